// Contact Engine
// Scores captured frames against registered bandits and tracks contact windows

use crate::bandits::bandit::{Bandit, BanditId};
use crate::dot11::ManagementFrame;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{error, info};

/// Minutes since the last frame during which a contact counts as active
pub const ACTIVE_CONTACT_MINUTES: i64 = 10;

// ============================================================================
// CONTACT
// ============================================================================

/// An observation window for one bandit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    bandit_id: BanditId,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    frame_count: u64,
    last_signal: i8,
}

impl Contact {
    fn new(bandit_id: BanditId, now: DateTime<Utc>, signal: i8) -> Self {
        Self {
            bandit_id,
            first_seen: now,
            last_seen: now,
            frame_count: 1,
            last_signal: signal,
        }
    }

    fn register_frame(&mut self, now: DateTime<Utc>, signal: i8) {
        self.last_seen = now;
        self.frame_count = self.frame_count.saturating_add(1);
        self.last_signal = signal;
    }

    /// Get the bandit this contact belongs to
    pub fn bandit_id(&self) -> BanditId {
        self.bandit_id
    }

    /// Get when the first frame was seen
    pub fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    /// Get when the most recent frame was seen
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// Get the number of frames observed during this contact
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the signal strength of the most recent frame
    pub fn last_signal(&self) -> i8 {
        self.last_signal
    }

    /// Check if the contact is still inside the active window at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.last_seen + Duration::minutes(ACTIVE_CONTACT_MINUTES) > now
    }
}

// ============================================================================
// CONTACT EVENT
// ============================================================================

/// Raised when a frame opens a new contact
#[derive(Debug, Clone)]
pub struct ContactEvent {
    /// The matched bandit
    pub bandit_id: BanditId,
    /// Name of the matched bandit
    pub bandit_name: String,
    /// Signal strength of the triggering frame
    pub signal_dbm: i8,
    /// When the contact opened
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// CONTACT ENGINE
// ============================================================================

/// Bandit registry plus in-memory contact state.
///
/// Matching itself is pure; all mutable state lives behind the engine's
/// locks, so `identify` is safe to call from any thread.
pub struct ContactEngine {
    bandits: RwLock<HashMap<BanditId, Arc<Bandit>>>,
    contacts: RwLock<HashMap<BanditId, Contact>>,
}

impl ContactEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self {
            bandits: RwLock::new(HashMap::new()),
            contacts: RwLock::new(HashMap::new()),
        }
    }

    /// Register a bandit definition
    pub fn register_bandit(&self, bandit: Bandit) -> BanditId {
        let id = bandit.id();

        match self.bandits.write() {
            Ok(mut bandits) => {
                info!("Registering bandit [{}].", bandit);
                bandits.insert(id, Arc::new(bandit));
            }
            Err(e) => error!("Could not acquire bandit registry lock. {}", e),
        }

        id
    }

    /// Remove a bandit and any contact state it accumulated
    pub fn remove_bandit(&self, id: BanditId) -> bool {
        let removed = match self.bandits.write() {
            Ok(mut bandits) => bandits.remove(&id).is_some(),
            Err(e) => {
                error!("Could not acquire bandit registry lock. {}", e);
                false
            }
        };

        if removed {
            if let Ok(mut contacts) = self.contacts.write() {
                contacts.remove(&id);
            }
        }

        removed
    }

    /// Look up a bandit by ID
    pub fn bandit(&self, id: BanditId) -> Option<Arc<Bandit>> {
        match self.bandits.read() {
            Ok(bandits) => bandits.get(&id).cloned(),
            Err(e) => {
                error!("Could not acquire bandit registry lock. {}", e);
                None
            }
        }
    }

    /// Get all registered bandits
    pub fn bandits(&self) -> Vec<Arc<Bandit>> {
        match self.bandits.read() {
            Ok(bandits) => bandits.values().cloned().collect(),
            Err(e) => {
                error!("Could not acquire bandit registry lock. {}", e);
                Vec::new()
            }
        }
    }

    /// Install the built-in bandit definitions, replacing earlier seeds.
    /// Built-in IDs are fixed, so re-seeding is idempotent.
    pub fn seed_built_in(&self) {
        match self.bandits.write() {
            Ok(mut bandits) => {
                bandits.retain(|_, b| !b.is_built_in());
                for bandit in crate::bandits::defaults::built_in_bandits() {
                    bandits.insert(bandit.id(), Arc::new(bandit));
                }
            }
            Err(e) => error!("Could not acquire bandit registry lock. {}", e),
        }
    }

    /// Score a frame against every registered bandit at the current time
    pub fn identify(&self, frame: &ManagementFrame) -> Vec<ContactEvent> {
        self.identify_at(frame, Utc::now())
    }

    /// Score a frame at an explicit timestamp.
    ///
    /// Every matching bandit either opens a new contact (raising a
    /// `ContactEvent`) or refreshes its active one.
    pub fn identify_at(&self, frame: &ManagementFrame, now: DateTime<Utc>) -> Vec<ContactEvent> {
        let bandits = self.bandits();
        let mut events = Vec::new();

        for bandit in bandits {
            if !bandit.matches(frame) {
                continue;
            }

            match self.contacts.write() {
                Ok(mut contacts) => match contacts.get_mut(&bandit.id()) {
                    Some(contact) if contact.is_active_at(now) => {
                        contact.register_frame(now, frame.signal_dbm());
                    }
                    _ => {
                        info!("New contact for bandit [{}].", bandit);
                        contacts
                            .insert(bandit.id(), Contact::new(bandit.id(), now, frame.signal_dbm()));
                        events.push(ContactEvent {
                            bandit_id: bandit.id(),
                            bandit_name: bandit.name().to_string(),
                            signal_dbm: frame.signal_dbm(),
                            timestamp: now,
                        });
                    }
                },
                Err(e) => error!("Could not acquire contact table lock. {}", e),
            }
        }

        events
    }

    /// Get all currently active contacts, pruning expired ones
    pub fn active_contacts(&self) -> Vec<Contact> {
        self.active_contacts_at(Utc::now())
    }

    /// Get contacts active at an explicit timestamp
    pub fn active_contacts_at(&self, now: DateTime<Utc>) -> Vec<Contact> {
        match self.contacts.write() {
            Ok(mut contacts) => {
                contacts.retain(|_, c| c.is_active_at(now));
                contacts.values().cloned().collect()
            }
            Err(e) => {
                error!("Could not acquire contact table lock. {}", e);
                Vec::new()
            }
        }
    }

    /// Get the active contact for one bandit, if any
    pub fn contact(&self, bandit_id: BanditId) -> Option<Contact> {
        match self.contacts.read() {
            Ok(contacts) => contacts
                .get(&bandit_id)
                .filter(|c| c.is_active_at(Utc::now()))
                .cloned(),
            Err(e) => {
                error!("Could not acquire contact table lock. {}", e);
                None
            }
        }
    }
}

impl Default for ContactEngine {
    fn default() -> Self {
        Self::new()
    }
}
