// Bandit Definitions
// A bandit is a known attack platform or rogue device described by its identifiers

use crate::bandits::identifiers::BanditIdentifier;
use crate::dot11::ManagementFrame;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

// ============================================================================
// BANDIT ID
// ============================================================================

/// Unique identifier for a bandit definition
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BanditId([u8; 16]);

impl BanditId {
    /// Generate a new random bandit ID
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 16];
        rng.fill(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for BanditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl PartialEq for BanditId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for BanditId {}

impl Hash for BanditId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

// ============================================================================
// BANDIT
// ============================================================================

/// A bandit definition: metadata plus the identifiers that recognize it
pub struct Bandit {
    id: BanditId,
    name: String,
    description: String,
    built_in: bool,
    created_at: DateTime<Utc>,
    identifiers: Vec<Box<dyn BanditIdentifier>>,
}

impl Bandit {
    /// Create a new user-defined bandit with a fresh random ID
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            id: BanditId::generate(),
            name: name.to_string(),
            description: description.to_string(),
            built_in: false,
            created_at: Utc::now(),
            identifiers: Vec::new(),
        }
    }

    /// Create a built-in bandit with a fixed ID
    pub fn built_in(id: BanditId, name: &str, description: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: description.to_string(),
            built_in: true,
            created_at: Utc::now(),
            identifiers: Vec::new(),
        }
    }

    /// Attach an identifier
    pub fn with_identifier(mut self, identifier: Box<dyn BanditIdentifier>) -> Self {
        self.identifiers.push(identifier);
        self
    }

    /// Get the bandit ID
    pub fn id(&self) -> BanditId {
        self.id
    }

    /// Get the bandit name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the bandit description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Check if this is a built-in definition
    pub fn is_built_in(&self) -> bool {
        self.built_in
    }

    /// Get when the definition was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the attached identifiers
    pub fn identifiers(&self) -> &[Box<dyn BanditIdentifier>] {
        &self.identifiers
    }

    /// Score a frame against all identifiers.
    ///
    /// A bandit matches when at least one identifier was applicable to the
    /// frame and no applicable identifier dissented. Frames to which every
    /// identifier is inapplicable do not match, and neither does a bandit
    /// without identifiers.
    pub fn matches(&self, frame: &ManagementFrame) -> bool {
        let mut any_applicable = false;

        for identifier in &self.identifiers {
            match identifier.matches(frame) {
                Some(true) => any_applicable = true,
                Some(false) => return false,
                None => {}
            }
        }

        any_applicable
    }
}

impl fmt::Debug for Bandit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bandit")
            .field("id", &self.id.to_string())
            .field("name", &self.name)
            .field("built_in", &self.built_in)
            .field("identifiers", &self.identifiers.len())
            .finish()
    }
}

impl fmt::Display for Bandit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)
    }
}
