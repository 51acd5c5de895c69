// Bandit Identifiers
// Tri-state matchers that vote on whether a management frame belongs to a bandit

use crate::dot11::{FrameType, ManagementFrame};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// IDENTIFIER KIND
// ============================================================================

/// The identifier families a bandit definition can combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierKind {
    Fingerprint,
    Ssid,
    VendorIdentity,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fingerprint => "FINGERPRINT",
            Self::Ssid => "SSID",
            Self::VendorIdentity => "VENDOR_IDENTITY",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// IDENTIFIER DESCRIPTOR
// ============================================================================

/// Stable, reproducible description of a configured identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierDescriptor {
    /// Identifier family
    pub kind: IdentifierKind,
    /// Human-readable explanation of the check
    pub description: String,
    /// Matcher expression; identical configuration renders identical bytes
    pub expression: String,
}

// ============================================================================
// BANDIT IDENTIFIER TRAIT
// ============================================================================

/// A single check scoring frames against one bandit attribute.
///
/// `None` means the check does not apply to the frame's type and casts no
/// vote. `Some(true)` is an applicable match, `Some(false)` an applicable
/// miss.
pub trait BanditIdentifier: Send + Sync {
    /// Score a frame
    fn matches(&self, frame: &ManagementFrame) -> Option<bool>;

    /// Describe the configured check
    fn descriptor(&self) -> IdentifierDescriptor;
}

// ============================================================================
// FINGERPRINT IDENTIFIER
// ============================================================================

/// Matches advertising frames by their tagged-parameter fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintIdentifier {
    fingerprint: String,
}

impl FingerprintIdentifier {
    /// Create a new fingerprint identifier
    pub fn new(fingerprint: &str) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
        }
    }
}

impl BanditIdentifier for FingerprintIdentifier {
    fn matches(&self, frame: &ManagementFrame) -> Option<bool> {
        if !frame.frame_type().is_advertising() {
            return None;
        }

        Some(frame.fingerprint() == self.fingerprint)
    }

    fn descriptor(&self) -> IdentifierDescriptor {
        IdentifierDescriptor {
            kind: IdentifierKind::Fingerprint,
            description: "Matches if the frame fingerprint equals the expected fingerprint."
                .to_string(),
            expression: format!("frame.fingerprint == \"{}\"", self.fingerprint),
        }
    }
}

// ============================================================================
// SSID IDENTIFIER
// ============================================================================

/// Matches advertising frames whose SSID is in a configured list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsidIdentifier {
    ssids: Vec<String>,
}

impl SsidIdentifier {
    /// Create a new SSID identifier over the given list
    pub fn new(ssids: Vec<String>) -> Self {
        Self { ssids }
    }
}

impl BanditIdentifier for SsidIdentifier {
    fn matches(&self, frame: &ManagementFrame) -> Option<bool> {
        if !frame.frame_type().is_advertising() {
            return None;
        }

        // Hidden or wildcard SSIDs are applicable but never members.
        Some(match frame.ssid() {
            Some(ssid) => self.ssids.iter().any(|s| s == ssid),
            None => false,
        })
    }

    fn descriptor(&self) -> IdentifierDescriptor {
        IdentifierDescriptor {
            kind: IdentifierKind::Ssid,
            description: "Matches if the SSID advertised by the frame is one of the expected SSIDs."
                .to_string(),
            expression: format!("frame.ssid IN [\"{}\"]", self.ssids.join("\",\"")),
        }
    }
}

// ============================================================================
// VENDOR IDENTITY IDENTIFIER
// ============================================================================

/// Matches beacons carrying a specific vendor identity tag.
///
/// Applicable to beacons only: the devices this recognizes advertise
/// themselves exclusively through beacon frames, so a probe response
/// carrying the same tag casts no vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorIdentityIdentifier {
    identity: String,
}

impl VendorIdentityIdentifier {
    /// Create a new vendor identity identifier
    pub fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
        }
    }
}

impl BanditIdentifier for VendorIdentityIdentifier {
    fn matches(&self, frame: &ManagementFrame) -> Option<bool> {
        if frame.frame_type() != FrameType::Beacon {
            return None;
        }

        Some(matches!(frame.vendor_identity(), Some(tag) if tag == self.identity))
    }

    fn descriptor(&self) -> IdentifierDescriptor {
        IdentifierDescriptor {
            kind: IdentifierKind::VendorIdentity,
            description: "Matches if the beacon advertises the expected vendor identity."
                .to_string(),
            expression: format!("frame.vendor_identity == \"{}\"", self.identity),
        }
    }
}
