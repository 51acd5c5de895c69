// 802.11 Management Frames
// Capture-layer product consumed by the bandit identification engine

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// FRAME TYPE
// ============================================================================

/// 802.11 management frame subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameType {
    AssociationRequest,
    AssociationResponse,
    ProbeRequest,
    ProbeResponse,
    Beacon,
    Authentication,
    Deauthentication,
    Disassociation,
}

impl FrameType {
    /// Check if this is a network-advertising frame (beacon or probe response)
    pub fn is_advertising(&self) -> bool {
        matches!(self, Self::Beacon | Self::ProbeResponse)
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AssociationRequest => "association-req",
            Self::AssociationResponse => "association-resp",
            Self::ProbeRequest => "probe-req",
            Self::ProbeResponse => "probe-resp",
            Self::Beacon => "beacon",
            Self::Authentication => "auth",
            Self::Deauthentication => "deauth",
            Self::Disassociation => "disassoc",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// MANAGEMENT FRAME
// ============================================================================

/// A decoded management frame with the attributes identifiers match on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementFrame {
    frame_type: FrameType,
    fingerprint: String,
    ssid: Option<String>,
    vendor_identity: Option<String>,
    signal_dbm: i8,
}

impl ManagementFrame {
    /// Create a new frame with the given type and parameter fingerprint
    pub fn new(frame_type: FrameType, fingerprint: &str) -> Self {
        Self {
            frame_type,
            fingerprint: fingerprint.to_string(),
            ssid: None,
            vendor_identity: None,
            signal_dbm: 0,
        }
    }

    /// Set the advertised SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = Some(ssid.to_string());
        self
    }

    /// Set the vendor-specific identity tag
    pub fn with_vendor_identity(mut self, identity: &str) -> Self {
        self.vendor_identity = Some(identity.to_string());
        self
    }

    /// Set the antenna signal strength
    pub fn with_signal_dbm(mut self, dbm: i8) -> Self {
        self.signal_dbm = dbm;
        self
    }

    /// Get the frame subtype
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// Get the lowercase hex fingerprint over the frame's tagged parameters
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Get the advertised SSID, if the frame carries one
    pub fn ssid(&self) -> Option<&str> {
        self.ssid.as_deref()
    }

    /// Get the vendor-specific identity tag, if the frame carries one
    pub fn vendor_identity(&self) -> Option<&str> {
        self.vendor_identity.as_deref()
    }

    /// Get the antenna signal strength in dBm
    pub fn signal_dbm(&self) -> i8 {
        self.signal_dbm
    }
}

impl fmt::Display for ManagementFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ssid {
            Some(ssid) => write!(f, "{} [{}] ({} dBm)", self.frame_type, ssid, self.signal_dbm),
            None => write!(f, "{} ({} dBm)", self.frame_type, self.signal_dbm),
        }
    }
}
