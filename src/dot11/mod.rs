// Dot11 module - 802.11 management frame model
// The abstract frame shape the identification engine consumes

mod frames;

pub use frames::{FrameType, ManagementFrame};
