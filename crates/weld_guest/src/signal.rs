//! Guest signal definitions.

use serde::{Deserialize, Serialize};
use weld_common::Shape;

weld_common::define_id!(
    /// Opaque, copyable ID for a signal within a guest module.
    GuestSignalId
);

/// A named signal in the guest module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestSignal {
    /// Preferred name; the generator may suffix it to keep names unique.
    pub name: String,
    /// Width and signedness.
    pub shape: Shape,
    /// Value after reset, and the constant driven when the signal has no driver.
    pub reset: u64,
}
