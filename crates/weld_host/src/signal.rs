//! Host signal definitions.

use serde::{Deserialize, Serialize};
use weld_common::Shape;

weld_common::define_id!(
    /// Opaque, copyable ID for a signal within a host module.
    HostSignalId
);

/// A named wire in the host netlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSignal {
    /// The signal name.
    pub name: String,
    /// Width and signedness.
    pub shape: Shape,
}

impl HostSignal {
    /// Returns the signal width in bits.
    pub fn width(&self) -> u32 {
        self.shape.width
    }
}
