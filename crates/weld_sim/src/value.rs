//! Simulated signal storage.

use serde::{Deserialize, Serialize};
use weld_common::Shape;

weld_common::define_id!(
    /// Opaque ID of a signal in a [`Simulator`](crate::Simulator).
    SimSignalId
);

/// A simulated signal: a name, a width of 1 to 64 bits, and its committed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimSignal {
    /// Signal name, unique within a simulator.
    pub name: String,
    /// Width in bits.
    pub width: u32,
    /// Value as of the last commit.
    pub value: u64,
}

impl SimSignal {
    /// Returns the all-ones value for this signal's width.
    pub fn mask(&self) -> u64 {
        Shape::unsigned(self.width).mask()
    }
}
