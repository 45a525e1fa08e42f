//! Bit width and signedness of a signal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The shape of a signal: how many bits it has and whether it is signed.
///
/// Both netlist representations use the same shape type so that shapes can be
/// carried across the bridge unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Shape {
    /// Width in bits.
    pub width: u32,
    /// Whether values are two's-complement signed.
    pub signed: bool,
}

impl Shape {
    /// An unsigned shape of the given width.
    pub const fn unsigned(width: u32) -> Self {
        Self {
            width,
            signed: false,
        }
    }

    /// A signed shape of the given width.
    pub const fn signed(width: u32) -> Self {
        Self {
            width,
            signed: true,
        }
    }

    /// Returns an all-ones mask covering this shape's bits (saturating at 64).
    pub fn mask(self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.signed {
            write!(f, "signed({})", self.width)
        } else {
            write!(f, "unsigned({})", self.width)
        }
    }
}
