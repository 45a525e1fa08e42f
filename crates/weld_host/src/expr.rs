//! Combinational expressions on host signals.

use crate::signal::HostSignalId;
use serde::{Deserialize, Serialize};

/// A combinational expression driving a host signal.
///
/// The host side only ever needs glue: direct references, bitwise inversion,
/// constants, and replication of a single bit across a bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostExpr {
    /// The value of a signal.
    Signal(HostSignalId),
    /// A constant.
    Const {
        /// The value, truncated to `width` bits.
        value: u64,
        /// Width in bits.
        width: u32,
    },
    /// Bitwise NOT.
    Not(Box<HostExpr>),
    /// Bit 0 of `bit` repeated `count` times.
    Replicate {
        /// The single-bit source.
        bit: HostSignalId,
        /// Number of copies.
        count: u32,
    },
}

impl HostExpr {
    /// Bitwise inversion of a signal.
    pub fn not(signal: HostSignalId) -> Self {
        HostExpr::Not(Box::new(HostExpr::Signal(signal)))
    }

    /// Evaluates the expression, reading signal values through `read`.
    ///
    /// The result is not masked; callers truncate it to the target width.
    pub fn eval(&self, read: &dyn Fn(HostSignalId) -> u64) -> u64 {
        match self {
            HostExpr::Signal(id) => read(*id),
            HostExpr::Const { value, .. } => *value,
            HostExpr::Not(inner) => !inner.eval(read),
            HostExpr::Replicate { bit, count } => {
                if read(*bit) & 1 == 0 {
                    0
                } else if *count >= 64 {
                    u64::MAX
                } else {
                    (1u64 << count) - 1
                }
            }
        }
    }

    /// Collects every signal the expression reads.
    pub fn reads(&self, out: &mut Vec<HostSignalId>) {
        match self {
            HostExpr::Signal(id) | HostExpr::Replicate { bit: id, .. } => out.push(*id),
            HostExpr::Const { .. } => {}
            HostExpr::Not(inner) => inner.reads(out),
        }
    }
}

impl From<HostSignalId> for HostExpr {
    fn from(id: HostSignalId) -> Self {
        HostExpr::Signal(id)
    }
}
