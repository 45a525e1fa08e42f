//! Simulation error types.

use weld_common::{Role, UnsupportedPad};
use weld_config::ConfigError;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A signal was declared with a width outside 1..=64.
    #[error("signal '{name}' has unsupported width {width} (expected 1..=64)")]
    InvalidWidth {
        /// The signal name.
        name: String,
        /// The requested width.
        width: u32,
    },

    /// A value does not fit the signal it was written to.
    #[error("value {value:#x} does not fit the {width}-bit signal '{signal}'")]
    ValueTooWide {
        /// The signal name.
        signal: String,
        /// The rejected value.
        value: u64,
        /// The signal width.
        width: u32,
    },

    /// Too many delta cycles without settling, indicating a combinational loop.
    #[error("delta cycle limit exceeded (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// The maximum number of delta cycles allowed.
        max_deltas: u32,
    },

    /// The resource table has no resource with this name and index.
    #[error("no resource '{0}'")]
    UnknownResource(String),

    /// The resource was already requested.
    #[error("resource '{0}' has already been requested")]
    AlreadyRequested(String),

    /// The pin's (direction, rate) cannot be simulated.
    #[error(transparent)]
    UnsupportedPin(#[from] UnsupportedPad),

    /// A pin lacks a signal its direction and rate need.
    #[error("pin '{pin}' has no '{role}' signal")]
    MissingPinSignal {
        /// Name of the pin.
        pin: String,
        /// The missing role.
        role: Role,
    },

    /// A per-field spec names a field the resource does not have.
    #[error("pin group '{group}' has no member '{member}'")]
    MissingMember {
        /// Name prefix of the group.
        group: String,
        /// The unknown field.
        member: String,
    },

    /// A per-field direction or rate spec was given for a single pin.
    #[error("pin '{0}' is a single signal but was given a per-field spec")]
    SpecShape(String),

    /// The resource table is malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
