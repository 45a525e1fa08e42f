//! Error types for bridging, pad adaptation, and platform access.

use crate::bridge::Phase;
use weld_common::{Direction, InternalError, UnsupportedPad};
use weld_config::ConfigError;
use weld_guest::GuestError;

/// Errors raised by a build platform while handing out pads.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The platform has no resource with the requested name and index.
    #[error("platform has no resource '{0}'")]
    UnknownResource(String),

    /// The resource table is malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while collecting connections, adapting pads, or finalizing a bridge.
///
/// All of them are fatal for the build.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Two connections resolve to the same generated port.
    #[error("port '{label}' is connected more than once")]
    PortCollision {
        /// The colliding `{i|o}_{name}` label.
        label: String,
    },

    /// The requested (direction, rate) has no entry in the pad decision table.
    #[error(transparent)]
    UnsupportedPad(#[from] UnsupportedPad),

    /// A capability's declared signature differs from the members actually built.
    #[error("capability '{name}' does not match its signature: {detail}")]
    SignatureMismatch {
        /// Name prefix of the capability.
        name: String,
        /// The first difference found.
        detail: String,
    },

    /// An operation was called out of order.
    #[error("cannot {operation} while the bridge is {phase}")]
    PhaseViolation {
        /// The rejected operation.
        operation: &'static str,
        /// The phase the bridge was in.
        phase: Phase,
    },

    /// A capability lacks a member an operation requires.
    #[error("capability '{node}' has no member '{member}'")]
    MissingMember {
        /// Name prefix of the capability.
        node: String,
        /// The missing member.
        member: String,
    },

    /// A physical pad was adapted twice with different parameters.
    #[error(
        "pad '{name}' is already adapted as '{direction}' at rate {rate}, \
         cannot adapt it as '{requested_direction}' at rate {requested_rate}"
    )]
    PadConflict {
        /// Name prefix used on the first adaptation.
        name: String,
        /// Direction of the first adaptation.
        direction: Direction,
        /// Rate of the first adaptation.
        rate: u8,
        /// Direction of the rejected adaptation.
        requested_direction: Direction,
        /// Rate of the rejected adaptation.
        requested_rate: u8,
    },

    /// A per-field direction or rate spec was given for a single pad.
    #[error("pad '{name}' is a single signal but was given a per-field spec")]
    SpecShape {
        /// Name prefix of the pad.
        name: String,
    },

    /// The platform failed to provide a pad.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Guest construction or code generation failed.
    #[error("guest error: {0}")]
    Guest(#[from] GuestError),

    /// Writing the netlist failed.
    #[error("failed to write netlist: {0}")]
    Io(#[from] std::io::Error),

    /// The bridge's own bookkeeping is inconsistent.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
