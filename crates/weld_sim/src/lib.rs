//! Event-driven simulation of physical pads.
//!
//! [`Simulator`] is a small delta-cycle kernel over integer-valued signals
//! with passive [`Process`]es that wait on value changes or levels.
//! [`SimPort`] attaches the run-time behavior of an adapted pad to a
//! simulated physical port, and [`SimPlatform`] hands out such pads from a
//! `weld.toml` resource table.

#![warn(missing_docs)]

pub mod error;
pub mod kernel;
pub mod platform;
pub mod port;
pub mod value;

pub use error::SimError;
pub use kernel::{Process, ProcessContext, Simulator, Wait, DEFAULT_MAX_DELTAS};
pub use platform::{SimPlatform, SimResource};
pub use port::{SimPin, SimPort};
pub use value::{SimSignal, SimSignalId};
