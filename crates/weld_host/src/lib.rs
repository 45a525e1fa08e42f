//! The host netlist: the design that embeds the guest module as a black box.
//!
//! A [`HostModule`] holds [`HostSignal`]s, combinational [`HostAssign`]ments,
//! and [`Special`] primitives (tristate buffers, single/double-data-rate
//! synchronizers, and black-box [`Instance`]s). The bridge synthesizes pad
//! glue into it and finally inserts the guest instance.

#![warn(missing_docs)]

pub mod expr;
pub mod module;
pub mod signal;
pub mod special;

pub use expr::HostExpr;
pub use module::{HostAssign, HostModule};
pub use signal::{HostSignal, HostSignalId};
pub use special::{Instance, PortPrefix, Special};
