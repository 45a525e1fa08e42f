//! The guest module: the design that is generated separately and embedded
//! into the host as a black box.
//!
//! A [`GuestModule`] holds signals, clock domains, and combinational or
//! synchronous statements over [`Expr`] trees. [`backend::verilog::convert`]
//! emits Verilog for it with the port list restricted to a caller-chosen set
//! of [`GuestRef`]s and reports the name and direction each port received.

#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod expr;
pub mod module;
pub mod signal;

pub use backend::verilog::{convert, Generated, PortDirection};
pub use error::GuestError;
pub use expr::{BinaryOp, Expr, UnaryOp};
pub use module::{ClockDomain, GuestModule, GuestRef, Statement, TOP_DOMAIN};
pub use signal::{GuestSignal, GuestSignalId};
