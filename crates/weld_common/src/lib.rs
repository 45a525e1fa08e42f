//! Shared foundational types used across the Weld bridge crates.
//!
//! This crate provides the dense [`Arena`] and its ID macro, signal
//! [`Shape`]s, the pad direction/rate vocabulary with the decision table
//! shared by synthesis and simulation, and the common internal error type.

#![warn(missing_docs)]

pub mod arena;
pub mod pad;
pub mod result;
pub mod shape;

pub use arena::{Arena, ArenaId};
pub use pad::{pad_roles, DirSpec, Direction, FieldSpec, Flow, RateSpec, Role, UnsupportedPad};
pub use result::{InternalError, WeldResult};
pub use shape::Shape;
