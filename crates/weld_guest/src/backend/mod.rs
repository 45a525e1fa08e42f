//! Code generation back-ends for guest modules.

pub mod verilog;
