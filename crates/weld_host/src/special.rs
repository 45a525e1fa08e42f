//! Special primitives: I/O buffers, synchronizers, and black-box instances.
//!
//! Specials are opaque to the host netlist. The build platform lowers them to
//! vendor primitives; the bridge only creates and connects them.

use crate::expr::HostExpr;
use crate::signal::HostSignalId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A primitive or instance inserted into the host netlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Special {
    /// Tristate I/O buffer on a physical pad.
    Tristate {
        /// The physical pad.
        target: HostSignalId,
        /// Value driven when enabled.
        o: HostSignalId,
        /// Per-bit output enable.
        oe: HostExpr,
        /// Value sampled from the pad.
        i: HostSignalId,
    },
    /// Single-data-rate input register.
    SdrInput {
        /// Pad-side input.
        i: HostSignalId,
        /// Registered output.
        o: HostSignalId,
        /// Sampling clock.
        clk: HostSignalId,
    },
    /// Single-data-rate output register.
    SdrOutput {
        /// Logic-side input.
        i: HostSignalId,
        /// Pad-side output.
        o: HostSignalId,
        /// Launch clock.
        clk: HostSignalId,
    },
    /// Double-data-rate input register.
    DdrInput {
        /// Pad-side input.
        i: HostSignalId,
        /// Sample taken on the rising edge.
        o1: HostSignalId,
        /// Sample taken on the falling edge.
        o2: HostSignalId,
        /// Sampling clock.
        clk: HostSignalId,
    },
    /// Double-data-rate output register.
    DdrOutput {
        /// Value driven during the first half-cycle.
        i1: HostSignalId,
        /// Value driven during the second half-cycle.
        i2: HostSignalId,
        /// Pad-side output.
        o: HostSignalId,
        /// Launch clock.
        clk: HostSignalId,
    },
    /// A black-box module instance.
    Instance(Instance),
}

impl Special {
    /// Returns a short primitive name for reporting.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Special::Tristate { .. } => "tristate",
            Special::SdrInput { .. } => "sdr_input",
            Special::SdrOutput { .. } => "sdr_output",
            Special::DdrInput { .. } => "ddr_input",
            Special::DdrOutput { .. } => "ddr_output",
            Special::Instance(_) => "instance",
        }
    }

    /// Returns `true` for clocked synchronizer primitives.
    pub fn is_synchronizer(&self) -> bool {
        matches!(
            self,
            Special::SdrInput { .. }
                | Special::SdrOutput { .. }
                | Special::DdrInput { .. }
                | Special::DdrOutput { .. }
        )
    }
}

/// Direction prefix of an instance port label (`i_` or `o_`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortPrefix {
    /// The instance reads the bound signal.
    Input,
    /// The instance drives the bound signal.
    Output,
}

impl PortPrefix {
    /// Returns the prefix letter.
    pub fn as_str(self) -> &'static str {
        match self {
            PortPrefix::Input => "i",
            PortPrefix::Output => "o",
        }
    }

    /// Formats a port label `{prefix}_{name}`.
    pub fn label(self, name: &str) -> String {
        format!("{}_{name}", self.as_str())
    }
}

/// An instance of an opaque module, bound to host signals by port label.
///
/// Labels carry their direction as an `i_`/`o_` prefix; the remainder is the
/// port name inside the instantiated module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Name of the instantiated module.
    pub module: String,
    /// Port label to bound signal.
    pub ports: BTreeMap<String, HostSignalId>,
}

impl Instance {
    /// Creates an instance with no ports bound.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ports: BTreeMap::new(),
        }
    }

    /// Returns the signal bound to `label`, if any.
    pub fn port(&self, label: &str) -> Option<HostSignalId> {
        self.ports.get(label).copied()
    }

    /// Splits a label into its direction and the module-side port name.
    pub fn parse_label(label: &str) -> Option<(PortPrefix, &str)> {
        if let Some(name) = label.strip_prefix("i_") {
            Some((PortPrefix::Input, name))
        } else {
            label
                .strip_prefix("o_")
                .map(|name| (PortPrefix::Output, name))
        }
    }

    /// Iterates over ports with the given direction as `(module port name, signal)`.
    pub fn ports_with(&self, prefix: PortPrefix) -> impl Iterator<Item = (&str, HostSignalId)> {
        self.ports.iter().filter_map(move |(label, sig)| match Self::parse_label(label) {
            Some((p, name)) if p == prefix => Some((name, *sig)),
            _ => None,
        })
    }
}
