//! The host module container and its combinational evaluator.

use crate::expr::HostExpr;
use crate::signal::{HostSignal, HostSignalId};
use crate::special::{Instance, Special};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use weld_common::{Arena, Shape};

/// A continuous assignment `target = value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAssign {
    /// The driven signal.
    pub target: HostSignalId,
    /// The driving expression.
    pub value: HostExpr,
}

/// A clock domain as seen from the host: its clock and reset wires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct HostDomain {
    clk: HostSignalId,
    rst: HostSignalId,
}

/// A single host module.
///
/// Holds every signal the bridge and platform allocate, the glue assignments,
/// and the special primitives. Signals are never removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostModule {
    /// The module name.
    pub name: String,
    /// All signals, keyed by [`HostSignalId`].
    pub signals: Arena<HostSignalId, HostSignal>,
    /// Continuous assignments.
    pub assignments: Vec<HostAssign>,
    /// Primitives and instances.
    pub specials: Vec<Special>,
    domains: IndexMap<String, HostDomain>,
}

impl HostModule {
    /// Creates an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Allocates a new signal.
    pub fn add_signal(&mut self, name: impl Into<String>, shape: Shape) -> HostSignalId {
        self.signals.alloc(HostSignal {
            name: name.into(),
            shape,
        })
    }

    /// Allocates a new signal with the same shape as `like`.
    pub fn signal_like(&mut self, like: HostSignalId, name: impl Into<String>) -> HostSignalId {
        let shape = self.signals[like].shape;
        self.add_signal(name, shape)
    }

    /// Returns a signal by ID.
    pub fn signal(&self, id: HostSignalId) -> &HostSignal {
        &self.signals[id]
    }

    /// Adds a continuous assignment.
    pub fn comb(&mut self, target: HostSignalId, value: impl Into<HostExpr>) {
        self.assignments.push(HostAssign {
            target,
            value: value.into(),
        });
    }

    /// Adds a special primitive.
    pub fn add_special(&mut self, special: Special) {
        self.specials.push(special);
    }

    /// Returns the clock wire of `domain`, creating the domain on first use.
    pub fn clock_signal(&mut self, domain: &str) -> HostSignalId {
        self.domain(domain).clk
    }

    /// Returns the reset wire of `domain`, creating the domain on first use.
    pub fn reset_signal(&mut self, domain: &str) -> HostSignalId {
        self.domain(domain).rst
    }

    fn domain(&mut self, name: &str) -> HostDomain {
        if let Some(domain) = self.domains.get(name) {
            return *domain;
        }
        let domain = HostDomain {
            clk: self.add_signal(format!("{name}_clk"), Shape::unsigned(1)),
            rst: self.add_signal(format!("{name}_rst"), Shape::unsigned(1)),
        };
        self.domains.insert(name.to_string(), domain);
        domain
    }

    /// Iterates over the black-box instances in the module.
    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.specials.iter().filter_map(|s| match s {
            Special::Instance(inst) => Some(inst),
            _ => None,
        })
    }

    /// Returns the assignment driving `target`, if any.
    pub fn driver(&self, target: HostSignalId) -> Option<&HostAssign> {
        self.assignments.iter().find(|a| a.target == target)
    }

    /// Settles the combinational assignments given fixed input values.
    ///
    /// Signals absent from `inputs` and undriven read as zero. Specials are
    /// opaque and do not propagate. Returns the value of every signal that
    /// is an input or an assignment target.
    pub fn evaluate(&self, inputs: &HashMap<HostSignalId, u64>) -> HashMap<HostSignalId, u64> {
        let mut values = inputs.clone();
        // Each pass settles at least one more level of an acyclic network.
        for _ in 0..=self.assignments.len() {
            let mut changed = false;
            for assign in &self.assignments {
                let mask = self.signals[assign.target].shape.mask();
                let value = assign
                    .value
                    .eval(&|id| values.get(&id).copied().unwrap_or(0))
                    & mask;
                if values.insert(assign.target, value) != Some(value) {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        values
    }
}
