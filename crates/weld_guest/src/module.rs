//! The guest module container.

use crate::error::GuestError;
use crate::expr::Expr;
use crate::signal::{GuestSignal, GuestSignalId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use weld_common::{Arena, Shape};

/// Name of the guest's default clock domain.
pub const TOP_DOMAIN: &str = "sync";

/// A named clock domain: a clock and a synchronous reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockDomain {
    /// The domain name.
    pub name: String,
    /// The clock signal.
    pub clk: GuestSignalId,
    /// The synchronous reset signal.
    pub rst: GuestSignalId,
}

/// A statement driving `target`.
///
/// `domain: None` is a combinational assignment; otherwise the target is a
/// register updated on the rising edge of that domain's clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// The driven signal.
    pub target: GuestSignalId,
    /// The driving expression.
    pub value: Expr,
    /// Clock domain for synchronous statements.
    pub domain: Option<String>,
}

/// A reference to a guest-side connection target.
///
/// Clock and reset references name a domain rather than its underlying
/// signal, so they can be declared before the domain's signals are known.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GuestRef {
    /// A plain signal.
    Signal(GuestSignalId),
    /// The clock of a domain.
    Clock(String),
    /// The reset of a domain.
    Reset(String),
}

impl From<GuestSignalId> for GuestRef {
    fn from(id: GuestSignalId) -> Self {
        GuestRef::Signal(id)
    }
}

impl fmt::Display for GuestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestRef::Signal(id) => write!(f, "signal #{}", id.as_raw()),
            GuestRef::Clock(domain) => write!(f, "clock of domain '{domain}'"),
            GuestRef::Reset(domain) => write!(f, "reset of domain '{domain}'"),
        }
    }
}

/// A guest module: signals, clock domains, and statements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuestModule {
    /// All signals, keyed by [`GuestSignalId`].
    pub signals: Arena<GuestSignalId, GuestSignal>,
    /// Declared clock domains by name.
    pub domains: IndexMap<String, ClockDomain>,
    /// Statements in declaration order.
    pub statements: Vec<Statement>,
}

impl GuestModule {
    /// Creates an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a signal with reset value zero.
    pub fn add_signal(&mut self, name: impl Into<String>, shape: Shape) -> GuestSignalId {
        self.add_signal_with_reset(name, shape, 0)
    }

    /// Allocates a signal with the given reset value.
    pub fn add_signal_with_reset(
        &mut self,
        name: impl Into<String>,
        shape: Shape,
        reset: u64,
    ) -> GuestSignalId {
        self.signals.alloc(GuestSignal {
            name: name.into(),
            shape,
            reset: reset & shape.mask(),
        })
    }

    /// Returns a signal by ID.
    pub fn signal(&self, id: GuestSignalId) -> &GuestSignal {
        &self.signals[id]
    }

    /// Declares a clock domain with fresh clock and reset signals.
    ///
    /// The default domain uses the bare names `clk`/`rst`; others are
    /// prefixed with the domain name.
    pub fn add_domain(&mut self, name: &str) -> Result<&ClockDomain, GuestError> {
        if self.domains.contains_key(name) {
            return Err(GuestError::DuplicateDomain(name.to_string()));
        }
        let (clk_name, rst_name) = if name == TOP_DOMAIN {
            ("clk".to_string(), "rst".to_string())
        } else {
            (format!("{name}_clk"), format!("{name}_rst"))
        };
        let clk = self.add_signal(clk_name, Shape::unsigned(1));
        let rst = self.add_signal(rst_name, Shape::unsigned(1));
        let domain = ClockDomain {
            name: name.to_string(),
            clk,
            rst,
        };
        Ok(self.domains.entry(name.to_string()).or_insert(domain))
    }

    /// Returns a declared clock domain.
    pub fn domain(&self, name: &str) -> Option<&ClockDomain> {
        self.domains.get(name)
    }

    /// Adds a combinational assignment.
    pub fn comb(&mut self, target: GuestSignalId, value: impl Into<Expr>) {
        self.statements.push(Statement {
            target,
            value: value.into(),
            domain: None,
        });
    }

    /// Adds a synchronous assignment in `domain`.
    ///
    /// The domain only has to exist by the time code is generated.
    pub fn sync(&mut self, domain: &str, target: GuestSignalId, value: impl Into<Expr>) {
        self.statements.push(Statement {
            target,
            value: value.into(),
            domain: Some(domain.to_string()),
        });
    }

    /// Resolves a connection target to its underlying signal.
    pub fn resolve(&self, target: &GuestRef) -> Result<GuestSignalId, GuestError> {
        match target {
            GuestRef::Signal(id) => Ok(*id),
            GuestRef::Clock(name) => self
                .domain(name)
                .map(|d| d.clk)
                .ok_or_else(|| GuestError::UnknownDomain(name.clone())),
            GuestRef::Reset(name) => self
                .domain(name)
                .map(|d| d.rst)
                .ok_or_else(|| GuestError::UnknownDomain(name.clone())),
        }
    }

    /// Returns the shape of a connection target.
    pub fn shape_of(&self, target: &GuestRef) -> Result<Shape, GuestError> {
        Ok(self.signals[self.resolve(target)?].shape)
    }
}
