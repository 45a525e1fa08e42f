//! Verilog-2001 generation with a caller-restricted port list.
//!
//! [`convert`] turns a [`GuestModule`] into a single Verilog module whose
//! ports are exactly the requested [`GuestRef`]s. A port is an output if the
//! module drives it and an input otherwise. Signals that are read but have
//! no driver and are not ports are tied to their reset value. The returned
//! [`Generated`] records the final name of every emitted signal and the
//! direction of every port, which is what callers need to bind an instance
//! of the generated module.

use crate::error::GuestError;
use crate::expr::{Expr, UnaryOp};
use crate::module::{GuestModule, GuestRef};
use crate::signal::GuestSignalId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use weld_common::Shape;

/// Direction of a generated port, from the generated module's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// The module reads the port.
    Input,
    /// The module drives the port.
    Output,
}

impl PortDirection {
    /// Returns `"i"` or `"o"`.
    pub fn as_str(self) -> &'static str {
        match self {
            PortDirection::Input => "i",
            PortDirection::Output => "o",
        }
    }
}

/// The output of [`convert`].
#[derive(Debug, Clone)]
pub struct Generated {
    /// The Verilog source text.
    pub text: String,
    /// Final (unique, legal) name of every emitted signal.
    pub names: BTreeMap<GuestSignalId, String>,
    /// Direction of every port, in port-list order.
    pub ports: IndexMap<GuestSignalId, PortDirection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Driver {
    Comb,
    Sync(String),
}

const KEYWORDS: &[&str] = &[
    "always", "assign", "begin", "case", "else", "end", "endmodule", "if", "initial", "inout",
    "input", "integer", "module", "negedge", "output", "posedge", "reg", "signed", "wire",
];

/// Hands out unique, legal Verilog identifiers.
#[derive(Default)]
struct Namer {
    taken: HashSet<String>,
}

impl Namer {
    fn claim(&mut self, preferred: &str) -> String {
        let mut base: String = preferred
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
            base.insert(0, '_');
        }
        if KEYWORDS.contains(&base.as_str()) {
            base.push('_');
        }
        let mut candidate = base.clone();
        let mut n = 1;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

/// Generates Verilog for `module` under the name `name`, exposing exactly `ports`.
///
/// Duplicate entries in `ports` (including a domain clock listed both by
/// domain and by signal) collapse to a single port.
pub fn convert(
    module: &GuestModule,
    name: &str,
    ports: &[GuestRef],
) -> Result<Generated, GuestError> {
    if let Some((_, sig)) = module.signals.iter().find(|(_, s)| s.shape.width == 0) {
        return Err(GuestError::ZeroWidth(sig.name.clone()));
    }

    let drivers = collect_drivers(module)?;
    for stmt in &module.statements {
        check_expr(module, stmt.target, &stmt.value)?;
    }

    let mut port_dirs: IndexMap<GuestSignalId, PortDirection> = IndexMap::new();
    for target in ports {
        let id = module.resolve(target)?;
        let dir = if drivers.contains_key(&id) {
            PortDirection::Output
        } else {
            PortDirection::Input
        };
        port_dirs.entry(id).or_insert(dir);
    }

    let mut used: BTreeSet<GuestSignalId> = BTreeSet::new();
    let mut reads = Vec::new();
    for stmt in &module.statements {
        used.insert(stmt.target);
        stmt.value.reads(&mut reads);
        if let Some(domain) = stmt.domain.as_deref().and_then(|d| module.domain(d)) {
            used.insert(domain.clk);
            used.insert(domain.rst);
        }
    }
    used.extend(reads);

    let mut namer = Namer::default();
    let mut names = BTreeMap::new();
    for id in port_dirs.keys() {
        names.insert(*id, namer.claim(&module.signal(*id).name));
    }
    for id in &used {
        if !names.contains_key(id) {
            names.insert(*id, namer.claim(&module.signal(*id).name));
        }
    }

    let mut emitter = Emitter {
        module,
        names: &names,
        namer,
        decls: Vec::new(),
        assigns: Vec::new(),
    };
    let text = emitter.module_text(name, &port_dirs, &drivers);

    log::debug!(
        "generated module '{name}': {} ports, {} signals",
        port_dirs.len(),
        names.len()
    );

    Ok(Generated {
        text,
        names,
        ports: port_dirs,
    })
}

fn collect_drivers(module: &GuestModule) -> Result<HashMap<GuestSignalId, Driver>, GuestError> {
    let mut drivers: HashMap<GuestSignalId, Driver> = HashMap::new();
    for stmt in &module.statements {
        let driver = match &stmt.domain {
            None => Driver::Comb,
            Some(domain) => {
                if module.domain(domain).is_none() {
                    return Err(GuestError::UnknownDomain(domain.clone()));
                }
                Driver::Sync(domain.clone())
            }
        };
        match drivers.get(&stmt.target) {
            None => {
                drivers.insert(stmt.target, driver);
            }
            // Several updates of one register in one domain: the last one wins.
            Some(existing @ Driver::Sync(_)) if *existing == driver => {}
            Some(_) => {
                return Err(GuestError::MultipleDrivers {
                    signal: module.signal(stmt.target).name.clone(),
                })
            }
        }
    }
    Ok(drivers)
}

/// Rejects slices outside their operand and empty concatenations.
fn check_expr(module: &GuestModule, target: GuestSignalId, e: &Expr) -> Result<(), GuestError> {
    match e {
        Expr::Signal(_) | Expr::Const { .. } => Ok(()),
        Expr::Unary { operand, .. } => check_expr(module, target, operand),
        Expr::Binary { lhs, rhs, .. } => {
            check_expr(module, target, lhs)?;
            check_expr(module, target, rhs)
        }
        Expr::Slice { value, start, end } => {
            check_expr(module, target, value)?;
            let width = value.shape(&module.signals).width;
            if start < end && *end <= width {
                Ok(())
            } else {
                Err(GuestError::InvalidSlice {
                    signal: module.signal(target).name.clone(),
                    start: *start,
                    end: *end,
                    width,
                })
            }
        }
        Expr::Cat(parts) => {
            if parts.is_empty() {
                return Err(GuestError::EmptyCat(module.signal(target).name.clone()));
            }
            parts.iter().try_for_each(|p| check_expr(module, target, p))
        }
        Expr::Mux {
            sel,
            then,
            otherwise,
        } => {
            check_expr(module, target, sel)?;
            check_expr(module, target, then)?;
            check_expr(module, target, otherwise)
        }
    }
}

fn decl(kind: &str, shape: Shape, name: &str) -> String {
    let mut s = format!("  {kind} ");
    if shape.signed {
        s.push_str("signed ");
    }
    if shape.width > 1 {
        s.push_str(&format!("[{}:0] ", shape.width - 1));
    }
    s.push_str(name);
    s
}

fn literal(value: u64, shape: Shape) -> String {
    let value = value & shape.mask();
    if shape.signed {
        format!("{}'sh{value:x}", shape.width)
    } else {
        format!("{}'h{value:x}", shape.width)
    }
}

struct Emitter<'a> {
    module: &'a GuestModule,
    names: &'a BTreeMap<GuestSignalId, String>,
    namer: Namer,
    decls: Vec<String>,
    assigns: Vec<String>,
}

impl Emitter<'_> {
    fn name(&self, id: GuestSignalId) -> &str {
        &self.names[&id]
    }

    fn module_text(
        &mut self,
        name: &str,
        ports: &IndexMap<GuestSignalId, PortDirection>,
        drivers: &HashMap<GuestSignalId, Driver>,
    ) -> String {
        let module = self.module;
        let mut out = String::from("/* Generated by weld */\n\n");

        let port_names: Vec<&str> = ports.keys().map(|id| self.name(*id)).collect();
        out.push_str(&format!("module {name}({});\n", port_names.join(", ")));
        for (id, dir) in ports {
            let kind = match dir {
                PortDirection::Input => "input",
                PortDirection::Output => "output",
            };
            out.push_str(&decl(kind, module.signal(*id).shape, self.name(*id)));
            out.push_str(";\n");
        }

        let names = self.names;
        for &id in names.keys() {
            let sig = module.signal(id);
            let name = self.name(id).to_string();
            match drivers.get(&id) {
                Some(Driver::Sync(_)) => {
                    let init = literal(sig.reset, sig.shape);
                    self.decls
                        .push(format!("{} = {init};", decl("reg", sig.shape, &name)));
                }
                Some(Driver::Comb) if !ports.contains_key(&id) => {
                    self.decls.push(format!("{};", decl("wire", sig.shape, &name)));
                }
                None if !ports.contains_key(&id) => {
                    self.decls.push(format!("{};", decl("wire", sig.shape, &name)));
                    let tie = literal(sig.reset, sig.shape);
                    self.assigns.push(format!("  assign {name} = {tie};"));
                }
                _ => {}
            }
        }

        for stmt in module.statements.iter().filter(|s| s.domain.is_none()) {
            let value = self.expr(&stmt.value);
            let target = self.name(stmt.target).to_string();
            self.assigns.push(format!("  assign {target} = {value};"));
        }

        let mut processes = Vec::new();
        for domain in module.domains.values() {
            let stmts: Vec<_> = module
                .statements
                .iter()
                .filter(|s| s.domain.as_deref() == Some(domain.name.as_str()))
                .collect();
            if stmts.is_empty() {
                continue;
            }
            let mut block = format!("  always @(posedge {}) begin\n", self.name(domain.clk));
            let mut registers = Vec::new();
            for stmt in stmts {
                let value = self.expr(&stmt.value);
                block.push_str(&format!("    {} <= {value};\n", self.name(stmt.target)));
                if !registers.contains(&stmt.target) {
                    registers.push(stmt.target);
                }
            }
            block.push_str(&format!("    if ({}) begin\n", self.name(domain.rst)));
            for reg in registers {
                let sig = module.signal(reg);
                block.push_str(&format!(
                    "      {} <= {};\n",
                    self.name(reg),
                    literal(sig.reset, sig.shape)
                ));
            }
            block.push_str("    end\n  end\n");
            processes.push(block);
        }

        for line in self.decls.iter().chain(self.assigns.iter()) {
            out.push_str(line);
            out.push('\n');
        }
        for block in processes {
            out.push_str(&block);
        }
        out.push_str("endmodule\n");
        out
    }

    fn expr(&mut self, e: &Expr) -> String {
        match e {
            Expr::Signal(id) => self.name(*id).to_string(),
            Expr::Const { value, shape } => literal(*value, *shape),
            Expr::Unary { op, operand } => {
                let inner = self.expr(operand);
                match op {
                    UnaryOp::Not => format!("(~{inner})"),
                    UnaryOp::Neg => format!("(-{inner})"),
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let (l, r) = (self.expr(lhs), self.expr(rhs));
                format!("({l} {} {r})", op.token())
            }
            Expr::Slice { value, start, end } => {
                let base = self.net(value);
                if end - start == 1 {
                    format!("{base}[{start}]")
                } else {
                    format!("{base}[{}:{start}]", end - 1)
                }
            }
            Expr::Cat(parts) => {
                let parts: Vec<String> = parts.iter().rev().map(|p| self.expr(p)).collect();
                format!("{{{}}}", parts.join(", "))
            }
            Expr::Mux {
                sel,
                then,
                otherwise,
            } => {
                let (s, t, o) = (self.expr(sel), self.expr(then), self.expr(otherwise));
                format!("({s} ? {t} : {o})")
            }
        }
    }

    /// Returns a name that can be bit-selected, introducing a temporary wire if needed.
    fn net(&mut self, e: &Expr) -> String {
        if let Expr::Signal(id) = e {
            return self.name(*id).to_string();
        }
        let shape = e.shape(&self.module.signals);
        let value = self.expr(e);
        let tmp = self.namer.claim("_t");
        self.decls.push(format!("{};", decl("wire", shape, &tmp)));
        self.assigns.push(format!("  assign {tmp} = {value};"));
        tmp
    }
}
