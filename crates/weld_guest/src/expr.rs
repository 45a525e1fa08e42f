//! Expression trees over guest signals.

use crate::signal::{GuestSignal, GuestSignalId};
use serde::{Deserialize, Serialize};
use std::ops;
use weld_common::{Arena, Shape};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Bitwise NOT (`~`).
    Not,
    /// Two's-complement negation (`-`).
    Neg,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Equality comparison.
    Eq,
    /// Inequality comparison.
    Ne,
    /// Less-than comparison.
    Lt,
}

impl BinaryOp {
    /// Returns the Verilog operator token.
    pub fn token(self) -> &'static str {
        match self {
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
        }
    }

    fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt)
    }
}

/// A combinational expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// The value of a signal.
    Signal(GuestSignalId),
    /// A constant, truncated to its shape.
    Const {
        /// The value.
        value: u64,
        /// Width and signedness.
        shape: Shape,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left-hand operand.
        lhs: Box<Expr>,
        /// Right-hand operand.
        rhs: Box<Expr>,
    },
    /// Bits `start..end` of a value.
    Slice {
        /// The sliced value.
        value: Box<Expr>,
        /// First bit (inclusive).
        start: u32,
        /// Last bit (exclusive).
        end: u32,
    },
    /// Concatenation, least significant part first.
    Cat(Vec<Expr>),
    /// `sel ? then : otherwise`.
    Mux {
        /// Selector; any nonzero value selects `then`.
        sel: Box<Expr>,
        /// Value when selected.
        then: Box<Expr>,
        /// Value otherwise.
        otherwise: Box<Expr>,
    },
}

impl Expr {
    /// An unsigned constant.
    pub fn konst(value: u64, width: u32) -> Self {
        let shape = Shape::unsigned(width);
        Expr::Const {
            value: value & shape.mask(),
            shape,
        }
    }

    /// Bits `start..end` of `self`.
    pub fn slice(self, start: u32, end: u32) -> Self {
        Expr::Slice {
            value: Box::new(self),
            start,
            end,
        }
    }

    /// Single bit `index` of `self`.
    pub fn bit(self, index: u32) -> Self {
        self.slice(index, index + 1)
    }

    /// `sel ? then : otherwise`.
    pub fn mux(sel: impl Into<Expr>, then: impl Into<Expr>, otherwise: impl Into<Expr>) -> Self {
        Expr::Mux {
            sel: Box::new(sel.into()),
            then: Box::new(then.into()),
            otherwise: Box::new(otherwise.into()),
        }
    }

    /// Equality comparison.
    pub fn equals(self, rhs: impl Into<Expr>) -> Self {
        binary(BinaryOp::Eq, self, rhs.into())
    }

    /// Less-than comparison.
    pub fn less_than(self, rhs: impl Into<Expr>) -> Self {
        binary(BinaryOp::Lt, self, rhs.into())
    }

    /// Infers the result shape.
    pub fn shape(&self, signals: &Arena<GuestSignalId, GuestSignal>) -> Shape {
        match self {
            Expr::Signal(id) => signals[*id].shape,
            Expr::Const { shape, .. } => *shape,
            Expr::Unary { op, operand } => {
                let inner = operand.shape(signals);
                match op {
                    UnaryOp::Not => inner,
                    UnaryOp::Neg => Shape::signed(inner.width + 1),
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                if op.is_comparison() {
                    return Shape::unsigned(1);
                }
                let (l, r) = (lhs.shape(signals), rhs.shape(signals));
                let width = l.width.max(r.width);
                let width = match op {
                    BinaryOp::Add | BinaryOp::Sub => width + 1,
                    _ => width,
                };
                Shape {
                    width,
                    signed: l.signed && r.signed,
                }
            }
            Expr::Slice { start, end, .. } => Shape::unsigned(end.saturating_sub(*start)),
            Expr::Cat(parts) => {
                Shape::unsigned(parts.iter().map(|p| p.shape(signals).width).sum())
            }
            Expr::Mux {
                then, otherwise, ..
            } => {
                let (t, o) = (then.shape(signals), otherwise.shape(signals));
                Shape {
                    width: t.width.max(o.width),
                    signed: t.signed && o.signed,
                }
            }
        }
    }

    /// Collects every signal the expression reads.
    pub fn reads(&self, out: &mut Vec<GuestSignalId>) {
        match self {
            Expr::Signal(id) => out.push(*id),
            Expr::Const { .. } => {}
            Expr::Unary { operand, .. } => operand.reads(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.reads(out);
                rhs.reads(out);
            }
            Expr::Slice { value, .. } => value.reads(out),
            Expr::Cat(parts) => parts.iter().for_each(|p| p.reads(out)),
            Expr::Mux {
                sel,
                then,
                otherwise,
            } => {
                sel.reads(out);
                then.reads(out);
                otherwise.reads(out);
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

impl From<GuestSignalId> for Expr {
    fn from(id: GuestSignalId) -> Self {
        Expr::Signal(id)
    }
}

impl ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }
}

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(self),
        }
    }
}

macro_rules! impl_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expr>> ops::$trait<R> for Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                binary($op, self, rhs.into())
            }
        }
    };
}

impl_binop!(BitAnd, bitand, BinaryOp::And);
impl_binop!(BitOr, bitor, BinaryOp::Or);
impl_binop!(BitXor, bitxor, BinaryOp::Xor);
impl_binop!(Add, add, BinaryOp::Add);
impl_binop!(Sub, sub, BinaryOp::Sub);

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> (Arena<GuestSignalId, GuestSignal>, GuestSignalId, GuestSignalId) {
        let mut signals = Arena::new();
        let a = signals.alloc(GuestSignal {
            name: "a".into(),
            shape: Shape::unsigned(8),
            reset: 0,
        });
        let b = signals.alloc(GuestSignal {
            name: "b".into(),
            shape: Shape::signed(4),
            reset: 0,
        });
        (signals, a, b)
    }

    #[test]
    fn arithmetic_grows_by_one() {
        let (signals, a, b) = arena();
        let e = Expr::from(a) + b;
        assert_eq!(e.shape(&signals), Shape::unsigned(9));
    }

    #[test]
    fn comparison_is_one_bit() {
        let (signals, a, b) = arena();
        assert_eq!(Expr::from(a).equals(b).shape(&signals), Shape::unsigned(1));
    }

    #[test]
    fn cat_and_slice_widths() {
        let (signals, a, b) = arena();
        let cat = Expr::Cat(vec![a.into(), b.into()]);
        assert_eq!(cat.shape(&signals).width, 12);
        assert_eq!(Expr::from(a).slice(2, 5).shape(&signals).width, 3);
        assert_eq!(Expr::from(a).bit(7).shape(&signals).width, 1);
    }

    #[test]
    fn konst_is_truncated() {
        assert_eq!(
            Expr::konst(0x1ff, 8),
            Expr::Const {
                value: 0xff,
                shape: Shape::unsigned(8)
            }
        );
    }

    #[test]
    fn reads_visits_all_operands() {
        let (_, a, b) = arena();
        let e = Expr::mux(a, !Expr::from(b), Expr::konst(0, 4));
        let mut reads = Vec::new();
        e.reads(&mut reads);
        assert_eq!(reads, vec![a, b]);
    }
}
