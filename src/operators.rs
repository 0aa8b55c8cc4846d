//! Operator tag enums used by both the decoded AST and the evaluator.
//!
//! Grounded on the reference runtime's `global::operators` module: small
//! `Copy` enums with a `Display` impl that prints the source-level symbol,
//! rather than folding operator dispatch into string matching at eval time.

use core::fmt;
use num_enum::TryFromPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum UnaryOperator {
    Neg,
    Not,
    BitNot,
    /// `++`/`--`; `is_increment` distinguishes the two, the node's
    /// `is_postfix` flag (carried alongside, not here) distinguishes pre/post.
    Increment,
    Decrement,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
            UnaryOperator::Increment => "++",
            UnaryOperator::Decrement => "--",
        };
        write!(f, "{s}")
    }
}

/// `None` is plain `=`; all others are the compound-assignment family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum AssignmentOperator {
    Set,
    AddSet,
    SubSet,
    MulSet,
    DivSet,
    ModSet,
    AndSet,
    OrSet,
    XorSet,
    ShlSet,
    ShrSet,
}

impl AssignmentOperator {
    /// The binary operator the compound form applies before storing, if any.
    pub fn as_binary(self) -> Option<BinaryOperator> {
        match self {
            AssignmentOperator::Set => None,
            AssignmentOperator::AddSet => Some(BinaryOperator::Add),
            AssignmentOperator::SubSet => Some(BinaryOperator::Sub),
            AssignmentOperator::MulSet => Some(BinaryOperator::Mul),
            AssignmentOperator::DivSet => Some(BinaryOperator::Div),
            AssignmentOperator::ModSet => Some(BinaryOperator::Mod),
            AssignmentOperator::AndSet => Some(BinaryOperator::BitAnd),
            AssignmentOperator::OrSet => Some(BinaryOperator::BitOr),
            AssignmentOperator::XorSet => Some(BinaryOperator::BitXor),
            AssignmentOperator::ShlSet => Some(BinaryOperator::Shl),
            AssignmentOperator::ShrSet => Some(BinaryOperator::Shr),
        }
    }
}
