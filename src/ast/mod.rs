//! The decoded in-memory AST (§3, §6).
//!
//! Nodes are stored flat in a `Vec<Node>` and addressed by `u32` index —
//! the reference runtime's node graphs are similarly index-addressed rather
//! than boxed-pointer trees, which keeps the structure `Clone`-free and
//! cheap to walk repeatedly across `loop()` iterations.

pub mod decode;

use crate::operators::{AssignmentOperator, BinaryOperator, ComparisonOperator, UnaryOperator};
use num_enum::TryFromPrimitive;

pub type NodeId = u32;
pub type StringId = u32;

/// Sentinel for an absent optional child slot (e.g. a `for` with no init).
pub const NODE_NONE: NodeId = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum TypeTag {
    Void,
    Bool,
    Int,
    UInt,
    Double,
    String,
    Struct,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: StringId,
    pub is_reference: bool,
}

/// `dims` is empty for a scalar, one entry for a 1-D array, two for a 2-D
/// array — each entry is a declared size, or `None` when left to the
/// initializer to determine (e.g. `int xs[] = {1,2,3};`).
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDims {
    pub dims: Vec<Option<u32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    /// `None` marks the `default` arm.
    pub value: Option<NodeId>,
    pub statements: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program { declarations: Vec<NodeId> },
    FunctionDef { name: StringId, params: Vec<Param>, return_type: TypeTag, body: NodeId },
    StructDef { name: StringId, fields: Vec<StringId> },
    Block { statements: Vec<NodeId> },

    VarDecl {
        name: StringId,
        type_tag: TypeTag,
        struct_type: Option<StringId>,
        array_dims: Option<ArrayDims>,
        is_const: bool,
        init: Option<NodeId>,
    },

    If { condition: NodeId, then_branch: NodeId, else_branch: Option<NodeId> },
    While { condition: NodeId, body: NodeId },
    DoWhile { condition: NodeId, body: NodeId },
    For { init: Option<NodeId>, condition: Option<NodeId>, update: Option<NodeId>, body: NodeId },
    Switch { discriminant: NodeId, arms: Vec<CaseArm> },

    Break,
    Continue,
    Return { value: Option<NodeId> },
    ExprStatement { expr: NodeId },

    IntLit(i32),
    UIntLit(u32),
    DoubleLit(f64),
    StringLit(StringId),
    BoolLit(bool),

    Identifier(StringId),
    Unary { op: UnaryOperator, operand: NodeId, is_postfix: bool },
    Binary { op: BinaryOperator, lhs: NodeId, rhs: NodeId },
    Comparison { op: ComparisonOperator, lhs: NodeId, rhs: NodeId },
    Ternary { condition: NodeId, then_expr: NodeId, else_expr: NodeId },
    Assign { op: AssignmentOperator, target: NodeId, value: NodeId },
    Index { base: NodeId, indices: Vec<NodeId> },
    Member { base: NodeId, field: StringId },
    Call { callee: StringId, args: Vec<NodeId> },
    StructLit { type_name: StringId, field_values: Vec<(StringId, NodeId)> },
    Cast { target_type: TypeTag, operand: NodeId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct Ast {
    pub nodes: Vec<Node>,
    pub strings: Vec<String>,
    pub root: NodeId,
}

impl Ast {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn string(&self, id: StringId) -> &str {
        &self.strings[id as usize]
    }
}
