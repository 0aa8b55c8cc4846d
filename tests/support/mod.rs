//! Hand-rolled `ASTP` byte-buffer builder for integration tests.
//!
//! Mirrors `ast::decode`'s node-stream shape field for field; kept here
//! rather than reused from `ast::decode`'s own `#[cfg(test)]` helper
//! because that one is private to its compilation unit. `Program` is
//! pinned at node index 0 (the decoder hardcodes `root: 0`), so it is
//! reserved up front and backpatched once every other node has been built.

#![allow(dead_code)]

use arduino_interpreter_core::ast::TypeTag;
use arduino_interpreter_core::operators::{AssignmentOperator, BinaryOperator, ComparisonOperator, UnaryOperator};

const MAGIC: &[u8; 4] = b"ASTP";
const VERSION: u16 = 1;

struct Enc {
    buf: Vec<u8>,
}

impl Enc {
    fn new() -> Self {
        Enc { buf: Vec::new() }
    }
    fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }
    fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn i32(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn f64(&mut self, v: f64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn bool_(&mut self, v: bool) -> &mut Self {
        self.u8(if v { 1 } else { 0 })
    }
    fn ids(&mut self, ids: &[u32]) -> &mut Self {
        self.u32(ids.len() as u32);
        for &id in ids {
            self.u32(id);
        }
        self
    }
}

pub const NODE_NONE: u32 = u32::MAX;

pub struct SwitchArm {
    pub value: Option<u32>,
    pub statements: Vec<u32>,
}

/// A single node's tag and already-encoded body.
struct NodeSlot {
    tag: u8,
    body: Vec<u8>,
}

pub struct AstBuilder {
    nodes: Vec<NodeSlot>,
    strings: Vec<String>,
}

impl AstBuilder {
    pub fn new() -> Self {
        // Reserve index 0 for Program; body is backpatched in `finish`.
        AstBuilder { nodes: vec![NodeSlot { tag: 0, body: Vec::new() }], strings: Vec::new() }
    }

    fn push(&mut self, tag: u8, body: Vec<u8>) -> u32 {
        self.nodes.push(NodeSlot { tag, body });
        (self.nodes.len() - 1) as u32
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(pos) = self.strings.iter().position(|existing| existing == s) {
            return pos as u32;
        }
        self.strings.push(s.to_string());
        (self.strings.len() - 1) as u32
    }

    pub fn int_lit(&mut self, v: i32) -> u32 {
        let mut e = Enc::new();
        e.i32(v);
        self.push(14, e.buf)
    }

    pub fn double_lit(&mut self, v: f64) -> u32 {
        let mut e = Enc::new();
        e.f64(v);
        self.push(16, e.buf)
    }

    pub fn string_lit(&mut self, s: &str) -> u32 {
        let sid = self.intern(s);
        let mut e = Enc::new();
        e.u32(sid);
        self.push(17, e.buf)
    }

    pub fn bool_lit(&mut self, v: bool) -> u32 {
        let mut e = Enc::new();
        e.bool_(v);
        self.push(18, e.buf)
    }

    pub fn identifier(&mut self, name: &str) -> u32 {
        let sid = self.intern(name);
        let mut e = Enc::new();
        e.u32(sid);
        self.push(19, e.buf)
    }

    pub fn unary(&mut self, op: UnaryOperator, operand: u32, is_postfix: bool) -> u32 {
        let mut e = Enc::new();
        e.u8(op as u8);
        e.u32(operand);
        e.bool_(is_postfix);
        self.push(20, e.buf)
    }

    pub fn binary(&mut self, op: BinaryOperator, lhs: u32, rhs: u32) -> u32 {
        let mut e = Enc::new();
        e.u8(op as u8);
        e.u32(lhs);
        e.u32(rhs);
        self.push(21, e.buf)
    }

    pub fn comparison(&mut self, op: ComparisonOperator, lhs: u32, rhs: u32) -> u32 {
        let mut e = Enc::new();
        e.u8(op as u8);
        e.u32(lhs);
        e.u32(rhs);
        self.push(22, e.buf)
    }

    pub fn assign(&mut self, op: AssignmentOperator, target: u32, value: u32) -> u32 {
        let mut e = Enc::new();
        e.u8(op as u8);
        e.u32(target);
        e.u32(value);
        self.push(24, e.buf)
    }

    pub fn index_expr(&mut self, base: u32, indices: &[u32]) -> u32 {
        let mut e = Enc::new();
        e.u32(base);
        e.ids(indices);
        self.push(25, e.buf)
    }

    pub fn call(&mut self, name: &str, args: &[u32]) -> u32 {
        let sid = self.intern(name);
        let mut e = Enc::new();
        e.u32(sid);
        e.ids(args);
        self.push(27, e.buf)
    }

    pub fn expr_stmt(&mut self, expr: u32) -> u32 {
        let mut e = Enc::new();
        e.u32(expr);
        self.push(13, e.buf)
    }

    pub fn var_decl(&mut self, name: &str, type_tag: TypeTag, init: Option<u32>) -> u32 {
        let sid = self.intern(name);
        let mut e = Enc::new();
        e.u32(sid);
        e.u8(type_tag as u8);
        e.bool_(false); // no struct_type
        e.u8(0); // rank 0, scalar
        e.bool_(false); // is_const
        e.u32(init.unwrap_or(NODE_NONE));
        self.push(4, e.buf)
    }

    /// `dims` entries are declared sizes (no "inferred from initializer" case needed here).
    pub fn var_decl_array(&mut self, name: &str, type_tag: TypeTag, dims: &[u32]) -> u32 {
        let sid = self.intern(name);
        let mut e = Enc::new();
        e.u32(sid);
        e.u8(type_tag as u8);
        e.bool_(false);
        e.u8(dims.len() as u8);
        for &d in dims {
            e.bool_(true);
            e.u32(d);
        }
        e.bool_(false); // is_const
        e.u32(NODE_NONE); // no init
        self.push(4, e.buf)
    }

    pub fn if_stmt(&mut self, condition: u32, then_branch: u32, else_branch: Option<u32>) -> u32 {
        let mut e = Enc::new();
        e.u32(condition);
        e.u32(then_branch);
        e.u32(else_branch.unwrap_or(NODE_NONE));
        self.push(5, e.buf)
    }

    pub fn while_stmt(&mut self, condition: u32, body: u32) -> u32 {
        let mut e = Enc::new();
        e.u32(condition);
        e.u32(body);
        self.push(6, e.buf)
    }

    pub fn do_while_stmt(&mut self, condition: u32, body: u32) -> u32 {
        let mut e = Enc::new();
        e.u32(condition);
        e.u32(body);
        self.push(7, e.buf)
    }

    pub fn for_stmt(&mut self, init: Option<u32>, condition: Option<u32>, update: Option<u32>, body: u32) -> u32 {
        let mut e = Enc::new();
        e.u32(init.unwrap_or(NODE_NONE));
        e.u32(condition.unwrap_or(NODE_NONE));
        e.u32(update.unwrap_or(NODE_NONE));
        e.u32(body);
        self.push(8, e.buf)
    }

    pub fn switch_stmt(&mut self, discriminant: u32, arms: Vec<SwitchArm>) -> u32 {
        let mut e = Enc::new();
        e.u32(discriminant);
        e.u32(arms.len() as u32);
        for arm in &arms {
            e.bool_(arm.value.is_none());
            e.u32(arm.value.unwrap_or(NODE_NONE));
            e.ids(&arm.statements);
        }
        self.push(9, e.buf)
    }

    pub fn break_stmt(&mut self) -> u32 {
        self.push(10, Vec::new())
    }

    pub fn continue_stmt(&mut self) -> u32 {
        self.push(11, Vec::new())
    }

    pub fn return_stmt(&mut self, value: Option<u32>) -> u32 {
        let mut e = Enc::new();
        e.u32(value.unwrap_or(NODE_NONE));
        self.push(12, e.buf)
    }

    pub fn block(&mut self, statements: &[u32]) -> u32 {
        let mut e = Enc::new();
        e.ids(statements);
        self.push(3, e.buf)
    }

    pub fn function_def(&mut self, name: &str, params: &[(&str, TypeTag, bool)], return_type: TypeTag, body: u32) -> u32 {
        let sid = self.intern(name);
        let mut e = Enc::new();
        e.u32(sid);
        e.u32(params.len() as u32);
        for (pname, _ty, is_reference) in params {
            let psid = self.intern(pname);
            e.u32(psid);
            e.bool_(*is_reference);
        }
        e.u8(return_type as u8);
        e.u32(body);
        self.push(1, e.buf)
    }

    /// Backpatches node 0 with `Program { declarations }` and assembles the
    /// full `ASTP` byte buffer.
    pub fn finish(mut self, declarations: &[u32]) -> Vec<u8> {
        let mut program_body = Enc::new();
        program_body.ids(declarations);
        self.nodes[0].body = program_body.buf;

        let mut strtab = Enc::new();
        for s in &self.strings {
            strtab.u32(s.len() as u32);
            strtab.buf.extend_from_slice(s.as_bytes());
        }

        let mut out = Enc::new();
        out.buf.extend_from_slice(MAGIC);
        out.u16(VERSION);
        out.u16(0); // flags
        out.u32(self.nodes.len() as u32);
        out.u32(strtab.buf.len() as u32);
        out.buf.extend_from_slice(&strtab.buf);
        for slot in &self.nodes {
            out.u8(slot.tag);
            out.u32(slot.body.len() as u32);
            out.buf.extend_from_slice(&slot.body);
        }
        out.buf
    }
}
