//! Binary AST decoder (§6).
//!
//! Layout: `{magic "ASTP", version: u16, flags: u16, node_count: u32,
//! string_table_size: u32, string_table, node_stream}`. The string table is
//! `string_table_size` bytes of back-to-back `u32`-length-prefixed UTF-8
//! strings. Each node-stream record is `{tag: u8, len: u32, ...fields}`
//! where `len` covers everything after itself; fields use `u32` for node
//! and string indices and fixed-width little-endian for inline literals.
//!
//! Grounded on the reference runtime's block-header parsing
//! (`global::protocol_structures::block_header`) for "read fixed-width
//! header fields with `binrw`, then hand the framed payload to a dedicated
//! reader" — the payload shape here is too heterogeneous across node kinds
//! for a single `#[derive(BinRead)]` struct, so each kind-specific field
//! list is read by hand through the same `binrw::BinReaderExt` primitives.

use crate::ast::{ArrayDims, Ast, CaseArm, Node, NodeKind, NodeId, Param, TypeTag, NODE_NONE};
use crate::error::DecodeError;
use crate::operators::{AssignmentOperator, BinaryOperator, ComparisonOperator, UnaryOperator};
use binrw::BinReaderExt;
use std::io::{Cursor, Read};

const MAGIC: &[u8; 4] = b"ASTP";
const SUPPORTED_VERSION: u16 = 1;

struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { cursor: Cursor::new(bytes) }
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        self.cursor.read_le::<u8>().map_err(|_| DecodeError::TruncatedBuffer)
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        self.cursor.read_le::<u16>().map_err(|_| DecodeError::TruncatedBuffer)
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        self.cursor.read_le::<u32>().map_err(|_| DecodeError::TruncatedBuffer)
    }

    fn i32(&mut self) -> Result<i32, DecodeError> {
        self.cursor.read_le::<i32>().map_err(|_| DecodeError::TruncatedBuffer)
    }

    fn f64(&mut self) -> Result<f64, DecodeError> {
        self.cursor.read_le::<f64>().map_err(|_| DecodeError::TruncatedBuffer)
    }

    fn bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.u8()? != 0)
    }

    fn bytes(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf).map_err(|_| DecodeError::TruncatedBuffer)?;
        Ok(buf)
    }

    fn position(&self) -> u64 {
        self.cursor.position()
    }
}

fn node_id_or_none(raw: u32) -> Option<NodeId> {
    if raw == NODE_NONE {
        None
    } else {
        Some(raw)
    }
}

fn check_index(idx: NodeId, node_count: u32) -> Result<NodeId, DecodeError> {
    if idx != NODE_NONE && idx >= node_count {
        Err(DecodeError::NodeIndexOutOfRange(idx))
    } else {
        Ok(idx)
    }
}

fn check_string_index(idx: u32, string_count: u32) -> Result<u32, DecodeError> {
    if idx >= string_count {
        Err(DecodeError::StringIndexOutOfRange(idx))
    } else {
        Ok(idx)
    }
}

fn binary_op(tag: u8) -> Result<BinaryOperator, DecodeError> {
    BinaryOperator::try_from(tag).map_err(|_| DecodeError::UnknownNodeKind(tag))
}

fn comparison_op(tag: u8) -> Result<ComparisonOperator, DecodeError> {
    ComparisonOperator::try_from(tag).map_err(|_| DecodeError::UnknownNodeKind(tag))
}

fn unary_op(tag: u8) -> Result<UnaryOperator, DecodeError> {
    UnaryOperator::try_from(tag).map_err(|_| DecodeError::UnknownNodeKind(tag))
}

fn assignment_op(tag: u8) -> Result<AssignmentOperator, DecodeError> {
    AssignmentOperator::try_from(tag).map_err(|_| DecodeError::UnknownNodeKind(tag))
}

fn type_tag(tag: u8) -> Result<TypeTag, DecodeError> {
    TypeTag::try_from(tag).map_err(|_| DecodeError::UnknownNodeKind(tag))
}

/// Decodes a complete `ASTP` byte buffer into an in-memory [`Ast`].
pub fn decode(bytes: &[u8]) -> Result<Ast, DecodeError> {
    let mut r = Reader::new(bytes);

    let magic = r.bytes(4)?;
    if magic.as_slice() != MAGIC {
        return Err(DecodeError::InvalidMagic);
    }
    let version = r.u16()?;
    if version != SUPPORTED_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let _flags = r.u16()?;
    let node_count = r.u32()?;
    let string_table_size = r.u32()?;

    let string_table_start = r.position();
    let mut strings = Vec::new();
    while r.position() - string_table_start < string_table_size as u64 {
        let len = r.u32()? as usize;
        let raw = r.bytes(len)?;
        let s = String::from_utf8(raw).map_err(|_| DecodeError::TruncatedBuffer)?;
        strings.push(s);
    }
    let string_count = strings.len() as u32;

    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        let tag = r.u8()?;
        let len = r.u32()? as u64;
        let record_start = r.position();
        let kind = decode_node(&mut r, tag, node_count, string_count)?;
        let consumed = r.position() - record_start;
        if consumed != len {
            return Err(DecodeError::TruncatedBuffer);
        }
        nodes.push(Node { kind });
    }

    if nodes.is_empty() {
        return Err(DecodeError::TruncatedBuffer);
    }

    Ok(Ast { nodes, strings, root: 0 })
}

fn decode_node(r: &mut Reader, tag: u8, node_count: u32, string_count: u32) -> Result<NodeKind, DecodeError> {
    let nid = |r: &mut Reader| -> Result<NodeId, DecodeError> {
        let raw = r.u32()?;
        check_index(raw, node_count)
    };
    let sid = |r: &mut Reader| -> Result<u32, DecodeError> {
        let raw = r.u32()?;
        check_string_index(raw, string_count)
    };

    Ok(match tag {
        0 => {
            let count = r.u32()?;
            let mut declarations = Vec::with_capacity(count as usize);
            for _ in 0..count {
                declarations.push(nid(r)?);
            }
            NodeKind::Program { declarations }
        }
        1 => {
            let name = sid(r)?;
            let param_count = r.u32()?;
            let mut params = Vec::with_capacity(param_count as usize);
            for _ in 0..param_count {
                let pname = sid(r)?;
                let is_reference = r.bool()?;
                params.push(Param { name: pname, is_reference });
            }
            let return_type = type_tag(r.u8()?)?;
            let body = nid(r)?;
            NodeKind::FunctionDef { name, params, return_type, body }
        }
        2 => {
            let name = sid(r)?;
            let field_count = r.u32()?;
            let mut fields = Vec::with_capacity(field_count as usize);
            for _ in 0..field_count {
                fields.push(sid(r)?);
            }
            NodeKind::StructDef { name, fields }
        }
        3 => {
            let count = r.u32()?;
            let mut statements = Vec::with_capacity(count as usize);
            for _ in 0..count {
                statements.push(nid(r)?);
            }
            NodeKind::Block { statements }
        }
        4 => {
            let name = sid(r)?;
            let tt = type_tag(r.u8()?)?;
            let struct_type = if r.bool()? { Some(sid(r)?) } else { None };
            let rank = r.u8()?;
            let array_dims = if rank == 0 {
                None
            } else {
                let mut dims = Vec::with_capacity(rank as usize);
                for _ in 0..rank {
                    let has_size = r.bool()?;
                    dims.push(if has_size { Some(r.u32()?) } else { None });
                }
                Some(ArrayDims { dims })
            };
            let is_const = r.bool()?;
            let init_raw = r.u32()?;
            let init = node_id_or_none(check_index(init_raw, node_count)?);
            NodeKind::VarDecl { name, type_tag: tt, struct_type, array_dims, is_const, init }
        }
        5 => {
            let condition = nid(r)?;
            let then_branch = nid(r)?;
            let else_raw = r.u32()?;
            let else_branch = node_id_or_none(check_index(else_raw, node_count)?);
            NodeKind::If { condition, then_branch, else_branch }
        }
        6 => NodeKind::While { condition: nid(r)?, body: nid(r)? },
        7 => {
            let condition = nid(r)?;
            let body = nid(r)?;
            NodeKind::DoWhile { condition, body }
        }
        8 => {
            let init_raw = r.u32()?;
            let init = node_id_or_none(check_index(init_raw, node_count)?);
            let cond_raw = r.u32()?;
            let condition = node_id_or_none(check_index(cond_raw, node_count)?);
            let update_raw = r.u32()?;
            let update = node_id_or_none(check_index(update_raw, node_count)?);
            let body = nid(r)?;
            NodeKind::For { init, condition, update, body }
        }
        9 => {
            let discriminant = nid(r)?;
            let arm_count = r.u32()?;
            let mut arms = Vec::with_capacity(arm_count as usize);
            for _ in 0..arm_count {
                let is_default = r.bool()?;
                let value_raw = r.u32()?;
                let value = if is_default { None } else { Some(check_index(value_raw, node_count)?) };
                let stmt_count = r.u32()?;
                let mut statements = Vec::with_capacity(stmt_count as usize);
                for _ in 0..stmt_count {
                    statements.push(nid(r)?);
                }
                arms.push(CaseArm { value, statements });
            }
            NodeKind::Switch { discriminant, arms }
        }
        10 => NodeKind::Break,
        11 => NodeKind::Continue,
        12 => {
            let raw = r.u32()?;
            NodeKind::Return { value: node_id_or_none(check_index(raw, node_count)?) }
        }
        13 => NodeKind::ExprStatement { expr: nid(r)? },
        14 => NodeKind::IntLit(r.i32()?),
        15 => NodeKind::UIntLit(r.u32()?),
        16 => NodeKind::DoubleLit(r.f64()?),
        17 => NodeKind::StringLit(sid(r)?),
        18 => NodeKind::BoolLit(r.bool()?),
        19 => NodeKind::Identifier(sid(r)?),
        20 => {
            let op = unary_op(r.u8()?)?;
            let operand = nid(r)?;
            let is_postfix = r.bool()?;
            NodeKind::Unary { op, operand, is_postfix }
        }
        21 => {
            let op = binary_op(r.u8()?)?;
            let lhs = nid(r)?;
            let rhs = nid(r)?;
            NodeKind::Binary { op, lhs, rhs }
        }
        22 => {
            let op = comparison_op(r.u8()?)?;
            let lhs = nid(r)?;
            let rhs = nid(r)?;
            NodeKind::Comparison { op, lhs, rhs }
        }
        23 => {
            let condition = nid(r)?;
            let then_expr = nid(r)?;
            let else_expr = nid(r)?;
            NodeKind::Ternary { condition, then_expr, else_expr }
        }
        24 => {
            let op = assignment_op(r.u8()?)?;
            let target = nid(r)?;
            let value = nid(r)?;
            NodeKind::Assign { op, target, value }
        }
        25 => {
            let base = nid(r)?;
            let count = r.u32()?;
            let mut indices = Vec::with_capacity(count as usize);
            for _ in 0..count {
                indices.push(nid(r)?);
            }
            NodeKind::Index { base, indices }
        }
        26 => {
            let base = nid(r)?;
            let field = sid(r)?;
            NodeKind::Member { base, field }
        }
        27 => {
            let callee = sid(r)?;
            let count = r.u32()?;
            let mut args = Vec::with_capacity(count as usize);
            for _ in 0..count {
                args.push(nid(r)?);
            }
            NodeKind::Call { callee, args }
        }
        28 => {
            let type_name = sid(r)?;
            let count = r.u32()?;
            let mut field_values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let name = sid(r)?;
                let value = nid(r)?;
                field_values.push((name, value));
            }
            NodeKind::StructLit { type_name, field_values }
        }
        29 => {
            let target_type = type_tag(r.u8()?)?;
            let operand = nid(r)?;
            NodeKind::Cast { target_type, operand }
        }
        other => return Err(DecodeError::UnknownNodeKind(other)),
    })
}
