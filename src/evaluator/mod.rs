//! The tree-walking evaluator (§4.5).
//!
//! Grounded on the reference runtime's `visitor` module for the shape of a
//! node-kind dispatch, but control flow is threaded through an explicit
//! [`StmtOutcome`] sum type rather than Rust exceptions/early-return
//! panics (§9 "Exceptions for control flow"), and suspension is threaded
//! through [`Flow`] rather than a generator (§9 "Coroutine/async", option b).

mod expr;
mod stmt;

use crate::ast::{Ast, NodeId, NodeKind, TypeTag};
use crate::broker::ResponseBroker;
use crate::commands::CommandEmitter;
use crate::config::Config;
use crate::error::EvalError;
use crate::governor::LoopGovernor;
use crate::scope::ScopeStack;
use crate::value::{Array1D, Array2D, StructValue, Value};
use indexmap::IndexMap;
use std::collections::HashMap;

/// A statement's control-flow result (§3 "Statement outcome").
#[derive(Debug, Clone, PartialEq)]
pub enum StmtOutcome {
    Normal,
    Break,
    Continue,
    Return(Value),
    Terminated,
}

/// Threads suspension through evaluation without a coroutine: a node
/// either finishes (`Done`) or hits a read that has no answer yet
/// (`Suspended`), in which case every caller up the Rust call stack just
/// propagates `Suspended` without doing further work.
pub enum Flow<T> {
    Done(T),
    Suspended,
}

macro_rules! propagate {
    ($flow:expr) => {
        match $flow {
            Flow::Done(v) => v,
            Flow::Suspended => return Ok(Flow::Suspended),
        }
    };
}
pub(crate) use propagate;

pub struct Evaluator {
    pub scope: ScopeStack,
    pub emitter: CommandEmitter,
    pub broker: ResponseBroker,
    pub governor: LoopGovernor,
    pub config: Config,
    rng: u32,
    functions: HashMap<String, NodeId>,
    struct_fields: HashMap<String, Vec<String>>,
    /// The AST node id of the builtin [`NodeKind::Call`] awaiting a
    /// response, if any. Re-entry after a resume re-walks the enclosing
    /// top-level statement from its start; this is how the one call node
    /// that actually suspended is told to use the cached answer instead of
    /// dispatching the builtin again (§4.5, §9).
    suspended_call: Option<NodeId>,
    /// Nesting depth of user-function calls currently on the Rust call
    /// stack. Blocking reads are only resumable from top-level `setup`/
    /// `loop` statements (§9 decisions); a suspend attempted while this is
    /// nonzero would leak the pushed call frame on resume, so it is
    /// rejected outright instead.
    call_depth: u32,
}

impl Evaluator {
    pub fn new(config: Config, broker: ResponseBroker) -> Self {
        Evaluator {
            scope: ScopeStack::new(),
            emitter: CommandEmitter::new(),
            broker,
            governor: LoopGovernor::new(config.max_loop_iterations, config.enforce_loop_limits_on_internal_loops),
            config,
            rng: 0x9E3779B9,
            functions: HashMap::new(),
            struct_fields: HashMap::new(),
            suspended_call: None,
            call_depth: 0,
        }
    }

    /// Hoists function/struct definitions and evaluates global `var`
    /// initializers, in declaration order (§4.5 "function definition —
    /// hoisted at program start").
    pub fn hoist_program(&mut self, ast: &Ast) -> Result<(), EvalError> {
        let declarations = match &ast.node(ast.root).kind {
            NodeKind::Program { declarations } => declarations.clone(),
            _ => return Err(EvalError::InternalInvariant("AST root is not a Program node".to_string())),
        };

        for &decl in &declarations {
            if let NodeKind::FunctionDef { name, .. } = &ast.node(decl).kind {
                self.functions.insert(ast.string(*name).to_string(), decl);
            }
            if let NodeKind::StructDef { name, fields } = &ast.node(decl).kind {
                let field_names = fields.iter().map(|f| ast.string(*f).to_string()).collect();
                self.struct_fields.insert(ast.string(*name).to_string(), field_names);
            }
        }

        for &decl in &declarations {
            if let NodeKind::VarDecl { .. } = &ast.node(decl).kind {
                match self.eval_stmt(ast, decl)? {
                    Flow::Done(_) => {}
                    Flow::Suspended => {
                        return Err(EvalError::InternalInvariant(
                            "global initializers must not perform blocking reads".to_string(),
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    pub fn function_body(&self, ast: &Ast, name: &str) -> Option<Vec<NodeId>> {
        let node = self.functions.get(name)?;
        match &ast.node(*node).kind {
            NodeKind::FunctionDef { body, .. } => match &ast.node(*body).kind {
                NodeKind::Block { statements } => Some(statements.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Runs a top-level function body (`setup`/`loop`) starting at
    /// `*cursor`, in a fresh block frame. Used by [`crate::Driver`] so that
    /// resuming after a suspend re-enters at the exact statement that
    /// suspended rather than the body's start: `*cursor` only advances past
    /// a statement once it finishes without suspending, so on `Suspended`
    /// it is left pointing at the statement to redo.
    pub fn run_top_level_from(
        &mut self,
        ast: &Ast,
        statements: &[NodeId],
        cursor: &mut usize,
    ) -> Result<Flow<StmtOutcome>, EvalError> {
        while *cursor < statements.len() {
            let stmt = statements[*cursor];
            match self.eval_stmt(ast, stmt)? {
                Flow::Suspended => return Ok(Flow::Suspended),
                Flow::Done(StmtOutcome::Normal) => *cursor += 1,
                Flow::Done(other) => {
                    *cursor += 1;
                    return Ok(Flow::Done(other));
                }
            }
        }
        Ok(Flow::Done(StmtOutcome::Normal))
    }

    fn eval_stmt(&mut self, ast: &Ast, node: NodeId) -> Result<Flow<StmtOutcome>, EvalError> {
        stmt::eval_stmt(self, ast, node)
    }

    fn eval_expr(&mut self, ast: &Ast, node: NodeId) -> Result<Flow<Value>, EvalError> {
        expr::eval_expr(self, ast, node)
    }

    fn default_value(&self, ast: &Ast, type_tag: TypeTag, struct_type: Option<crate::ast::StringId>) -> Value {
        match type_tag {
            TypeTag::Void => Value::Void,
            TypeTag::Bool => Value::Bool(false),
            TypeTag::Int => Value::Int(0),
            TypeTag::UInt => Value::UInt(0),
            TypeTag::Double => Value::Double(0.0),
            TypeTag::String => Value::String(String::new()),
            TypeTag::Struct => {
                let type_name = struct_type.map(|s| ast.string(s).to_string()).unwrap_or_default();
                let mut fields = IndexMap::new();
                if let Some(names) = self.struct_fields.get(&type_name) {
                    for name in names {
                        fields.insert(name.clone(), Value::Void);
                    }
                }
                Value::Struct(StructValue { type_name, fields })
            }
        }
    }

    fn default_array(&self, type_tag: TypeTag, dims: &crate::ast::ArrayDims) -> Value {
        match dims.dims.len() {
            1 => {
                let n = dims.dims[0].unwrap_or(0) as usize;
                match type_tag {
                    TypeTag::Double => Value::Array1D(Array1D::Double(vec![0.0; n])),
                    TypeTag::String => Value::Array1D(Array1D::String(vec![String::new(); n])),
                    _ => Value::Array1D(Array1D::Int(vec![0; n])),
                }
            }
            2 => {
                let rows = dims.dims[0].unwrap_or(0) as usize;
                let cols = dims.dims[1].unwrap_or(0) as usize;
                match type_tag {
                    TypeTag::Double => Value::Array2D(Array2D::Double(vec![vec![0.0; cols]; rows])),
                    _ => Value::Array2D(Array2D::Int(vec![vec![0; cols]; rows])),
                }
            }
            _ => Value::Void,
        }
    }
}
