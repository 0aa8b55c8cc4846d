//! Expression evaluation (§4.5).

use super::{propagate, Evaluator, Flow, StmtOutcome};
use crate::ast::{Ast, NodeId, NodeKind, StringId};
use crate::builtins::{self, BuiltinContext, BuiltinOutcome};
use crate::error::EvalError;
use crate::operators::{AssignmentOperator, UnaryOperator};
use crate::scope::DeclFlags;
use crate::value::{Reference, Value};
use indexmap::IndexMap;

pub fn eval_expr(ev: &mut Evaluator, ast: &Ast, node: NodeId) -> Result<Flow<Value>, EvalError> {
    let kind = ast.node(node).kind.clone();
    Ok(Flow::Done(match kind {
        NodeKind::IntLit(v) => Value::Int(v),
        NodeKind::UIntLit(v) => Value::UInt(v),
        NodeKind::DoubleLit(v) => Value::Double(v),
        NodeKind::StringLit(s) => Value::String(ast.string(s).to_string()),
        NodeKind::BoolLit(v) => Value::Bool(v),

        NodeKind::Identifier(s) => {
            let name = ast.string(s);
            if let Some(binding) = ev.scope.lookup(name) {
                binding.value.clone()
            } else if let Some(v) = builtins::resolve_constant(name, &ev.config) {
                v
            } else {
                return Err(EvalError::UndefinedName(name.to_string()));
            }
        }

        NodeKind::Unary { op, operand, is_postfix } => {
            if matches!(op, UnaryOperator::Increment | UnaryOperator::Decrement) {
                let old = propagate!(lvalue_get(ev, ast, operand)?);
                let delta = if matches!(op, UnaryOperator::Increment) { 1 } else { -1 };
                let new_value = apply_delta(&old, delta)?;
                let (var_name, _) = lvalue_set(ev, ast, operand, new_value.clone())?;
                emit_var_set(ev, var_name, &new_value);
                if is_postfix {
                    old
                } else {
                    new_value
                }
            } else {
                let v = propagate!(eval_expr(ev, ast, operand)?);
                match op {
                    UnaryOperator::Neg => v.neg()?,
                    UnaryOperator::Not => v.not(),
                    UnaryOperator::BitNot => v.bit_not()?,
                    _ => unreachable!(),
                }
            }
        }

        NodeKind::Binary { op, lhs, rhs } => {
            let l = propagate!(eval_expr(ev, ast, lhs)?);
            let r = propagate!(eval_expr(ev, ast, rhs)?);
            l.binary_op(op, &r)?
        }

        NodeKind::Comparison { op, lhs, rhs } => {
            let l = propagate!(eval_expr(ev, ast, lhs)?);
            let r = propagate!(eval_expr(ev, ast, rhs)?);
            l.compare(op, &r)
        }

        NodeKind::Ternary { condition, then_expr, else_expr } => {
            let c = propagate!(eval_expr(ev, ast, condition)?);
            if c.truthy() {
                propagate!(eval_expr(ev, ast, then_expr)?)
            } else {
                propagate!(eval_expr(ev, ast, else_expr)?)
            }
        }

        NodeKind::Assign { op, target, value } => {
            let rhs = propagate!(eval_expr(ev, ast, value)?);
            let new_value = match op.as_binary() {
                None => rhs,
                Some(bin_op) => {
                    let current = propagate!(lvalue_get(ev, ast, target)?);
                    current.binary_op(bin_op, &rhs)?
                }
            };
            let (var_name, _) = lvalue_set(ev, ast, target, new_value.clone())?;
            emit_var_set(ev, var_name, &new_value);
            new_value
        }

        NodeKind::Index { .. } | NodeKind::Member { .. } => propagate!(lvalue_get(ev, ast, node)?),

        NodeKind::Call { callee, args } => return eval_call(ev, ast, node, callee, args),

        NodeKind::StructLit { type_name, field_values } => {
            let mut fields = IndexMap::new();
            for (name, value_node) in field_values {
                let v = propagate!(eval_expr(ev, ast, value_node)?);
                fields.insert(ast.string(name).to_string(), v);
            }
            Value::Struct(crate::value::StructValue { type_name: ast.string(type_name).to_string(), fields })
        }

        NodeKind::Cast { target_type, operand } => {
            let v = propagate!(eval_expr(ev, ast, operand)?);
            match target_type {
                crate::ast::TypeTag::Int => Value::Int(v.as_int()?),
                crate::ast::TypeTag::UInt => Value::UInt(v.as_int()? as u32),
                crate::ast::TypeTag::Double => Value::Double(v.as_double()?),
                crate::ast::TypeTag::Bool => Value::Bool(v.truthy()),
                crate::ast::TypeTag::String => Value::String(v.as_string_lossy()),
                crate::ast::TypeTag::Void => Value::Void,
                crate::ast::TypeTag::Struct => v,
            }
        }

        other => {
            return Err(EvalError::InternalInvariant(format!("not an expression node: {other:?}")))
        }
    }))
}

fn apply_delta(v: &Value, delta: i32) -> Result<Value, EvalError> {
    Ok(match v {
        Value::Int(i) => Value::Int(i.wrapping_add(delta)),
        Value::UInt(u) => Value::UInt((*u as i32).wrapping_add(delta) as u32),
        Value::Double(d) => Value::Double(d + delta as f64),
        Value::Bool(b) => Value::Int(if *b { 1 } else { 0 } + delta),
        other => return Err(EvalError::TypeMismatch(format!("cannot increment/decrement {}", other.type_tag()))),
    }
}

fn emit_var_set(ev: &mut Evaluator, name: String, value: &Value) {
    ev.emitter.emit(crate::commands::CommandKind::VAR_SET {
        variable: name,
        value: crate::commands::CommandValue::from(value),
    });
}

/// Reads the current value of an lvalue expression (identifier, index, or member access).
fn lvalue_get(ev: &mut Evaluator, ast: &Ast, node: NodeId) -> Result<Flow<Value>, EvalError> {
    match &ast.node(node).kind {
        NodeKind::Identifier(s) => {
            let name = ast.string(*s);
            match ev.scope.lookup(name) {
                Some(b) => Ok(Flow::Done(b.value.clone())),
                None => match builtins::resolve_constant(name, &ev.config) {
                    Some(v) => Ok(Flow::Done(v)),
                    None => Err(EvalError::UndefinedName(name.to_string())),
                },
            }
        }
        NodeKind::Index { base, indices } => {
            let base_value = propagate!(eval_expr(ev, ast, *base)?);
            let mut idx_values = Vec::with_capacity(indices.len());
            for &idx in indices {
                idx_values.push(propagate!(eval_expr(ev, ast, idx)?).as_int()?);
            }
            Ok(Flow::Done(base_value.array_get(&idx_values)?))
        }
        NodeKind::Member { base, field } => {
            let base_value = propagate!(eval_expr(ev, ast, *base)?);
            Ok(Flow::Done(base_value.field_get(ast.string(*field))?))
        }
        other => Err(EvalError::InternalInvariant(format!("not an lvalue: {other:?}"))),
    }
}

/// Writes `value` into an lvalue expression. Returns the name reported in
/// the resulting `VAR_SET` record — the base identifier for index/member
/// targets (§9 decisions, extending the spec's `VAR_SET` rule to compound targets).
fn lvalue_set(ev: &mut Evaluator, ast: &Ast, node: NodeId, value: Value) -> Result<(String, ()), EvalError> {
    match &ast.node(node).kind {
        NodeKind::Identifier(s) => {
            let name = ast.string(*s).to_string();
            ev.scope.assign(&name, value)?;
            Ok((name, ()))
        }
        NodeKind::Index { base, indices } => {
            let name = base_identifier_name(ast, *base)?;
            let idx_values: Result<Vec<i32>, EvalError> = indices
                .iter()
                .map(|&idx| match eval_expr(ev, ast, idx)? {
                    Flow::Done(v) => v.as_int(),
                    Flow::Suspended => Err(EvalError::InternalInvariant(
                        "array index expressions must not suspend".to_string(),
                    )),
                })
                .collect();
            let idx_values = idx_values?;
            let binding = ev
                .scope
                .lookup_mut(&name)
                .ok_or_else(|| EvalError::UndefinedName(name.clone()))?;
            binding.value.array_set(&idx_values, value)?;
            Ok((name, ()))
        }
        NodeKind::Member { base, field } => {
            let name = base_identifier_name(ast, *base)?;
            let field_name = ast.string(*field).to_string();
            let binding = ev
                .scope
                .lookup_mut(&name)
                .ok_or_else(|| EvalError::UndefinedName(name.clone()))?;
            binding.value.field_set(&field_name, value)?;
            Ok((name, ()))
        }
        other => Err(EvalError::InternalInvariant(format!("not an lvalue: {other:?}"))),
    }
}

fn base_identifier_name(ast: &Ast, node: NodeId) -> Result<String, EvalError> {
    match &ast.node(node).kind {
        NodeKind::Identifier(s) => Ok(ast.string(*s).to_string()),
        NodeKind::Index { base, .. } | NodeKind::Member { base, .. } => base_identifier_name(ast, *base),
        other => Err(EvalError::InternalInvariant(format!("index/member base is not an identifier: {other:?}"))),
    }
}

fn eval_call(
    ev: &mut Evaluator,
    ast: &Ast,
    node: NodeId,
    callee: StringId,
    args: Vec<NodeId>,
) -> Result<Flow<Value>, EvalError> {
    let name = ast.string(callee).to_string();

    if ev.has_function(&name) {
        return call_user_function(ev, ast, &name, &args);
    }

    let mut arg_values = Vec::with_capacity(args.len());
    for &a in &args {
        arg_values.push(propagate!(eval_expr(ev, ast, a)?));
    }

    if ev.suspended_call == Some(node) {
        if let Some(v) = ev.broker.take_response() {
            ev.suspended_call = None;
            // every call that can suspend is one of the hardware read builtins,
            // so there is never a non-builtin `FUNCTION_CALL` to emit here
            return Ok(Flow::Done(v));
        }
        return Ok(Flow::Suspended);
    }

    if ev.config.verbose && !is_builtin_hardware_call(&name) {
        ev.emitter.emit(crate::commands::CommandKind::FUNCTION_CALL {
            function: name.clone(),
            arguments: arg_values.iter().map(crate::commands::CommandValue::from).collect(),
        });
    }

    let mut ctx = BuiltinContext {
        emitter: &mut ev.emitter,
        broker: &mut ev.broker,
        config: &ev.config,
        rng: &mut ev.rng,
    };
    match builtins::call(&name, arg_values, &mut ctx)? {
        BuiltinOutcome::Value(v) => Ok(Flow::Done(v)),
        BuiltinOutcome::Pending(_) if ev.call_depth > 0 => Err(EvalError::InternalInvariant(
            "blocking reads inside user-defined functions are not supported".to_string(),
        )),
        BuiltinOutcome::Pending(_) => {
            ev.suspended_call = Some(node);
            Ok(Flow::Suspended)
        }
    }
}

/// `verbose` only adds `FUNCTION_CALL` records for non-builtin calls (§6);
/// hardware builtins already emit their own dedicated command.
fn is_builtin_hardware_call(name: &str) -> bool {
    !matches!(name, "map" | "constrain" | "min" | "max" | "abs" | "sq" | "sqrt" | "pow" | "sin" | "cos" | "tan")
}

/// A reference parameter's argument must name a binding directly — it binds
/// to the caller's storage slot, not to a computed value (§3 "Binding", §4.5).
fn reference_arg_name(ast: &Ast, node: NodeId) -> Result<String, EvalError> {
    match &ast.node(node).kind {
        NodeKind::Identifier(s) => Ok(ast.string(*s).to_string()),
        other => Err(EvalError::TypeMismatch(format!(
            "reference parameter argument must be a plain identifier, got {other:?}"
        ))),
    }
}

fn call_user_function(
    ev: &mut Evaluator,
    ast: &Ast,
    name: &str,
    arg_nodes: &[NodeId],
) -> Result<Flow<Value>, EvalError> {
    let func_node = *ev
        .functions
        .get(name)
        .ok_or_else(|| EvalError::UndefinedName(name.to_string()))?;
    let (params, body) = match &ast.node(func_node).kind {
        NodeKind::FunctionDef { params, body, .. } => (params.clone(), *body),
        _ => return Err(EvalError::InternalInvariant(format!("{name} is not a function"))),
    };
    if params.len() != arg_nodes.len() {
        return Err(EvalError::WrongArity { name: name.to_string(), expected: params.len(), got: arg_nodes.len() });
    }

    let statements = match &ast.node(body).kind {
        NodeKind::Block { statements } => statements.clone(),
        _ => return Err(EvalError::InternalInvariant(format!("{name} body is not a block"))),
    };

    // Bound to the caller's frame before the call frame is pushed, so a
    // reference parameter captures the caller's slot, never the callee's.
    let caller_frame_id = ev.scope.current_frame_id();
    let mut bound_args = Vec::with_capacity(params.len());
    for (param, &arg_node) in params.iter().zip(arg_nodes.iter()) {
        let pname = ast.string(param.name).to_string();
        if param.is_reference {
            let arg_name = reference_arg_name(ast, arg_node)?;
            if ev.scope.lookup(&arg_name).is_none() {
                return Err(EvalError::UndefinedName(arg_name));
            }
            bound_args.push((pname, Value::Reference(Reference { frame_id: caller_frame_id, key: arg_name })));
        } else {
            let v = propagate!(eval_expr(ev, ast, arg_node)?);
            bound_args.push((pname, v));
        }
    }

    let token = ev.scope.push_function_frame();
    for ((pname, value), param) in bound_args.into_iter().zip(params.iter()) {
        ev.scope.declare(&pname, value, DeclFlags { is_const: false, is_reference: param.is_reference })?;
    }

    ev.call_depth += 1;
    let mut cursor = 0;
    let outcome = ev.run_top_level_from(ast, &statements, &mut cursor);
    ev.call_depth -= 1;

    match outcome {
        Ok(Flow::Suspended) => {
            let _ = ev.scope.pop(token);
            Err(EvalError::InternalInvariant(
                "blocking reads inside user-defined functions are not supported".to_string(),
            ))
        }
        Ok(Flow::Done(StmtOutcome::Return(v))) => {
            ev.scope.pop(token)?;
            Ok(Flow::Done(v))
        }
        Ok(Flow::Done(StmtOutcome::Normal)) => {
            ev.scope.pop(token)?;
            Ok(Flow::Done(Value::Void))
        }
        Ok(Flow::Done(other)) => {
            ev.scope.pop(token)?;
            Err(EvalError::InternalInvariant(format!(
                "{name} body produced an illegal top-level outcome: {other:?}"
            )))
        }
        Err(e) => {
            let _ = ev.scope.pop(token);
            Err(e)
        }
    }
}
