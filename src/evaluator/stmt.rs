//! Statement evaluation (§4.5).

use super::{propagate, Evaluator, Flow, StmtOutcome};
use crate::ast::{Ast, NodeId, NodeKind};
use crate::error::EvalError;
use crate::scope::DeclFlags;
use crate::value::Value;

pub fn eval_stmt(ev: &mut Evaluator, ast: &Ast, node: NodeId) -> Result<Flow<StmtOutcome>, EvalError> {
    let kind = ast.node(node).kind.clone();
    match kind {
        NodeKind::FunctionDef { .. } | NodeKind::StructDef { .. } => Ok(Flow::Done(StmtOutcome::Normal)),

        NodeKind::VarDecl { name, type_tag, struct_type, array_dims, is_const, init } => {
            let var_name = ast.string(name).to_string();
            let value = if let Some(init_node) = init {
                propagate!(super::expr::eval_expr(ev, ast, init_node)?)
            } else if let Some(dims) = &array_dims {
                ev.default_array(type_tag, dims)
            } else {
                ev.default_value(ast, type_tag, struct_type)
            };
            ev.scope.declare(&var_name, value.clone(), DeclFlags { is_const, is_reference: false })?;
            ev.emitter.emit(crate::commands::CommandKind::VAR_SET {
                variable: var_name,
                value: crate::commands::CommandValue::from(&value),
            });
            Ok(Flow::Done(StmtOutcome::Normal))
        }

        NodeKind::ExprStatement { expr } => {
            propagate!(super::expr::eval_expr(ev, ast, expr)?);
            Ok(Flow::Done(StmtOutcome::Normal))
        }

        NodeKind::Block { statements } => eval_block(ev, ast, &statements),

        NodeKind::If { condition, then_branch, else_branch } => {
            let c = propagate!(super::expr::eval_expr(ev, ast, condition)?);
            if c.truthy() {
                eval_stmt(ev, ast, then_branch)
            } else if let Some(else_node) = else_branch {
                eval_stmt(ev, ast, else_node)
            } else {
                Ok(Flow::Done(StmtOutcome::Normal))
            }
        }

        NodeKind::While { condition, body } => {
            let mut counter = ev.governor.new_internal_counter();
            loop {
                let c = propagate!(super::expr::eval_expr(ev, ast, condition)?);
                if !c.truthy() {
                    break;
                }
                if counter.tick().is_err() {
                    return Ok(Flow::Done(StmtOutcome::Terminated));
                }
                match eval_stmt(ev, ast, body)? {
                    Flow::Suspended => return Ok(Flow::Suspended),
                    Flow::Done(StmtOutcome::Break) => break,
                    Flow::Done(StmtOutcome::Continue) | Flow::Done(StmtOutcome::Normal) => {}
                    Flow::Done(other) => return Ok(Flow::Done(other)),
                }
            }
            Ok(Flow::Done(StmtOutcome::Normal))
        }

        NodeKind::DoWhile { condition, body } => {
            let mut counter = ev.governor.new_internal_counter();
            loop {
                if counter.tick().is_err() {
                    return Ok(Flow::Done(StmtOutcome::Terminated));
                }
                match eval_stmt(ev, ast, body)? {
                    Flow::Suspended => return Ok(Flow::Suspended),
                    Flow::Done(StmtOutcome::Break) => break,
                    Flow::Done(StmtOutcome::Continue) | Flow::Done(StmtOutcome::Normal) => {}
                    Flow::Done(other) => return Ok(Flow::Done(other)),
                }
                let c = propagate!(super::expr::eval_expr(ev, ast, condition)?);
                if !c.truthy() {
                    break;
                }
            }
            Ok(Flow::Done(StmtOutcome::Normal))
        }

        NodeKind::For { init, condition, update, body } => {
            let token = ev.scope.push_block_frame();
            let result = (|| -> Result<Flow<StmtOutcome>, EvalError> {
                if let Some(init_node) = init {
                    propagate!(eval_stmt(ev, ast, init_node)?);
                }
                let mut counter = ev.governor.new_internal_counter();
                loop {
                    if let Some(cond_node) = condition {
                        let c = propagate!(super::expr::eval_expr(ev, ast, cond_node)?);
                        if !c.truthy() {
                            break;
                        }
                    }
                    if counter.tick().is_err() {
                        return Ok(Flow::Done(StmtOutcome::Terminated));
                    }
                    match eval_stmt(ev, ast, body)? {
                        Flow::Suspended => return Ok(Flow::Suspended),
                        Flow::Done(StmtOutcome::Break) => break,
                        Flow::Done(StmtOutcome::Continue) | Flow::Done(StmtOutcome::Normal) => {}
                        Flow::Done(other) => return Ok(Flow::Done(other)),
                    }
                    if let Some(update_node) = update {
                        propagate!(super::expr::eval_expr(ev, ast, update_node)?);
                    }
                }
                Ok(Flow::Done(StmtOutcome::Normal))
            })();
            ev.scope.pop(token)?;
            result
        }

        NodeKind::Switch { discriminant, arms } => {
            let disc = propagate!(super::expr::eval_expr(ev, ast, discriminant)?);
            let mut matched = false;
            let mut default_index = None;
            for (i, arm) in arms.iter().enumerate() {
                match arm.value {
                    Some(value_node) => {
                        if !matched {
                            let v = propagate!(super::expr::eval_expr(ev, ast, value_node)?);
                            if v.compare(crate::operators::ComparisonOperator::Eq, &disc).truthy() {
                                matched = true;
                            }
                        }
                    }
                    None => default_index = Some(i),
                }
                if matched {
                    match run_statements(ev, ast, &arm.statements)? {
                        Flow::Suspended => return Ok(Flow::Suspended),
                        Flow::Done(StmtOutcome::Break) => return Ok(Flow::Done(StmtOutcome::Normal)),
                        Flow::Done(StmtOutcome::Normal) => {}
                        Flow::Done(other) => return Ok(Flow::Done(other)),
                    }
                }
            }
            if !matched {
                if let Some(i) = default_index {
                    for arm in &arms[i..] {
                        match run_statements(ev, ast, &arm.statements)? {
                            Flow::Suspended => return Ok(Flow::Suspended),
                            Flow::Done(StmtOutcome::Break) => return Ok(Flow::Done(StmtOutcome::Normal)),
                            Flow::Done(StmtOutcome::Normal) => {}
                            Flow::Done(other) => return Ok(Flow::Done(other)),
                        }
                    }
                }
            }
            Ok(Flow::Done(StmtOutcome::Normal))
        }

        NodeKind::Break => Ok(Flow::Done(StmtOutcome::Break)),
        NodeKind::Continue => Ok(Flow::Done(StmtOutcome::Continue)),
        NodeKind::Return { value } => {
            let v = match value {
                Some(n) => propagate!(super::expr::eval_expr(ev, ast, n)?),
                None => Value::Void,
            };
            Ok(Flow::Done(StmtOutcome::Return(v)))
        }

        other => Err(EvalError::InternalInvariant(format!("not a statement node: {other:?}"))),
    }
}

fn eval_block(ev: &mut Evaluator, ast: &Ast, statements: &[NodeId]) -> Result<Flow<StmtOutcome>, EvalError> {
    let token = ev.scope.push_block_frame();
    let result = run_statements(ev, ast, statements);
    ev.scope.pop(token)?;
    result
}

fn run_statements(ev: &mut Evaluator, ast: &Ast, statements: &[NodeId]) -> Result<Flow<StmtOutcome>, EvalError> {
    for &s in statements {
        match eval_stmt(ev, ast, s)? {
            Flow::Suspended => return Ok(Flow::Suspended),
            Flow::Done(StmtOutcome::Normal) => continue,
            Flow::Done(other) => return Ok(Flow::Done(other)),
        }
    }
    Ok(Flow::Done(StmtOutcome::Normal))
}
