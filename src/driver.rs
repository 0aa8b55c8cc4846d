//! The public host-facing API (§4.7).
//!
//! Grounded on the reference runtime's top-level `Interpreter`/`Runtime`
//! façade that owns decode-then-hoist-then-drive sequencing; here that
//! sequencing is made explicit as a small state machine rather than an
//! object with ad-hoc `pub` fields.

use crate::ast::{self, Ast, NodeId};
use crate::broker::{ReadRequest, ResponseBroker};
use crate::commands::{CommandKind, CommandRecord};
use crate::config::Config;
use crate::error::{DriverError, EvalError, ResumeError};
use crate::evaluator::{Evaluator, Flow};
use crate::value::Value;

/// §4 "ExecutionState". Only `Driver` mutates this; the evaluator never sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Running,
    Paused,
    Stepping,
    WaitingForResponse,
    Complete,
    Error,
}

/// Which top-level body (`setup` or `loop`) is currently being driven.
/// `resume_index` is the entire "continuation" a resume needs — re-entry
/// re-walks the body from this index (§9: the statement that suspended is
/// cheap to redo up to its suspending call, since everything before it in
/// the same body already committed its effects).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Setup,
    Loop,
}

pub struct Driver {
    evaluator: Evaluator,
    ast: Ast,
    state: ExecutionState,
    phase: Phase,
    resume_index: usize,
}

impl Driver {
    /// Decodes `ast_bytes`, hoists declarations, emits `VERSION_INFO` and
    /// `PROGRAM_START`, and leaves the Driver `Idle`. `inline_callback` is
    /// required when `config.sync_mode` is set and ignored otherwise — it is
    /// the host's synchronous answer to every hardware read.
    pub fn new(
        ast_bytes: &[u8],
        config: Config,
        inline_callback: Option<Box<dyn FnMut(&ReadRequest) -> Value>>,
    ) -> Result<Driver, DriverError> {
        let ast = ast::decode::decode(ast_bytes)?;

        let broker = if config.sync_mode {
            let callback = inline_callback.unwrap_or_else(|| Box::new(|_req: &ReadRequest| Value::Void));
            ResponseBroker::new_inline(callback)
        } else {
            ResponseBroker::new_cooperative()
        };

        let mut evaluator = Evaluator::new(config, broker);
        evaluator.hoist_program(&ast)?;

        evaluator.emitter.emit(CommandKind::VERSION_INFO {
            component: "interpreter".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "ready".to_string(),
        });
        evaluator.emitter.emit(CommandKind::PROGRAM_START);

        Ok(Driver { evaluator, ast, state: ExecutionState::Idle, phase: Phase::Setup, resume_index: 0 })
    }

    /// Runs `setup()` to completion, or until it suspends. No-op once already started.
    pub fn start(&mut self) -> Result<(), DriverError> {
        if !matches!(self.state, ExecutionState::Idle) {
            return Ok(());
        }
        self.phase = Phase::Setup;
        self.resume_index = 0;
        self.state = ExecutionState::Running;
        self.evaluator.emitter.emit(CommandKind::SETUP_START);
        self.drive_setup()
    }

    /// Advances execution by one step: finishes `setup()` if still running
    /// it, otherwise attempts exactly one `loop()` iteration. No-op once
    /// `Complete`, `Error`, or `WaitingForResponse` (a pending read must be
    /// answered through [`Self::resume`] first).
    pub fn tick(&mut self) -> Result<(), DriverError> {
        match self.state {
            ExecutionState::Complete | ExecutionState::Error | ExecutionState::WaitingForResponse => Ok(()),
            ExecutionState::Idle => self.start(),
            _ => match self.phase {
                Phase::Setup => self.drive_setup(),
                Phase::Loop => {
                    self.resume_index = 0;
                    if self.evaluator.governor.tick_top_level().is_err() {
                        self.evaluator.emitter.emit(CommandKind::LOOP_LIMIT_REACHED {
                            phase: "loop".to_string(),
                            iterations: self.evaluator.governor.top_level_iterations(),
                            message: "top-level loop iteration cap reached".to_string(),
                        });
                        self.stop();
                        return Ok(());
                    }
                    self.evaluator.emitter.emit(CommandKind::LOOP_START);
                    self.drive_loop()
                }
            },
        }
    }

    /// Delivers a host response to the pending cooperative read and
    /// continues driving the body that suspended. Never re-runs the
    /// start-of-iteration bookkeeping (`SETUP_START`/`LOOP_START`, the loop
    /// cap check) — that happens only on the `start`/`tick` entry paths, so
    /// a suspend on a body's very first statement can't cause it to run twice.
    pub fn resume(&mut self, request_id: u64, value: Value) -> Result<(), DriverError> {
        if !matches!(self.state, ExecutionState::WaitingForResponse) {
            return Err(ResumeError::NotWaiting.into());
        }
        self.evaluator.broker.resume(request_id, value).map_err(DriverError::from)?;
        self.state = ExecutionState::Running;
        match self.phase {
            Phase::Setup => self.drive_setup(),
            Phase::Loop => self.drive_loop(),
        }
    }

    /// Idempotent cancellation: emits `PROGRAM_END` once and transitions to `Complete`.
    pub fn stop(&mut self) {
        if !matches!(self.state, ExecutionState::Complete) {
            self.evaluator.emitter.emit(CommandKind::PROGRAM_END);
            self.state = ExecutionState::Complete;
        }
    }

    pub fn is_waiting_for_response(&self) -> bool {
        matches!(self.state, ExecutionState::WaitingForResponse)
    }

    pub fn get_waiting_request_id(&self) -> Option<u64> {
        self.evaluator.broker.waiting_request_id()
    }

    pub fn get_state(&self) -> ExecutionState {
        self.state
    }

    pub fn take_commands(&mut self) -> Vec<CommandRecord> {
        self.evaluator.emitter.take_all()
    }

    fn setup_statements(&self) -> Result<Vec<NodeId>, DriverError> {
        self.evaluator
            .function_body(&self.ast, "setup")
            .ok_or_else(|| EvalError::UndefinedName("setup".to_string()).into())
    }

    fn loop_statements(&self) -> Result<Vec<NodeId>, DriverError> {
        self.evaluator
            .function_body(&self.ast, "loop")
            .ok_or_else(|| EvalError::UndefinedName("loop".to_string()).into())
    }

    fn drive_setup(&mut self) -> Result<(), DriverError> {
        let statements = self.setup_statements()?;
        match self.evaluator.run_top_level_from(&self.ast, &statements, &mut self.resume_index) {
            Ok(Flow::Suspended) => {
                self.state = ExecutionState::WaitingForResponse;
                Ok(())
            }
            Ok(Flow::Done(_)) => {
                self.evaluator.emitter.emit(CommandKind::SETUP_END);
                self.phase = Phase::Loop;
                self.resume_index = 0;
                self.state = ExecutionState::Running;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn drive_loop(&mut self) -> Result<(), DriverError> {
        let statements = self.loop_statements()?;
        match self.evaluator.run_top_level_from(&self.ast, &statements, &mut self.resume_index) {
            Ok(Flow::Suspended) => {
                self.state = ExecutionState::WaitingForResponse;
                Ok(())
            }
            Ok(Flow::Done(_)) => {
                self.evaluator.emitter.emit(CommandKind::LOOP_END);
                self.resume_index = 0;
                self.state = ExecutionState::Running;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&mut self, e: EvalError) -> DriverError {
        self.evaluator.emitter.emit(CommandKind::ERROR { kind: e.kind().to_string(), message: e.to_string() });
        self.state = ExecutionState::Error;
        e.into()
    }
}
