//! Error taxonomy for the interpreter core.
//!
//! Mirrors the split the reference runtime draws between its hot-path
//! `ExecutionError`/`InvalidProgramError` (hand-written `Display`, no derive
//! overhead) and its host/network-facing error types (`thiserror`). Decode
//! errors and evaluation errors are both hot-path; the resume protocol error
//! sits at the host boundary.

use core::fmt;

/// Malformed or truncated AST byte stream. Surfaces from [`crate::Driver::new`]
/// before any evaluation begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    InvalidMagic,
    UnsupportedVersion(u16),
    TruncatedBuffer,
    UnknownNodeKind(u8),
    NodeIndexOutOfRange(u32),
    StringIndexOutOfRange(u32),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidMagic => write!(f, "invalid AST magic, expected \"ASTP\""),
            DecodeError::UnsupportedVersion(v) => {
                write!(f, "unsupported AST format version {v}")
            }
            DecodeError::TruncatedBuffer => {
                write!(f, "AST byte buffer ended before the declared content")
            }
            DecodeError::UnknownNodeKind(tag) => {
                write!(f, "unknown node kind tag {tag:#04x}")
            }
            DecodeError::NodeIndexOutOfRange(idx) => {
                write!(f, "node index {idx} out of range")
            }
            DecodeError::StringIndexOutOfRange(idx) => {
                write!(f, "string table index {idx} out of range")
            }
        }
    }
}

impl core::error::Error for DecodeError {}

/// Evaluator runtime error kinds, closed set per the command-stream `ERROR` record.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    TypeMismatch(String),
    UndefinedName(String),
    RedeclaredName(String),
    WrongArity { name: String, expected: usize, got: usize },
    IndexOutOfRange(String),
    DivisionByZero,
    InternalInvariant(String),
}

impl EvalError {
    /// The `kind` field of the `ERROR` command record, drawn from the closed set in §7.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::TypeMismatch(_) => "TypeMismatch",
            EvalError::UndefinedName(_) => "UndefinedName",
            EvalError::RedeclaredName(_) => "RedeclaredName",
            EvalError::WrongArity { .. } => "WrongArity",
            EvalError::IndexOutOfRange(_) => "IndexOutOfRange",
            EvalError::DivisionByZero => "DivisionByZero",
            EvalError::InternalInvariant(_) => "InternalInvariant",
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::TypeMismatch(msg) => write!(f, "type mismatch: {msg}"),
            EvalError::UndefinedName(name) => write!(f, "undefined name: {name}"),
            EvalError::RedeclaredName(name) => {
                write!(f, "name already declared in this scope: {name}")
            }
            EvalError::WrongArity { name, expected, got } => write!(
                f,
                "{name} expects {expected} argument(s), got {got}"
            ),
            EvalError::IndexOutOfRange(msg) => write!(f, "index out of range: {msg}"),
            EvalError::DivisionByZero => write!(f, "integer division by zero"),
            EvalError::InternalInvariant(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl core::error::Error for EvalError {}

/// Host protocol misuse around [`crate::Driver::resume`]. Reported to the
/// host via the return value, never as an `ERROR` command (§7).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResumeError {
    #[error("no request is currently pending")]
    NoRequestPending,
    #[error("resume id {given} does not match the pending request id {expected}")]
    MismatchedRequestId { expected: u64, given: u64 },
    #[error("driver is not in a state that accepts a resume")]
    NotWaiting,
}

/// Umbrella error returned from [`crate::Driver`] methods.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Decode(#[from] DecodeErrorWrapper),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalErrorWrapper),
    #[error(transparent)]
    Resume(#[from] ResumeError),
}

/// `thiserror`'s `#[from]` needs `core::error::Error`; these newtypes bridge
/// the hand-written hot-path error enums into the boundary error without
/// making `EvalError`/`DecodeError` themselves derive-macro types.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeErrorWrapper(pub DecodeError);
impl fmt::Display for DecodeErrorWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl core::error::Error for DecodeErrorWrapper {}
impl From<DecodeError> for DecodeErrorWrapper {
    fn from(e: DecodeError) -> Self {
        DecodeErrorWrapper(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalErrorWrapper(pub EvalError);
impl fmt::Display for EvalErrorWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl core::error::Error for EvalErrorWrapper {}
impl From<EvalError> for EvalErrorWrapper {
    fn from(e: EvalError) -> Self {
        EvalErrorWrapper(e)
    }
}

impl From<DecodeError> for DriverError {
    fn from(e: DecodeError) -> Self {
        DriverError::Decode(DecodeErrorWrapper(e))
    }
}

impl From<EvalError> for DriverError {
    fn from(e: EvalError) -> Self {
        DriverError::Eval(EvalErrorWrapper(e))
    }
}
