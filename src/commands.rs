//! The command stream (§3 "CommandRecord", §4.3, §6).
//!
//! `CommandKind` is the closed set of record shapes the protocol table in
//! §6 enumerates; `CommandRecord` pairs one with the monotonic timestamp
//! every record carries. Grounded on the reference runtime's closed
//! `repr(u8)` protocol enums (`global::binary_codes`) for the "one variant
//! per wire record, nothing open-ended" shape, generalized here to
//! data-carrying variants since command records are structured, not opcodes.

use crate::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[allow(non_camel_case_types)]
pub enum CommandKind {
    VERSION_INFO { component: String, version: String, status: String },
    PROGRAM_START,
    SETUP_START,
    SETUP_END,
    LOOP_START,
    LOOP_END,
    PROGRAM_END,
    PIN_MODE { pin: u32, mode: u32 },
    DIGITAL_WRITE { pin: u32, value: u32 },
    ANALOG_WRITE { pin: u32, value: u32 },
    DELAY { duration: u32 },
    DELAY_MICROSECONDS { duration: u32 },
    SERIAL_BEGIN { baud_rate: u32 },
    SERIAL_PRINT { data: String },
    SERIAL_PRINTLN { data: String },
    TONE { pin: u32, frequency: u32, duration: Option<u32> },
    NO_TONE { pin: u32 },
    ANALOG_READ_REQUEST { request_id: u64, pin: u32 },
    DIGITAL_READ_REQUEST { request_id: u64, pin: u32 },
    MILLIS_REQUEST { request_id: u64 },
    MICROS_REQUEST { request_id: u64 },
    PULSE_IN_REQUEST { request_id: u64, pin: u32, state: u32, timeout: u32 },
    VAR_SET { variable: String, value: CommandValue },
    FUNCTION_CALL { function: String, arguments: Vec<CommandValue> },
    LOOP_LIMIT_REACHED { phase: String, iterations: u32, message: String },
    ERROR { kind: String, message: String },
}

/// A host-facing projection of [`Value`]: only the shapes the command
/// stream ever carries (no [`crate::value::Reference`] — the host never
/// observes one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandValue {
    Void,
    Bool(bool),
    Int(i32),
    UInt(u32),
    Double(String),
    String(String),
}

impl From<&Value> for CommandValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Void => CommandValue::Void,
            Value::Bool(b) => CommandValue::Bool(*b),
            Value::Int(i) => CommandValue::Int(*i),
            Value::UInt(u) => CommandValue::UInt(*u),
            Value::Double(d) => CommandValue::Double(crate::value::format_command_double(*d)),
            Value::String(s) => CommandValue::String(s.clone()),
            other => CommandValue::String(crate::value::format_arduino_print(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub timestamp: u64,
    #[serde(flatten)]
    pub kind: CommandKind,
}

/// Append-only command buffer (§4.3). A command is visible to the host as
/// soon as the emitting evaluator step returns control — this type does no
/// buffering beyond the `Vec` itself, and never reorders.
#[derive(Debug, Default)]
pub struct CommandEmitter {
    records: Vec<CommandRecord>,
    clock: u64,
}

impl CommandEmitter {
    pub fn new() -> Self {
        CommandEmitter { records: Vec::new(), clock: 0 }
    }

    /// Assigns a fresh monotonically non-decreasing timestamp and appends the record.
    pub fn emit(&mut self, kind: CommandKind) {
        let timestamp = self.clock;
        self.clock += 1;
        self.records.push(CommandRecord { timestamp, kind });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drains the buffer; the host is expected to call this after every `tick`.
    pub fn take_all(&mut self) -> Vec<CommandRecord> {
        core::mem::take(&mut self.records)
    }

    pub fn as_slice(&self) -> &[CommandRecord] {
        &self.records
    }
}
