//! The builtin dispatch table (§4.8).
//!
//! A static, name-indexed table rather than a call-site `match` chain — the
//! same shape as the reference runtime's opcode-indexed instruction tables
//! (`global::instruction_codes`), generalized from "one entry per opcode" to
//! "one entry per qualified builtin name".

use crate::broker::{ReadRequest, ResponseBroker};
use crate::commands::{CommandKind, CommandEmitter};
use crate::config::Config;
use crate::error::EvalError;
use crate::value::Value;

/// Pin-mode constants (§4.8).
pub const INPUT: i32 = 0;
pub const OUTPUT: i32 = 1;
pub const INPUT_PULLUP: i32 = 2;
pub const HIGH: i32 = 1;
pub const LOW: i32 = 0;

/// Resolves a bare identifier against the builtin constant/pin-alias table.
/// Tried only after scope lookup fails — user declarations always shadow these.
pub fn resolve_constant(name: &str, config: &Config) -> Option<Value> {
    match name {
        "INPUT" => Some(Value::Int(INPUT)),
        "OUTPUT" => Some(Value::Int(OUTPUT)),
        "INPUT_PULLUP" => Some(Value::Int(INPUT_PULLUP)),
        "HIGH" => Some(Value::Int(HIGH)),
        "LOW" => Some(Value::Int(LOW)),
        "PI" => Some(Value::Double(core::f64::consts::PI)),
        _ => config.pin_aliases.resolve(name).map(|p| Value::Int(p as i32)),
    }
}

pub enum BuiltinOutcome {
    /// The call completed and produced a value (`Void` for commands with no return).
    Value(Value),
    /// The call issued a read request that has not yet been answered; the
    /// evaluator must suspend at this call site (§4.4, §4.5).
    Pending(u64),
}

pub struct BuiltinContext<'a> {
    pub emitter: &'a mut CommandEmitter,
    pub broker: &'a mut ResponseBroker,
    pub config: &'a Config,
    pub rng: &'a mut u32,
}

fn arity_error(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::WrongArity { name: name.to_string(), expected, got }
}

fn as_pin(v: &Value) -> Result<u32, EvalError> {
    Ok(v.as_int()?.max(0) as u32)
}

/// Simple xorshift32 PRNG — deterministic given a seed, matching the "no
/// hidden global state" requirement (§5): the seed lives in the `Driver`,
/// not a static.
fn xorshift32(state: &mut u32) -> u32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    x
}

/// Dispatches a builtin call by its fully qualified name (e.g. `Serial.println`).
pub fn call(name: &str, args: Vec<Value>, ctx: &mut BuiltinContext) -> Result<BuiltinOutcome, EvalError> {
    use BuiltinOutcome::Value as V;

    match name {
        "pinMode" => {
            require_arity(name, &args, 2)?;
            let pin = as_pin(&args[0])?;
            let mode = args[1].as_int()? as u32;
            ctx.emitter.emit(CommandKind::PIN_MODE { pin, mode });
            Ok(V(Value::Void))
        }
        "digitalWrite" => {
            require_arity(name, &args, 2)?;
            let pin = as_pin(&args[0])?;
            let value = args[1].as_int()? as u32;
            ctx.emitter.emit(CommandKind::DIGITAL_WRITE { pin, value });
            Ok(V(Value::Void))
        }
        "analogWrite" => {
            require_arity(name, &args, 2)?;
            let pin = as_pin(&args[0])?;
            let value = args[1].as_int()? as u32;
            ctx.emitter.emit(CommandKind::ANALOG_WRITE { pin, value });
            Ok(V(Value::Void))
        }
        "digitalRead" => {
            require_arity(name, &args, 1)?;
            let pin = as_pin(&args[0])?;
            read(ctx, ReadRequest::DigitalRead { pin }, |id, pin| CommandKind::DIGITAL_READ_REQUEST { request_id: id, pin })
        }
        "analogRead" => {
            require_arity(name, &args, 1)?;
            let pin = as_pin(&args[0])?;
            read(ctx, ReadRequest::AnalogRead { pin }, |id, pin| CommandKind::ANALOG_READ_REQUEST { request_id: id, pin })
        }
        "millis" => {
            require_arity(name, &args, 0)?;
            let (id, value) = ctx.broker.request(ReadRequest::Millis);
            ctx.emitter.emit(CommandKind::MILLIS_REQUEST { request_id: id });
            Ok(value.map(V).unwrap_or(BuiltinOutcome::Pending(id)))
        }
        "micros" => {
            require_arity(name, &args, 0)?;
            let (id, value) = ctx.broker.request(ReadRequest::Micros);
            ctx.emitter.emit(CommandKind::MICROS_REQUEST { request_id: id });
            Ok(value.map(V).unwrap_or(BuiltinOutcome::Pending(id)))
        }
        "pulseIn" => {
            if args.len() < 2 || args.len() > 3 {
                return Err(arity_error(name, 2, args.len()));
            }
            let pin = as_pin(&args[0])?;
            let state = args[1].as_int()? as u32;
            let timeout = if args.len() == 3 { args[2].as_int()? as u32 } else { 1_000_000 };
            let (id, value) = ctx.broker.request(ReadRequest::PulseIn { pin, state, timeout });
            ctx.emitter.emit(CommandKind::PULSE_IN_REQUEST { request_id: id, pin, state, timeout });
            Ok(value.map(V).unwrap_or(BuiltinOutcome::Pending(id)))
        }
        "delay" => {
            require_arity(name, &args, 1)?;
            let duration = args[0].as_int()? as u32;
            ctx.emitter.emit(CommandKind::DELAY { duration });
            Ok(V(Value::Void))
        }
        "delayMicroseconds" => {
            require_arity(name, &args, 1)?;
            let duration = args[0].as_int()? as u32;
            ctx.emitter.emit(CommandKind::DELAY_MICROSECONDS { duration });
            Ok(V(Value::Void))
        }
        "tone" => {
            if args.len() < 2 || args.len() > 3 {
                return Err(arity_error(name, 2, args.len()));
            }
            let pin = as_pin(&args[0])?;
            let frequency = args[1].as_int()? as u32;
            let duration = if args.len() == 3 { Some(args[2].as_int()? as u32) } else { None };
            ctx.emitter.emit(CommandKind::TONE { pin, frequency, duration });
            Ok(V(Value::Void))
        }
        "noTone" => {
            require_arity(name, &args, 1)?;
            let pin = as_pin(&args[0])?;
            ctx.emitter.emit(CommandKind::NO_TONE { pin });
            Ok(V(Value::Void))
        }
        "Serial.begin" => {
            require_arity(name, &args, 1)?;
            let baud_rate = args[0].as_int()? as u32;
            ctx.emitter.emit(CommandKind::SERIAL_BEGIN { baud_rate });
            Ok(V(Value::Void))
        }
        "Serial.print" => {
            require_arity(name, &args, 1)?;
            let data = crate::value::format_arduino_print(&args[0]);
            ctx.emitter.emit(CommandKind::SERIAL_PRINT { data });
            Ok(V(Value::Void))
        }
        "Serial.println" => {
            require_arity(name, &args, 1)?;
            let data = crate::value::format_arduino_print(&args[0]);
            ctx.emitter.emit(CommandKind::SERIAL_PRINTLN { data });
            Ok(V(Value::Void))
        }
        "map" => {
            require_arity(name, &args, 5)?;
            let x = args[0].as_double()?;
            let in_min = args[1].as_double()?;
            let in_max = args[2].as_double()?;
            let out_min = args[3].as_double()?;
            let out_max = args[4].as_double()?;
            let result = (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min;
            Ok(V(Value::Int(result as i32)))
        }
        "constrain" => {
            require_arity(name, &args, 3)?;
            let x = args[0].as_double()?;
            let lo = args[1].as_double()?;
            let hi = args[2].as_double()?;
            Ok(V(Value::Double(x.clamp(lo.min(hi), lo.max(hi)))))
        }
        "min" => {
            require_arity(name, &args, 2)?;
            binary_numeric(&args[0], &args[1], f64::min)
        }
        "max" => {
            require_arity(name, &args, 2)?;
            binary_numeric(&args[0], &args[1], f64::max)
        }
        "abs" => {
            require_arity(name, &args, 1)?;
            Ok(V(Value::Double(args[0].as_double()?.abs())))
        }
        "sq" => {
            require_arity(name, &args, 1)?;
            let x = args[0].as_double()?;
            Ok(V(Value::Double(x * x)))
        }
        "sqrt" => {
            require_arity(name, &args, 1)?;
            Ok(V(Value::Double(args[0].as_double()?.sqrt())))
        }
        "pow" => {
            require_arity(name, &args, 2)?;
            Ok(V(Value::Double(args[0].as_double()?.powf(args[1].as_double()?))))
        }
        "sin" => {
            require_arity(name, &args, 1)?;
            Ok(V(Value::Double(args[0].as_double()?.sin())))
        }
        "cos" => {
            require_arity(name, &args, 1)?;
            Ok(V(Value::Double(args[0].as_double()?.cos())))
        }
        "tan" => {
            require_arity(name, &args, 1)?;
            Ok(V(Value::Double(args[0].as_double()?.tan())))
        }
        "random" => {
            if args.is_empty() || args.len() > 2 {
                return Err(arity_error(name, 1, args.len()));
            }
            let (lo, hi) = if args.len() == 1 {
                (0i64, args[0].as_int()? as i64)
            } else {
                (args[0].as_int()? as i64, args[1].as_int()? as i64)
            };
            if hi <= lo {
                return Ok(V(Value::Int(lo as i32)));
            }
            let span = (hi - lo) as u32;
            let draw = xorshift32(ctx.rng) % span;
            Ok(V(Value::Int(lo as i32 + draw as i32)))
        }
        "randomSeed" => {
            require_arity(name, &args, 1)?;
            let seed = args[0].as_int()? as u32;
            *ctx.rng = if seed == 0 { 0x9E3779B9 } else { seed };
            Ok(V(Value::Void))
        }
        other => Err(EvalError::UndefinedName(other.to_string())),
    }
}

fn require_arity(name: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() != expected {
        Err(arity_error(name, expected, args.len()))
    } else {
        Ok(())
    }
}

fn binary_numeric(a: &Value, b: &Value, f: fn(f64, f64) -> f64) -> Result<BuiltinOutcome, EvalError> {
    Ok(BuiltinOutcome::Value(Value::Double(f(a.as_double()?, b.as_double()?))))
}

fn read(
    ctx: &mut BuiltinContext,
    req: ReadRequest,
    make_cmd: fn(u64, u32) -> CommandKind,
) -> Result<BuiltinOutcome, EvalError> {
    let pin = match &req {
        ReadRequest::AnalogRead { pin } | ReadRequest::DigitalRead { pin } => *pin,
        _ => 0,
    };
    let (id, value) = ctx.broker.request(req);
    ctx.emitter.emit(make_cmd(id, pin));
    Ok(value.map(BuiltinOutcome::Value).unwrap_or(BuiltinOutcome::Pending(id)))
}
