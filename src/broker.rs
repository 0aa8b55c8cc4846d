//! The host read protocol (§4.4).
//!
//! Two modes selected once, at construction: `Inline` resolves a read
//! synchronously through a host-supplied callback; `Cooperative` suspends
//! execution and waits for an explicit `resume`. Neither spawns a thread or
//! a coroutine — suspension is just "the Driver returns control and is told
//! to call back in later with the answer" (§9 "Coroutine/async", option b).

use crate::error::ResumeError;
use crate::value::Value;

/// The shape of a blocking read, independent of how it gets answered.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadRequest {
    AnalogRead { pin: u32 },
    DigitalRead { pin: u32 },
    Millis,
    Micros,
    PulseIn { pin: u32, state: u32, timeout: u32 },
}

pub enum ResponseBroker {
    Inline { callback: Box<dyn FnMut(&ReadRequest) -> Value> },
    Cooperative { next_id: u64, pending: Option<u64>, response: Option<Value> },
}

impl core::fmt::Debug for ResponseBroker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ResponseBroker::Inline { .. } => write!(f, "ResponseBroker::Inline"),
            ResponseBroker::Cooperative { next_id, pending, .. } => f
                .debug_struct("ResponseBroker::Cooperative")
                .field("next_id", next_id)
                .field("pending", pending)
                .finish(),
        }
    }
}

impl ResponseBroker {
    pub fn new_inline(callback: impl FnMut(&ReadRequest) -> Value + 'static) -> Self {
        ResponseBroker::Inline { callback: Box::new(callback) }
    }

    pub fn new_cooperative() -> Self {
        ResponseBroker::Cooperative { next_id: 1, pending: None, response: None }
    }

    pub fn is_cooperative(&self) -> bool {
        matches!(self, ResponseBroker::Cooperative { .. })
    }

    /// Issues a request. Inline mode answers immediately (`Some`); Cooperative
    /// mode records the pending id and answers `None` — the caller must
    /// suspend execution and wait for [`Self::resume`].
    pub fn request(&mut self, req: ReadRequest) -> (u64, Option<Value>) {
        match self {
            ResponseBroker::Inline { callback } => (0, Some(callback(&req))),
            ResponseBroker::Cooperative { next_id, pending, .. } => {
                let id = *next_id;
                *next_id += 1;
                *pending = Some(id);
                (id, None)
            }
        }
    }

    /// Delivers a host response. Validates that exactly the pending id is being answered.
    pub fn resume(&mut self, id: u64, value: Value) -> Result<(), ResumeError> {
        match self {
            ResponseBroker::Inline { .. } => Err(ResumeError::NotWaiting),
            ResponseBroker::Cooperative { pending, response, .. } => match *pending {
                None => Err(ResumeError::NoRequestPending),
                Some(expected) if expected != id => {
                    Err(ResumeError::MismatchedRequestId { expected, given: id })
                }
                Some(_) => {
                    *pending = None;
                    *response = Some(value);
                    Ok(())
                }
            },
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, ResponseBroker::Cooperative { pending: Some(_), .. })
    }

    pub fn waiting_request_id(&self) -> Option<u64> {
        match self {
            ResponseBroker::Cooperative { pending, .. } => *pending,
            ResponseBroker::Inline { .. } => None,
        }
    }

    /// Consumes the delivered response, if any is ready.
    pub fn take_response(&mut self) -> Option<Value> {
        match self {
            ResponseBroker::Cooperative { response, .. } => response.take(),
            ResponseBroker::Inline { .. } => None,
        }
    }
}
