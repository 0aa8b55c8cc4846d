//! Lexical scope management (§3 "Frame"/"ScopeStack", §4.2).
//!
//! Grounded on the reference runtime's `runtime::stack::ScopeStack`, but
//! frames here are a name→binding map with a lexical parent pointer rather
//! than a bare LIFO of anonymous containers — save/restore across a call is
//! push/pop of a real frame, never a snapshot-and-copy.

use crate::error::EvalError;
use crate::value::Value;
use std::collections::HashMap;

/// Declaration-site flags for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeclFlags {
    pub is_const: bool,
    pub is_reference: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: Value,
    pub is_const: bool,
    pub is_reference: bool,
}

#[derive(Debug, Default)]
struct Frame {
    bindings: HashMap<String, Binding>,
    /// Index into `ScopeStack::frames` of the lexical parent, or `None` for the global frame.
    parent: Option<usize>,
}

/// Returned by `push_function_frame`/`push_block_frame`, required by `pop`
/// to catch LIFO violations (a `pop` with a stale token is a bug, not a
/// recoverable runtime error — it indicates AST-walking miscounted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeToken(usize);

#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<Frame>,
    /// Index into `frames` of the currently active top.
    top: usize,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack { frames: vec![Frame::default()], top: 0 }
    }

    /// Pushes a call frame whose lexical parent is the global frame (index 0),
    /// *not* the caller — the distinguishing rule of §3.
    pub fn push_function_frame(&mut self) -> ScopeToken {
        self.frames.push(Frame { bindings: HashMap::new(), parent: Some(0) });
        let idx = self.frames.len() - 1;
        self.top = idx;
        ScopeToken(idx)
    }

    /// Pushes a block frame whose lexical parent is the current top.
    pub fn push_block_frame(&mut self) -> ScopeToken {
        self.frames.push(Frame { bindings: HashMap::new(), parent: Some(self.top) });
        let idx = self.frames.len() - 1;
        self.top = idx;
        ScopeToken(idx)
    }

    /// Pops the top frame. `token` must be the one returned by the matching push.
    pub fn pop(&mut self, token: ScopeToken) -> Result<(), EvalError> {
        if self.top != token.0 || self.top == 0 {
            return Err(EvalError::InternalInvariant(
                "scope pop did not match the matching push".to_string(),
            ));
        }
        let parent = self.frames[self.top].parent.expect("non-global frame always has a parent");
        self.frames.truncate(self.top);
        self.top = parent;
        Ok(())
    }

    /// True once only the global frame remains (§8 invariant 3).
    pub fn is_at_global(&self) -> bool {
        self.top == 0 && self.frames.len() == 1
    }

    pub fn declare(&mut self, name: &str, value: Value, flags: DeclFlags) -> Result<(), EvalError> {
        let frame = &mut self.frames[self.top];
        if frame.bindings.contains_key(name) {
            return Err(EvalError::RedeclaredName(name.to_string()));
        }
        frame.bindings.insert(
            name.to_string(),
            Binding { name: name.to_string(), value, is_const: flags.is_const, is_reference: flags.is_reference },
        );
        Ok(())
    }

    /// The frame id a `Reference` built right now would name to reach the
    /// current top frame later (§3 "Binding").
    pub fn current_frame_id(&self) -> u32 {
        self.top as u32
    }

    fn frame_of(&self, name: &str) -> Option<usize> {
        let mut idx = Some(self.top);
        while let Some(i) = idx {
            if self.frames[i].bindings.contains_key(name) {
                return Some(i);
            }
            idx = self.frames[i].parent;
        }
        None
    }

    /// Walks parents from the current top until it finds `name`, following
    /// through any `Reference` binding along the way, or the global frame is
    /// exhausted. Transparent on read (§3 "Binding") — the returned binding
    /// is always the underlying storage slot, never a `Reference` itself.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        let mut frame = self.frame_of(name)?;
        let mut key = name;
        loop {
            let binding = self.frames[frame].bindings.get(key)?;
            match &binding.value {
                Value::Reference(r) => {
                    frame = r.frame_id as usize;
                    key = &r.key;
                }
                _ => return Some(binding),
            }
        }
    }

    /// Mutable counterpart of [`Self::lookup`]: follows a `Reference` chain
    /// to the underlying binding rather than the reference binding itself.
    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Binding> {
        let mut frame = self.frame_of(name)?;
        let mut key = name.to_string();
        loop {
            let target = self.frames.get(frame)?.bindings.get(&key)?;
            match &target.value {
                Value::Reference(r) => {
                    frame = r.frame_id as usize;
                    key = r.key.clone();
                }
                _ => return self.frames.get_mut(frame)?.bindings.get_mut(&key),
            }
        }
    }

    /// Mutates the binding `name` resolves to, following a `Reference`
    /// through to the slot it points at (transparent on write, §3
    /// "Binding"). Fails if no binding named `name` is visible.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        match self.lookup_mut(name) {
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => Err(EvalError::UndefinedName(name.to_string())),
        }
    }

    /// Global-frame declaration, used for hoisting top-level `var`s and function definitions.
    pub fn declare_global(&mut self, name: &str, value: Value, flags: DeclFlags) -> Result<(), EvalError> {
        if self.frames[0].bindings.contains_key(name) {
            return Err(EvalError::RedeclaredName(name.to_string()));
        }
        self.frames[0].bindings.insert(
            name.to_string(),
            Binding { name: name.to_string(), value, is_const: flags.is_const, is_reference: flags.is_reference },
        );
        Ok(())
    }
}
