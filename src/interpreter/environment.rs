//! Lexical environments: one frame of name bindings plus a link to the
//! enclosing frame. Frames are shared, since closures keep the frame they
//! were created in alive after the block that made it has finished.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::token::Token;

use super::error::{RuntimeError, RuntimeErrorKind};
use super::value::Value;

#[derive(Default)]
pub struct Environment {
    values: FxHashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

// Unlinks the enclosing chain iteratively; a frame still shared elsewhere ends the walk.
impl Drop for Environment {
    fn drop(&mut self) {
        let mut next = self.enclosing.take();
        while let Some(EnvRef(frame)) = next {
            next = match Rc::try_unwrap(frame) {
                Ok(frame) => frame.into_inner().enclosing.take(),
                Err(_) => None,
            };
        }
    }
}

/// Shared handle to an [`Environment`]. Cloning the handle aliases the frame.
#[derive(Clone, Default)]
pub struct EnvRef(Rc<RefCell<Environment>>);

impl fmt::Debug for EnvRef {
    // Frames can reach themselves through closures, so only the shape is shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.0.borrow();
        f.debug_struct("EnvRef")
            .field("bindings", &frame.values.len())
            .field("has_enclosing", &frame.enclosing.is_some())
            .finish()
    }
}

impl EnvRef {
    pub fn global() -> Self {
        Self::default()
    }

    pub fn child(parent: &EnvRef) -> Self {
        EnvRef(Rc::new(RefCell::new(Environment {
            values: FxHashMap::default(),
            enclosing: Some(parent.clone()),
        })))
    }

    /// Binds `name` in this frame, replacing any existing binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().values.insert(name.into(), value);
    }

    /// Looks `name` up in this frame, then each enclosing frame in turn.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        let mut current = self.clone();
        loop {
            let next = {
                let frame = current.0.borrow();
                if let Some(value) = frame.values.get(&name.lexeme) {
                    return Ok(value.clone());
                }
                frame.enclosing.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => return Err(undefined(name)),
            }
        }
    }

    /// Rebinds the nearest existing `name`. Assignment never creates a binding.
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        let mut current = self.clone();
        loop {
            let next = {
                let mut frame = current.0.borrow_mut();
                if let Some(slot) = frame.values.get_mut(&name.lexeme) {
                    *slot = value;
                    return Ok(());
                }
                frame.enclosing.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => return Err(undefined(name)),
            }
        }
    }

    /// Follows exactly `depth` enclosing links.
    pub fn ancestor(&self, depth: usize, name: &Token) -> Result<EnvRef, RuntimeError> {
        let mut current = self.clone();
        for _ in 0..depth {
            let parent = current.0.borrow().enclosing.clone();
            current = parent.ok_or_else(|| {
                internal(
                    name,
                    format!("scope depth {depth} for '{}' is past the outermost frame", name.lexeme),
                )
            })?;
        }
        Ok(current)
    }

    pub fn get_at(&self, depth: usize, name: &Token) -> Result<Value, RuntimeError> {
        let frame = self.ancestor(depth, name)?;
        let frame = frame.0.borrow();
        frame.values.get(&name.lexeme).cloned().ok_or_else(|| {
            internal(
                name,
                format!("resolved variable '{}' missing at depth {depth}", name.lexeme),
            )
        })
    }

    pub fn assign_at(&self, depth: usize, name: &Token, value: Value) -> Result<(), RuntimeError> {
        let frame = self.ancestor(depth, name)?;
        let mut frame = frame.0.borrow_mut();
        match frame.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(internal(
                name,
                format!("resolved variable '{}' missing at depth {depth}", name.lexeme),
            )),
        }
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(
        name,
        RuntimeErrorKind::UndefinedVariable {
            name: name.lexeme.clone(),
        },
    )
}

fn internal(name: &Token, message: String) -> RuntimeError {
    RuntimeError::new(name, RuntimeErrorKind::Internal { message })
}
