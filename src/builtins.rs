//! Native functions installed into the global environment.

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::interpreter::callable::NativeFunction;
use crate::interpreter::environment::EnvRef;
use crate::interpreter::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    /// `clock()`: whole seconds since the Unix epoch.
    Clock,
    /// `len(text)`: number of characters in a string.
    Len,
    /// `str(value)`: the text `print` would write for `value`.
    Str,
}

impl BuiltinFunction {
    pub const ALL: [Self; 3] = [Self::Clock, Self::Len, Self::Str];

    pub fn name(self) -> &'static str {
        match self {
            Self::Clock => "clock",
            Self::Len => "len",
            Self::Str => "str",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Clock => 0,
            Self::Len | Self::Str => 1,
        }
    }

    /// Arity has already been checked by the caller.
    pub fn invoke(self, arguments: &[Value]) -> Result<Value, String> {
        match (self, arguments) {
            (Self::Clock, []) => {
                let elapsed = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map_err(|error| format!("system clock is before the epoch: {error}"))?;
                i64::try_from(elapsed.as_secs())
                    .map(Value::Number)
                    .map_err(|_| "system clock out of range".to_string())
            }
            (Self::Len, [Value::Str(text)]) => i64::try_from(text.chars().count())
                .map(Value::Number)
                .map_err(|_| "string too long".to_string()),
            (Self::Len, [other]) => Err(format!("expected a string, got {}", other.type_name())),
            (Self::Str, [value]) => Ok(Value::string(value.to_string())),
            (builtin, arguments) => Err(format!(
                "expected {} arguments, got {}",
                builtin.arity(),
                arguments.len()
            )),
        }
    }
}

pub fn install(globals: &EnvRef) {
    for builtin in BuiltinFunction::ALL {
        globals.define(builtin.name(), Value::Callable(Rc::new(NativeFunction::new(builtin))));
    }
}
