//! Registry behind `host(...)` expressions.
//!
//! The text handed to `host` is split at the first whitespace into a command
//! name and an argument. Only registered commands run; with nothing
//! registered every escape fails.

use std::env::{self, VarError};

use rustc_hash::FxHashMap;

use super::error::RuntimeErrorKind;
use super::value::Value;

pub type HostCommand = fn(&str) -> Result<Value, String>;

#[derive(Debug, Clone, Default)]
pub struct HostExtensions {
    commands: FxHashMap<&'static str, HostCommand>,
}

impl HostExtensions {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// `echo <text>` and `env <NAME>`.
    pub fn with_builtin_commands() -> Self {
        let mut extensions = Self::default();
        extensions.register("echo", echo);
        extensions.register("env", env_var);
        extensions
    }

    pub fn register(&mut self, name: &'static str, command: HostCommand) {
        self.commands.insert(name, command);
    }

    pub fn is_enabled(&self) -> bool {
        !self.commands.is_empty()
    }

    pub fn dispatch(&self, code: &str) -> Result<Value, RuntimeErrorKind> {
        if !self.is_enabled() {
            return Err(RuntimeErrorKind::HostDisabled);
        }
        let code = code.trim();
        let (command, argument) = match code.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim_start()),
            None => (code, ""),
        };
        let handler = self
            .commands
            .get(command)
            .ok_or_else(|| RuntimeErrorKind::UnknownHostCommand {
                command: command.to_string(),
            })?;
        handler(argument).map_err(|message| RuntimeErrorKind::HostCommandFailed {
            command: command.to_string(),
            message,
        })
    }
}

fn echo(argument: &str) -> Result<Value, String> {
    Ok(Value::string(argument))
}

fn env_var(argument: &str) -> Result<Value, String> {
    if argument.is_empty() {
        return Err("missing variable name".to_string());
    }
    match env::var(argument) {
        Ok(value) => Ok(Value::string(value)),
        Err(VarError::NotPresent) => Ok(Value::Nil),
        Err(VarError::NotUnicode(_)) => Err(format!("'{argument}' is not valid unicode")),
    }
}
