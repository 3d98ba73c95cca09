/// Runtime switches chosen once per session, usually from CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Route local variable access through the resolver's depth cache.
    /// When off, lookups walk the environment chain by name.
    pub use_resolver: bool,
    /// Nested user-function calls allowed before a stack-overflow error.
    pub max_call_depth: usize,
    /// Enables the built-in `host(...)` commands.
    pub allow_host: bool,
}

pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

impl Default for Config {
    fn default() -> Self {
        Self {
            use_resolver: true,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            allow_host: false,
        }
    }
}
