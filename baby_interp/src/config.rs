use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Time elapsed since the Unix epoch. Hosts without a system
/// clock, such as the browser, provide their own.
pub type Clock = fn() -> Duration;

pub fn system_clock() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Redeclaring a variable in the same scope is an error.
    /// Otherwise it overwrites the binding and emits a note.
    pub strict: bool,
    /// Maximum number of iterations of a single `while` loop.
    pub loop_limit: usize,
    /// Maximum number of guest calls active at once.
    pub call_limit: usize,
    /// How long the `async` and `csv` natives take to produce their result.
    pub async_delay: Duration,
    pub clock: Clock,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict: true,
            loop_limit: 10_000,
            call_limit: 256,
            async_delay: Duration::from_secs(3),
            clock: system_clock,
        }
    }
}
