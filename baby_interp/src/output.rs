use std::cell::RefCell;

use crate::{config::Clock, error::Phase};

/// Sink for everything the interpreter reports to its user. Only `log`
/// and `error` are required; the remaining channels are optional and
/// are dropped unless a logger opts into them.
pub trait Logger {
    /// Output of `print` statements and natives.
    fn log(&self, text: &str);
    fn error(&self, phase: Phase, text: &str);
    /// Non-fatal advice, such as style warnings from the parser.
    fn info(&self, _text: &str) {}
    /// Internal tracing, only emitted in debug mode.
    fn debug(&self, _phase: Phase, _text: &str) {}
    /// Snapshots of the active environment, only emitted in debug mode.
    fn environment(&self, _text: &str) {}
    /// A request to navigate to `url`.
    fn visit(&self, _url: &str) {}
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _text: &str) {}
    fn error(&self, _phase: Phase, _text: &str) {}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Line {
    /// Milliseconds since the Unix epoch.
    pub at: u128,
    pub text: String,
}

/// Everything reported while interpreting one input,
/// split into independent channels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Output {
    pub stdout: Vec<Line>,
    /// Errors, prefixed with the phase that raised them.
    pub stderr: Vec<Line>,
    pub info: Vec<Line>,
    pub debug: Vec<Line>,
    pub env_trace: Vec<Line>,
    pub redirect: Option<Line>,
}

/// The text of each line, without timestamps.
pub fn texts(lines: &[Line]) -> Vec<&str> {
    lines.iter().map(|line| line.text.as_str()).collect()
}

impl Output {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
            && self.stderr.is_empty()
            && self.info.is_empty()
            && self.debug.is_empty()
            && self.env_trace.is_empty()
            && self.redirect.is_none()
    }
}

/// A logger that records into an [`Output`].
#[derive(Debug)]
pub struct Channels {
    output: RefCell<Output>,
    clock: Clock,
}

impl Channels {
    pub fn new(clock: Clock) -> Self {
        Self {
            output: RefCell::default(),
            clock,
        }
    }

    /// Returns the recorded output and starts over with empty channels.
    pub fn take(&self) -> Output {
        self.output.take()
    }

    fn line(&self, text: String) -> Line {
        Line {
            at: (self.clock)().as_millis(),
            text,
        }
    }
}

impl Logger for Channels {
    fn log(&self, text: &str) {
        let line = self.line(text.to_string());
        self.output.borrow_mut().stdout.push(line);
    }

    fn error(&self, phase: Phase, text: &str) {
        let line = self.line(format!("{phase}: {text}"));
        self.output.borrow_mut().stderr.push(line);
    }

    fn info(&self, text: &str) {
        let line = self.line(text.to_string());
        self.output.borrow_mut().info.push(line);
    }

    fn debug(&self, phase: Phase, text: &str) {
        let line = self.line(format!("{phase}: {text}"));
        self.output.borrow_mut().debug.push(line);
    }

    fn environment(&self, text: &str) {
        let line = self.line(text.to_string());
        self.output.borrow_mut().env_trace.push(line);
    }

    fn visit(&self, url: &str) {
        let line = self.line(url.to_string());
        self.output.borrow_mut().redirect = Some(line);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn fixed_clock() -> Duration {
        Duration::from_millis(42)
    }

    #[test]
    fn channels_are_independent() {
        let channels = Channels::new(fixed_clock);
        channels.log("1");
        channels.error(Phase::Parse, "oops");
        channels.info("careful");
        channels.debug(Phase::Interpret, "expr 1");
        channels.environment("a = 1");
        channels.visit("/blog");
        channels.visit("/about");

        let output = channels.take();
        assert_eq!(texts(&output.stdout), vec!["1"]);
        assert_eq!(texts(&output.stderr), vec!["parse: oops"]);
        assert_eq!(texts(&output.info), vec!["careful"]);
        assert_eq!(texts(&output.debug), vec!["interpret: expr 1"]);
        assert_eq!(texts(&output.env_trace), vec!["a = 1"]);
        assert_eq!(
            output.redirect,
            Some(Line {
                at: 42,
                text: "/about".to_owned()
            })
        );
        assert!(channels.take().is_empty());
    }

    #[test]
    fn optional_channels_default_to_nothing() {
        struct Minimal(RefCell<Vec<String>>);
        impl Logger for Minimal {
            fn log(&self, text: &str) {
                self.0.borrow_mut().push(text.to_owned());
            }
            fn error(&self, phase: Phase, text: &str) {
                self.0.borrow_mut().push(format!("{phase}: {text}"));
            }
        }

        let logger = Minimal(RefCell::default());
        logger.info("ignored");
        logger.debug(Phase::Scan, "ignored");
        logger.environment("ignored");
        logger.visit("ignored");
        logger.log("kept");
        assert_eq!(logger.0.take(), vec!["kept"]);
    }
}
