use std::env;

use baby_interp::{
    config::{Clock, Config},
    output::{texts, Line, Output},
    Session,
};
use wasm_bindgen::prelude::*;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = Date)]
    fn now() -> f64;
}

// The standard library has no clock on wasm32-unknown-unknown
#[cfg(target_arch = "wasm32")]
fn clock() -> Clock {
    fn browser_clock() -> std::time::Duration {
        std::time::Duration::from_millis(now() as u64)
    }
    browser_clock
}

#[cfg(not(target_arch = "wasm32"))]
fn clock() -> Clock {
    baby_interp::config::system_clock
}

#[wasm_bindgen]
pub fn init() -> String {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    format!(
        "Baby v{} on {} ({}), Copyright (c) {}",
        env!("CARGO_PKG_VERSION"),
        env::consts::OS,
        env::consts::ARCH,
        env!("CARGO_PKG_AUTHORS"),
    )
}

/// The channels of one run, each joined into a single string.
#[wasm_bindgen]
pub struct Report {
    output: Output,
}

fn joined(lines: &[Line]) -> String {
    texts(lines).join("\n")
}

#[wasm_bindgen]
impl Report {
    pub fn stdout(&self) -> String {
        joined(&self.output.stdout)
    }

    pub fn stderr(&self) -> String {
        joined(&self.output.stderr)
    }

    pub fn info(&self) -> String {
        joined(&self.output.info)
    }

    pub fn debug(&self) -> String {
        joined(&self.output.debug)
    }

    pub fn env_trace(&self) -> String {
        joined(&self.output.env_trace)
    }

    pub fn redirect(&self) -> Option<String> {
        self.output.redirect.as_ref().map(|line| line.text.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

#[wasm_bindgen]
pub struct World {
    session: Session,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl World {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        let config = Config {
            clock: clock(),
            ..Default::default()
        };
        Self {
            session: Session::new(config),
        }
    }

    pub fn run(&mut self, src: &str, debug: bool) -> Report {
        Report {
            output: self.session.interpret(src, debug),
        }
    }

    /// Runs the deferred work that is due. Meant to be called on a timer
    /// while `has_pending` is true.
    pub fn poll(&mut self) -> Report {
        Report {
            output: self.session.poll(),
        }
    }

    pub fn has_pending(&self) -> bool {
        self.session.has_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_joined() {
        let mut world = World::new();
        let report = world.run("print 1; print 2; visit(\"/blog\"); print nope;", false);
        assert_eq!(report.stdout(), "1\n2");
        assert_eq!(report.redirect(), Some("/blog".to_owned()));
        assert!(report.stderr().starts_with("interpret: "));
        assert!(report.debug().is_empty());
    }

    #[test]
    fn state_survives_between_runs() {
        let mut world = World::new();
        assert!(world.run("let a = 2;", false).is_empty());
        assert_eq!(world.run("print a * 21;", false).stdout(), "42");
        assert!(!world.has_pending());
    }
}
