pub mod config;
pub mod environment;
pub mod error;
pub mod interpret;
pub mod output;
pub mod resolve;
pub mod stdlib;
pub mod types;

use std::rc::Rc;

use baby_syntax::{lex::Lexer, parse::Parser};
use config::Config;
use error::{Abort, Phase};
use interpret::Interpreter;
use log::trace;
use output::{Channels, Output};
use resolve::Resolver;

/// Runs `source` through every phase on an existing interpreter. The
/// errors of the failing phase are reported to the interpreter's logger
/// before they are returned.
pub fn run(source: &str, interpreter: &mut Interpreter, debug: bool) -> Result<(), Abort> {
    let logger = interpreter.logger();
    let abort = |phase: Phase, errors: Vec<String>| {
        errors.iter().for_each(|e| logger.error(phase, e));
        Abort { phase, errors }
    };
    interpreter.set_debug(debug);

    let offset = interpreter.claim_offset(source.len());
    trace!("Lexing {source} at offset {offset}");
    let tokens = Lexer::with_offset(source, offset)
        .lex_all_sanitised()
        .map_err(|e| abort(Phase::Scan, e))?;
    if debug {
        logger.debug(Phase::Scan, &format!("{} tokens", tokens.len()));
    }

    trace!("Parsing {tokens:#?}");
    let mut parser = Parser::new(&tokens);
    let parsed = parser.parse_all();
    parser
        .take_notes()
        .iter()
        .for_each(|note| logger.info(note));
    let root = parsed.map_err(|e| abort(Phase::Parse, e))?;
    if debug {
        root.items
            .iter()
            .for_each(|item| logger.debug(Phase::Parse, &item.summary()));
    }

    trace!("Resolving {root:#?}");
    let resolution = Resolver::new()
        .resolve(&root)
        .map_err(|e| abort(Phase::ResolveVariable, e))?;
    if debug {
        logger.debug(
            Phase::ResolveVariable,
            &format!("{} local variables resolved", resolution.depths.len()),
        );
    }
    interpreter.resolve(resolution);

    trace!("Interpreting {} items", root.items.len());
    interpreter
        .interpret_all(&root.items)
        .map_err(|e| abort(Phase::Interpret, vec![e.to_string()]))
}

/// An interpreter whose output is collected into channels,
/// one [`Output`] per input.
pub struct Session {
    interpreter: Interpreter,
    channels: Rc<Channels>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Session {
    pub fn new(config: Config) -> Self {
        let channels = Rc::new(Channels::new(config.clock));
        Self {
            interpreter: Interpreter::new(config, channels.clone()),
            channels,
        }
    }

    /// Runs the deferred tasks that are due, then `source`.
    pub fn interpret(&mut self, source: &str, debug: bool) -> Output {
        self.interpreter.poll_deferred();
        // Errors have already been recorded on the error channel
        let _ = run(source, &mut self.interpreter, debug);
        self.channels.take()
    }

    /// Runs the deferred tasks that are due and returns what they reported.
    pub fn poll(&mut self) -> Output {
        self.interpreter.poll_deferred();
        self.channels.take()
    }

    pub fn has_pending(&self) -> bool {
        self.interpreter.has_deferred()
    }
}
