use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    rc::Rc,
    thread,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use baby_interp::{config::Config, error::Phase, interpret::Interpreter, output::Logger, run};
use clap::Parser;
use log::{debug, info};

/// Interpreter for the baby language. Starts a REPL when no files are given.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Source files, run one after the other in the same session
    files: Vec<PathBuf>,
    /// Trace every phase and show the environment as it changes
    #[arg(short, long)]
    debug: bool,
    /// Allow variables to be redeclared in the same scope
    #[arg(long)]
    lenient: bool,
    /// Maximum number of iterations of a single while loop
    #[arg(long, default_value_t = 10_000)]
    loop_limit: usize,
    /// Maximum number of function calls active at once
    #[arg(long, default_value_t = 256)]
    call_limit: usize,
}

/// Writes every channel to the terminal.
struct Terminal;

impl Logger for Terminal {
    fn log(&self, text: &str) {
        println!("{text}");
    }

    fn error(&self, phase: Phase, text: &str) {
        eprintln!("{phase}: {text}");
    }

    fn info(&self, text: &str) {
        println!("info: {text}");
    }

    fn debug(&self, phase: Phase, text: &str) {
        eprintln!("debug: {phase}: {text}");
    }

    fn environment(&self, text: &str) {
        eprintln!("env: {text}");
    }

    fn visit(&self, url: &str) {
        println!("redirect: {url}");
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();
    let config = Config {
        strict: !args.lenient,
        loop_limit: args.loop_limit,
        call_limit: args.call_limit,
        ..Default::default()
    };
    let mut interpreter = Interpreter::new(config, Rc::new(Terminal));

    if args.files.is_empty() {
        run_repl(&mut interpreter, args.debug)
    } else {
        run_files(&mut interpreter, &args.files, args.debug)
    }
}

fn run_repl(interpreter: &mut Interpreter, mut debug: bool) -> Result<()> {
    let (stdin, mut stdout) = (io::stdin(), io::stdout());
    loop {
        interpreter.poll_deferred();
        let mut line = String::default();
        print!(">>> ");
        stdout.flush().context("Failed to flush stdout")?;
        let n = stdin
            .read_line(&mut line)
            .context("Failed to read line")?;
        // If zero bytes are read, then exit (usually triggered by Ctrl-D)
        if n == 0 {
            break;
        }
        interpreter.poll_deferred();
        if line.trim() == "vvvv" {
            debug = !debug;
            println!("debug output {}", if debug { "on" } else { "off" });
            continue;
        }
        if let Err(e) = run(&line, interpreter, debug) {
            debug!("Input failed in {} phase", e.phase);
        }
    }
    Ok(())
}

fn run_files(interpreter: &mut Interpreter, files: &[PathBuf], debug: bool) -> Result<()> {
    let mut failed = 0;
    for path in files {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        info!("Running {}", path.display());
        if run(&source, interpreter, debug).is_err() {
            failed += 1;
        }
    }

    while interpreter.has_deferred() {
        interpreter.poll_deferred();
        thread::sleep(Duration::from_millis(10));
    }

    if failed > 0 {
        bail!("{failed} of {} files failed", files.len());
    }
    Ok(())
}
