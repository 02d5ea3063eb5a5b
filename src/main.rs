use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser as ClapParser;
use env_logger::Builder;
use log::{debug, info};

use rlox as lox;

use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    /// Script to run; omit to start an interactive session
    script: Option<PathBuf>,

    /// Enable logging to app.log
    #[arg(long)]
    log: bool,
}

/// What a single pipeline run produced, mapped to exit codes by the driver.
enum RunOutcome {
    Success,
    StaticError,
    RuntimeError,
}

/// Reads the contents of a file into a Vec<u8>.
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'rlox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rlox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Runs the whole pipeline once over `source`: scan → parse → resolve →
/// interpret.  Static errors accumulate and are all reported, and any static
/// error suppresses interpretation entirely (fail-closed).
///
/// `next_id` threads the parser's node-id counter between REPL lines so that
/// distance annotations recorded for earlier lines stay valid.
fn run(interpreter: &mut Interpreter, next_id: &mut usize, source: &[u8]) -> RunOutcome {
    let mut tokens: Vec<Token> = Vec::new();
    let mut had_scan_error = false;

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => {
                debug!("Scan error: {}", e);
                had_scan_error = true;
                eprintln!("{}", e);
            }
        }
    }

    let mut parser = Parser::resuming_from(tokens, *next_id);
    let parse_result = parser.parse();
    *next_id = parser.next_node_id();

    let statements = match parse_result {
        Ok(statements) => statements,
        Err(errors) => {
            for e in errors {
                eprintln!("{}", e);
            }
            return RunOutcome::StaticError;
        }
    };

    if had_scan_error {
        return RunOutcome::StaticError;
    }

    if let Err(errors) = Resolver::new(interpreter).resolve(&statements) {
        for e in errors {
            eprintln!("{}", e);
        }
        return RunOutcome::StaticError;
    }

    match interpreter.interpret(&statements) {
        Ok(()) => RunOutcome::Success,
        Err(e) => {
            debug!("Runtime error: {}", e);
            eprintln!("{}", e);
            RunOutcome::RuntimeError
        }
    }
}

fn run_file(path: &PathBuf) -> Result<()> {
    info!("Running script {:?}", path);

    let source = read_file(path)?;
    let mut interpreter = Interpreter::new();
    let mut next_id = 0usize;

    match run(&mut interpreter, &mut next_id, &source) {
        RunOutcome::Success => Ok(()),
        RunOutcome::StaticError => std::process::exit(65),
        RunOutcome::RuntimeError => std::process::exit(70),
    }
}

fn run_prompt() -> Result<()> {
    info!("Starting interactive session");

    let mut interpreter = Interpreter::new();
    let mut next_id = 0usize;

    let stdin = io::stdin();

    print!("> ");
    io::stdout().flush()?;

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read line from stdin")?;

        // Errors are reported by `run`; the session continues regardless.
        let _ = run(&mut interpreter, &mut next_id, line.as_bytes());

        print!("> ");
        io::stdout().flush()?;
    }

    info!("Interactive session ended");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return Ok(());
        }

        // Anything else (including more than one positional argument) is a
        // usage error.
        Err(e) => {
            let _ = e.print();
            std::process::exit(64);
        }
    };

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.script {
        Some(path) => run_file(path),
        None => run_prompt(),
    }
}
