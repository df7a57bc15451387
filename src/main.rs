use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use loxwalk as lox;

use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::interpreter::{Interpreter, InterpreterConfig};
use lox::parser::Parser;
use lox::resolver;
use lox::scanner::Scanner;

/// Exit code for lexical, syntax and static errors.
const EXIT_STATIC: i32 = 65;
/// Exit code for runtime errors.
const EXIT_RUNTIME: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking Lox interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,

    /// Print tokens as JSON (tokenize only)
    #[arg(long, global = true)]
    json: bool,

    /// Maximum nested call depth before a stack overflow is reported
    #[arg(long, global = true, default_value_t = InterpreterConfig::default().max_call_depth)]
    max_depth: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },
}

/// Memory-maps a source file and copies it out as UTF-8 text.
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    // zero-length files cannot be mapped
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read-only and copied out before it is dropped.
    let mmap = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    let text = std::str::from_utf8(&mmap)
        .map_err(LoxError::from)
        .context(format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", text.len(), filename);

    Ok(text)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'loxwalk::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("loxwalk::")
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
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Prints every error and exits with `code` if there is at least one.
fn report_and_exit(errors: &[LoxError], code: i32) -> ! {
    for e in errors {
        debug!("Reporting error: {}", e);
        eprintln!("{}", e);
    }
    std::process::exit(code);
}

/// Scans `source`, exiting with 65 on any lexical error.
fn scan_or_exit(source: &str) -> Vec<lox::token::Token> {
    match Scanner::new(source).scan_all() {
        Ok(tokens) => tokens,
        Err(errors) => report_and_exit(&errors, EXIT_STATIC),
    }
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let mut tokenized = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => {
                if json {
                    println!(
                        "{}",
                        serde_json::to_string(&token).context("Failed to encode token")?
                    );
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC);
        std::process::exit(EXIT_STATIC);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(source: &str) {
    let tokens = scan_or_exit(source);

    match Parser::new(tokens).parse_expression() {
        Ok(expr) => {
            let ast = AstPrinter::print(&expr);
            debug!("AST: {}", ast);
            println!("{}", ast);
        }
        Err(e) => report_and_exit(&[e], EXIT_STATIC),
    }
}

fn evaluate(source: &str, config: InterpreterConfig) {
    let tokens = scan_or_exit(source);

    let expr = match Parser::new(tokens).parse_expression() {
        Ok(expr) => expr,
        Err(e) => report_and_exit(&[e], EXIT_STATIC),
    };

    let mut interpreter = Interpreter::new().with_config(config);

    match interpreter.evaluate(&expr) {
        Ok(value) => println!("{}", value),
        Err(e) => report_and_exit(&[e.into()], EXIT_RUNTIME),
    }
}

fn run(source: &str, config: InterpreterConfig) {
    let tokens = scan_or_exit(source);

    let statements = match Parser::new(tokens).parse() {
        Ok(statements) => statements,
        Err(errors) => report_and_exit(&errors, EXIT_STATIC),
    };

    info!("Parsed {} statements", statements.len());

    let locals = match resolver::resolve(&statements) {
        Ok(locals) => locals,
        Err(e) => report_and_exit(&[e.into()], EXIT_STATIC),
    };

    let mut interpreter = Interpreter::new().with_config(config);

    match interpreter.interpret(&statements, locals) {
        Ok(()) => info!("Program executed successfully"),
        Err(e) => report_and_exit(&[e.into()], EXIT_RUNTIME),
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

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

    let config = InterpreterConfig {
        max_call_depth: args.max_depth,
    };

    let filename = match &args.commands {
        Commands::Tokenize { filename }
        | Commands::Parse { filename }
        | Commands::Evaluate { filename }
        | Commands::Run { filename } => filename,
    };

    let Some(filename) = filename else {
        info!("No filepath provided");
        println!("No input filepath was provided. Exiting...");
        return Ok(());
    };

    let source = read_file(filename)?;

    match args.commands {
        Commands::Tokenize { .. } => tokenize(&source, args.json)?,
        Commands::Parse { .. } => parse(&source),
        Commands::Evaluate { .. } => evaluate(&source, config),
        Commands::Run { .. } => run(&source, config),
    }

    Ok(())
}
