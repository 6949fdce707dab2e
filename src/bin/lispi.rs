use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Once;

use clap::Parser;
use lispi::DEFAULT_MAX_EVAL_DEPTH;
use lispi::ast::ValueKind;
use lispi::config::{DefinePolicy, InterpreterConfig};
use lispi::evaluator::Environment;
use lispi::session::{Interpreter, Transcript, is_terminal_signal, run_script};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

#[derive(Parser, Debug)]
#[command(name = "lispi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A minimal Lisp interpreter", long_about = None)]
struct Args {
    /// Evaluate this file line by line instead of prompting
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// Session log; truncated at startup
    #[arg(long, value_name = "FILE", default_value = "results.txt")]
    log: PathBuf,

    #[arg(long = "no-log")]
    no_log: bool,

    #[arg(long = "max-depth", value_name = "N", default_value_t = DEFAULT_MAX_EVAL_DEPTH)]
    max_depth: usize,

    /// Let `define` replace existing bindings
    #[arg(long)]
    redefine: bool,
}

impl Args {
    fn interpreter_config(&self) -> InterpreterConfig {
        let define_policy = if self.redefine {
            DefinePolicy::Overwrite
        } else {
            DefinePolicy::KeepExisting
        };
        InterpreterConfig::default()
            .with_max_eval_depth(self.max_depth)
            .with_define_policy(define_policy)
    }
}

type SessionTranscript = Transcript<io::Stdout, File>;

static TRACING_INIT: Once = Once::new();

/// Enable with `RUST_LOG=lispi=debug` or `RUST_LOG=lispi=trace`.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("lispi: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let interpreter = Interpreter::new(args.interpreter_config());
    let log = if args.no_log {
        None
    } else {
        Some(File::create(&args.log)?)
    };
    let mut transcript = Transcript::new(io::stdout(), log);

    match &args.script {
        Some(path) => {
            let script = BufReader::new(File::open(path)?);
            run_script(&interpreter, script, &mut transcript)?;
        }
        None => run_repl(&interpreter, &mut transcript)?,
    }
    Ok(())
}

fn run_repl(
    interpreter: &Interpreter,
    transcript: &mut SessionTranscript,
) -> Result<(), Box<dyn Error>> {
    println!("Lispi - A Lisp Interpreter");
    println!("Type :help for more commands, or (quit) to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(interpreter.environment());
                        continue;
                    }
                    ":quit" => break,
                    _ => {}
                }

                let Some(value) = interpreter.eval_line(line) else {
                    continue;
                };
                transcript.write_line(&value)?;
                if is_terminal_signal(&value) {
                    return Ok(());
                }
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  (quit)     - Exit the interpreter");
    println!("  Ctrl+C/D   - Exit the interpreter");
    println!();
    println!("Syntax:");
    println!("  Numbers: 42 (negative numbers via (- 0 5))");
    println!("  Booleans: T, NIL");
    println!("  Quote: 'x, '(1 2 3)");
    println!();
    println!("Special forms: if, define, defun, set!, quit");
    println!("Procedures: + - * / > < = != and or not car cdr cons sqrt pow");
    println!();
    println!("Examples:");
    println!("  (+ 1 2 3)");
    println!("  (defun sq (n) (* n n))");
    println!("  (if (> (sq 3) 5) 'big 'small)");
    println!();
}

fn print_environment(env: &Environment) {
    let bindings = env.get_all_bindings();

    let (natives, user_defined): (Vec<_>, Vec<_>) = bindings
        .into_iter()
        .partition(|(_, value)| matches!(value.kind, ValueKind::NativeProcedure { .. }));

    println!("Native procedures ({}):", natives.len());
    let mut col = 0;
    for (name, _) in &natives {
        print!("  {name:<8}");
        col += 1;
        if col % 8 == 0 {
            println!();
        }
    }
    if col % 8 != 0 {
        println!();
    }
    println!();

    if user_defined.is_empty() {
        println!("No user-defined values.");
        return;
    }

    println!("User-defined values ({}):", user_defined.len());
    for (name, value) in user_defined {
        println!("  {name} = {value}");
    }
}
