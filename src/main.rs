use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Once,
};

use clap::{Parser, Subcommand};
use jcode::{Error, Interpreter, Lexer, Value};
use miette::{IntoDiagnostic, WrapErr};

#[derive(Parser, Debug)]
#[command(version, about = "Run and inspect JCode programs")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a source file. `.jc` and `.jcode` files must define `main`.
    Run {
        filename: PathBuf,
        /// Report errors with miette's graphical renderer.
        #[arg(long)]
        fancy: bool,
    },
    /// Evaluate a snippet and print its value.
    Eval {
        code: String,
        #[arg(long)]
        fancy: bool,
    },
    /// Interactive shell; definitions persist between lines.
    Repl,
    Tokenize { filename: PathBuf },
    Parse { filename: PathBuf },
}

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_writer(io::stderr))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

fn read_source(filename: &Path) -> miette::Result<String> {
    fs::read_to_string(filename)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading `{}` failed", filename.display()))
}

/// Prints `error` and picks the exit code for it.
fn report(error: Error, fancy: bool) -> ExitCode {
    let code = if error.is_static() { 65 } else { 70 };
    if fancy {
        eprintln!("{:?}", miette::Report::new(error));
    } else {
        eprintln!("{}", error.render());
    }
    ExitCode::from(code)
}

fn main() -> miette::Result<ExitCode> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Commands::Run { filename, fancy } => {
            let text = read_source(&filename)?;
            let name = filename.to_string_lossy();
            if let Err(error) = Interpreter::new().run(&name, &text) {
                return Ok(report(error, fancy));
            }
        }
        Commands::Eval { code, fancy } => match Interpreter::new().run("<eval>", &code) {
            Ok(value) => {
                if let Some(shown) = display_result(&value) {
                    println!("{shown}");
                }
            }
            Err(error) => return Ok(report(error, fancy)),
        },
        Commands::Repl => repl()?,
        Commands::Tokenize { filename } => {
            let text = read_source(&filename)?;
            let name = filename.to_string_lossy();
            for token in Lexer::new(&name, &text) {
                match token {
                    Ok(token) => println!("{token}"),
                    Err(error) => return Ok(report(error, false)),
                }
            }
        }
        Commands::Parse { filename } => {
            let text = read_source(&filename)?;
            let name = filename.to_string_lossy();
            match jcode::Parser::new(&name, &text).and_then(|parser| parser.parse()) {
                Ok(program) => println!("{program}"),
                Err(error) => return Ok(report(error, false)),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn repl() -> miette::Result<()> {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    loop {
        print!("jcode > ");
        io::stdout().flush().into_diagnostic()?;

        let mut line = String::new();
        if stdin.read_line(&mut line).into_diagnostic()? == 0 {
            println!();
            return Ok(());
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match interpreter.run("<stdin>", line) {
            Ok(value) => {
                if let Some(shown) = display_result(&value) {
                    println!("{shown}");
                }
            }
            Err(error) => eprintln!("{}", error.render()),
        }
    }
}

/// What the shell echoes for a result: null entries are dropped and a lone
/// survivor is shown by itself.
fn display_result(value: &Value) -> Option<String> {
    let Value::List(values) = value else {
        return Some(value.repr());
    };
    let kept: Vec<Value> = values
        .borrow()
        .iter()
        .filter(|value| !matches!(value, Value::Number(n) if n.is_zero()))
        .cloned()
        .collect();
    match kept.len() {
        0 => None,
        1 => Some(kept[0].repr()),
        _ => Some(Value::list(kept).repr()),
    }
}
