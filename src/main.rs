//! interpol CLI
//!
//! Usage:
//!   interpol [OPTIONS] [TEMPLATE]
//!
//! Options:
//!   -f, --file <FILE>         Read the template from a file
//!   -s, --scope <FILE>        Scope file with bindings (TOML format), repeatable
//!   -D, --define <NAME=EXPR>  Bind NAME to the value of EXPR, repeatable
//!   --strict-comprehensions   Reject malformed comprehension placeholders
//!   -n, --no-newline          Do not print a trailing newline
//!   -v, --verbose             Log cache and registration activity
//!   -h, --help                Print help

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use interpol::{
    EngineConfig, Error, EvalError, Evaluator, ExprEvaluator, Interpolator, Scope, ScopeFile,
    Value,
};

#[derive(Parser)]
#[command(name = "interpol")]
#[command(about = "Render f-string style templates")]
struct Cli {
    /// Template text (reads from stdin if neither this nor --file is given)
    template: Option<String>,

    /// Read the template from a file
    #[arg(short, long, conflicts_with = "template")]
    file: Option<PathBuf>,

    /// Scope file with bindings (TOML format); later files override earlier ones
    #[arg(short, long)]
    scope: Vec<PathBuf>,

    /// Bind NAME to the value of EXPR; EXPR that does not parse is taken as a string
    #[arg(short = 'D', long = "define", value_name = "NAME=EXPR")]
    defines: Vec<String>,

    /// Reject placeholders shaped like a comprehension that fail to parse as one
    #[arg(long)]
    strict_comprehensions: bool,

    /// Do not print a trailing newline
    #[arg(short, long)]
    no_newline: bool,

    /// Log cache and registration activity
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "interpol=debug" } else { "interpol=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    // Load scope files in order
    let mut scope = Scope::new();
    for path in &cli.scope {
        match ScopeFile::from_file(path) {
            Ok(file) => {
                tracing::debug!(path = %path.display(), name = ?file.name, "loaded scope file");
                scope.layer(&file.values);
            }
            Err(e) => {
                eprintln!("Error loading scope file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    // Definitions see the scope built so far
    let evaluator = ExprEvaluator::new();
    for define in &cli.defines {
        let Some((name, expr)) = define.split_once('=') else {
            eprintln!("Error: definition '{}' must have the form NAME=EXPR", define);
            std::process::exit(1);
        };
        let name = name.trim();
        if !interpol::expr::is_identifier(name) {
            eprintln!("Error: '{}' is not a valid binding name", name);
            std::process::exit(1);
        }
        match define_value(&evaluator, expr, &scope) {
            Ok(value) => {
                scope.bind(name, value);
            }
            Err(e) => {
                eprintln!("Error evaluating definition of '{}': {}", name, e);
                std::process::exit(1);
            }
        }
    }

    // Read template
    let (source, filename) = match (&cli.template, &cli.file) {
        (Some(text), _) => (text.clone(), "<template>".to_string()),
        (None, Some(path)) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        (None, None) => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let config = EngineConfig::new().with_strict_comprehensions(cli.strict_comprehensions);
    let engine = Interpolator::new().with_config(config);
    match engine.interpolate(&source, &scope) {
        Ok(text) if cli.no_newline => print!("{}", text),
        Ok(text) => println!("{}", text),
        Err(e @ Error::MalformedTemplate { .. }) => {
            eprint!("{}", e.report(&source, &filename));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Value of a `-D NAME=EXPR` definition
///
/// Text that is not an expression, or names nothing in scope, is kept as a
/// plain string so `-D title=Release` works without quoting.
fn define_value(
    evaluator: &ExprEvaluator,
    expr: &str,
    scope: &Scope,
) -> Result<Value, EvalError> {
    match evaluator.evaluate(expr, scope) {
        Ok(value) => Ok(value),
        Err(EvalError::Syntax { .. } | EvalError::UnresolvedName { .. }) => Ok(Value::from(expr)),
        Err(e) => Err(e),
    }
}
