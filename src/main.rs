use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vision::{compile, Script, ScriptOptions, SourceFile, Vocabulary, DEFAULT_HAT};

#[derive(Parser)]
#[command(name = "vision")]
#[command(about = "Compile and run Vision programs")]
struct Args {
    /// Source files making up the program. Reads stdin when none are given.
    files: Vec<PathBuf>,

    /// Hat pattern to start.
    #[arg(long, default_value = DEFAULT_HAT)]
    hat: String,

    /// Log compilation and hat execution.
    #[arg(short, long)]
    verbose: bool,

    /// Do not echo printed lines to stdout.
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn read_files(paths: &[PathBuf]) -> io::Result<Vec<SourceFile>> {
    if paths.is_empty() {
        let mut code = String::new();
        io::stdin().read_to_string(&mut code)?;
        return Ok(vec![SourceFile::new("main", code)]);
    }
    paths.iter().map(|p| SourceFile::read(p)).collect()
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let files = match read_files(&args.files) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error reading source: {}", e);
            process::exit(1);
        }
    };

    let program = match compile(Arc::new(Vocabulary::standard()), &files) {
        Ok(program) => program,
        Err(log) => {
            eprintln!("{}", log);
            process::exit(1);
        }
    };

    let options = ScriptOptions {
        echo: !args.quiet,
        ..ScriptOptions::default()
    };
    let mut script = Script::with_options(program, options);
    let errors = script.start_hat(&args.hat);
    for e in &errors {
        eprintln!("{}", e);
    }
    if !errors.is_empty() {
        process::exit(1);
    }
}
