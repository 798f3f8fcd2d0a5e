//! `value-history`: record a sequence of versions and print the history.
//!
//! Usage:
//!   value-history [--structural] [--undo N] < versions.json
//!
//! The input is a JSON array; its first element is the baseline. Diff
//! fallback warnings are logged to stderr (filter with `RUST_LOG`).

use std::io::{self, Read, Write};

use tracing_subscriber::EnvFilter;
use value_history::cli::{parse_args, run};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match run(buf.trim(), &parsed) {
        Ok(out) => {
            if let Err(e) = writeln!(io::stdout(), "{out}") {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
