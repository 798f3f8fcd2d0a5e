//! Logic behind the `value-history` binary.
//!
//! The binary reads a JSON array of versions from stdin, records every
//! version after the first against the first as baseline, optionally undoes
//! some of them and prints the resulting snapshot.

use serde_json::Value;

use crate::error::HistoryError;
use crate::history::VersionedValueHistory;
use crate::options::HistoryOptions;
use crate::DiffStrategy;

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum CliError {
    Json(serde_json::Error),
    History(HistoryError),
    Usage(String),
    EmptyInput,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Json(e)    => write!(f, "{e}"),
            CliError::History(e) => write!(f, "{e}"),
            CliError::Usage(e)   => write!(f, "{e}\n\n{USAGE}"),
            CliError::EmptyInput => write!(f, "input must be a non-empty JSON array of versions"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self { CliError::Json(e) }
}

impl From<HistoryError> for CliError {
    fn from(e: HistoryError) -> Self { CliError::History(e) }
}

pub const USAGE: &str = "usage: value-history [--structural] [--undo N] < versions.json";

// ── Arguments ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub options: HistoryOptions,
    pub undo: usize,
}

pub fn parse_args(args: &[String]) -> Result<CliArgs, CliError> {
    let mut parsed = CliArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--structural" => parsed.options.strategy = DiffStrategy::Structural,
            "--merge" => parsed.options.strategy = DiffStrategy::Merge,
            "--undo" => {
                let n = iter
                    .next()
                    .ok_or_else(|| CliError::Usage("--undo requires a count".into()))?;
                parsed.undo = n
                    .parse()
                    .map_err(|_| CliError::Usage(format!("invalid undo count: {n}")))?;
            }
            other => return Err(CliError::Usage(format!("unknown argument: {other}"))),
        }
    }
    Ok(parsed)
}

// ── Run ───────────────────────────────────────────────────────────────────

/// Builds a history from `versions_json` and returns its snapshot as
/// pretty-printed JSON.
pub fn run(versions_json: &str, args: &CliArgs) -> Result<String, CliError> {
    let versions: Vec<Value> = serde_json::from_str(versions_json)?;
    let (baseline, rest) = versions.split_first().ok_or(CliError::EmptyInput)?;

    let mut history = VersionedValueHistory::with_options(
        baseline,
        args.options.clone(),
        std::sync::Arc::new(crate::TracingSink),
    )?;
    for version in rest {
        history.add(version)?;
    }
    for _ in 0..args.undo {
        history.undo()?;
    }
    Ok(serde_json::to_string_pretty(&history.snapshot()?)?)
}
