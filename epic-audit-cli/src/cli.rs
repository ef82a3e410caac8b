//! CLI definition for the epic-audit command-line interface.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Behaviour when a rule's scope or status cannot be found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LookupMissArg {
    /// Stop at the first unresolved rule
    Abort,
    /// Warn and continue with the next rule
    Skip,
}

/// Epic audit
///
/// Checks the epics in each configured scope/status column against field
/// rules and prints one JSON object per rule on stdout.
#[derive(Parser, Debug)]
#[command(name = "epic-audit")]
#[command(version)]
#[command(about = "Check VersionOne epics against declarative field rules")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long)]
    pub debug: bool,

    /// Settings file (YAML, TOML or JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// VersionOne instance URL [env: VERSION_ONE_ENDPOINT]
    #[arg(long)]
    pub endpoint: Option<String>,

    /// VersionOne access token [env: VERSION_ONE_TOKEN]
    #[arg(long)]
    pub token: Option<String>,

    /// Rule set file (YAML or JSON); the built-in rules are used when omitted
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Read scopes, statuses and epics from a JSON snapshot instead of VersionOne
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Only run rules for this scope (repeatable)
    #[arg(short, long = "scope", value_name = "NAME")]
    pub scopes: Vec<String>,

    /// What to do when a scope or status name does not resolve
    #[arg(long, value_enum)]
    pub on_lookup_miss: Option<LookupMissArg>,
}
