//! epic-audit - check VersionOne epics against declarative field rules.
//!
//! Prints one JSON object per rule on stdout:
//!
//! ```text
//! {"scope":"S","status":"Funnel","results":{"Owners is empty":[...]}}
//! ```
//!
//! Logging goes to stderr so stdout stays machine-readable.
//!
//! Exit codes:
//! - 0: Success (violations are reported, not treated as failure)
//! - 1: Error

use std::io;

use anyhow::Context;
use clap::Parser;
use swissarmyhammer_epic_audit::{Backend, MemoryBackend, RuleSet, RuleSetRunner, VersionOneBackend};
use tracing_subscriber::EnvFilter;

mod cli;
mod settings;

use cli::Cli;
use settings::Settings;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level
    let filter = if cli.debug {
        EnvFilter::new("epic_audit=debug,swissarmyhammer_epic_audit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    std::process::exit(result_to_exit(run(&cli).await));
}

/// Convert a run result to an exit code.
fn result_to_exit<E: std::fmt::Display>(result: Result<(), E>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli).context("failed to resolve settings")?;

    let mut rules = match &settings.rules {
        Some(path) => RuleSet::load(path)
            .with_context(|| format!("failed to load rules from {}", path.display()))?,
        None => RuleSet::builtin()?,
    };
    if !settings.scopes.is_empty() {
        rules = rules.only_scopes(settings.scopes.as_slice());
    }
    tracing::debug!(rules = rules.len(), "rule set ready");

    let backend = build_backend(&settings, &rules)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    RuleSetRunner::new(&rules)
        .on_lookup_miss(settings.on_lookup_miss)
        .run(backend.as_ref(), &mut out)
        .await?;
    Ok(())
}

fn build_backend(settings: &Settings, rules: &RuleSet) -> anyhow::Result<Box<dyn Backend>> {
    if let Some(path) = &settings.snapshot {
        let backend = MemoryBackend::load(path)
            .with_context(|| format!("failed to load snapshot {}", path.display()))?;
        return Ok(Box::new(backend));
    }

    let endpoint = settings
        .endpoint
        .as_deref()
        .context("no VersionOne endpoint; pass --endpoint or set VERSION_ONE_ENDPOINT")?;
    let token = settings
        .token
        .as_deref()
        .context("no VersionOne token; pass --token or set VERSION_ONE_TOKEN")?;
    Ok(Box::new(VersionOneBackend::new(endpoint, token, rules.schema())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::LookupMissArg;
    use std::path::PathBuf;

    #[test]
    fn test_cli_parsing_no_args() {
        let cli = Cli::parse_from(["epic-audit"]);
        assert!(!cli.debug);
        assert!(cli.scopes.is_empty());
        assert!(cli.on_lookup_miss.is_none());
    }

    #[test]
    fn test_cli_parsing_repeated_scope() {
        let cli = Cli::parse_from(["epic-audit", "-s", "S1", "--scope", "S2"]);
        assert_eq!(cli.scopes, ["S1", "S2"]);
    }

    #[test]
    fn test_cli_parsing_lookup_miss() {
        let cli = Cli::parse_from(["epic-audit", "--on-lookup-miss", "skip", "--debug"]);
        assert_eq!(cli.on_lookup_miss, Some(LookupMissArg::Skip));
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_parsing_rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["epic-audit", "--on-lookup-miss", "retry"]).is_err());
    }

    #[test]
    fn test_backend_requires_endpoint() {
        let settings = Settings {
            token: Some("t".into()),
            ..Settings::default()
        };
        let err = build_backend(&settings, &RuleSet::default()).err().unwrap();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn test_backend_requires_token() {
        let settings = Settings {
            endpoint: Some("https://v1.example.com".into()),
            ..Settings::default()
        };
        let err = build_backend(&settings, &RuleSet::default()).err().unwrap();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_missing_snapshot_file() {
        let settings = Settings {
            snapshot: Some(PathBuf::from("/nonexistent/snapshot.json")),
            ..Settings::default()
        };
        assert!(build_backend(&settings, &RuleSet::default()).is_err());
    }

    #[test]
    fn test_result_to_exit() {
        assert_eq!(result_to_exit::<String>(Ok(())), 0);
        assert_eq!(result_to_exit(Err("boom".to_string())), 1);
    }
}
