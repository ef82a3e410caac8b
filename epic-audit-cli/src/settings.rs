//! Settings resolution using Figment.
//!
//! Sources are merged in precedence order (later sources override earlier ones):
//! 1. Default values
//! 2. The `--config` file, if given
//! 3. Environment variables (`VERSION_ONE_ENDPOINT`, `VERSION_ONE_TOKEN`)
//! 4. Command line flags

use crate::cli::{Cli, LookupMissArg};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use swissarmyhammer_epic_audit::LookupMissPolicy;
use tracing::debug;

/// Environment variable prefix for backend settings.
const ENV_PREFIX: &str = "VERSION_ONE_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub on_lookup_miss: LookupMissPolicy,
}

/// Values given explicitly on the command line. Unset flags are omitted so
/// they do not mask file or environment values.
#[derive(Debug, Default, Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rules: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    on_lookup_miss: Option<LookupMissPolicy>,
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            endpoint: cli.endpoint.clone(),
            token: cli.token.clone(),
            rules: cli.rules.clone(),
            snapshot: cli.snapshot.clone(),
            scopes: cli.scopes.clone(),
            on_lookup_miss: cli.on_lookup_miss.map(|arg| match arg {
                LookupMissArg::Abort => LookupMissPolicy::Abort,
                LookupMissArg::Skip => LookupMissPolicy::Skip,
            }),
        }
    }
}

impl Settings {
    /// Resolve settings for a parsed command line.
    pub fn load(cli: &Cli) -> Result<Self, figment::Error> {
        let settings: Settings = Self::figment(cli)?.extract()?;
        debug!(
            endpoint = ?settings.endpoint,
            rules = ?settings.rules,
            snapshot = ?settings.snapshot,
            scopes = ?settings.scopes,
            "resolved settings"
        );
        Ok(settings)
    }

    fn figment(cli: &Cli) -> Result<Figment, figment::Error> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

        if let Some(path) = &cli.config {
            figment = figment.merge(Self::config_file(path)?);
        }

        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).only(&["endpoint", "token"]))
            .merge(Serialized::defaults(CliOverrides::from(cli))))
    }

    fn config_file(path: &Path) -> Result<Figment, figment::Error> {
        if !path.is_file() {
            return Err(format!("config file not found: {}", path.display()).into());
        }
        Ok(match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Figment::from(Toml::file(path)),
            Some("json") => Figment::from(Json::file(path)),
            _ => Figment::from(Yaml::file(path)),
        })
    }
}
