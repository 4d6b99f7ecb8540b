//! Service settings.
//!
//! Settings are merged from several layers, later ones overriding earlier ones:
//!
//! 1. the built-in `config/default.toml`,
//! 2. `<config_dir>/default.toml`, `<config_dir>/<run_mode>.toml` and
//!    `<config_dir>/local.toml`, each optional,
//! 3. `-s key=value` command line overrides,
//! 4. `PAGUE_` environment variables, `__` separating nested keys
//!    (`PAGUE_SERVICE__PORT=3000`),
//! 5. `PORT`, which sets `service.port`.
//!
//! The run mode comes from `RUN_MODE`, else from the command line.

use crate::store::StoreConfig;
use crate::types::CollectionSpec;
use clap::{Parser, Subcommand};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_SETTINGS: &str = include_str!("../config/default.toml");

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid setting '{0}', expected key=value")]
    InvalidSetting(String),

    #[error("Config merge error: {msg} [{source}]")]
    ConfigMerge {
        msg: String,
        source: config::ConfigError,
    },

    #[error("No collection configured")]
    NoCollection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Host on which the API listens. Example: '127.0.0.1', '0.0.0.0'
    pub host: String,
    /// Port on which the API listens.
    pub port: u16,
    /// Upper limit on the size of request bodies (in bytes).
    pub content_length_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    /// Path of the JSON document.
    pub path: PathBuf,
    pub create_if_missing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub mode: String,
    pub service: Service,
    pub database: Database,
    pub logging: Logging,
    pub collections: Vec<CollectionSpec>,
    /// Worker threads; defaults to the number of CPUs.
    #[serde(default)]
    pub nb_threads: Option<usize>,
}

#[derive(Debug, Parser)]
#[command(name = "pague-direto", about = "REST API for debt records", version)]
pub struct Opts {
    /// Defines the config directory
    #[arg(short = 'c', long = "config-dir")]
    pub config_dir: Option<PathBuf>,

    /// Defines the run mode in {testing, dev, prod, ...}
    #[arg(short = 'm', long = "run-mode", default_value = "dev")]
    pub run_mode: String,

    /// Defines settings values, as key=value
    #[arg(short = 's', long = "setting")]
    pub settings: Vec<String>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Serve the API
    Run,
    /// Print the merged settings
    Config,
}

impl Settings {
    pub fn new(opts: &Opts) -> Result<Self, SettingsError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| opts.run_mode.clone());

        let mut builder = Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml));

        if let Some(config_dir) = &opts.config_dir {
            for name in ["default", run_mode.as_str(), "local"] {
                let path = config_dir.join(name).with_extension("toml");
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder
            .set_override("mode", run_mode.clone())
            .map_err(|source| SettingsError::ConfigMerge {
                msg: String::from("Could not set run mode"),
                source,
            })?;

        for setting in &opts.settings {
            let (key, value) = setting
                .split_once('=')
                .ok_or_else(|| SettingsError::InvalidSetting(setting.clone()))?;
            builder = builder
                .set_override(key.trim(), value.trim())
                .map_err(|source| SettingsError::ConfigMerge {
                    msg: format!("Could not apply setting '{}'", setting),
                    source,
                })?;
        }

        builder = builder.add_source(
            Environment::with_prefix("PAGUE")
                .prefix_separator("_")
                .separator("__"),
        );

        if let Ok(port) = env::var("PORT") {
            builder = builder
                .set_override("service.port", port)
                .map_err(|source| SettingsError::ConfigMerge {
                    msg: String::from("Could not set port from PORT"),
                    source,
                })?;
        }

        let settings: Settings = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|source| SettingsError::ConfigMerge {
                msg: String::from("Cannot merge settings"),
                source,
            })?;

        if settings.collections.is_empty() {
            return Err(SettingsError::NoCollection);
        }

        Ok(settings)
    }
}

impl From<&Settings> for StoreConfig {
    fn from(settings: &Settings) -> Self {
        StoreConfig {
            path: settings.database.path.clone(),
            collections: settings.collections.clone(),
            create_if_missing: settings.database.create_if_missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IdStrategy;

    fn opts(config_dir: Option<PathBuf>, run_mode: &str, settings: Vec<&str>) -> Opts {
        Opts {
            config_dir,
            run_mode: run_mode.to_string(),
            settings: settings.into_iter().map(String::from).collect(),
            cmd: Command::Run,
        }
    }

    fn repo_config_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
    }

    #[test]
    fn should_return_builtin_defaults_without_config_dir() {
        let settings = Settings::new(&opts(None, "dev", vec![])).unwrap();
        assert_eq!(settings.database.path, PathBuf::from("pagueDB.json"));
        assert_eq!(settings.service.content_length_limit, 1_048_576);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
        assert_eq!(settings.collections, vec![CollectionSpec::debitos()]);
    }

    #[test]
    fn should_merge_run_mode_file() {
        let settings = Settings::new(&opts(Some(repo_config_dir()), "testing", vec![])).unwrap();
        assert_eq!(settings.mode, "testing");
        assert_eq!(settings.service.host, "127.0.0.1");

        let names: Vec<&str> = settings.collections.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["debitos", "negotiation", "cliente"]);
        assert_eq!(settings.collections[1].id_strategy, IdStrategy::NanoId);
        assert_eq!(settings.collections[1].id_field, "id");
    }

    #[test]
    fn should_override_with_command_line() {
        let settings = Settings::new(&opts(
            None,
            "dev",
            vec!["database.path=/tmp/other.json", "logging.format=json"],
        ))
        .unwrap();
        assert_eq!(settings.database.path, PathBuf::from("/tmp/other.json"));
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn should_reject_malformed_setting() {
        let result = Settings::new(&opts(None, "dev", vec!["service.port"]));
        assert!(matches!(result, Err(SettingsError::InvalidSetting(_))));
    }

    #[test]
    fn should_build_store_config() {
        let settings = Settings::new(&opts(None, "dev", vec![])).unwrap();
        let config = StoreConfig::from(&settings);
        assert_eq!(config.path, settings.database.path);
        assert!(config.create_if_missing);
        assert_eq!(config.collections.len(), 1);
    }
}
