//! Layered configuration
//!
//! Sources, later ones win:
//! 1. built-in defaults
//! 2. a TOML file: `--config`, else `FLOWTALK_CONFIG_PATH`, else `./flowtalk.toml` if present
//! 3. `FLOWTALK_*` environment variables (a `.env` file is read first)

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::executor::{
    EngineOptions, IntentClassifier, KeywordClassifier, NoopClassifier, DEFAULT_FALLBACK_STATES,
    DEFAULT_MAX_TRANSITIONS,
};

const ENV_PREFIX: &str = "FLOWTALK";
const CONFIG_PATH_VAR: &str = "FLOWTALK_CONFIG_PATH";

/// Which intent classifier the engine gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    None,
    /// Offline keyword matching on state names
    Keyword,
}

impl ClassifierKind {
    pub fn build(self) -> Box<dyn IntentClassifier> {
        match self {
            ClassifierKind::None => Box::new(NoopClassifier),
            ClassifierKind::Keyword => Box::new(KeywordClassifier),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Flow to run
    pub flow: String,
    pub max_transitions: usize,
    pub fallback_states: Vec<String>,
    pub classifier: ClassifierKind,
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Store file to seed the context from
    pub context_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flow: "main".to_string(),
            max_transitions: DEFAULT_MAX_TRANSITIONS,
            fallback_states: DEFAULT_FALLBACK_STATES.iter().map(|s| s.to_string()).collect(),
            classifier: ClassifierKind::None,
            log_filter: "warn".to_string(),
            context_file: None,
        }
    }
}

impl Config {
    /// Load from the default file location and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Load with an explicit config file, which must exist.
    pub fn load_with(path: Option<&Path>) -> Result<Self> {
        // A missing .env is fine
        let _ = dotenvy::dotenv();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));

        Self::from_sources(path.as_deref(), Environment::with_prefix(ENV_PREFIX))
    }

    fn from_sources(path: Option<&Path>, env: Environment) -> Result<Self> {
        let defaults = Config::default();

        let mut builder = config::Config::builder()
            .set_default("flow", defaults.flow)?
            .set_default("max_transitions", defaults.max_transitions as u64)?
            .set_default("fallback_states", defaults.fallback_states)?
            .set_default("classifier", "none")?
            .set_default("log_filter", defaults.log_filter)?;

        builder = match path {
            Some(path) => builder.add_source(File::from(path).format(FileFormat::Toml).required(true)),
            None => builder.add_source(File::with_name("flowtalk").required(false)),
        };

        let config: Config = builder
            .add_source(
                env.try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("fallback_states"),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.flow.trim().is_empty() {
            bail!("flow name must not be empty");
        }
        if self.max_transitions == 0 {
            bail!("max_transitions must be at least 1");
        }
        Ok(())
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        EngineOptions {
            flow: config.flow.clone(),
            max_transitions: config.max_transitions,
            fallback_states: config.fallback_states.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.toml");
        fs::write(&path, "").unwrap();

        let config = Config::from_sources(Some(path.as_path()), env(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.fallback_states, vec!["fallback", "unknown", "end"]);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flowtalk.toml");
        fs::write(
            &path,
            r#"
flow = "support"
max_transitions = 50
classifier = "keyword"
fallback_states = ["oops"]
context_file = "data/ctx.json"
"#,
        )
        .unwrap();

        let config = Config::from_sources(Some(path.as_path()), env(&[])).unwrap();
        assert_eq!(config.flow, "support");
        assert_eq!(config.max_transitions, 50);
        assert_eq!(config.classifier, ClassifierKind::Keyword);
        assert_eq!(config.fallback_states, vec!["oops"]);
        assert_eq!(config.context_file, Some(PathBuf::from("data/ctx.json")));
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flowtalk.toml");
        fs::write(&path, "flow = \"support\"\nmax_transitions = 50\n").unwrap();

        let config = Config::from_sources(
            Some(path.as_path()),
            env(&[
                ("FLOWTALK_MAX_TRANSITIONS", "7"),
                ("FLOWTALK_FALLBACK_STATES", "a,b"),
            ]),
        )
        .unwrap();
        assert_eq!(config.flow, "support");
        assert_eq!(config.max_transitions, 7);
        assert_eq!(config.fallback_states, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(Config::from_sources(Some(path.as_path()), env(&[])).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_ceiling() {
        let config = Config {
            max_transitions: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            flow: " ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_options_from_config() {
        let config = Config {
            flow: "support".to_string(),
            max_transitions: 9,
            ..Config::default()
        };
        let options = EngineOptions::from(&config);
        assert_eq!(options.flow, "support");
        assert_eq!(options.max_transitions, 9);
        assert_eq!(options.fallback_states, config.fallback_states);
    }
}
