//! Configuration loader with layered sources.

use crate::{AppConfig, ConfigError, ConfigValidator};
use config::{Config, Environment, File, Map};
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable selecting `config/{environment}.toml`.
pub const ENVIRONMENT_VAR: &str = "TASKER_ENVIRONMENT";

/// Prefix of structured environment overrides, e.g.
/// `TASKER__JOBS__WORKER__POLL_INTERVAL_MS`.
pub const ENV_PREFIX: &str = "TASKER";

/// Plain Redis URL override, honored for compatibility with existing
/// deployments.
pub const REDIS_URL_VAR: &str = "REDIS_URL";

/// Configuration loader with layered sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: AppConfig,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `.env` in the working directory, exported to the process
    /// 2. `config/default.toml` - Default values
    /// 3. `config/{environment}.toml` - Environment-specific overrides
    /// 4. `config/local.toml` - Local overrides
    /// 5. Environment variables with `TASKER__` prefix
    /// 6. `REDIS_URL`
    pub fn new(config_dir: impl Into<String>) -> Result<Self, ConfigError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());
        let config = Self::load_config(&config_dir.into(), &environment)?;

        Ok(Self { config })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, ConfigError> {
        Self::new("./config")
    }

    /// Returns the loaded configuration.
    pub fn get(&self) -> &AppConfig {
        &self.config
    }

    /// Consumes the loader, returning the configuration.
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// Loads and validates configuration from `config_dir` for `environment`.
    pub fn load_config(config_dir: &str, environment: &str) -> Result<AppConfig, ConfigError> {
        Self::load_with_vars(config_dir, environment, None)
    }

    /// Like [`ConfigLoader::load_config`], reading overrides from `vars`
    /// instead of the process environment when given.
    fn load_with_vars(
        config_dir: &str,
        environment: &str,
        vars: Option<Map<String, String>>,
    ) -> Result<AppConfig, ConfigError> {
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder().set_default("app.environment", environment)?;

        for name in ["default", environment, "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        let redis_url = match &vars {
            Some(vars) => vars.get(REDIS_URL_VAR).cloned(),
            None => std::env::var(REDIS_URL_VAR).ok(),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(vars),
        );

        if let Some(url) = redis_url {
            debug!("Using {} for the Redis connection", REDIS_URL_VAR);
            builder = builder.set_override("jobs.redis.url", url)?;
        }

        let app_config: AppConfig = builder.build()?.try_deserialize()?;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Validates the configuration, logging warnings.
    fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
        let result = ConfigValidator::validate(config);

        for warning in result.warnings() {
            warn!("{}", warning);
        }

        if result.is_valid() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(result.errors().to_vec()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        dir
    }

    fn load(dir: &TempDir, environment: &str) -> Result<AppConfig, ConfigError> {
        ConfigLoader::load_config(dir.path().to_str().unwrap(), environment)
    }

    #[test]
    fn test_missing_files_use_defaults() {
        let dir = config_dir(&[]);
        let config = load(&dir, "development").unwrap();

        assert_eq!(config.app.environment, "development");
        assert_eq!(config.jobs.retry.max_attempts, 3);
    }

    #[test]
    fn test_layers_override_in_order() {
        let dir = config_dir(&[
            (
                "default.toml",
                "[jobs.worker]\nqueue_name = \"from_default\"\npoll_interval_ms = 250\n",
            ),
            ("staging.toml", "[jobs.worker]\nqueue_name = \"from_staging\"\n"),
            ("local.toml", "[jobs.executor]\nsimulated_work_ms = 5\n"),
        ]);

        let config = load(&dir, "staging").unwrap();
        assert_eq!(config.app.environment, "staging");
        assert_eq!(config.jobs.worker.queue_name, "from_staging");
        assert_eq!(config.jobs.worker.poll_interval_ms, 250);
        assert_eq!(config.jobs.executor.simulated_work_ms, 5);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = config_dir(&[("default.toml", "[jobs.retry]\nmax_attempts = 0\n")]);

        let err = load(&dir, "development").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_malformed_file_is_load_error() {
        let dir = config_dir(&[("default.toml", "[jobs.worker\nqueue_name = ")]);
        assert!(matches!(load(&dir, "development"), Err(ConfigError::Load(_))));
    }

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_override() {
        let dir = config_dir(&[("default.toml", "[jobs.worker]\npoll_interval_ms = 250\n")]);
        let config = ConfigLoader::load_with_vars(
            dir.path().to_str().unwrap(),
            "development",
            Some(vars(&[
                ("TASKER__JOBS__EXECUTOR__FAIL_ON_KEY", "explode"),
                ("TASKER__JOBS__WORKER__POLL_INTERVAL_MS", "20"),
            ])),
        )
        .unwrap();

        assert_eq!(config.jobs.executor.fail_on_key.as_deref(), Some("explode"));
        assert_eq!(config.jobs.worker.poll_interval_ms, 20);
    }

    #[test]
    fn test_redis_url_override() {
        let dir = config_dir(&[("default.toml", "[jobs.redis]\nurl = \"redis://from-file:6379\"\n")]);
        let config = ConfigLoader::load_with_vars(
            dir.path().to_str().unwrap(),
            "development",
            Some(vars(&[("REDIS_URL", "redis://from-env:6380/2")])),
        )
        .unwrap();

        assert_eq!(config.jobs.redis.url, "redis://from-env:6380/2");
    }

    #[test]
    fn test_new_exposes_loaded_config() {
        let dir = config_dir(&[("default.toml", "[jobs.worker]\nqueue_name = \"reports\"\n")]);
        let loader = ConfigLoader::new(dir.path().to_str().unwrap()).unwrap();

        assert_eq!(loader.get().jobs.worker.queue_name, "reports");
        assert_eq!(loader.into_config().jobs.worker.queue_name, "reports");
    }
}
