use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// A tool consumer as declared in configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ConsumerConfig {
    pub secret: String,
    /// Display name shown in logs and admin tooling.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LtiConfig {
    /// Consumer key -> shared secret. Left optional so a missing entry is
    /// reported when the registry is built rather than as a parse failure.
    #[serde(default)]
    pub consumers: Option<BTreeMap<String, ConsumerConfig>>,
    /// Accepted clock skew for `oauth_timestamp`, in seconds.
    #[serde(default = "default_timestamp_threshold")]
    pub timestamp_threshold: i64,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Idle lifetime of a stored session, in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl: u64,
}

impl Default for LtiConfig {
    fn default() -> Self {
        Self {
            consumers: None,
            timestamp_threshold: default_timestamp_threshold(),
            session_cookie: default_session_cookie(),
            session_ttl: default_session_ttl(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default)]
    pub lti: LtiConfig,
}

fn default_timestamp_threshold() -> i64 {
    300
}

fn default_session_cookie() -> String {
    "lti_session".to_string()
}

fn default_session_ttl() -> u64 {
    60 * 60 * 8
}

impl AppConfig {
    /// Checks invariants `serde` cannot express.
    ///
    /// An absent `consumers` table is reported by
    /// [`crate::consumer::ConsumerRegistry::from_config`], not here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lti.timestamp_threshold <= 0 {
            return Err(ConfigError::Validation(
                "lti.timestamp_threshold must be > 0".into(),
            ));
        }
        if self.lti.session_cookie.is_empty() {
            return Err(ConfigError::Validation(
                "lti.session_cookie must not be empty".into(),
            ));
        }
        if let Some(consumers) = &self.lti.consumers {
            for (key, consumer) in consumers {
                if key.is_empty() {
                    return Err(ConfigError::Validation(
                        "lti.consumers contains an empty key".into(),
                    ));
                }
                if consumer.secret.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "lti.consumers.{key}.secret must not be empty"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Any environment variable matching the key path separated by double
/// underscores (e.g. `LTI__TIMESTAMP_THRESHOLD`) overrides the file value.
///
/// Returns a `ConfigError` instead of panicking so the caller can decide how to fail.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from("config.yaml")
}

/// Same as [`load_config`] but reading the named file instead of `config.yaml`.
pub fn load_config_from(path: &str) -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}
