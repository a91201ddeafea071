//! Registry of trusted tool consumers.

use std::collections::BTreeMap;

use crate::config::{AppConfig, ConfigError, ConsumerConfig};
use crate::error::SignatureError;

/// A tool consumer (LMS) allowed to launch this provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Consumer {
    pub key: String,
    pub secret: String,
    pub name: Option<String>,
}

/// Immutable consumer key -> [`Consumer`] lookup, built once at startup.
#[derive(Clone, Debug, Default)]
pub struct ConsumerRegistry {
    consumers: BTreeMap<String, Consumer>,
}

impl ConsumerRegistry {
    /// Builds the registry from the `lti.consumers` configuration entry.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let consumers = config.lti.consumers.as_ref().ok_or_else(|| {
            ConfigError::Validation("lti.consumers is not configured".into())
        })?;
        Ok(Self::from_entries(consumers))
    }

    pub fn from_entries(entries: &BTreeMap<String, ConsumerConfig>) -> Self {
        let consumers = entries
            .iter()
            .map(|(key, cfg)| {
                (
                    key.clone(),
                    Consumer {
                        key: key.clone(),
                        secret: cfg.secret.clone(),
                        name: cfg.name.clone(),
                    },
                )
            })
            .collect();
        Self { consumers }
    }

    pub fn get(&self, key: &str) -> Result<&Consumer, SignatureError> {
        self.consumers
            .get(key)
            .ok_or_else(|| SignatureError::UnknownConsumer(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.consumers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LtiConfig;

    fn config_with(consumers: Option<BTreeMap<String, ConsumerConfig>>) -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            lti: LtiConfig {
                consumers,
                ..LtiConfig::default()
            },
        }
    }

    #[test]
    fn missing_consumers_is_a_config_error() {
        let err = ConsumerRegistry::from_config(&config_with(None)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn lookup_by_key() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "1234567890".to_string(),
            ConsumerConfig {
                secret: "secret".into(),
                name: Some("Canvas".into()),
            },
        );
        let registry = ConsumerRegistry::from_config(&config_with(Some(entries))).unwrap();

        let consumer = registry.get("1234567890").unwrap();
        assert_eq!(consumer.secret, "secret");
        assert_eq!(consumer.name.as_deref(), Some("Canvas"));
        assert_eq!(
            registry.get("nope").unwrap_err(),
            SignatureError::UnknownConsumer("nope".into())
        );
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["1234567890"]);
    }
}
