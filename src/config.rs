//! Adapter configuration.
//!
//! A `StorageConfig` is built once (deserialized or assembled in code),
//! validated at client construction and never mutated afterwards. Defaults
//! mirror the conventional settings of the backing service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// One pattern -> header-set entry. Rules are applied in order; later
/// matches overwrite keys set by earlier ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderRule {
    /// Regular expression matched against the start of the object name.
    pub pattern: String,
    /// Headers attached to uploads whose name matches the pattern.
    pub headers: HashMap<String, String>,
}

/// Storage adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Account user name.
    #[serde(default)]
    pub username: String,
    /// Account API key.
    #[serde(default)]
    pub api_key: String,
    /// Identity/auth scheme understood by the identity provider.
    #[serde(default = "default_identity_type")]
    pub identity_type: String,
    /// Container holding uploaded files.
    #[serde(default)]
    pub container: String,
    /// Separate container for the static-asset pipeline.
    #[serde(default)]
    pub static_container: Option<String>,
    /// Per-call timeout (seconds) for individual remote calls.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Retry bound for transient transport failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Cache TTL (seconds) applied when a container is made public.
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// Serve the container through its SSL CDN endpoint.
    #[serde(default)]
    pub use_ssl: bool,
    /// Prefer the provider's internal service network.
    #[serde(default)]
    pub use_service_net: bool,
    /// Explicit public base URI, overriding the CDN endpoint until the
    /// container is replaced.
    #[serde(default)]
    pub container_uri: Option<String>,
    /// Ordered upload header rules.
    #[serde(default)]
    pub headers: Vec<HeaderRule>,
    /// Opaque extra arguments forwarded to the protocol implementation.
    #[serde(default)]
    pub connection_args: HashMap<String, serde_json::Value>,
}

fn default_identity_type() -> String {
    "keystone".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    5
}

fn default_ttl() -> u64 {
    86400 // 24h
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            api_key: String::new(),
            identity_type: default_identity_type(),
            container: String::new(),
            static_container: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            ttl_secs: default_ttl(),
            use_ssl: false,
            use_service_net: false,
            container_uri: None,
            headers: Vec::new(),
            connection_args: HashMap::new(),
        }
    }
}

impl StorageConfig {
    /// Credentials and the container name are mandatory.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.username.is_empty() {
            return Err(StorageError::Configuration("username is required".into()));
        }
        if self.api_key.is_empty() {
            return Err(StorageError::Configuration("api_key is required".into()));
        }
        if self.container.is_empty() {
            return Err(StorageError::Configuration("container is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gets_the_defaults() {
        let config: StorageConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.identity_type, "keystone");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.ttl_secs, 86400);
        assert!(!config.use_ssl);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn validate_requires_credentials_and_container() {
        let mut config = StorageConfig::default();
        assert!(matches!(
            config.validate(),
            Err(StorageError::Configuration(_))
        ));

        config.username = "demo".into();
        config.api_key = "secret".into();
        assert!(matches!(
            config.validate(),
            Err(StorageError::Configuration(msg)) if msg.contains("container")
        ));

        config.container = "media".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn header_rules_survive_a_round_trip() {
        let raw = r#"{
            "username": "demo",
            "api_key": "secret",
            "container": "media",
            "headers": [
                {"pattern": ".*\\.css", "headers": {"Cache-Control": "max-age=3600"}}
            ]
        }"#;
        let config: StorageConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.headers[0].pattern, ".*\\.css");
        assert_eq!(
            config.headers[0].headers.get("Cache-Control").unwrap(),
            "max-age=3600"
        );
    }
}
