//! Environment variable names used by this crate for convenient
//! configuration from services.
//!
//! These are helpers only; the layout, layer and sink types never read the
//! environment themselves.

use crate::event::{LogLevel, ParseLevelError};
use crate::layout::{LayoutConfig, ParseSchemaError, SchemaVariant};

/// Service name reported in `serviceContext`.
pub const CLOUD_LOG_SERVICE_NAME_ENV: &str = "CLOUD_LOG_SERVICE_NAME";

/// Service version reported in `serviceContext`.
pub const CLOUD_LOG_SERVICE_VERSION_ENV: &str = "CLOUD_LOG_SERVICE_VERSION";

/// `true`/`false`: emit trace and span id fields.
pub const CLOUD_LOG_TRACE_FIELDS_ENV: &str = "CLOUD_LOG_TRACE_FIELDS";

/// `true`/`false`: emit the `httpRequest` field.
pub const CLOUD_LOG_HTTP_FIELDS_ENV: &str = "CLOUD_LOG_HTTP_FIELDS";

/// `structured` or `legacy`.
pub const CLOUD_LOG_SCHEMA_ENV: &str = "CLOUD_LOG_SCHEMA";

/// Target log name.
pub const CLOUD_LOG_NAME_ENV: &str = "CLOUD_LOG_NAME";

/// Monitored resource type.
pub const CLOUD_LOG_RESOURCE_TYPE_ENV: &str = "CLOUD_LOG_RESOURCE_TYPE";

/// Level at or above which batches are flushed immediately.
pub const CLOUD_LOG_FLUSH_LEVEL_ENV: &str = "CLOUD_LOG_FLUSH_LEVEL";

/// Comma-separated enhancer names, resolved against an
/// [`EnhancerRegistry`](crate::enhancer::EnhancerRegistry).
pub const CLOUD_LOG_ENHANCERS_ENV: &str = "CLOUD_LOG_ENHANCERS";

/// Optional bearer token for the Cloud Logging API.
pub const CLOUD_LOG_ACCESS_TOKEN_ENV: &str = "CLOUD_LOG_ACCESS_TOKEN";

/// Sink DSN, see [`parse_dsn`](crate::backend::parse_dsn).
pub const CLOUD_LOG_SINK_DSN_ENV: &str = "CLOUD_LOG_SINK_DSN";

/// Error returned when a configuration value cannot be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: expected true or false, got {value:?}")]
    InvalidBool { key: String, value: String },

    #[error("{key}: {source}")]
    InvalidLevel {
        key: String,
        #[source]
        source: ParseLevelError,
    },

    #[error("{key}: {source}")]
    InvalidSchema {
        key: String,
        #[source]
        source: ParseSchemaError,
    },
}

/// Settings of the remote appender that are not part of the record layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppenderConfig {
    pub log_name: String,
    pub resource_type: String,
    pub flush_level: LogLevel,
    pub enhancers: Vec<String>,
    pub access_token: Option<String>,
}

impl Default for AppenderConfig {
    fn default() -> Self {
        Self {
            log_name: "rust.log".to_string(),
            resource_type: "global".to_string(),
            flush_level: LogLevel::Error,
            enhancers: Vec::new(),
            access_token: None,
        }
    }
}

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn lookup_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// [`LayoutConfig`] from the process environment.
pub fn layout_config_from_env() -> Result<LayoutConfig, ConfigError> {
    layout_config_from_lookup(lookup_env)
}

/// [`AppenderConfig`] from the process environment.
pub fn appender_config_from_env() -> Result<AppenderConfig, ConfigError> {
    appender_config_from_lookup(lookup_env)
}

/// [`LayoutConfig`] from an arbitrary key lookup; unset keys keep defaults.
pub fn layout_config_from_lookup<F>(lookup: F) -> Result<LayoutConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = LayoutConfig::default();
    if let Some(name) = lookup(CLOUD_LOG_SERVICE_NAME_ENV) {
        config.service_name = name;
    }
    if let Some(version) = lookup(CLOUD_LOG_SERVICE_VERSION_ENV) {
        config.service_version = version;
    }
    if let Some(raw) = lookup(CLOUD_LOG_TRACE_FIELDS_ENV) {
        config.add_trace_fields = parse_bool(CLOUD_LOG_TRACE_FIELDS_ENV, &raw)?;
    }
    if let Some(raw) = lookup(CLOUD_LOG_HTTP_FIELDS_ENV) {
        config.add_http_request_fields = parse_bool(CLOUD_LOG_HTTP_FIELDS_ENV, &raw)?;
    }
    if let Some(raw) = lookup(CLOUD_LOG_SCHEMA_ENV) {
        config.schema = raw
            .parse::<SchemaVariant>()
            .map_err(|source| ConfigError::InvalidSchema {
                key: CLOUD_LOG_SCHEMA_ENV.to_string(),
                source,
            })?;
    }
    Ok(config)
}

/// [`AppenderConfig`] from an arbitrary key lookup; unset keys keep defaults.
pub fn appender_config_from_lookup<F>(lookup: F) -> Result<AppenderConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = AppenderConfig::default();
    if let Some(name) = lookup(CLOUD_LOG_NAME_ENV) {
        config.log_name = name;
    }
    if let Some(kind) = lookup(CLOUD_LOG_RESOURCE_TYPE_ENV) {
        config.resource_type = kind;
    }
    if let Some(raw) = lookup(CLOUD_LOG_FLUSH_LEVEL_ENV) {
        config.flush_level = raw
            .parse::<LogLevel>()
            .map_err(|source| ConfigError::InvalidLevel {
                key: CLOUD_LOG_FLUSH_LEVEL_ENV.to_string(),
                source,
            })?;
    }
    if let Some(raw) = lookup(CLOUD_LOG_ENHANCERS_ENV) {
        config.enhancers = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    config.access_token = lookup(CLOUD_LOG_ACCESS_TOKEN_ENV).filter(|t| !t.is_empty());
    Ok(config)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let layout = layout_config_from_lookup(lookup(&[])).unwrap();
        assert_eq!(layout, LayoutConfig::default());
        let appender = appender_config_from_lookup(lookup(&[])).unwrap();
        assert_eq!(appender, AppenderConfig::default());
    }

    #[test]
    fn reads_every_setting() {
        let layout = layout_config_from_lookup(lookup(&[
            (CLOUD_LOG_SERVICE_NAME_ENV, "orders"),
            (CLOUD_LOG_SERVICE_VERSION_ENV, "2.1.0"),
            (CLOUD_LOG_TRACE_FIELDS_ENV, "false"),
            (CLOUD_LOG_HTTP_FIELDS_ENV, "0"),
            (CLOUD_LOG_SCHEMA_ENV, "legacy"),
        ]))
        .unwrap();
        assert_eq!(layout.service_name, "orders");
        assert_eq!(layout.service_version, "2.1.0");
        assert!(!layout.add_trace_fields);
        assert!(!layout.add_http_request_fields);
        assert_eq!(layout.schema, SchemaVariant::Legacy);

        let appender = appender_config_from_lookup(lookup(&[
            (CLOUD_LOG_NAME_ENV, "orders.log"),
            (CLOUD_LOG_RESOURCE_TYPE_ENV, "k8s_container"),
            (CLOUD_LOG_FLUSH_LEVEL_ENV, "warn"),
            (CLOUD_LOG_ENHANCERS_ENV, "process, zone,,"),
            (CLOUD_LOG_ACCESS_TOKEN_ENV, "ya29.token"),
        ]))
        .unwrap();
        assert_eq!(appender.log_name, "orders.log");
        assert_eq!(appender.resource_type, "k8s_container");
        assert_eq!(appender.flush_level, LogLevel::Warn);
        assert_eq!(appender.enhancers, vec!["process", "zone"]);
        assert_eq!(appender.access_token.as_deref(), Some("ya29.token"));
    }

    #[test]
    fn rejects_invalid_values() {
        let err = layout_config_from_lookup(lookup(&[(CLOUD_LOG_TRACE_FIELDS_ENV, "maybe")]));
        assert!(matches!(err, Err(ConfigError::InvalidBool { .. })));

        let err = layout_config_from_lookup(lookup(&[(CLOUD_LOG_SCHEMA_ENV, "xml")]));
        assert!(matches!(err, Err(ConfigError::InvalidSchema { .. })));

        let err = appender_config_from_lookup(lookup(&[(CLOUD_LOG_FLUSH_LEVEL_ENV, "loud")]));
        assert!(matches!(err, Err(ConfigError::InvalidLevel { .. })));
    }
}
