use std::sync::Arc;

use crate::enhancer::{EnhancerRegistry, UnknownEnhancer};
use crate::env::AppenderConfig;
use crate::layout::{LayoutConfig, StructuredLogRecordBuilder};
use crate::noop_sink::NoopSink;
use crate::sink::LogSink;
use crate::stdout::StdoutSink;

/// Supported backend kinds that can be selected via DSN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Stdout,
    CloudLogging,
    Noop,
}

/// Backend selection parsed from a DSN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Selected backend implementation.
    pub kind: BackendKind,
    /// Raw DSN that was used to construct this config.
    pub dsn: String,
    /// Project id, for `cloudlogging://` DSNs.
    pub project_id: Option<String>,
    /// Log name given in the DSN path, if any.
    pub log_name: Option<String>,
}

impl BackendConfig {
    pub fn new(kind: BackendKind, dsn: impl Into<String>) -> Self {
        BackendConfig {
            kind,
            dsn: dsn.into(),
            project_id: None,
            log_name: None,
        }
    }
}

/// Parse a DSN string and infer the backend kind from its scheme.
///
/// Examples:
/// - "stdout://"
/// - "noop://"
/// - "cloudlogging://my-project"
/// - "cloudlogging://my-project/orders.log"
pub fn parse_dsn(dsn: &str) -> Result<BackendConfig, DsnError> {
    let trimmed = dsn.trim();
    let lower = trimmed.to_ascii_lowercase();

    if lower.starts_with("stdout://") {
        Ok(BackendConfig::new(BackendKind::Stdout, trimmed))
    } else if lower.starts_with("noop://") {
        Ok(BackendConfig::new(BackendKind::Noop, trimmed))
    } else if lower.starts_with("cloudlogging://") {
        let rest = &trimmed["cloudlogging://".len()..];
        let (project, log) = match rest.split_once('/') {
            Some((project, log)) => (project, log.trim_end_matches('/')),
            None => (rest, ""),
        };
        if project.is_empty() {
            return Err(DsnError::MissingProject);
        }
        let mut cfg = BackendConfig::new(BackendKind::CloudLogging, trimmed);
        cfg.project_id = Some(project.to_string());
        cfg.log_name = (!log.is_empty()).then(|| log.to_string());
        Ok(cfg)
    } else {
        Err(DsnError::UnknownScheme)
    }
}

/// Error type returned when parsing a DSN.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DsnError {
    #[error("unknown or unsupported DSN scheme")]
    UnknownScheme,

    #[error("cloudlogging DSN must name a project, e.g. cloudlogging://my-project")]
    MissingProject,
}

/// Error type returned when building a sink from configuration.
#[derive(thiserror::Error, Debug)]
pub enum BackendBuildError {
    #[error("cloud-logging feature is not enabled")]
    CloudLoggingFeatureDisabled,

    #[error("backend {0:?} requires a project id")]
    MissingProject(BackendKind),

    #[error(transparent)]
    UnknownEnhancer(#[from] UnknownEnhancer),
}

/// Create a concrete `LogSink` from a parsed DSN and the layout and
/// appender settings.
///
/// Enhancers named in `appender` are resolved against `registry`; an
/// unknown name fails the whole construction.
pub fn make_sink_from_config(
    cfg: &BackendConfig,
    layout: &LayoutConfig,
    appender: &AppenderConfig,
    registry: &EnhancerRegistry,
) -> Result<Arc<dyn LogSink>, BackendBuildError> {
    let builder = StructuredLogRecordBuilder::from_config(layout.clone());
    match cfg.kind {
        BackendKind::Stdout => Ok(Arc::new(StdoutSink::new(builder)) as Arc<dyn LogSink>),
        BackendKind::Noop => Ok(Arc::new(NoopSink) as Arc<dyn LogSink>),
        BackendKind::CloudLogging => {
            #[cfg(feature = "cloud-logging")]
            {
                use crate::cloud_logging::{CloudLoggingConfig, CloudLoggingSink};
                use crate::entry::MonitoredResource;

                let project_id = cfg
                    .project_id
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or(BackendBuildError::MissingProject(BackendKind::CloudLogging))?;

                let mut config = CloudLoggingConfig::new(project_id);
                config.log_name = cfg
                    .log_name
                    .clone()
                    .unwrap_or_else(|| appender.log_name.clone());
                config.resource = MonitoredResource::for_project(&appender.resource_type, project_id);
                config.access_token = appender.access_token.clone();

                let enhancers = registry.resolve(&appender.enhancers)?;
                let sink = CloudLoggingSink::new(config, builder).with_enhancers(enhancers);
                Ok(Arc::new(sink) as Arc<dyn LogSink>)
            }

            #[cfg(not(feature = "cloud-logging"))]
            {
                let _ = (appender, registry, builder);
                Err(BackendBuildError::CloudLoggingFeatureDisabled)
            }
        }
    }
}
