use crate::backend::{make_sink_from_config, parse_dsn, BackendBuildError, DsnError};
use crate::enhancer::EnhancerRegistry;
use crate::env::{self, ConfigError};
use crate::event::LogLevel;
use crate::layer::CloudLogLayer;
use crate::sink::LogSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Layer configuration.
///
/// **Fields**
/// - `channel_buffer`: maximum number of queued [`LogEvent`](crate::event::LogEvent)s
///   before new ones are dropped.
/// - `batch_size`: number of events handed to the sink at once.
/// - `flush_interval`: longest time a partial batch waits before it is sent.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is
///   installed next to the sink layer for human-readable console output.
/// - `min_level`: events below this level are not captured.
/// - `flush_level`: events at or above this level are sent right away
///   together with whatever is already batched.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enable_stdout: bool,
    pub min_level: LogLevel,
    pub flush_level: LogLevel,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            enable_stdout: false,
            min_level: LogLevel::Info,
            flush_level: LogLevel::Error,
        }
    }
}

/// Error returned by [`init_from_env`].
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dsn(#[from] DsnError),

    #[error(transparent)]
    Backend(#[from] BackendBuildError),

    #[error(transparent)]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Install a global `tracing` subscriber that feeds `sink`.
///
/// **Parameters**
/// - `sink`: implementation of [`LogSink`] that receives the captured events.
/// - `config`: [`LayerConfig`] controlling filtering, buffering and batching.
///
/// **Returns**
/// - the handle of the background batching task;
/// - `Err(..)` if a global subscriber was already installed.
///
/// Must be called from within a Tokio runtime.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    config: LayerConfig,
) -> Result<JoinHandle<()>, SetGlobalDefaultError> {
    let (layer, handle) = CloudLogLayer::new(sink, &config);

    // The fmt layer changes the subscriber type, hence the two branches.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(handle)
}

/// Initialize tracing with [`LayerConfig::default`].
pub fn init_tracing(sink: Arc<dyn LogSink>) -> Result<JoinHandle<()>, SetGlobalDefaultError> {
    init_tracing_with_config(sink, LayerConfig::default())
}

/// Configure everything from the process environment.
///
/// Reads the layout and appender settings (see [`crate::env`]), builds the
/// sink selected by `CLOUD_LOG_SINK_DSN` (stdout when unset), resolves the
/// configured enhancers against `registry` and installs the subscriber.
pub fn init_from_env(registry: &EnhancerRegistry) -> Result<JoinHandle<()>, InitError> {
    let layout = env::layout_config_from_env()?;
    let appender = env::appender_config_from_env()?;
    let dsn = env::env_or(env::CLOUD_LOG_SINK_DSN_ENV, "stdout://");

    let backend = parse_dsn(&dsn)?;
    let sink = make_sink_from_config(&backend, &layout, &appender, registry)?;

    let config = LayerConfig {
        flush_level: appender.flush_level,
        ..LayerConfig::default()
    };
    Ok(init_tracing_with_config(sink, config)?)
}
