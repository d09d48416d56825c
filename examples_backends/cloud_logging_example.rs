use std::sync::Arc;

use tracing::{error, info};
use tracing_cloud_logging::{
    backend::{make_sink_from_config, parse_dsn},
    enhancer::EnhancerRegistry,
    env::{appender_config_from_env, layout_config_from_env},
    init::init_tracing,
    sink::LogSink,
};

#[tokio::main]
async fn main() {
    // Example DSN: cloudlogging://my-project/orders.log
    // The API token is read from CLOUD_LOG_ACCESS_TOKEN, e.g.
    // `CLOUD_LOG_ACCESS_TOKEN=$(gcloud auth print-access-token)`.
    let dsn = std::env::var("CLOUD_LOG_SINK_DSN")
        .unwrap_or_else(|_| "cloudlogging://my-project/rust.log".to_string());

    let layout = layout_config_from_env().expect("invalid layout config");
    let appender = appender_config_from_env().expect("invalid appender config");
    let backend_cfg = parse_dsn(&dsn).expect("invalid CLOUD_LOG_SINK_DSN");
    let sink: Arc<dyn LogSink> = make_sink_from_config(
        &backend_cfg,
        &layout,
        &appender,
        &EnhancerRegistry::with_builtins(),
    )
    .expect("failed to build cloud logging sink");

    init_tracing(sink).expect("install subscriber");

    info!("cloud logging example started");
    error!(component = "billing", "simulated error sent via Cloud Logging");

    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
}
