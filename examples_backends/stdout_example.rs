use tracing::{error, info, info_span, warn};
use tracing_cloud_logging::enhancer::EnhancerRegistry;
use tracing_cloud_logging::init::init_from_env;

/// Structured JSON on stdout, configured entirely from the environment.
///
/// Try:
/// `CLOUD_LOG_SERVICE_NAME=checkout CLOUD_LOG_SCHEMA=legacy cargo run --example stdout_example`
#[tokio::main]
async fn main() {
    init_from_env(&EnhancerRegistry::with_builtins()).expect("configure logging");

    info!(region = "eu", "checkout service started");

    let span = info_span!("place_order", trace_id = "4bf92f3577b34da6", span_id = "00f067aa0ba902b7");
    {
        let _entered = span.enter();
        warn!(
            order_id = 991,
            http.requestMethod = "POST",
            http.requestUrl = "https://shop.example.com/orders",
            http.status = "502",
            "payment provider slow"
        );
        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timed out");
        error!(error = &err as &(dyn std::error::Error + 'static), "order failed");
    }

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
}
