use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{error, info_span};

use tracing_cloud_logging::init::init_tracing;
use tracing_cloud_logging::noop_sink::NoopSink;

/// Failures on a single request: each event inherits the request span's
/// trace ids and carries its own `httpRequest` fields.
fn handle_request(i: u64) {
    let span = info_span!(
        "handle_request",
        trace_id = "4bf92f3577b34da6",
        span_id = tracing::field::Empty
    );
    let _entered = span.enter();
    span.record("span_id", format!("{:016x}", i).as_str());

    let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timed out");
    error!(
        iteration = i,
        http.requestMethod = "POST",
        http.requestUrl = "https://shop.example.com/cart",
        http.status = "504",
        error = &err as &(dyn std::error::Error + 'static),
        "default load test error"
    );
}

#[tokio::main]
async fn main() {
    let sink = Arc::new(NoopSink::default());
    init_tracing(sink).expect("install subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        handle_request(i);
    }

    let elapsed = start.elapsed();
    println!("default config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give background task a little time to drain the channel
    sleep(Duration::from_secs(2)).await;
}
