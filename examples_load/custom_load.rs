use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{error, info_span};

use tracing_cloud_logging::event::LogLevel;
use tracing_cloud_logging::init::{init_tracing_with_config, LayerConfig};
use tracing_cloud_logging::noop_sink::NoopSink;

#[tokio::main]
async fn main() {
    let sink = Arc::new(NoopSink::default());

    let layer_config = LayerConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        enable_stdout: false,
        min_level: LogLevel::Warn,
        // Never flush early, only by size or interval.
        flush_level: LogLevel::Off,
    };

    init_tracing_with_config(sink, layer_config).expect("install subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    let span = info_span!("load_loop", trace_id = "4bf92f3577b34da6", span_id = "00f067aa0ba902b7");
    let _entered = span.enter();
    for i in 0..n {
        error!(iteration = i, http.requestMethod = "GET", "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    sleep(Duration::from_secs(2)).await;
}
