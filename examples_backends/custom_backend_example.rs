use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use tracing_cloud_logging::{
    event::LogEvent,
    init::init_tracing,
    layout::StructuredLogRecordBuilder,
    sink::LogSink,
};

/// Example of integrating a completely custom backend by implementing
/// the `LogSink` trait directly. The records are rendered with the same
/// builder the bundled sinks use.
struct MyCustomDbSink {
    builder: StructuredLogRecordBuilder,
}

#[async_trait]
impl LogSink for MyCustomDbSink {
    async fn send(&self, event: &LogEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Here you would call your own client library for the target DB.
        let record = self.builder.build(event);
        println!("[my-custom-db] {}", serde_json::to_string(&record)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let sink: Arc<dyn LogSink> = Arc::new(MyCustomDbSink {
        builder: StructuredLogRecordBuilder::new("custom-db-demo", "0.1.0", true, true),
    });

    init_tracing(sink).expect("install subscriber");

    info!("custom backend example started");
    error!(db = "my-custom-db", "simulated error sent via custom backend");

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
}
