use crate::event::LogEvent;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;

/// A sink that simply drops all events.
///
/// Useful for measuring the overhead of the layer itself without any
/// external I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _event: &LogEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }

    async fn send_batch(&self, _events: &[LogEvent]) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
