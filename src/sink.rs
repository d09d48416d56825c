use crate::event::LogEvent;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for [`LogEvent`]s captured by the logging layer.
///
/// Implementations decide how an event is rendered (usually through a
/// [`StructuredLogRecordBuilder`](crate::layout::StructuredLogRecordBuilder))
/// and where it goes: stdout, the Cloud Logging API, a test buffer. The
/// layer calls into the sink from a background task and never awaits it on
/// the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Send a single event to the underlying backend.
    ///
    /// **Returns**
    /// - `Ok(())` if the event was accepted by the backend.
    /// - `Err(..)` if the backend failed (network error, serialization
    ///   error, HTTP status, etc). The layer treats this as a transient
    ///   failure and retries the whole batch with backoff.
    async fn send(&self, event: &LogEvent) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Send a batch of events.
    ///
    /// The default implementation sends events one by one and stops at the
    /// first failure. Backends with a bulk API should override it.
    async fn send_batch(&self, events: &[LogEvent]) -> Result<(), Box<dyn Error + Send + Sync>> {
        for event in events {
            self.send(event).await?;
        }
        Ok(())
    }

    /// Flush any buffered events, if the backend implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
