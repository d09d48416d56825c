use crate::event::LogEvent;
use crate::layout::StructuredLogRecordBuilder;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use tokio::io::AsyncWriteExt;

/// Writes one structured record per line to stdout.
///
/// This is the format the Cloud Logging agents on GKE, Cloud Run and App
/// Engine parse into structured entries, so no API access is needed.
#[derive(Clone, Default)]
pub struct StdoutSink {
    builder: StructuredLogRecordBuilder,
}

impl StdoutSink {
    pub fn new(builder: StructuredLogRecordBuilder) -> Self {
        Self { builder }
    }

    /// Render an event as a compact JSON line, newline included.
    pub fn format_line(&self, event: &LogEvent) -> Result<String, serde_json::Error> {
        let record = self.builder.build(event);
        Ok(serde_json::to_string(&record)? + "\n")
    }
}

#[async_trait]
impl LogSink for StdoutSink {
    async fn send(&self, event: &LogEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        let line = self.format_line(event)?;
        let mut out = tokio::io::stdout();
        out.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn send_batch(&self, events: &[LogEvent]) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut buf = String::new();
        for event in events {
            buf.push_str(&self.format_line(event)?);
        }
        let mut out = tokio::io::stdout();
        out.write_all(buf.as_bytes()).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        tokio::io::stdout().flush().await?;
        Ok(())
    }
}
