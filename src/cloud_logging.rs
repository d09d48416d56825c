use crate::enhancer::LoggingEnhancer;
use crate::entry::{LogEntry, MonitoredResource};
use crate::event::LogEvent;
use crate::layout::StructuredLogRecordBuilder;
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::error::Error;

/// Public endpoint of the Cloud Logging v2 API.
pub const DEFAULT_ENDPOINT: &str = "https://logging.googleapis.com/v2/entries:write";

/// Log name used when none is configured.
pub const DEFAULT_LOG_NAME: &str = "rust.log";

/// Configuration for [`CloudLoggingSink`].
#[derive(Clone, Debug)]
pub struct CloudLoggingConfig {
    pub project_id: String,
    /// Short log id, e.g. `rust.log`. Encoded into the full log name.
    pub log_name: String,
    pub resource: MonitoredResource,
    /// `entries:write` URL. Overridable for emulators and proxies.
    pub endpoint: String,
    /// OAuth2 bearer token sent with every request, if any.
    pub access_token: Option<String>,
}

impl CloudLoggingConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        Self {
            resource: MonitoredResource::for_project("global", &project_id),
            project_id,
            log_name: DEFAULT_LOG_NAME.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
        }
    }

    /// `projects/{project}/logs/{url-encoded log}`.
    pub fn full_log_name(&self) -> String {
        format!(
            "projects/{}/logs/{}",
            self.project_id,
            urlencoding::encode(&self.log_name)
        )
    }
}

/// Cloud Logging implementation of [`LogSink`] using the REST
/// `entries:write` method.
///
/// Each batch handed over by the layer is written with a single request.
/// Authentication is limited to a static bearer token; obtaining and
/// refreshing it is up to the application.
pub struct CloudLoggingSink {
    client: Client,
    config: CloudLoggingConfig,
    builder: StructuredLogRecordBuilder,
    enhancers: Vec<Box<dyn LoggingEnhancer>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WriteEntriesRequest<'a> {
    log_name: String,
    resource: &'a MonitoredResource,
    entries: Vec<LogEntry>,
}

impl CloudLoggingSink {
    /// Construct a new sink.
    ///
    /// **Parameters**
    /// - `config`: target project, log and resource.
    /// - `builder`: renders each event into the entry's `jsonPayload`.
    pub fn new(config: CloudLoggingConfig, builder: StructuredLogRecordBuilder) -> Self {
        Self {
            client: Client::new(),
            config,
            builder,
            enhancers: Vec::new(),
        }
    }

    /// Apply `enhancers` to every entry, in order.
    pub fn with_enhancers(mut self, enhancers: Vec<Box<dyn LoggingEnhancer>>) -> Self {
        self.enhancers = enhancers;
        self
    }

    pub fn config(&self) -> &CloudLoggingConfig {
        &self.config
    }

    fn entry_for(&self, event: &LogEvent) -> LogEntry {
        let mut entry = LogEntry::from_event(event, &self.builder, Some(&self.config.project_id));
        for enhancer in &self.enhancers {
            enhancer.enhance(&mut entry);
        }
        entry
    }

    pub(crate) fn request_body(&self, events: &[LogEvent]) -> WriteEntriesRequest<'_> {
        WriteEntriesRequest {
            log_name: self.config.full_log_name(),
            resource: &self.config.resource,
            entries: events.iter().map(|e| self.entry_for(e)).collect(),
        }
    }
}

#[async_trait]
impl LogSink for CloudLoggingSink {
    async fn send(&self, event: &LogEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.send_batch(std::slice::from_ref(event)).await
    }

    async fn send_batch(&self, events: &[LogEvent]) -> Result<(), Box<dyn Error + Send + Sync>> {
        if events.is_empty() {
            return Ok(());
        }
        let body = self.request_body(events);
        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("Cloud Logging write failed with status {}: {}", status, text).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancer::ProcessEnhancer;
    use crate::event::LogLevel;

    #[test]
    fn log_name_is_url_encoded() {
        let mut config = CloudLoggingConfig::new("acme-prod");
        config.log_name = "orders/api".to_string();
        assert_eq!(config.full_log_name(), "projects/acme-prod/logs/orders%2Fapi");
    }

    #[test]
    fn request_body_carries_one_entry_per_event() {
        let sink = CloudLoggingSink::new(
            CloudLoggingConfig::new("acme-prod"),
            StructuredLogRecordBuilder::new("orders", "9", true, true),
        )
        .with_enhancers(vec![Box::new(ProcessEnhancer)]);

        let events = vec![
            LogEvent::new(LogLevel::Info, "one"),
            LogEvent::new(LogLevel::Error, "two"),
        ];
        let body = serde_json::to_value(sink.request_body(&events)).unwrap();

        assert_eq!(body["logName"], "projects/acme-prod/logs/rust.log");
        assert_eq!(body["resource"]["type"], "global");
        assert_eq!(body["resource"]["labels"]["project_id"], "acme-prod");

        let entries = body["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["severity"], "ERROR");
        assert_eq!(entries[1]["jsonPayload"]["serviceContext"]["service"], "orders");
        assert_eq!(entries[0]["labels"]["pid"], std::process::id().to_string());
    }
}
