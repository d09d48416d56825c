use crate::event::LogEvent;
use crate::layout::StructuredLogRecordBuilder;
use crate::record::StructuredLogRecord;
use crate::severity::{severity, Severity};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Entity a log entry is attributed to, e.g. `global` or `k8s_container`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl MonitoredResource {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Resource of the given type labelled with the owning project.
    pub fn for_project(kind: impl Into<String>, project_id: &str) -> Self {
        Self::new(kind).with_label("project_id", project_id)
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

impl Default for MonitoredResource {
    fn default() -> Self {
        Self::new("global")
    }
}

/// A `LogEntry` as accepted by the `entries:write` API.
///
/// The structured record becomes the `jsonPayload`; severity and timestamp
/// are lifted to the entry itself and thread, logger and context values are
/// exposed as labels so they can be filtered on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub severity: Severity,
    pub timestamp: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    pub json_payload: StructuredLogRecord,
}

impl LogEntry {
    /// Build the entry for `event`.
    ///
    /// When `project_id` is given and trace fields are enabled on the
    /// builder, the trace id is expanded to its full
    /// `projects/{project}/traces/{id}` resource name.
    pub fn from_event(
        event: &LogEvent,
        builder: &StructuredLogRecordBuilder,
        project_id: Option<&str>,
    ) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("thread".to_string(), event.thread_name.clone());
        labels.insert("logger".to_string(), event.logger_name.clone());
        for (key, value) in &event.context {
            labels.insert(key.clone(), label_value(value));
        }

        let (mut trace, mut span_id) = (None, None);
        if builder.config().add_trace_fields {
            if let Some(ctx) = event.trace_context() {
                if !ctx.trace_id.is_empty() {
                    trace = Some(match project_id {
                        Some(project) => format!("projects/{}/traces/{}", project, ctx.trace_id),
                        None => ctx.trace_id.clone(),
                    });
                }
                if !ctx.span_id.is_empty() {
                    span_id = Some(ctx.span_id.clone());
                }
            }
        }

        Self {
            severity: severity(event.level),
            timestamp: rfc3339(event.timestamp_millis),
            labels,
            trace,
            span_id,
            json_payload: builder.build(event),
        }
    }

    pub fn add_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }
}

fn label_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn rfc3339(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
