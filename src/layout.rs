use crate::event::LogEvent;
use crate::record::*;
use crate::severity::severity;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Shape of the records produced by [`StructuredLogRecordBuilder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaVariant {
    /// Structured logging layout: details, source location, thread and
    /// logger at the top level.
    #[default]
    Structured,
    /// Error-reporting layout: location, thread, logger and details nested
    /// under `context`.
    Legacy,
}

impl SchemaVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVariant::Structured => "structured",
            SchemaVariant::Legacy => "legacy",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown schema variant: {0}")]
pub struct ParseSchemaError(pub String);

impl FromStr for SchemaVariant {
    type Err = ParseSchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" | "v3" => Ok(SchemaVariant::Structured),
            "legacy" | "v2" => Ok(SchemaVariant::Legacy),
            _ => Err(ParseSchemaError(s.to_string())),
        }
    }
}

/// Static settings of a [`StructuredLogRecordBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    pub service_name: String,
    pub service_version: String,
    pub add_trace_fields: bool,
    pub add_http_request_fields: bool,
    pub schema: SchemaVariant,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            service_name: "default".to_string(),
            service_version: "default".to_string(),
            add_trace_fields: true,
            add_http_request_fields: true,
            schema: SchemaVariant::default(),
        }
    }
}

/// Turns [`LogEvent`]s into [`StructuredLogRecord`]s.
///
/// The builder is immutable once constructed and can be shared between
/// threads. Building a record never fails: data that is missing or cannot
/// be rendered is left out of the record.
#[derive(Debug, Clone)]
pub struct StructuredLogRecordBuilder {
    config: LayoutConfig,
    service_context: Value,
}

impl StructuredLogRecordBuilder {
    pub fn new(
        service_name: impl Into<String>,
        service_version: impl Into<String>,
        add_trace_fields: bool,
        add_http_request_fields: bool,
    ) -> Self {
        Self::from_config(LayoutConfig {
            service_name: service_name.into(),
            service_version: service_version.into(),
            add_trace_fields,
            add_http_request_fields,
            schema: SchemaVariant::Structured,
        })
    }

    pub fn from_config(config: LayoutConfig) -> Self {
        let mut service_context = Map::with_capacity(2);
        service_context.insert("service".into(), config.service_name.clone().into());
        service_context.insert("version".into(), config.service_version.clone().into());
        Self {
            config,
            service_context: Value::Object(service_context),
        }
    }

    pub fn with_schema(mut self, schema: SchemaVariant) -> Self {
        self.config.schema = schema;
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// The `{service, version}` object shared by every record of this builder.
    pub fn service_context(&self) -> &Value {
        &self.service_context
    }

    pub fn build(&self, event: &LogEvent) -> StructuredLogRecord {
        match self.config.schema {
            SchemaVariant::Structured => self.build_structured(event),
            SchemaVariant::Legacy => self.build_legacy(event),
        }
    }

    fn build_structured(&self, event: &LogEvent) -> StructuredLogRecord {
        let mut record = self.common_fields(event);

        if !event.context.is_empty() {
            record.insert(DETAILS_KEY.into(), details(event));
        }

        let location = SourceLocation::from_caller_data(&event.caller_data);
        let mut source_location = Map::with_capacity(3);
        source_location.insert("file".into(), location.file.into());
        source_location.insert("line".into(), location.line.into());
        source_location.insert("function".into(), location.function.into());
        record.insert(SOURCE_LOCATION_KEY.into(), Value::Object(source_location));

        record.insert(THREAD_KEY.into(), event.thread_name.clone().into());
        record.insert(LOGGER_KEY.into(), event.logger_name.clone().into());
        record
    }

    fn build_legacy(&self, event: &LogEvent) -> StructuredLogRecord {
        let mut record = self.common_fields(event);

        let mut report_location = Map::new();
        if let Some(frame) = event.caller_data.first() {
            report_location.insert("filePath".into(), class_file_path(frame).into());
            report_location.insert("lineNumber".into(), frame.line_number.into());
            report_location.insert("functionName".into(), function_name(frame).into());
        }
        report_location.insert(THREAD_KEY.into(), event.thread_name.clone().into());
        report_location.insert(LOGGER_KEY.into(), event.logger_name.clone().into());

        let mut context = Map::new();
        context.insert(REPORT_LOCATION_KEY.into(), Value::Object(report_location));
        if !event.context.is_empty() {
            context.insert(DETAILS_KEY.into(), details(event));
        }
        record.insert(CONTEXT_KEY.into(), Value::Object(context));
        record
    }

    /// Keys shared by every schema variant.
    fn common_fields(&self, event: &LogEvent) -> StructuredLogRecord {
        let mut record = Map::new();
        record.insert(SEVERITY_KEY.into(), severity(event.level).as_str().into());
        record.insert(
            TIMESTAMP_KEY.into(),
            Timestamp::from_millis(event.timestamp_millis).to_value(),
        );
        record.insert(SERVICE_CONTEXT_KEY.into(), self.service_context.clone());
        record.insert(MESSAGE_KEY.into(), message(event).into());

        if self.config.add_trace_fields {
            if let Some(trace) = event.trace_context() {
                if !trace.trace_id.is_empty() {
                    record.insert(TRACE_ID_KEY.into(), trace.trace_id.clone().into());
                }
                if !trace.span_id.is_empty() {
                    record.insert(SPAN_ID_KEY.into(), trace.span_id.clone().into());
                }
            }
        }

        if self.config.add_http_request_fields {
            if let Some(http) = event.http_request() {
                record.insert(
                    HTTP_REQUEST_KEY.into(),
                    Value::Object(http.fields().clone()),
                );
            }
        }
        record
    }
}

impl Default for StructuredLogRecordBuilder {
    fn default() -> Self {
        Self::from_config(LayoutConfig::default())
    }
}

/// Formatted message, followed by the rendered throwable when one is attached.
fn message(event: &LogEvent) -> String {
    match &event.throwable {
        Some(t) if !t.rendered().is_empty() => format!("{}\n{}", event.message, t.rendered()),
        _ => event.message.clone(),
    }
}

fn details(event: &LogEvent) -> Value {
    Value::Object(
        event
            .context
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CallerFrame, EventArgument, LogLevel, Throwable, TraceContext};
    use crate::http::HttpRequestContext;
    use serde_json::json;

    fn event() -> LogEvent {
        LogEvent::new(LogLevel::Info, "hello")
            .with_timestamp_millis(1_500_000_123)
            .with_thread("main")
            .with_logger("app::db")
    }

    fn builder() -> StructuredLogRecordBuilder {
        StructuredLogRecordBuilder::new("checkout", "1.4.2", true, true)
    }

    #[test]
    fn builds_required_fields() {
        let record = builder().build(&event());

        assert_eq!(record["severity"], "INFO");
        assert_eq!(record["timestamp"], json!({"seconds": 1_500_000, "nanos": 123_000_000}));
        assert_eq!(record["serviceContext"], json!({"service": "checkout", "version": "1.4.2"}));
        assert_eq!(record["message"], "hello");
        assert_eq!(record["thread"], "main");
        assert_eq!(record["logger"], "app::db");
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let record = builder().build(&event());

        for key in [TRACE_ID_KEY, SPAN_ID_KEY, HTTP_REQUEST_KEY, DETAILS_KEY, CONTEXT_KEY] {
            assert!(!record.contains_key(key), "unexpected key {}", key);
        }
    }

    #[test]
    fn missing_caller_data_uses_sentinels() {
        let record = builder().build(&event());
        assert_eq!(
            record[SOURCE_LOCATION_KEY],
            json!({"file": "?", "line": -1, "function": "?"})
        );
    }

    #[test]
    fn source_location_from_first_frame() {
        let ev = event()
            .with_caller(CallerFrame::new("com.shop.Cart", "add").with_file("Cart.java", 88))
            .with_caller(CallerFrame::new("com.shop.Api", "post").with_file("Api.java", 12));
        let record = builder().build(&ev);
        assert_eq!(
            record[SOURCE_LOCATION_KEY],
            json!({"file": "com/shop/Cart.java", "line": 88, "function": "com.shop.Cart.add"})
        );
    }

    #[test]
    fn throwable_is_appended_to_message() {
        let ev = LogEvent::new(LogLevel::Error, "boom").with_throwable(Throwable::new("Err\n at X"));
        let record = builder().build(&ev);
        assert_eq!(record["message"], "boom\nErr\n at X");
        assert_eq!(record["severity"], "ERROR");
    }

    #[test]
    fn empty_span_id_is_omitted() {
        let ev = event().with_argument(EventArgument::Trace(TraceContext::new("t1", "")));
        let record = builder().build(&ev);
        assert_eq!(record[TRACE_ID_KEY], "t1");
        assert!(!record.contains_key(SPAN_ID_KEY));
    }

    #[test]
    fn trace_fields_respect_flag() {
        let ev = event().with_argument(EventArgument::Trace(TraceContext::new("t1", "s1")));
        let record = StructuredLogRecordBuilder::new("svc", "1", false, true).build(&ev);
        assert!(!record.contains_key(TRACE_ID_KEY));
        assert!(!record.contains_key(SPAN_ID_KEY));
    }

    #[test]
    fn first_trace_context_wins() {
        let ev = event()
            .with_argument(EventArgument::Other(json!("user-42")))
            .with_argument(EventArgument::Trace(TraceContext::new("first", "a")))
            .with_argument(EventArgument::Trace(TraceContext::new("second", "b")));
        let record = builder().build(&ev);
        assert_eq!(record[TRACE_ID_KEY], "first");
        assert_eq!(record[SPAN_ID_KEY], "a");
    }

    #[test]
    fn http_request_is_embedded_verbatim() {
        let mut http = HttpRequestContext::new();
        http.put("requestMethod", "POST");
        http.put("status", "201");
        let ev = event().with_argument(EventArgument::HttpRequest(http));

        let record = builder().build(&ev);
        assert_eq!(record[HTTP_REQUEST_KEY], json!({"requestMethod": "POST", "status": "201"}));

        let record = StructuredLogRecordBuilder::new("svc", "1", true, false).build(&ev);
        assert!(!record.contains_key(HTTP_REQUEST_KEY));
    }

    #[test]
    fn context_map_becomes_details() {
        let ev = event().with_context("order_id", 991).with_context("region", "eu");
        let record = builder().build(&ev);
        assert_eq!(record[DETAILS_KEY], json!({"order_id": 991, "region": "eu"}));
    }

    #[test]
    fn service_context_is_shared() {
        let b = builder();
        let first = b.service_context() as *const Value;
        let _ = b.build(&event());
        let _ = b.build(&event());
        assert_eq!(first, b.service_context() as *const Value);
        assert_eq!(b.build(&event())["serviceContext"], *b.service_context());
    }

    #[test]
    fn unknown_level_maps_to_default() {
        let ev = LogEvent::new(LogLevel::Off, "quiet");
        assert_eq!(builder().build(&ev)["severity"], "DEFAULT");
    }

    #[test]
    fn keys_keep_wire_order() {
        let ev = event()
            .with_context("k", "v")
            .with_argument(EventArgument::Trace(TraceContext::new("t", "s")));
        let record = builder().build(&ev);
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                SEVERITY_KEY,
                TIMESTAMP_KEY,
                SERVICE_CONTEXT_KEY,
                MESSAGE_KEY,
                TRACE_ID_KEY,
                SPAN_ID_KEY,
                DETAILS_KEY,
                SOURCE_LOCATION_KEY,
                THREAD_KEY,
                LOGGER_KEY
            ]
        );
    }

    #[test]
    fn legacy_nests_location_under_context() {
        let ev = event()
            .with_caller(CallerFrame::new("com.shop.Cart", "add").with_file("Cart.java", 88));
        let record = builder().with_schema(SchemaVariant::Legacy).build(&ev);

        assert_eq!(
            record[CONTEXT_KEY],
            json!({
                "reportLocation": {
                    "filePath": "com/shop/Cart.class",
                    "lineNumber": 88,
                    "functionName": "com.shop.Cart.add",
                    "thread": "main",
                    "logger": "app::db"
                }
            })
        );
        assert!(!record.contains_key(SOURCE_LOCATION_KEY));
        assert!(!record.contains_key(THREAD_KEY));
        assert!(!record.contains_key(DETAILS_KEY));
    }

    #[test]
    fn legacy_without_frame_keeps_thread_and_logger() {
        let record = builder()
            .with_schema(SchemaVariant::Legacy)
            .build(&event().with_context("attempt", 3));
        assert_eq!(
            record[CONTEXT_KEY],
            json!({
                "reportLocation": {"thread": "main", "logger": "app::db"},
                "details": {"attempt": 3}
            })
        );
    }

    #[test]
    fn schema_variant_parses() {
        assert_eq!("Legacy".parse::<SchemaVariant>(), Ok(SchemaVariant::Legacy));
        assert_eq!("structured".parse::<SchemaVariant>(), Ok(SchemaVariant::Structured));
        assert!("xml".parse::<SchemaVariant>().is_err());
    }
}
