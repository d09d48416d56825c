use crate::http::HttpRequestContext;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// Input log level.
///
/// Ordered from the most verbose to the least verbose. `All` and `Off` are
/// threshold sentinels and are never produced by `tracing` itself, but they
/// can be carried by events built by hand and used as filter thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    All,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::All => "ALL",
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Off => "OFF",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// Error returned when a level name cannot be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(LogLevel::All),
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "OFF" => Ok(LogLevel::Off),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Placeholder used for file and function names that cannot be resolved.
pub const NOT_AVAILABLE: &str = "?";

/// Line number used when no caller frame is available.
pub const LINE_NOT_AVAILABLE: i64 = -1;

/// One frame of the caller stack that emitted an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerFrame {
    /// Fully qualified declaring type or module path, e.g. `com.example.Foo`
    /// or `my_app::handlers`.
    pub declaring_type: String,
    pub method_name: String,
    /// File name as reported by the frame. May be a bare name or a path.
    pub file_name: Option<String>,
    pub line_number: i64,
    pub native: bool,
}

impl CallerFrame {
    pub fn new(declaring_type: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            method_name: method_name.into(),
            file_name: None,
            line_number: LINE_NOT_AVAILABLE,
            native: false,
        }
    }

    pub fn with_file(mut self, file_name: impl Into<String>, line_number: i64) -> Self {
        self.file_name = Some(file_name.into());
        self.line_number = line_number;
        self
    }

    pub fn with_native(mut self, native: bool) -> Self {
        self.native = native;
        self
    }
}

/// Rendered representation of an error attached to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throwable {
    rendered: String,
}

impl Throwable {
    /// Wrap an already rendered stack trace.
    pub fn new(rendered: impl Into<String>) -> Self {
        Self { rendered: rendered.into() }
    }

    /// Render an error and its whole `source()` chain.
    ///
    /// The first line is the error itself, every cause follows on its own
    /// `Caused by: ` line, innermost last.
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let mut rendered = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            rendered.push_str("\nCaused by: ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { rendered }
    }

    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

/// Trace correlation ids attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
}

impl TraceContext {
    pub fn new(trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trace_id.is_empty() && self.span_id.is_empty()
    }
}

/// Argument attached to the call site of an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventArgument {
    Trace(TraceContext),
    HttpRequest(HttpRequestContext),
    Other(Value),
}

/// A single log event, independent of the logging framework that produced it.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: LogLevel,
    /// Milliseconds since the Unix epoch.
    pub timestamp_millis: i64,
    pub message: String,
    pub throwable: Option<Throwable>,
    /// Caller stack, innermost frame first.
    pub caller_data: Vec<CallerFrame>,
    pub thread_name: String,
    pub logger_name: String,
    pub context: BTreeMap<String, Value>,
    pub arguments: Vec<EventArgument>,
}

impl LogEvent {
    /// Create an event stamped with the current time and thread.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp_millis: Utc::now().timestamp_millis(),
            message: message.into(),
            throwable: None,
            caller_data: Vec::new(),
            thread_name: current_thread_name(),
            logger_name: String::new(),
            context: BTreeMap::new(),
            arguments: Vec::new(),
        }
    }

    pub fn with_timestamp_millis(mut self, millis: i64) -> Self {
        self.timestamp_millis = millis;
        self
    }

    pub fn with_throwable(mut self, throwable: Throwable) -> Self {
        self.throwable = Some(throwable);
        self
    }

    pub fn with_caller(mut self, frame: CallerFrame) -> Self {
        self.caller_data.push(frame);
        self
    }

    pub fn with_thread(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    pub fn with_logger(mut self, logger_name: impl Into<String>) -> Self {
        self.logger_name = logger_name.into();
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_argument(mut self, argument: EventArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// First [`TraceContext`] among the arguments, if any.
    pub fn trace_context(&self) -> Option<&TraceContext> {
        self.arguments.iter().find_map(|arg| match arg {
            EventArgument::Trace(ctx) => Some(ctx),
            _ => None,
        })
    }

    /// First [`HttpRequestContext`] among the arguments, if any.
    pub fn http_request(&self) -> Option<&HttpRequestContext> {
        self.arguments.iter().find_map(|arg| match arg {
            EventArgument::HttpRequest(ctx) => Some(ctx),
            _ => None,
        })
    }
}

/// Name of the current thread, or its id for unnamed threads.
pub fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}
