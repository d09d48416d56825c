use crate::event::{CallerFrame, LINE_NOT_AVAILABLE, NOT_AVAILABLE};
use serde::Serialize;
use serde_json::{Map, Value};

/// One structured log entry, as a JSON object with keys in insertion order.
pub type StructuredLogRecord = Map<String, Value>;

pub const SEVERITY_KEY: &str = "severity";
pub const TIMESTAMP_KEY: &str = "timestamp";
pub const SERVICE_CONTEXT_KEY: &str = "serviceContext";
pub const MESSAGE_KEY: &str = "message";
pub const TRACE_ID_KEY: &str = "logging.googleapis.com/trace";
pub const SPAN_ID_KEY: &str = "logging.googleapis.com/spanId";
pub const HTTP_REQUEST_KEY: &str = "httpRequest";
pub const DETAILS_KEY: &str = "details";
pub const SOURCE_LOCATION_KEY: &str = "logging.googleapis.com/sourceLocation";
pub const THREAD_KEY: &str = "thread";
pub const LOGGER_KEY: &str = "logger";
pub const CONTEXT_KEY: &str = "context";
pub const REPORT_LOCATION_KEY: &str = "reportLocation";

/// Suffix appended to the function name of native frames.
pub const NATIVE_METHOD_SUFFIX: &str = "(Native Method)";

/// Epoch timestamp split into whole seconds and the nanosecond remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn from_millis(millis: i64) -> Self {
        Self {
            seconds: millis.div_euclid(1000),
            nanos: (millis.rem_euclid(1000) * 1_000_000) as i32,
        }
    }

    pub fn to_value(self) -> Value {
        let mut map = Map::with_capacity(2);
        map.insert("seconds".into(), self.seconds.into());
        map.insert("nanos".into(), self.nanos.into());
        Value::Object(map)
    }
}

/// Where a log call originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: i64,
    pub function: String,
}

impl SourceLocation {
    /// Resolve the location from the innermost caller frame.
    ///
    /// Without any frame both names fall back to `"?"` and the line to `-1`.
    pub fn from_caller_data(frames: &[CallerFrame]) -> Self {
        match frames.first() {
            Some(frame) => Self {
                file: resolve_file(frame),
                line: frame.line_number,
                function: function_name(frame),
            },
            None => Self {
                file: NOT_AVAILABLE.to_string(),
                line: LINE_NOT_AVAILABLE,
                function: NOT_AVAILABLE.to_string(),
            },
        }
    }
}

/// `Type.method`, with a marker for native frames.
pub fn function_name(frame: &CallerFrame) -> String {
    let mut name = format!("{}.{}", frame.declaring_type, frame.method_name);
    if frame.native {
        name.push_str(NATIVE_METHOD_SUFFIX);
    }
    name
}

/// Slash-delimited source path built from the declaring type's package and
/// the bare file name of the frame.
///
/// `com.example.Foo` in `Foo.java` resolves to `com/example/Foo.java`,
/// `my_app::handlers` in `src/handlers.rs` to `my_app/handlers.rs`.
pub fn resolve_file(frame: &CallerFrame) -> String {
    let file_name = match frame.file_name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => return NOT_AVAILABLE.to_string(),
    };
    let bare = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);

    let declaring = frame.declaring_type.replace("::", ".");
    match declaring.rsplit_once('.') {
        Some((package, _)) if !package.is_empty() => {
            format!("{}/{}", package.replace('.', "/"), bare)
        }
        _ => bare.to_string(),
    }
}

/// Class-file path of the declaring type, as error-reporting expects it.
///
/// `com.shop.Cart` becomes `com/shop/Cart.class`, module separators are
/// treated the same way.
pub fn class_file_path(frame: &CallerFrame) -> String {
    let path = frame.declaring_type.replace("::", "/").replace('.', "/");
    format!("{}.class", path)
}
