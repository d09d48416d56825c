use crate::event::{
    current_thread_name, CallerFrame, EventArgument, LogEvent, LogLevel, Throwable, TraceContext,
    LINE_NOT_AVAILABLE, NOT_AVAILABLE,
};
use crate::http::HttpRequestContext;
use crate::init::LayerConfig;
use crate::sink::LogSink;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{atomic::{AtomicU64, Ordering}, Arc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Field carrying the trace id, on events or on any enclosing span.
pub const TRACE_ID_FIELD: &str = "trace_id";
/// Field carrying the span id, on events or on any enclosing span.
pub const SPAN_ID_FIELD: &str = "span_id";
/// Event fields starting with this prefix populate `httpRequest`.
pub const HTTP_FIELD_PREFIX: &str = "http.";

const MAX_SEND_ATTEMPTS: u32 = 5;

/// `tracing_subscriber` layer that turns events into [`LogEvent`]s and
/// forwards them to an asynchronous [`LogSink`] via a bounded channel and
/// background task.
///
/// Events below the configured minimum level are ignored. Network I/O is
/// fully decoupled from application threads: `on_event` only ever does a
/// non-blocking `try_send`.
pub struct CloudLogLayer {
    sender: mpsc::Sender<LogEvent>,
    min_level: LogLevel,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully handed over to the background task.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
}

impl CloudLogLayer {
    /// Create a new layer and spawn a background task that pulls
    /// [`LogEvent`]s from a bounded channel and sends them in batches to
    /// the provided [`LogSink`].
    ///
    /// Must be called from within a Tokio runtime. Minimal thresholds are
    /// enforced for the buffer, batch size and flush interval.
    pub fn new(sink: Arc<dyn LogSink>, config: &LayerConfig) -> (Self, JoinHandle<()>) {
        let buffer = config.channel_buffer.max(16);
        let batch_size = config.batch_size.max(1);
        let flush_interval = config.flush_interval.max(Duration::from_millis(10));
        let flush_level = config.flush_level;

        let (tx, rx) = mpsc::channel::<LogEvent>(buffer);

        let total_events = Arc::new(AtomicU64::new(0));
        let enqueued_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));

        let handle = tokio::spawn(run_batcher(
            sink,
            rx,
            batch_size,
            flush_interval,
            flush_level,
            Arc::clone(&enqueued_events),
        ));

        (
            Self {
                sender: tx,
                min_level: config.min_level,
                total_events,
                enqueued_events,
                dropped_events,
            },
            handle,
        )
    }
}

async fn run_batcher(
    sink: Arc<dyn LogSink>,
    mut rx: mpsc::Receiver<LogEvent>,
    batch_size: usize,
    flush_interval: Duration,
    flush_level: LogLevel,
    enqueued_events: Arc<AtomicU64>,
) {
    let mut batch: Vec<LogEvent> = Vec::with_capacity(batch_size);
    let mut ticker = interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(event) => {
                    let urgent = event.level >= flush_level;
                    batch.push(event);
                    enqueued_events.fetch_add(1, Ordering::Relaxed);
                    if urgent || batch.len() >= batch_size {
                        if let Err(e) = send_batch(&*sink, &mut batch).await {
                            eprintln!("error sending log batch: {}", e);
                        }
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if !batch.is_empty() {
                    if let Err(e) = send_batch(&*sink, &mut batch).await {
                        eprintln!("error flushing log batch: {}", e);
                    }
                }
            }
        }
    }

    if !batch.is_empty() {
        if let Err(e) = send_batch(&*sink, &mut batch).await {
            eprintln!("error flushing final log batch: {}", e);
        }
    }
    if let Err(e) = sink.flush().await {
        eprintln!("error flushing log sink: {}", e);
    }
}

/// Send the batch, retrying with exponential backoff.
///
/// The batch is cleared either way; after the last failed attempt its
/// events are dropped and the error is returned.
async fn send_batch(
    sink: &dyn LogSink,
    batch: &mut Vec<LogEvent>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut backoff = Duration::from_millis(100);
    let max_backoff = Duration::from_secs(10);
    let mut attempt = 1;

    loop {
        match sink.send_batch(batch).await {
            Ok(()) => {
                batch.clear();
                return Ok(());
            }
            Err(e) if attempt >= MAX_SEND_ATTEMPTS => {
                eprintln!("dropping {} log events after {} attempts", batch.len(), attempt);
                batch.clear();
                return Err(e);
            }
            Err(e) => {
                eprintln!("log sink send failed ({}), retrying in {:?}", e, backoff);
                sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, max_backoff);
                attempt += 1;
            }
        }
    }
}

impl<S> Layer<S> for CloudLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut trace = TraceContext::default();
        attrs.record(&mut SpanTraceVisitor { trace: &mut trace });
        if trace.is_empty() {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(trace);
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(trace) = extensions.get_mut::<TraceContext>() {
            values.record(&mut SpanTraceVisitor { trace });
            return;
        }
        let mut trace = TraceContext::default();
        values.record(&mut SpanTraceVisitor { trace: &mut trace });
        if !trace.is_empty() {
            extensions.insert(trace);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        let level = LogLevel::from(meta.level());
        if level < self.min_level {
            return;
        }

        let mut fields = EventFields::default();
        event.record(&mut FieldVisitor { fields: &mut fields });

        // Innermost span first: it names the function and supplies any
        // trace ids the event does not carry itself.
        let mut method_name = None;
        let mut span_trace = None;
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if method_name.is_none() {
                    method_name = Some(span.name().to_string());
                }
                if let Some(trace) = span.extensions().get::<TraceContext>() {
                    span_trace = Some(trace.clone());
                    break;
                }
            }
        }

        // Ids on the event win; missing ones come from the span.
        let mut arguments = Vec::new();
        let trace = match (fields.trace.take(), span_trace) {
            (Some(mut own), Some(inherited)) => {
                if own.trace_id.is_empty() {
                    own.trace_id = inherited.trace_id;
                }
                if own.span_id.is_empty() {
                    own.span_id = inherited.span_id;
                }
                Some(own)
            }
            (own, inherited) => own.or(inherited),
        };
        if let Some(trace) = trace.filter(|t| !t.is_empty()) {
            arguments.push(EventArgument::Trace(trace));
        }
        if !fields.http.is_empty() {
            arguments.push(EventArgument::HttpRequest(std::mem::take(&mut fields.http)));
        }

        let declaring_type = meta.module_path().unwrap_or_else(|| meta.target());
        let mut frame = CallerFrame::new(
            declaring_type,
            method_name.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        );
        if let Some(file) = meta.file() {
            let line = meta.line().map(i64::from).unwrap_or(LINE_NOT_AVAILABLE);
            frame = frame.with_file(file, line);
        }

        let log_event = LogEvent {
            level,
            timestamp_millis: Utc::now().timestamp_millis(),
            message: fields.message.unwrap_or_default(),
            throwable: fields.throwable,
            caller_data: vec![frame],
            thread_name: current_thread_name(),
            logger_name: meta.target().to_string(),
            context: fields.context,
            arguments,
        };

        if self.sender.try_send(log_event).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            eprintln!("log channel full, dropping log event");
        }
    }
}

#[derive(Default)]
struct EventFields {
    message: Option<String>,
    context: BTreeMap<String, Value>,
    trace: Option<TraceContext>,
    http: HttpRequestContext,
    throwable: Option<Throwable>,
}

impl EventFields {
    fn insert(&mut self, name: &str, value: Value) {
        if name == TRACE_ID_FIELD || name == SPAN_ID_FIELD {
            let trace = self.trace.get_or_insert_with(TraceContext::default);
            let id = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            if name == TRACE_ID_FIELD {
                trace.trace_id = id;
            } else {
                trace.span_id = id;
            }
        } else if let Some(key) = name.strip_prefix(HTTP_FIELD_PREFIX) {
            self.http.put(key, value);
        } else {
            self.context.insert(name.to_string(), value);
        }
    }
}

struct FieldVisitor<'a> {
    fields: &'a mut EventFields,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.fields.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        if self.fields.throwable.is_none() {
            self.fields.throwable = Some(Throwable::from_error(value));
        } else {
            self.fields.insert(field.name(), Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.fields.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name(), Value::String(format!("{:?}", value)));
        }
    }
}

/// Picks the trace ids out of span attributes.
struct SpanTraceVisitor<'a> {
    trace: &'a mut TraceContext,
}

impl<'a> SpanTraceVisitor<'a> {
    fn set(&mut self, field: &Field, value: String) {
        match field.name() {
            TRACE_ID_FIELD => self.trace.trace_id = value,
            SPAN_ID_FIELD => self.trace.span_id = value,
            _ => {}
        }
    }
}

impl<'a> Visit for SpanTraceVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.set(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.set(field, format!("{:?}", value));
    }
}
