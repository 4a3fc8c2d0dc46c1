//! Data contracts for the inbound span stream.
//!
//! These types describe what the surrounding pipeline framework is assumed to hand us;
//! they are not wire formats, and this crate never serializes them.

use std::collections::BTreeMap;
use std::fmt;

/// A single attribute value. Mirrors the handful of primitive shapes a tracing
/// attribute bag actually carries.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    /// A UTF-8 string value.
    String(String),
    /// A signed integer value.
    Int(i64),
    /// A floating point value.
    Double(f64),
    /// A boolean value.
    Bool(bool),
}

impl AttributeValue {
    /// Render this value the same way for key construction and for label emission,
    /// so a (key, label) pair built from the same attribute always agree.
    pub fn stringify(&self) -> String {
        match self {
            AttributeValue::String(s) => s.clone(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Double(d) => d.to_string(),
            AttributeValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

/// An ordered attribute bag. `BTreeMap` gives deterministic iteration at
/// negligible cost.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Span kind, following the usual tracing vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanKind {
    /// Kind unspecified by the producer.
    Unspecified,
    /// A synchronous request handled by this service.
    Server,
    /// A request this service issued to another.
    Client,
    /// One-way message production.
    Producer,
    /// One-way message consumption.
    Consumer,
    /// Internal operation, no remote counterpart.
    Internal,
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpanKind::Unspecified => "SPAN_KIND_UNSPECIFIED",
            SpanKind::Server => "SPAN_KIND_SERVER",
            SpanKind::Client => "SPAN_KIND_CLIENT",
            SpanKind::Producer => "SPAN_KIND_PRODUCER",
            SpanKind::Consumer => "SPAN_KIND_CONSUMER",
            SpanKind::Internal => "SPAN_KIND_INTERNAL",
        };
        f.write_str(s)
    }
}

/// Span status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusCode {
    /// No status was set.
    Unset,
    /// The span completed successfully.
    Ok,
    /// The span recorded an error.
    Error,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusCode::Unset => "STATUS_CODE_UNSET",
            StatusCode::Ok => "STATUS_CODE_OK",
            StatusCode::Error => "STATUS_CODE_ERROR",
        };
        f.write_str(s)
    }
}

/// One timed operation in a trace.
#[derive(Clone, Debug, PartialEq)]
pub struct Span {
    /// Operation name (e.g. "GET /users/:id").
    pub name: String,
    /// Span kind.
    pub kind: SpanKind,
    /// Status code.
    pub status_code: StatusCode,
    /// Start time, nanoseconds since the Unix epoch.
    pub start_time_unix_nano: u64,
    /// End time, nanoseconds since the Unix epoch.
    pub end_time_unix_nano: u64,
    /// Span id, as the producer's native encoding (e.g. hex string).
    pub span_id: String,
    /// Trace id, as the producer's native encoding.
    pub trace_id: String,
    /// Span attributes.
    pub attributes: Attributes,
}

impl Span {
    /// Latency of this span in milliseconds. Computed in `f64` so that
    /// out-of-order or extreme timestamps can never overflow or panic;
    /// a negative result is possible and meaningful (clock skew, malformed input).
    pub fn latency_ms(&self) -> f64 {
        (self.end_time_unix_nano as f64 - self.start_time_unix_nano as f64) / 1_000_000.0
    }
}

/// A group of spans sharing one instrumentation library.
#[derive(Clone, Debug, Default)]
pub struct InstrumentationLibrary {
    /// Library name, as reported by the producer.
    pub name: String,
    /// Library version, as reported by the producer.
    pub version: String,
}

/// Spans produced by one instrumentation library, within one resource.
#[derive(Clone, Debug)]
pub struct InstrumentationLibrarySpans {
    /// The producing library.
    pub instrumentation_library: InstrumentationLibrary,
    /// The spans it produced.
    pub spans: Vec<Span>,
}

/// The process/service that produced a group of spans.
#[derive(Clone, Debug, Default)]
pub struct Resource {
    /// Resource attributes, expected to include `service.name`.
    pub attributes: Attributes,
}

impl Resource {
    /// `service.name`, if present.
    pub fn service_name(&self) -> Option<&str> {
        match self.attributes.get("service.name") {
            Some(AttributeValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// All instrumentation-library span groups belonging to one resource.
#[derive(Clone, Debug)]
pub struct ResourceSpans {
    /// The producing resource.
    pub resource: Resource,
    /// Its instrumentation-library span groups.
    pub instrumentation_library_spans: Vec<InstrumentationLibrarySpans>,
}

/// A batch of spans as handed to `Processor::consume`.
#[derive(Clone, Debug, Default)]
pub struct TraceBatch {
    /// Resource-grouped spans.
    pub resource_spans: Vec<ResourceSpans>,
}
