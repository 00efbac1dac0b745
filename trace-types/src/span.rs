//  Copyright 2024 The trace-store Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! Spans.
use crate::attribute::AttributeValue;
use crate::computed::{ComputedAttributes, ComputedKey, COMPUTED_PREFIX};
use crate::error::AttributeKeyError;
use crate::status::StatusCode;
use crate::{SpanId, Timestamp, TraceId};
use std::collections::HashMap;

/// The kind of operation a span represents, per the OpenInference semantic
/// conventions for LLM/RAG applications.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum SpanKind {
    /// A call to a large language model.
    Llm,
    /// A composed sequence of other operations.
    Chain,
    /// A call to an external tool or function.
    Tool,
    /// A retrieval over a document store.
    Retriever,
    /// A call to an embedding model.
    Embedding,
    /// An autonomous agent step.
    Agent,
    /// A reranking of retrieved documents.
    Reranker,
    /// An evaluation or grading operation.
    Evaluator,
    /// A guardrail check.
    Guardrail,
    /// None of the above, or not reported.
    Unknown,
}

/// A prefix used to address a span's context fields (`trace_id`, `span_id`,
/// `parent_id`) through [`Span::get`].
pub const CONTEXT_PREFIX: &str = "context.";
/// A prefix used to address a span's ingested attributes through
/// [`Span::get`].
pub const ATTRIBUTE_PREFIX: &str = "attributes.";

/// A single traced operation.
///
/// Multiple spans sharing a `trace_id` make up one trace, nested via
/// `parent_span_id`. A span with no parent is a *root* span.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    span_id: SpanId,
    trace_id: TraceId,
    parent_span_id: Option<SpanId>,
    name: String,
    span_kind: SpanKind,
    status_code: StatusCode,
    start_time: Timestamp,
    end_time: Timestamp,
    attributes: HashMap<String, AttributeValue>,
    computed: ComputedAttributes,
}

impl Span {
    /// Returns a builder used to construct a `Span`.
    #[inline]
    pub fn builder() -> Builder {
        Builder {
            span_id: None,
            trace_id: None,
            parent_span_id: None,
            name: String::new(),
            span_kind: SpanKind::Unknown,
            status_code: StatusCode::Unset,
            start_time: None,
            end_time: None,
            attributes: HashMap::new(),
        }
    }

    /// This span's unique identifier.
    #[inline]
    pub fn span_id(&self) -> &SpanId {
        &self.span_id
    }

    /// The identifier of the trace this span belongs to.
    #[inline]
    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    /// The parent span's identifier, or `None` if this is a root span.
    #[inline]
    pub fn parent_span_id(&self) -> Option<&SpanId> {
        self.parent_span_id.as_ref()
    }

    /// Returns `true` if this span has no parent.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    /// The logical operation name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of operation.
    #[inline]
    pub fn span_kind(&self) -> SpanKind {
        self.span_kind
    }

    /// The status of the operation.
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// The start of the span.
    #[inline]
    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    /// The end of the span. Always `>= start_time`.
    #[inline]
    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    /// The ingested attributes.
    #[inline]
    pub fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.attributes
    }

    /// A single ingested attribute, if present.
    #[inline]
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// The computed attributes the store has derived for this span.
    #[inline]
    pub fn computed(&self) -> &ComputedAttributes {
        &self.computed
    }

    /// Mutable access to the computed attributes, for use by the store
    /// during ingest and propagation.
    #[inline]
    pub fn computed_mut(&mut self) -> &mut ComputedAttributes {
        &mut self.computed
    }

    /// Resolves a possibly-prefixed string key against context fields,
    /// ingested attributes, or computed attributes, in that namespace
    /// order - the read-only surface of the "dynamic attribute bag"
    /// design note. Returns owned values since the three namespaces don't
    /// share a representation.
    pub fn get(&self, key: &str) -> Option<ResolvedValue> {
        if let Some(suffix) = key.strip_prefix(COMPUTED_PREFIX) {
            return ComputedKey::from_name(suffix)
                .and_then(|k| self.computed.get(k))
                .map(ResolvedValue::Computed);
        }
        if let Some(suffix) = key.strip_prefix(CONTEXT_PREFIX) {
            return match suffix {
                "span_id" => Some(ResolvedValue::SpanId(self.span_id.clone())),
                "trace_id" => Some(ResolvedValue::TraceId(self.trace_id.clone())),
                "parent_id" => self
                    .parent_span_id
                    .clone()
                    .map(ResolvedValue::SpanId),
                _ => None,
            };
        }
        if let Some(suffix) = key.strip_prefix(ATTRIBUTE_PREFIX) {
            return self
                .attributes
                .get(suffix)
                .cloned()
                .map(ResolvedValue::Attribute);
        }
        None
    }
}

/// The result of resolving a prefixed key via [`Span::get`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    /// A computed numeric value.
    Computed(f64),
    /// An ingested attribute.
    Attribute(AttributeValue),
    /// A span identifier from the context namespace.
    SpanId(SpanId),
    /// A trace identifier from the context namespace.
    TraceId(TraceId),
}

/// A builder for [`Span`]s.
pub struct Builder {
    span_id: Option<SpanId>,
    trace_id: Option<TraceId>,
    parent_span_id: Option<SpanId>,
    name: String,
    span_kind: SpanKind,
    status_code: StatusCode,
    start_time: Option<Timestamp>,
    end_time: Option<Timestamp>,
    attributes: HashMap<String, AttributeValue>,
}

impl Builder {
    /// Sets the span's identifier.
    #[inline]
    pub fn span_id(&mut self, span_id: impl Into<SpanId>) -> &mut Builder {
        self.span_id = Some(span_id.into());
        self
    }

    /// Sets the trace identifier.
    #[inline]
    pub fn trace_id(&mut self, trace_id: impl Into<TraceId>) -> &mut Builder {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Sets the parent span's identifier. Defaults to `None` (root span).
    #[inline]
    pub fn parent_span_id(&mut self, parent_span_id: impl Into<SpanId>) -> &mut Builder {
        self.parent_span_id = Some(parent_span_id.into());
        self
    }

    /// Sets the span's name.
    #[inline]
    pub fn name(&mut self, name: impl Into<String>) -> &mut Builder {
        self.name = name.into();
        self
    }

    /// Sets the span's kind. Defaults to [`SpanKind::Unknown`].
    #[inline]
    pub fn span_kind(&mut self, span_kind: SpanKind) -> &mut Builder {
        self.span_kind = span_kind;
        self
    }

    /// Sets the span's status. Defaults to [`StatusCode::Unset`].
    #[inline]
    pub fn status_code(&mut self, status_code: StatusCode) -> &mut Builder {
        self.status_code = status_code;
        self
    }

    /// Sets the start time.
    #[inline]
    pub fn start_time(&mut self, start_time: Timestamp) -> &mut Builder {
        self.start_time = Some(start_time);
        self
    }

    /// Sets the end time.
    #[inline]
    pub fn end_time(&mut self, end_time: Timestamp) -> &mut Builder {
        self.end_time = Some(end_time);
        self
    }

    /// Sets an ingested attribute.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeKeyError`] if `key` carries the reserved computed
    /// attribute prefix - legacy payloads sometimes do, and those keys must
    /// be stripped rather than stored as ingested data.
    pub fn attribute(
        &mut self,
        key: impl Into<String>,
        value: AttributeValue,
    ) -> Result<&mut Builder, AttributeKeyError> {
        let key = key.into();
        if key.starts_with(COMPUTED_PREFIX) {
            return Err(AttributeKeyError(key));
        }
        self.attributes.insert(key, value);
        Ok(self)
    }

    /// Constructs the `Span`.
    ///
    /// # Panics
    ///
    /// Panics if `span_id`, `trace_id`, `start_time`, or `end_time` was not
    /// set, or if `end_time` precedes `start_time`.
    pub fn build(&self) -> Span {
        let start_time = self.start_time.expect("start time not set");
        let end_time = self.end_time.expect("end time not set");
        assert!(end_time >= start_time, "end_time must be >= start_time");
        Span {
            span_id: self.span_id.clone().expect("span ID not set"),
            trace_id: self.trace_id.clone().expect("trace ID not set"),
            parent_span_id: self.parent_span_id.clone(),
            name: self.name.clone(),
            span_kind: self.span_kind,
            status_code: self.status_code,
            start_time,
            end_time,
            attributes: self.attributes.clone(),
            computed: ComputedAttributes::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_span() -> Span {
        Span::builder()
            .span_id("s1")
            .trace_id("t1")
            .name("retrieve")
            .span_kind(SpanKind::Retriever)
            .status_code(StatusCode::Ok)
            .start_time(Timestamp::from_unix_nanos(0))
            .end_time(Timestamp::from_unix_nanos(50_000_000))
            .build()
    }

    #[test]
    fn root_span_has_no_parent() {
        let span = sample_span();
        assert!(span.is_root());
        assert_eq!(span.parent_span_id(), None);
    }

    #[test]
    #[should_panic(expected = "end_time must be >= start_time")]
    fn build_panics_on_inverted_times() {
        Span::builder()
            .span_id("s1")
            .trace_id("t1")
            .start_time(Timestamp::from_unix_nanos(100))
            .end_time(Timestamp::from_unix_nanos(0))
            .build();
    }

    #[test]
    fn attribute_rejects_computed_prefixed_key() {
        let mut builder = Span::builder();
        let err = builder
            .attribute("__computed__.latency_ms", AttributeValue::Float(1.0))
            .unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn get_resolves_context_attribute_and_computed_namespaces() {
        let mut span = sample_span();
        span.computed_mut().set(ComputedKey::LatencyMs, 50.0);
        assert_eq!(
            span.get("context.span_id"),
            Some(ResolvedValue::SpanId(SpanId::from("s1")))
        );
        assert_eq!(
            span.get("__computed__.latency_ms"),
            Some(ResolvedValue::Computed(50.0))
        );
        assert_eq!(span.get("attributes.missing"), None);
    }
}
