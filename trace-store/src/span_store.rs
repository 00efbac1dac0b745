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

//! The concurrent span index: per-span/per-trace/per-root lookups, two
//! order-sensitive views, cumulative attribute propagation, and the root
//! latency quantile sketch.
use crate::error::CyclicAncestryError;
use crate::sketch::LatencySketch;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use trace_types::{attribute, AttributeValue, ComputedKey, Span, SpanId, StatusCode, Timestamp, TraceId};

/// A strictly-ordered `f64` wrapper for latency keys.
///
/// Latencies are never negative or NaN (`Timestamp::millis_since` clamps
/// reversed times to zero), so total ordering is safe here.
#[derive(Debug, Copy, Clone, PartialEq)]
struct OrderedLatency(f64);

impl Eq for OrderedLatency {}

impl PartialOrd for OrderedLatency {
    fn partial_cmp(&self, other: &OrderedLatency) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedLatency {
    fn cmp(&self, other: &OrderedLatency) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// A query against [`SpanStore::get_spans`].
///
/// All fields are optional; an empty query returns every span in reverse
/// chronological order.
#[derive(Debug, Clone, Default)]
pub struct GetSpansQuery {
    start: Option<Timestamp>,
    stop: Option<Timestamp>,
    root_only: bool,
    span_ids: Option<Vec<SpanId>>,
}

impl GetSpansQuery {
    /// Returns an empty query.
    #[inline]
    pub fn new() -> GetSpansQuery {
        GetSpansQuery::default()
    }

    /// Sets the inclusive lower time bound.
    #[inline]
    pub fn start(&mut self, start: Timestamp) -> &mut Self {
        self.start = Some(start);
        self
    }

    /// Sets the exclusive upper time bound.
    #[inline]
    pub fn stop(&mut self, stop: Timestamp) -> &mut Self {
        self.stop = Some(stop);
        self
    }

    /// Restricts the result to root spans.
    #[inline]
    pub fn root_only(&mut self, root_only: bool) -> &mut Self {
        self.root_only = root_only;
        self
    }

    /// Restricts the result to exactly the given span ids, preserving their
    /// order, instead of sweeping a time range.
    #[inline]
    pub fn span_ids(&mut self, span_ids: Vec<SpanId>) -> &mut Self {
        self.span_ids = Some(span_ids);
        self
    }
}

struct SpanStoreInner {
    by_id: HashMap<SpanId, Span>,
    parent_of: HashMap<SpanId, SpanId>,
    children_of: HashMap<SpanId, Vec<SpanId>>,
    spans_of_trace: HashMap<TraceId, HashSet<SpanId>>,
    num_documents: HashMap<SpanId, u64>,
    by_start_time: BTreeMap<(Timestamp, u64), SpanId>,
    roots_by_start_time: BTreeMap<(Timestamp, u64), SpanId>,
    roots_by_latency: BTreeMap<(OrderedLatency, u64), SpanId>,
    root_latency_sketch: LatencySketch,
    token_count_total: i64,
    last_updated_at: Option<Timestamp>,
    next_seq: u64,
}

impl SpanStoreInner {
    fn new() -> SpanStoreInner {
        SpanStoreInner {
            by_id: HashMap::new(),
            parent_of: HashMap::new(),
            children_of: HashMap::new(),
            spans_of_trace: HashMap::new(),
            num_documents: HashMap::new(),
            by_start_time: BTreeMap::new(),
            roots_by_start_time: BTreeMap::new(),
            roots_by_latency: BTreeMap::new(),
            root_latency_sketch: LatencySketch::new(),
            token_count_total: 0,
            last_updated_at: None,
            next_seq: 0,
        }
    }

    fn add_span(&mut self, mut span: Span) {
        if self.by_id.contains_key(span.span_id()) {
            return;
        }

        let span_id = span.span_id().clone();
        let trace_id = span.trace_id().clone();
        let parent_span_id = span.parent_span_id().cloned();
        let is_root = parent_span_id.is_none();

        // Link parentage before publishing, so propagation sees consistent
        // children_of/parent_of state regardless of arrival order.
        if let Some(parent_id) = parent_span_id {
            self.children_of
                .entry(parent_id.clone())
                .or_default()
                .push(span_id.clone());
            self.parent_of.insert(span_id.clone(), parent_id);
        }

        let latency_ms = span.end_time().millis_since(span.start_time());
        let error_count = span.status_code().error_count() as f64;
        span.computed_mut().set(ComputedKey::LatencyMs, latency_ms);
        span.computed_mut().set(ComputedKey::ErrorCount, error_count);
        if is_root {
            self.root_latency_sketch.add(latency_ms);
        }

        let token_total = non_negative_attribute(&span, &span_id, attribute::LLM_TOKEN_COUNT_TOTAL);
        let num_documents = span
            .attribute(attribute::RETRIEVAL_DOCUMENTS)
            .and_then(AttributeValue::sequence_len)
            .unwrap_or(0);

        let seq = self.next_seq;
        self.next_seq += 1;
        let start_time = span.start_time();

        self.spans_of_trace
            .entry(trace_id)
            .or_default()
            .insert(span_id.clone());
        self.by_start_time.insert((start_time, seq), span_id.clone());
        if is_root {
            self.roots_by_start_time
                .insert((start_time, seq), span_id.clone());
            self.roots_by_latency
                .insert((OrderedLatency(latency_ms), seq), span_id.clone());
        }
        self.by_id.insert(span_id.clone(), span);

        self.propagate_cumulative_attributes(&span_id);

        if let Some(total) = token_total {
            self.token_count_total += total;
        }
        if num_documents > 0 {
            *self.num_documents.entry(span_id).or_insert(0) += num_documents as u64;
        }

        self.last_updated_at = Some(Timestamp::now());
    }

    /// Two-phase propagation: gather from known children, then push the
    /// resulting total to known ancestors. Correct under any arrival order -
    /// see the ingest algorithm notes on out-of-order arrivals.
    fn propagate_cumulative_attributes(&mut self, span_id: &SpanId) {
        for key in ComputedKey::CUMULATIVE {
            let own_base = self.cumulative_base_value(span_id, key);
            let children_sum: f64 = self
                .children_of
                .get(span_id)
                .into_iter()
                .flatten()
                .filter_map(|child_id| self.by_id.get(child_id))
                .filter_map(|child| child.computed().get(key))
                .sum();
            let value = own_base + children_sum;
            if let Some(span) = self.by_id.get_mut(span_id) {
                span.computed_mut().set(key, value);
            }
        }

        for key in ComputedKey::CUMULATIVE {
            let value = self
                .by_id
                .get(span_id)
                .and_then(|span| span.computed().get(key))
                .unwrap_or(0.0);
            self.add_value_to_ancestors(span_id, key, value);
        }
    }

    fn cumulative_base_value(&self, span_id: &SpanId, key: ComputedKey) -> f64 {
        let span = match self.by_id.get(span_id) {
            Some(span) => span,
            None => return 0.0,
        };
        match key {
            ComputedKey::CumulativeLlmTokenCountTotal => {
                non_negative_attribute(span, span_id, attribute::LLM_TOKEN_COUNT_TOTAL)
                    .map(|v| v as f64)
                    .unwrap_or(0.0)
            }
            ComputedKey::CumulativeLlmTokenCountPrompt => {
                non_negative_attribute(span, span_id, attribute::LLM_TOKEN_COUNT_PROMPT)
                    .map(|v| v as f64)
                    .unwrap_or(0.0)
            }
            ComputedKey::CumulativeLlmTokenCountCompletion => {
                non_negative_attribute(span, span_id, attribute::LLM_TOKEN_COUNT_COMPLETION)
                    .map(|v| v as f64)
                    .unwrap_or(0.0)
            }
            ComputedKey::CumulativeErrorCount => span.computed().error_count.unwrap_or(0.0),
            ComputedKey::LatencyMs | ComputedKey::ErrorCount => 0.0,
        }
    }

    fn add_value_to_ancestors(&mut self, span_id: &SpanId, key: ComputedKey, value: f64) {
        let mut visited = HashSet::new();
        visited.insert(span_id.clone());
        let mut current = span_id.clone();
        while let Some(parent_id) = self.parent_of.get(&current).cloned() {
            if !visited.insert(parent_id.clone()) {
                let error = CyclicAncestryError {
                    span_id: span_id.to_string(),
                };
                log::error!("{} (key: {})", error, key.name());
                return;
            }
            let parent = match self.by_id.get_mut(&parent_id) {
                Some(parent) => parent,
                None => return,
            };
            parent.computed_mut().add(key, value);
            current = parent_id;
        }
    }

    fn get_trace(&self, trace_id: &TraceId) -> Vec<Span> {
        self.spans_of_trace
            .get(trace_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
            .cloned()
            .collect()
    }

    fn get_spans(&self, query: &GetSpansQuery) -> Vec<Span> {
        if let Some(span_ids) = &query.span_ids {
            let (start, stop) = self.resolve_range(query.start, query.stop);
            return span_ids
                .iter()
                .filter_map(|id| self.by_id.get(id))
                .filter(|span| span.start_time() >= start && span.start_time() < stop)
                .filter(|span| !query.root_only || span.is_root())
                .cloned()
                .collect();
        }

        let (start, stop) = self.resolve_range(query.start, query.stop);
        let index = if query.root_only {
            &self.roots_by_start_time
        } else {
            &self.by_start_time
        };
        index
            .range((start, 0)..(stop, 0))
            .rev()
            .filter_map(|(_, id)| self.by_id.get(id))
            .cloned()
            .collect()
    }

    fn resolve_range(&self, start: Option<Timestamp>, stop: Option<Timestamp>) -> (Timestamp, Timestamp) {
        let (default_start, default_stop) = self.right_open_time_range();
        (
            start.or(default_start).unwrap_or_else(Timestamp::now),
            stop.or(default_stop).unwrap_or_else(Timestamp::now),
        )
    }

    fn get_descendant_spans(&self, span_id: &SpanId) -> Vec<Span> {
        let mut result = Vec::new();
        let mut frontier: Vec<SpanId> = self.children_of.get(span_id).cloned().unwrap_or_default();
        frontier.reverse();
        while let Some(current) = frontier.pop() {
            if let Some(span) = self.by_id.get(&current) {
                result.push(span.clone());
            }
            let mut children: Vec<SpanId> = self.children_of.get(&current).cloned().unwrap_or_default();
            children.reverse();
            frontier.extend(children);
        }
        result
    }

    fn right_open_time_range(&self) -> (Option<Timestamp>, Option<Timestamp>) {
        let min_start = self.by_start_time.keys().next().map(|(t, _)| *t);
        let max_start = self.by_start_time.keys().next_back().map(|(t, _)| *t);
        match (min_start, max_start) {
            (Some(min), Some(max)) => {
                let (lo, hi) = trace_types::right_open_time_range(min, max);
                (Some(lo), Some(hi))
            }
            _ => (None, None),
        }
    }
}

/// Reads an integer-valued attribute, dropping (and logging) a negative
/// value - the open question on negative token counts is resolved by
/// discarding the contribution while still indexing the span. Shared by the
/// store-wide token total and every cumulative token-count key so a negative
/// reading never survives into either.
fn non_negative_attribute(span: &Span, span_id: &SpanId, key: &str) -> Option<i64> {
    let value = span.attribute(key).and_then(AttributeValue::as_i64)?;
    if value < 0 {
        log::warn!(
            "span {} carries negative {} ({}); dropping contribution",
            span_id,
            key,
            value
        );
        return None;
    }
    Some(value)
}

/// The concurrent span index described above, safe to share across threads
/// behind an `Arc`.
pub struct SpanStore {
    inner: ReentrantMutex<RefCell<SpanStoreInner>>,
}

impl SpanStore {
    /// Creates an empty span store.
    pub fn new() -> SpanStore {
        SpanStore {
            inner: ReentrantMutex::new(RefCell::new(SpanStoreInner::new())),
        }
    }

    /// Ingests a span. A second arrival with an already-known `span_id` is a
    /// silent no-op (first write wins).
    pub fn add_span(&self, span: Span) {
        let guard = self.inner.lock();
        guard.borrow_mut().add_span(span);
    }

    /// Returns every span in the given trace. Order is unspecified.
    pub fn get_trace(&self, trace_id: &TraceId) -> Vec<Span> {
        let guard = self.inner.lock();
        guard.borrow().get_trace(trace_id)
    }

    /// Returns spans matching `query`. Snapshot-then-yield: the result is
    /// fully materialized under the lock.
    pub fn get_spans(&self, query: &GetSpansQuery) -> Vec<Span> {
        let guard = self.inner.lock();
        guard.borrow().get_spans(query)
    }

    /// Depth-first traversal of `span_id`'s descendants. Each level is
    /// snapshotted under the lock before recursing further.
    pub fn get_descendant_spans(&self, span_id: &SpanId) -> Vec<Span> {
        let guard = self.inner.lock();
        guard.borrow().get_descendant_spans(span_id)
    }

    /// The number of retrieved documents ever recorded for `span_id`.
    pub fn get_num_documents(&self, span_id: &SpanId) -> u64 {
        let guard = self.inner.lock();
        guard.borrow().num_documents.get(span_id).copied().unwrap_or(0)
    }

    /// The total number of distinct spans ingested.
    pub fn span_count(&self) -> usize {
        let guard = self.inner.lock();
        guard.borrow().by_id.len()
    }

    /// The total number of distinct traces observed.
    pub fn trace_count(&self) -> usize {
        let guard = self.inner.lock();
        guard.borrow().spans_of_trace.len()
    }

    /// The running sum of ingested `llm.token_count.total` across all spans.
    pub fn token_count_total(&self) -> i64 {
        let guard = self.inner.lock();
        guard.borrow().token_count_total
    }

    /// Estimates the `p`-quantile of root-span latencies in milliseconds, or
    /// `None` if no root span has been ingested.
    pub fn root_span_latency_ms_quantile(&self, p: f64) -> Option<f64> {
        let guard = self.inner.lock();
        guard.borrow().root_latency_sketch.quantile(p)
    }

    /// The half-open `[min_start, max_start + ε)` interval spanning every
    /// ingested `start_time`, or `(None, None)` if the store is empty.
    pub fn right_open_time_range(&self) -> (Option<Timestamp>, Option<Timestamp>) {
        let guard = self.inner.lock();
        guard.borrow().right_open_time_range()
    }

    /// The UTC instant of the most recent successful ingest, or `None` if
    /// the store is empty.
    pub fn last_updated_at(&self) -> Option<Timestamp> {
        let guard = self.inner.lock();
        guard.borrow().last_updated_at
    }
}

impl Default for SpanStore {
    fn default() -> SpanStore {
        SpanStore::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use trace_types::SpanKind;

    const T: u64 = 1_704_067_200_000_000_000; // 2024-01-01T00:00:00Z in unix nanos

    fn ts(offset_ms: u64) -> Timestamp {
        Timestamp::from_unix_nanos(T + offset_ms * 1_000_000)
    }

    fn root_span(id: &str, trace: &str, start_ms: u64, end_ms: u64, token_total: i64, status: StatusCode) -> Span {
        let mut builder = Span::builder();
        builder
            .span_id(id)
            .trace_id(trace)
            .name("root")
            .span_kind(SpanKind::Chain)
            .status_code(status)
            .start_time(ts(start_ms))
            .end_time(ts(end_ms));
        builder
            .attribute(attribute::LLM_TOKEN_COUNT_TOTAL, AttributeValue::Int(token_total))
            .unwrap();
        builder.build()
    }

    fn child_span(id: &str, trace: &str, parent: &str, start_ms: u64, end_ms: u64, token_total: i64, status: StatusCode) -> Span {
        let mut builder = Span::builder();
        builder
            .span_id(id)
            .trace_id(trace)
            .parent_span_id(parent)
            .name("child")
            .span_kind(SpanKind::Tool)
            .status_code(status)
            .start_time(ts(start_ms))
            .end_time(ts(end_ms));
        builder
            .attribute(attribute::LLM_TOKEN_COUNT_TOTAL, AttributeValue::Int(token_total))
            .unwrap();
        builder.build()
    }

    #[test]
    fn single_root_scenario() {
        let store = SpanStore::new();
        store.add_span(root_span("a", "t1", 0, 50, 10, StatusCode::Ok));

        assert_eq!(store.span_count(), 1);
        assert_eq!(store.trace_count(), 1);
        assert_eq!(store.token_count_total(), 10);

        let trace = store.get_trace(&TraceId::from("t1"));
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].computed().latency_ms, Some(50.0));
        assert_eq!(trace[0].computed().cumulative_llm_token_count_total, 10.0);
        assert_eq!(trace[0].computed().error_count, Some(0.0));

        let q = store.root_span_latency_ms_quantile(0.5).unwrap();
        assert!((q - 50.0).abs() < 1.0);
    }

    #[test]
    fn parent_before_child_accumulates() {
        let store = SpanStore::new();
        store.add_span(root_span("a", "t1", 0, 50, 10, StatusCode::Ok));
        store.add_span(child_span("b", "t1", "a", 5, 20, 4, StatusCode::Error));

        assert_eq!(store.span_count(), 2);
        let a = &store.get_trace(&TraceId::from("t1"))[0];
        let _ = a;
        let spans = store.get_spans(GetSpansQuery::new().span_ids(vec![SpanId::from("a")]));
        assert_eq!(spans[0].computed().cumulative_llm_token_count_total, 14.0);
        assert_eq!(spans[0].computed().cumulative_error_count, 1.0);
        assert_eq!(store.token_count_total(), 14);
    }

    #[test]
    fn child_before_parent_matches_parent_before_child() {
        let store = SpanStore::new();
        store.add_span(child_span("b", "t1", "a", 5, 20, 4, StatusCode::Error));
        assert_eq!(store.span_count(), 1);
        let b = store.get_spans(GetSpansQuery::new().span_ids(vec![SpanId::from("b")]));
        assert_eq!(b[0].computed().cumulative_error_count, 1.0);

        store.add_span(root_span("a", "t1", 0, 50, 10, StatusCode::Ok));

        let a = store.get_spans(GetSpansQuery::new().span_ids(vec![SpanId::from("a")]));
        assert_eq!(a[0].computed().cumulative_llm_token_count_total, 14.0);
        assert_eq!(a[0].computed().cumulative_error_count, 1.0);
        assert_eq!(store.token_count_total(), 14);
    }

    #[test]
    fn duplicate_span_is_ignored() {
        let store = SpanStore::new();
        store.add_span(root_span("a", "t1", 0, 50, 10, StatusCode::Ok));
        store.add_span(root_span("a", "t1", 0, 50, 10, StatusCode::Ok));

        assert_eq!(store.span_count(), 1);
        assert_eq!(store.token_count_total(), 10);
    }

    #[test]
    fn time_range_sweep_is_most_recent_first() {
        let store = SpanStore::new();
        store.add_span(root_span("a", "t1", 0, 10, 0, StatusCode::Ok));
        store.add_span(root_span(
            "b",
            "t1",
            60 * 60 * 1000,
            60 * 60 * 1000 + 10,
            0,
            StatusCode::Ok,
        ));
        store.add_span(root_span(
            "c",
            "t1",
            2 * 60 * 60 * 1000,
            2 * 60 * 60 * 1000 + 10,
            0,
            StatusCode::Ok,
        ));

        let mut query = GetSpansQuery::new();
        query
            .start(ts(0))
            .stop(ts(2 * 60 * 60 * 1000))
            .root_only(true);
        let spans = store.get_spans(&query);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].span_id(), &SpanId::from("b"));
        assert_eq!(spans[1].span_id(), &SpanId::from("a"));
    }

    #[test]
    fn negative_token_total_does_not_propagate_to_ancestors() {
        let store = SpanStore::new();
        store.add_span(root_span("a", "t1", 0, 50, 10, StatusCode::Ok));
        store.add_span(child_span("b", "t1", "a", 5, 20, -4, StatusCode::Ok));

        let a = store.get_spans(GetSpansQuery::new().span_ids(vec![SpanId::from("a")]));
        assert_eq!(a[0].computed().cumulative_llm_token_count_total, 10.0);
        let b = store.get_spans(GetSpansQuery::new().span_ids(vec![SpanId::from("b")]));
        assert_eq!(b[0].computed().cumulative_llm_token_count_total, 0.0);
        assert_eq!(store.token_count_total(), 10);
    }

    #[test]
    fn get_descendant_spans_is_preorder_depth_first() {
        let store = SpanStore::new();
        store.add_span(root_span("root", "t1", 0, 100, 0, StatusCode::Ok));
        store.add_span(child_span("a", "t1", "root", 1, 10, 0, StatusCode::Ok));
        store.add_span(child_span("a1", "t1", "a", 2, 3, 0, StatusCode::Ok));
        store.add_span(child_span("a1a", "t1", "a1", 2, 3, 0, StatusCode::Ok));
        store.add_span(child_span("b", "t1", "root", 1, 10, 0, StatusCode::Ok));
        store.add_span(child_span("b1", "t1", "b", 2, 3, 0, StatusCode::Ok));

        let ids: Vec<String> = store
            .get_descendant_spans(&SpanId::from("root"))
            .iter()
            .map(|s| s.span_id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "a1", "a1a", "b", "b1"]);
    }
}
