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

//! The evaluation index: joins evaluations to spans, traces, or retrieved
//! documents, and exports them as tabular frames.
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use trace_types::{Evaluation, EvaluationResult, EvaluationSubject, SpanId, Timestamp, TraceId};

/// Which shape of subject an [`EvaluationsFrame`] was built from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EvaluationsFrameKind {
    /// Rows indexed by `span_id`.
    Span,
    /// Rows indexed by `(span_id, document_position)`.
    Document,
}

/// One row of an [`EvaluationsFrame`].
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationRow {
    /// A span-subject evaluation result.
    Span {
        /// The evaluated span.
        span_id: SpanId,
        /// The judgment.
        result: EvaluationResult,
    },
    /// A document-subject evaluation result.
    Document {
        /// The span that retrieved the document.
        span_id: SpanId,
        /// The document's position within that span's retrieval list.
        document_position: u32,
        /// The judgment.
        result: EvaluationResult,
    },
}

/// A tabular export of every evaluation recorded under one name.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationsFrame {
    name: String,
    kind: EvaluationsFrameKind,
    rows: Vec<EvaluationRow>,
}

impl EvaluationsFrame {
    /// The evaluation name this frame was built from, e.g. `"relevance"`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this frame's rows are indexed by span or by document.
    #[inline]
    pub fn kind(&self) -> EvaluationsFrameKind {
        self.kind
    }

    /// The frame's rows.
    #[inline]
    pub fn rows(&self) -> &[EvaluationRow] {
        &self.rows
    }
}

struct EvalStoreInner {
    by_span: HashMap<SpanId, HashMap<String, Evaluation>>,
    span_by_name: HashMap<String, HashMap<SpanId, Evaluation>>,
    by_trace: HashMap<TraceId, HashMap<String, Evaluation>>,
    trace_by_name: HashMap<String, HashMap<TraceId, Evaluation>>,
    by_document: HashMap<SpanId, HashMap<String, BTreeMap<u32, Evaluation>>>,
    doc_by_name: HashMap<String, HashMap<SpanId, BTreeMap<u32, Evaluation>>>,
    labels_by_name: HashMap<String, HashSet<String>>,
    last_updated_at: Option<Timestamp>,
}

impl EvalStoreInner {
    fn new() -> EvalStoreInner {
        EvalStoreInner {
            by_span: HashMap::new(),
            span_by_name: HashMap::new(),
            by_trace: HashMap::new(),
            trace_by_name: HashMap::new(),
            by_document: HashMap::new(),
            doc_by_name: HashMap::new(),
            labels_by_name: HashMap::new(),
            last_updated_at: None,
        }
    }

    fn add_evaluation(&mut self, evaluation: Evaluation) {
        let name = evaluation.name().to_string();
        match evaluation.subject().clone() {
            EvaluationSubject::Span(span_id) => {
                if let Some(label) = evaluation.result().label() {
                    self.labels_by_name
                        .entry(name.clone())
                        .or_default()
                        .insert(label.to_string());
                }
                self.by_span
                    .entry(span_id.clone())
                    .or_default()
                    .insert(name.clone(), evaluation.clone());
                self.span_by_name
                    .entry(name)
                    .or_default()
                    .insert(span_id, evaluation);
            }
            EvaluationSubject::Trace(trace_id) => {
                self.by_trace
                    .entry(trace_id.clone())
                    .or_default()
                    .insert(name.clone(), evaluation.clone());
                self.trace_by_name
                    .entry(name)
                    .or_default()
                    .insert(trace_id, evaluation);
            }
            EvaluationSubject::Document {
                span_id,
                document_position,
            } => {
                self.by_document
                    .entry(span_id.clone())
                    .or_default()
                    .entry(name.clone())
                    .or_default()
                    .insert(document_position, evaluation.clone());
                self.doc_by_name
                    .entry(name)
                    .or_default()
                    .entry(span_id)
                    .or_default()
                    .insert(document_position, evaluation);
            }
        }
        self.last_updated_at = Some(Timestamp::now());
    }

    fn get_span_evaluation(&self, span_id: &SpanId, name: &str) -> Option<Evaluation> {
        self.by_span.get(span_id)?.get(name).cloned()
    }

    fn get_evaluations_by_span_id(&self, span_id: &SpanId) -> Vec<Evaluation> {
        self.by_span
            .get(span_id)
            .into_iter()
            .flat_map(|m| m.values().cloned())
            .collect()
    }

    fn get_span_evaluation_names(&self) -> Vec<String> {
        self.span_by_name.keys().cloned().collect()
    }

    fn get_span_evaluation_labels(&self, name: &str) -> HashSet<String> {
        self.labels_by_name.get(name).cloned().unwrap_or_default()
    }

    fn get_span_evaluation_span_ids(&self, name: &str) -> Vec<SpanId> {
        self.span_by_name
            .get(name)
            .into_iter()
            .flat_map(|m| m.keys().cloned())
            .collect()
    }

    fn get_document_evaluation_names(&self, span_id: Option<&SpanId>) -> Vec<String> {
        match span_id {
            Some(span_id) => self
                .by_document
                .get(span_id)
                .into_iter()
                .flat_map(|m| m.keys().cloned())
                .collect(),
            None => self.doc_by_name.keys().cloned().collect(),
        }
    }

    fn get_document_evaluations_by_span_id(&self, span_id: &SpanId) -> Vec<(String, u32, Evaluation)> {
        self.by_document
            .get(span_id)
            .into_iter()
            .flat_map(|by_name| {
                by_name.iter().flat_map(|(name, by_position)| {
                    by_position
                        .iter()
                        .map(move |(position, evaluation)| (name.clone(), *position, evaluation.clone()))
                })
            })
            .collect()
    }

    fn get_document_evaluation_scores(&self, span_id: &SpanId, name: &str, num_documents: usize) -> Vec<f64> {
        let mut scores = vec![f64::NAN; num_documents];
        if let Some(by_position) = self.by_document.get(span_id).and_then(|m| m.get(name)) {
            for (position, evaluation) in by_position {
                let position = *position as usize;
                if position < num_documents {
                    if let Some(score) = evaluation.result().score() {
                        scores[position] = score;
                    }
                }
            }
        }
        scores
    }

    /// The rows of the span-evaluation frame named `name`, if any evaluation
    /// has ever been recorded under it.
    fn span_frame_rows(&self, name: &str) -> Option<Vec<EvaluationRow>> {
        let by_span_id = self.span_by_name.get(name)?;
        Some(
            by_span_id
                .iter()
                .map(|(span_id, evaluation)| EvaluationRow::Span {
                    span_id: span_id.clone(),
                    result: evaluation.result().clone(),
                })
                .collect(),
        )
    }

    /// The rows of the document-evaluation frame named `name`, if any
    /// evaluation has ever been recorded under it.
    fn document_frame_rows(&self, name: &str) -> Option<Vec<EvaluationRow>> {
        let by_span_id = self.doc_by_name.get(name)?;
        let mut rows = Vec::new();
        for (span_id, by_position) in by_span_id {
            for (position, evaluation) in by_position {
                rows.push(EvaluationRow::Document {
                    span_id: span_id.clone(),
                    document_position: *position,
                    result: evaluation.result().clone(),
                });
            }
        }
        Some(rows)
    }
}

/// The concurrent evaluation index described above.
pub struct EvalStore {
    inner: ReentrantMutex<RefCell<EvalStoreInner>>,
}

impl EvalStore {
    /// Creates an empty evaluation store.
    pub fn new() -> EvalStore {
        EvalStore {
            inner: ReentrantMutex::new(RefCell::new(EvalStoreInner::new())),
        }
    }

    /// Ingests an evaluation. Dispatches on the subject kind; an existing
    /// entry under the same key is overwritten (last writer wins).
    ///
    /// The "missing subject" and "unknown subject kind" failure modes
    /// `spec` error taxonomy category 2/3 name cannot occur here: `subject`
    /// is a mandatory field of [`Evaluation`] and `EvaluationSubject` is an
    /// exhaustively-matched closed enum, so both are enforced by the type
    /// system before an `Evaluation` value can exist at all.
    pub fn add_evaluation(&self, evaluation: Evaluation) {
        let guard = self.inner.lock();
        guard.borrow_mut().add_evaluation(evaluation);
    }

    /// The evaluation named `name` attached directly to `span_id`, if any.
    pub fn get_span_evaluation(&self, span_id: &SpanId, name: &str) -> Option<Evaluation> {
        let guard = self.inner.lock();
        guard.borrow().get_span_evaluation(span_id, name)
    }

    /// Every span-subject evaluation attached to `span_id`.
    pub fn get_evaluations_by_span_id(&self, span_id: &SpanId) -> Vec<Evaluation> {
        let guard = self.inner.lock();
        guard.borrow().get_evaluations_by_span_id(span_id)
    }

    /// Every distinct span-evaluation name ever ingested.
    pub fn get_span_evaluation_names(&self) -> Vec<String> {
        let guard = self.inner.lock();
        guard.borrow().get_span_evaluation_names()
    }

    /// The distinct label values observed for span evaluations named `name`.
    pub fn get_span_evaluation_labels(&self, name: &str) -> HashSet<String> {
        let guard = self.inner.lock();
        guard.borrow().get_span_evaluation_labels(name)
    }

    /// The span ids carrying a span evaluation named `name`.
    pub fn get_span_evaluation_span_ids(&self, name: &str) -> Vec<SpanId> {
        let guard = self.inner.lock();
        guard.borrow().get_span_evaluation_span_ids(name)
    }

    /// Document-evaluation names, across all spans or filtered to one.
    pub fn get_document_evaluation_names(&self, span_id: Option<&SpanId>) -> Vec<String> {
        let guard = self.inner.lock();
        guard.borrow().get_document_evaluation_names(span_id)
    }

    /// Every document evaluation attached to `span_id`, flattened across
    /// names and positions, as `(name, document_position, evaluation)`.
    pub fn get_document_evaluations_by_span_id(&self, span_id: &SpanId) -> Vec<(String, u32, Evaluation)> {
        let guard = self.inner.lock();
        guard.borrow().get_document_evaluations_by_span_id(span_id)
    }

    /// Document evaluation scores for `(span_id, name)`, as a vector of
    /// length `num_documents` with `NaN` where no score was recorded.
    ///
    /// `num_documents` is supplied by the caller since stored document
    /// positions are not bounded at ingest time.
    pub fn get_document_evaluation_scores(&self, span_id: &SpanId, name: &str, num_documents: usize) -> Vec<f64> {
        let guard = self.inner.lock();
        guard
            .borrow()
            .get_document_evaluation_scores(span_id, name, num_documents)
    }

    /// Builds one [`EvaluationsFrame`] per span-evaluation name and one per
    /// document-evaluation name.
    ///
    /// Snapshot strategy is copy-then-release: under the lock, copy the
    /// top-level name list; release; then for each name, reacquire the lock
    /// only to snapshot that name's rows before building its frame. No
    /// single critical section spans the whole export, so a burst of
    /// concurrent ingests can interleave between frames rather than queue
    /// up behind it. Document rows within a frame are ordered by ascending
    /// `document_position` (the `BTreeMap<u32, _>` backing
    /// `by_document`/`doc_by_name` already iterates in that order).
    pub fn export_evaluations(&self) -> Vec<EvaluationsFrame> {
        let (span_names, doc_names) = {
            let guard = self.inner.lock();
            let inner = guard.borrow();
            (inner.get_span_evaluation_names(), inner.get_document_evaluation_names(None))
        };

        let mut frames = Vec::with_capacity(span_names.len() + doc_names.len());

        for name in span_names {
            let guard = self.inner.lock();
            let rows = guard.borrow().span_frame_rows(&name);
            if let Some(rows) = rows {
                frames.push(EvaluationsFrame {
                    name,
                    kind: EvaluationsFrameKind::Span,
                    rows,
                });
            }
        }

        for name in doc_names {
            let guard = self.inner.lock();
            let rows = guard.borrow().document_frame_rows(&name);
            if let Some(rows) = rows {
                frames.push(EvaluationsFrame {
                    name,
                    kind: EvaluationsFrameKind::Document,
                    rows,
                });
            }
        }

        frames
    }

    /// The UTC instant of the most recent successful ingest, or `None` if
    /// the store is empty.
    pub fn last_updated_at(&self) -> Option<Timestamp> {
        let guard = self.inner.lock();
        guard.borrow().last_updated_at
    }
}

impl Default for EvalStore {
    fn default() -> EvalStore {
        EvalStore::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use trace_types::EvaluationResult;

    fn span_eval(span_id: &str, name: &str, label: &str, score: f64) -> Evaluation {
        let result = EvaluationResult::builder().label(label).score(score).build().unwrap();
        Evaluation::new(name, EvaluationSubject::Span(SpanId::from(span_id)), result)
    }

    fn doc_eval(span_id: &str, position: u32, name: &str, score: f64) -> Evaluation {
        let result = EvaluationResult::builder().score(score).build().unwrap();
        Evaluation::new(
            name,
            EvaluationSubject::Document {
                span_id: SpanId::from(span_id),
                document_position: position,
            },
            result,
        )
    }

    #[test]
    fn span_evaluation_round_trips() {
        let store = EvalStore::new();
        store.add_evaluation(span_eval("a", "relevance", "yes", 0.9));

        let result = store
            .get_span_evaluation(&SpanId::from("a"), "relevance")
            .unwrap();
        assert_eq!(result.result().score(), Some(0.9));
        assert_eq!(
            store.get_span_evaluation_labels("relevance"),
            HashSet::from(["yes".to_string()])
        );
    }

    #[test]
    fn document_evaluation_scores_default_to_nan() {
        let store = EvalStore::new();
        store.add_evaluation(doc_eval("a", 2, "doc_rel", 0.4));

        let scores = store.get_document_evaluation_scores(&SpanId::from("a"), "doc_rel", 4);
        assert!(scores[0].is_nan());
        assert!(scores[1].is_nan());
        assert_eq!(scores[2], 0.4);
        assert!(scores[3].is_nan());
    }

    #[test]
    fn export_produces_one_frame_per_name() {
        let store = EvalStore::new();
        store.add_evaluation(span_eval("a", "relevance", "yes", 0.9));
        store.add_evaluation(doc_eval("a", 0, "doc_rel", 0.1));

        let frames = store.export_evaluations();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().any(|f| f.name() == "relevance" && f.kind() == EvaluationsFrameKind::Span));
        assert!(frames.iter().any(|f| f.name() == "doc_rel" && f.kind() == EvaluationsFrameKind::Document));
    }

    #[test]
    fn last_writer_wins_on_same_key() {
        let store = EvalStore::new();
        store.add_evaluation(span_eval("a", "relevance", "yes", 0.9));
        store.add_evaluation(span_eval("a", "relevance", "no", 0.1));

        let result = store
            .get_span_evaluation(&SpanId::from("a"), "relevance")
            .unwrap();
        assert_eq!(result.result().label(), Some("no"));
    }
}
