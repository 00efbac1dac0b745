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

//! Evaluations: judgments attached to a span, a trace, or a retrieved
//! document.
use crate::error::EvaluationResultError;
use crate::{SpanId, TraceId};

/// The thing an [`Evaluation`] judges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EvaluationSubject {
    /// A judgment about an entire span.
    Span(SpanId),
    /// A judgment about an entire trace.
    Trace(TraceId),
    /// A judgment about one retrieved document within a span.
    Document {
        /// The span that retrieved the document.
        span_id: SpanId,
        /// The document's position within the span's retrieval list.
        document_position: u32,
    },
}

/// The judgment payload of an [`Evaluation`].
///
/// At least one of `score`, `label`, or `explanation` must be present;
/// use [`EvaluationResult::builder`] to construct one.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationResult {
    score: Option<f64>,
    label: Option<String>,
    explanation: Option<String>,
}

impl EvaluationResult {
    /// Returns a builder for an `EvaluationResult`.
    #[inline]
    pub fn builder() -> EvaluationResultBuilder {
        EvaluationResultBuilder {
            score: None,
            label: None,
            explanation: None,
        }
    }

    /// The numeric score, if present.
    #[inline]
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// The categorical label, if present.
    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The free-text explanation, if present.
    #[inline]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
}

/// A builder for [`EvaluationResult`].
#[derive(Debug, Default)]
pub struct EvaluationResultBuilder {
    score: Option<f64>,
    label: Option<String>,
    explanation: Option<String>,
}

impl EvaluationResultBuilder {
    /// Sets the numeric score.
    #[inline]
    pub fn score(&mut self, score: f64) -> &mut Self {
        self.score = Some(score);
        self
    }

    /// Sets the categorical label.
    #[inline]
    pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the free-text explanation.
    #[inline]
    pub fn explanation(&mut self, explanation: impl Into<String>) -> &mut Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Builds the `EvaluationResult`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationResultError`] if `score`, `label`, and
    /// `explanation` are all absent.
    pub fn build(&self) -> Result<EvaluationResult, EvaluationResultError> {
        if self.score.is_none() && self.label.is_none() && self.explanation.is_none() {
            return Err(EvaluationResultError::new());
        }
        Ok(EvaluationResult {
            score: self.score,
            label: self.label.clone(),
            explanation: self.explanation.clone(),
        })
    }
}

/// A single evaluation record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Evaluation {
    name: String,
    subject: EvaluationSubject,
    result: EvaluationResult,
}

impl Evaluation {
    /// Creates a new evaluation.
    pub fn new(name: impl Into<String>, subject: EvaluationSubject, result: EvaluationResult) -> Evaluation {
        Evaluation {
            name: name.into(),
            subject,
            result,
        }
    }

    /// The evaluation's name, e.g. `"relevance"`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The subject being judged.
    #[inline]
    pub fn subject(&self) -> &EvaluationSubject {
        &self.subject
    }

    /// The judgment payload.
    #[inline]
    pub fn result(&self) -> &EvaluationResult {
        &self.result
    }
}
