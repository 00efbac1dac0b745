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

//! Ingested span attributes.

/// An ingested attribute value.
///
/// Attributes arrive already decoded from the wire format (the decoder is
/// out of scope for this crate); this is the closed set of shapes the store
/// needs to reason about.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AttributeValue {
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(String),
    /// A boolean.
    Bool(bool),
    /// A sequence of integers.
    IntArray(Vec<i64>),
    /// A sequence of floats.
    FloatArray(Vec<f64>),
    /// A sequence of strings.
    StrArray(Vec<String>),
}

impl AttributeValue {
    /// The length of this value when treated as a sequence, for attributes
    /// like `retrieval.documents` where only the count of entries matters.
    pub fn sequence_len(&self) -> Option<usize> {
        match self {
            AttributeValue::IntArray(v) => Some(v.len()),
            AttributeValue::FloatArray(v) => Some(v.len()),
            AttributeValue::StrArray(v) => Some(v.len()),
            AttributeValue::Int(_)
            | AttributeValue::Float(_)
            | AttributeValue::Str(_)
            | AttributeValue::Bool(_) => None,
        }
    }

    /// Interprets this value as a non-negative integer count, e.g. a token
    /// total. Returns `None` for shapes that aren't integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Float(v) => Some(*v as i64),
            _ => None,
        }
    }
}

/// The OpenInference semantic-convention key for a span's total token count.
pub const LLM_TOKEN_COUNT_TOTAL: &str = "llm.token_count.total";
/// The OpenInference semantic-convention key for a span's prompt token count.
pub const LLM_TOKEN_COUNT_PROMPT: &str = "llm.token_count.prompt";
/// The OpenInference semantic-convention key for a span's completion token count.
pub const LLM_TOKEN_COUNT_COMPLETION: &str = "llm.token_count.completion";
/// The OpenInference semantic-convention key for a span's retrieved documents.
pub const RETRIEVAL_DOCUMENTS: &str = "retrieval.documents";
