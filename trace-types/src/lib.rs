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

//! Type definitions for the trace and evaluation data recorded by an
//! LLM/RAG observability backend.
//!
//! This crate has no locking and no indices of its own - it's the shared
//! vocabulary that `trace-store` builds a concurrent store on top of.
//!
//! # Serialization
//!
//! If the `serde` Cargo feature is enabled, `SpanId`, `TraceId`, `Span`,
//! `Evaluation` and their constituent types implement `Serialize` and
//! `Deserialize`.
#![warn(missing_docs)]

#[doc(inline)]
pub use attribute::AttributeValue;
#[doc(inline)]
pub use computed::{ComputedAttributes, ComputedKey, COMPUTED_PREFIX};
#[doc(inline)]
pub use error::{AttributeKeyError, EvaluationResultError};
#[doc(inline)]
pub use evaluation::{Evaluation, EvaluationResult, EvaluationSubject};
#[doc(inline)]
pub use span::{Builder as SpanBuilder, ResolvedValue, Span, SpanKind};
#[doc(inline)]
pub use span_id::SpanId;
#[doc(inline)]
pub use status::StatusCode;
#[doc(inline)]
pub use time_range::right_open_time_range;
#[doc(inline)]
pub use timestamp::Timestamp;
#[doc(inline)]
pub use trace_id::TraceId;

pub mod attribute;
pub mod computed;
pub mod error;
pub mod evaluation;
pub mod span;
pub mod span_id;
pub mod status;
pub mod time_range;
pub mod timestamp;
pub mod trace_id;
