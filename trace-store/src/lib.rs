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

//! A concurrent in-memory store for LLM/RAG trace and evaluation data.
//!
//! A [`Project`] composes a [`SpanStore`] and an [`EvalStore`]; a process
//! hosting several independent projects can use a [`ProjectRegistry`] to
//! keep them keyed by name.
//!
//! Every public operation acquires its store's own reentrant lock; the
//! `Project` facade never holds a lock of its own and never acquires both
//! sub-stores' locks at once. See the module docs on [`span_store`] for the
//! ingest algorithm and the cumulative-attribute propagation it performs.
#![warn(missing_docs)]

pub use eval_store::{EvalStore, EvaluationRow, EvaluationsFrame, EvaluationsFrameKind};
pub use project::{Project, ProjectRegistry, DEFAULT_PROJECT_NAME};
pub use span_store::{GetSpansQuery, SpanStore};

pub mod error;
pub mod eval_store;
pub mod project;
mod sketch;
pub mod span_store;
