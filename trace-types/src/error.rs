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

//! Caller contract violations.
use std::error::Error;
use std::fmt;

/// The error returned when a caller attempts to write an attribute whose key
/// carries the reserved computed-attribute prefix.
///
/// Computed values are derived by the store, not supplied by ingest; this
/// rejects the write instead of silently corrupting the computed record.
#[derive(Debug)]
pub struct AttributeKeyError(pub(crate) String);

impl fmt::Display for AttributeKeyError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "{:?} is a reserved computed-attribute key and cannot be set as an ingested attribute",
            self.0
        )
    }
}

impl Error for AttributeKeyError {}

/// The error returned when constructing an [`crate::EvaluationResult`] with
/// every field absent.
#[derive(Debug)]
pub struct EvaluationResultError(());

impl EvaluationResultError {
    pub(crate) fn new() -> EvaluationResultError {
        EvaluationResultError(())
    }
}

impl fmt::Display for EvaluationResultError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("evaluation result must carry at least one of score, label, or explanation")
    }
}

impl Error for EvaluationResultError {}
