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

//! Store-level error types.
use std::error::Error;
use std::fmt;

/// Returned internally by the ancestor walk when a span's `parent_of` chain
/// revisits a span already seen in the same walk.
///
/// The parent relation is logically a forest; a cycle means the input is
/// already corrupt upstream. `SpanStore::add_span` logs this at `error`
/// level and stops propagating further up the chain - the span itself is
/// still indexed, and its own already-published computed values are left in
/// place rather than rolled back.
#[derive(Debug)]
pub struct CyclicAncestryError {
    pub(crate) span_id: String,
}

impl fmt::Display for CyclicAncestryError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "cycle detected in ancestor chain while propagating cumulative attributes from span {:?}",
            self.span_id
        )
    }
}

impl Error for CyclicAncestryError {}
