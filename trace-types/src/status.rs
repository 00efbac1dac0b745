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

//! Span status.

/// The outcome of the operation a span represents.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum StatusCode {
    /// The default status; the operation neither succeeded nor failed
    /// explicitly.
    Unset,
    /// The operation completed successfully.
    Ok,
    /// The operation failed.
    Error,
}

impl StatusCode {
    /// Returns `1` if this is `Error`, else `0` - the definition of
    /// `computed.error_count`.
    #[inline]
    pub fn error_count(&self) -> u32 {
        match self {
            StatusCode::Error => 1,
            StatusCode::Unset | StatusCode::Ok => 0,
        }
    }
}
