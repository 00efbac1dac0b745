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

//! Computed (store-derived) span attributes.

/// Attribute keys whose values only the store writes, never the decoder.
///
/// These share the [`COMPUTED_PREFIX`] reserved namespace so they can never
/// collide with an ingested attribute key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ComputedKey {
    /// `(end_time - start_time) * 1000`.
    LatencyMs,
    /// `1` if the span's status is `ERROR`, else `0`.
    ErrorCount,
    /// Own `llm.token_count.total` plus the same key summed over descendants.
    CumulativeLlmTokenCountTotal,
    /// Own `llm.token_count.prompt` plus the same key summed over descendants.
    CumulativeLlmTokenCountPrompt,
    /// Own `llm.token_count.completion` plus the same key summed over descendants.
    CumulativeLlmTokenCountCompletion,
    /// Own `error_count` plus the same key summed over descendants.
    CumulativeErrorCount,
}

/// The reserved prefix shared by every computed-attribute wire name.
///
/// Ingested attributes carrying this prefix (legacy payloads sometimes do)
/// must be stripped before a span is indexed - see `spec` section 6.
pub const COMPUTED_PREFIX: &str = "__computed__.";

impl ComputedKey {
    /// All computed keys, in a stable order.
    pub const ALL: [ComputedKey; 6] = [
        ComputedKey::LatencyMs,
        ComputedKey::ErrorCount,
        ComputedKey::CumulativeLlmTokenCountTotal,
        ComputedKey::CumulativeLlmTokenCountPrompt,
        ComputedKey::CumulativeLlmTokenCountCompletion,
        ComputedKey::CumulativeErrorCount,
    ];

    /// The four cumulative keys - the ones subject to ancestor propagation.
    pub const CUMULATIVE: [ComputedKey; 4] = [
        ComputedKey::CumulativeLlmTokenCountTotal,
        ComputedKey::CumulativeLlmTokenCountPrompt,
        ComputedKey::CumulativeLlmTokenCountCompletion,
        ComputedKey::CumulativeErrorCount,
    ];

    /// The bare name, without [`COMPUTED_PREFIX`].
    pub fn name(&self) -> &'static str {
        match self {
            ComputedKey::LatencyMs => "latency_ms",
            ComputedKey::ErrorCount => "error_count",
            ComputedKey::CumulativeLlmTokenCountTotal => "cumulative_llm_token_count_total",
            ComputedKey::CumulativeLlmTokenCountPrompt => "cumulative_llm_token_count_prompt",
            ComputedKey::CumulativeLlmTokenCountCompletion => {
                "cumulative_llm_token_count_completion"
            }
            ComputedKey::CumulativeErrorCount => "cumulative_error_count",
        }
    }

    /// The full reserved wire name, e.g. `__computed__.latency_ms`.
    pub fn wire_name(&self) -> String {
        format!("{}{}", COMPUTED_PREFIX, self.name())
    }

    /// Parses a bare name (without prefix) back into a key.
    pub fn from_name(name: &str) -> Option<ComputedKey> {
        ComputedKey::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// The fixed-shape record of computed values the store maintains per span.
///
/// This is a typed struct rather than a dynamic map - see the "Dynamic
/// attribute bag on spans" design note: a systems-language span represents
/// computed values as "a small typed record", not a string-keyed overlay.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComputedAttributes {
    /// See [`ComputedKey::LatencyMs`]. `None` until the store has ingested
    /// the span and computed it (i.e. always `Some` for any span a reader
    /// can observe).
    pub latency_ms: Option<f64>,
    /// See [`ComputedKey::ErrorCount`].
    pub error_count: Option<f64>,
    /// See [`ComputedKey::CumulativeLlmTokenCountTotal`].
    pub cumulative_llm_token_count_total: f64,
    /// See [`ComputedKey::CumulativeLlmTokenCountPrompt`].
    pub cumulative_llm_token_count_prompt: f64,
    /// See [`ComputedKey::CumulativeLlmTokenCountCompletion`].
    pub cumulative_llm_token_count_completion: f64,
    /// See [`ComputedKey::CumulativeErrorCount`].
    pub cumulative_error_count: f64,
}

impl ComputedAttributes {
    /// Reads a computed value by key.
    pub fn get(&self, key: ComputedKey) -> Option<f64> {
        match key {
            ComputedKey::LatencyMs => self.latency_ms,
            ComputedKey::ErrorCount => self.error_count,
            ComputedKey::CumulativeLlmTokenCountTotal => {
                Some(self.cumulative_llm_token_count_total)
            }
            ComputedKey::CumulativeLlmTokenCountPrompt => {
                Some(self.cumulative_llm_token_count_prompt)
            }
            ComputedKey::CumulativeLlmTokenCountCompletion => {
                Some(self.cumulative_llm_token_count_completion)
            }
            ComputedKey::CumulativeErrorCount => Some(self.cumulative_error_count),
        }
    }

    /// Overwrites a computed value by key. Internal to the store - ingested
    /// attributes never reach this setter.
    pub fn set(&mut self, key: ComputedKey, value: f64) {
        match key {
            ComputedKey::LatencyMs => self.latency_ms = Some(value),
            ComputedKey::ErrorCount => self.error_count = Some(value),
            ComputedKey::CumulativeLlmTokenCountTotal => {
                self.cumulative_llm_token_count_total = value
            }
            ComputedKey::CumulativeLlmTokenCountPrompt => {
                self.cumulative_llm_token_count_prompt = value
            }
            ComputedKey::CumulativeLlmTokenCountCompletion => {
                self.cumulative_llm_token_count_completion = value
            }
            ComputedKey::CumulativeErrorCount => self.cumulative_error_count = value,
        }
    }

    /// Adds to a cumulative computed value by key, used when pushing a
    /// child's contribution up to an ancestor.
    pub fn add(&mut self, key: ComputedKey, value: f64) {
        let current = self.get(key).unwrap_or(0.0);
        self.set(key, current + value);
    }
}
