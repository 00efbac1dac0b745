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

//! A thin wrapper over `sketches_ddsketch::DDSketch` fixed at the relative
//! accuracy root-span latency quantiles are tracked at.
use sketches_ddsketch::{Config, DDSketch};

const RELATIVE_ACCURACY: f64 = 0.01;
const MIN_VALUE: f64 = 1.0e-9;
const MAX_NUM_BINS: u32 = 2048;

/// A streaming estimator of root-span latency quantiles.
///
/// Latencies are never negative or NaN by invariant (see `Timestamp::millis_since`),
/// so every value fed to `add` is a valid positive real.
pub struct LatencySketch {
    inner: DDSketch,
}

impl LatencySketch {
    /// Creates an empty sketch at relative accuracy ~0.01.
    pub fn new() -> LatencySketch {
        LatencySketch {
            inner: DDSketch::new(Config::new(RELATIVE_ACCURACY, MAX_NUM_BINS, MIN_VALUE)),
        }
    }

    /// Records a latency observation.
    pub fn add(&mut self, latency_ms: f64) {
        self.inner.add(latency_ms);
    }

    /// Estimates the `p`-quantile (`0.0..=1.0`), or `None` if the sketch has
    /// never received a value.
    pub fn quantile(&self, p: f64) -> Option<f64> {
        self.inner.quantile(p).ok().flatten()
    }

    /// The number of values ever added.
    pub fn count(&self) -> usize {
        self.inner.count()
    }
}

impl Default for LatencySketch {
    fn default() -> LatencySketch {
        LatencySketch::new()
    }
}
