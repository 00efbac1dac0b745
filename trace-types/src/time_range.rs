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

//! The shared right-open time range utility used by `get_spans` and
//! `right_open_time_range`.
use crate::Timestamp;

/// Widens `[min_start, max_start]` into a half-open range
/// `[min_start, max_start + epsilon)` that strictly contains `max_start`.
///
/// `epsilon` is fixed to one minute - the coarsest shared time granularity a
/// caller is expected to sweep over - per the open question in the spec this
/// was distilled from.
pub fn right_open_time_range(min_start: Timestamp, max_start: Timestamp) -> (Timestamp, Timestamp) {
    (min_start, max_start.plus(Timestamp::one_tick()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn upper_bound_strictly_exceeds_max_start() {
        let min = Timestamp::from_unix_nanos(0);
        let max = Timestamp::from_unix_nanos(1_000_000_000);
        let (lo, hi) = right_open_time_range(min, max);
        assert_eq!(lo, min);
        assert!(hi > max);
    }
}
