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

//! Timestamps.
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// An instant in time, normalized to UTC.
///
/// `Timestamp` wraps [`SystemTime`], which already has no notion of a local
/// timezone - constructing one from, say, a decoded OTLP `time_unix_nano`
/// value is the normalization step; from here on every comparison and
/// arithmetic operation is timezone-free.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(SystemTime);

impl Timestamp {
    /// Returns the current instant.
    #[inline]
    pub fn now() -> Timestamp {
        Timestamp(SystemTime::now())
    }

    /// Constructs a timestamp from nanoseconds since the Unix epoch.
    #[inline]
    pub fn from_unix_nanos(nanos: u64) -> Timestamp {
        Timestamp(UNIX_EPOCH + Duration::from_nanos(nanos))
    }

    /// Constructs a timestamp from a raw [`SystemTime`], already UTC.
    #[inline]
    pub fn from_system_time(time: SystemTime) -> Timestamp {
        Timestamp(time)
    }

    /// Returns the underlying [`SystemTime`].
    #[inline]
    pub fn as_system_time(&self) -> SystemTime {
        self.0
    }

    /// Adds a fixed duration, returning the result.
    #[inline]
    pub fn plus(&self, duration: Duration) -> Timestamp {
        Timestamp(self.0 + duration)
    }

    /// The smallest representable tick this store's time-range sweep uses:
    /// one minute, per the fixed epsilon in `right_open_time_range`.
    #[inline]
    pub fn one_tick() -> Duration {
        Duration::from_secs(60)
    }

    /// Returns `(self - earlier).as_millis()` as a float, or `0.0` if
    /// `earlier` is later than `self` (clock skew / malformed input).
    #[inline]
    pub fn millis_since(&self, earlier: Timestamp) -> f64 {
        match self.0.duration_since(earlier.0) {
            Ok(d) => d.as_secs_f64() * 1000.0,
            Err(_) => 0.0,
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self
            .0
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_nanos();
        write!(fmt, "Timestamp({}ns since epoch)", nanos)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::Timestamp;
    use serde::de::{Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};
    use std::time::{Duration, UNIX_EPOCH};

    impl Serialize for Timestamp {
        fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let nanos = self
                .0
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_nanos() as u64;
            nanos.serialize(s)
        }
    }

    impl<'de> Deserialize<'de> for Timestamp {
        fn deserialize<D>(d: D) -> Result<Timestamp, D::Error>
        where
            D: Deserializer<'de>,
        {
            u64::deserialize(d).map(Timestamp::from_unix_nanos)
        }
    }
}
