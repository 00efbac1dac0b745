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

//! Trace IDs.
use std::fmt;
use std::sync::Arc;

/// The identifier shared by every span within a trace.
///
/// Like [`SpanId`](crate::SpanId), this is an opaque printable string used
/// only for equality and hashing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TraceId(Arc<str>);

impl TraceId {
    /// Creates a new trace ID from its printable text.
    #[inline]
    pub fn new(id: impl Into<Arc<str>>) -> TraceId {
        TraceId(id.into())
    }

    /// Returns the identifier's text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

impl From<&str> for TraceId {
    #[inline]
    fn from(id: &str) -> TraceId {
        TraceId(Arc::from(id))
    }
}

impl From<String> for TraceId {
    #[inline]
    fn from(id: String) -> TraceId {
        TraceId(Arc::from(id))
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::TraceId;
    use serde::de::{Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    impl Serialize for TraceId {
        fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            s.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for TraceId {
        fn deserialize<D>(d: D) -> Result<TraceId, D::Error>
        where
            D: Deserializer<'de>,
        {
            String::deserialize(d).map(TraceId::from)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn equality_and_hash_only() {
        let a = TraceId::from("trace-1");
        let b = TraceId::from("trace-1".to_string());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "trace-1");
    }
}
