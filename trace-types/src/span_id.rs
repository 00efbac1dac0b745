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

//! Span IDs.
use std::fmt;
use std::sync::Arc;

/// The unique identifier of a span within the process.
///
/// `SpanId`s are opaque printable strings; the store only ever needs to
/// compare and hash them, never interpret their bytes. Cloning is cheap -
/// the identifier text is reference counted.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpanId(Arc<str>);

impl SpanId {
    /// Creates a new span ID from its printable text.
    #[inline]
    pub fn new(id: impl Into<Arc<str>>) -> SpanId {
        SpanId(id.into())
    }

    /// Returns the identifier's text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

impl From<&str> for SpanId {
    #[inline]
    fn from(id: &str) -> SpanId {
        SpanId(Arc::from(id))
    }
}

impl From<String> for SpanId {
    #[inline]
    fn from(id: String) -> SpanId {
        SpanId(Arc::from(id))
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::SpanId;
    use serde::de::{Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    impl Serialize for SpanId {
        fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            s.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for SpanId {
        fn deserialize<D>(d: D) -> Result<SpanId, D::Error>
        where
            D: Deserializer<'de>,
        {
            String::deserialize(d).map(SpanId::from)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn equality_and_hash_only() {
        let a = SpanId::from("abc123");
        let b = SpanId::from("abc123".to_string());
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "abc123");
        assert_eq!(a.to_string(), "abc123");
    }

    #[test]
    fn clone_is_cheap_reference() {
        let a = SpanId::from("shared");
        let b = a.clone();
        assert_eq!(a, b);
    }
}
