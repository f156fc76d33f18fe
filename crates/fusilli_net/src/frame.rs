//! Logical message frames.
//!
//! A logical message is an ordered sequence of `(tag, content)` pairs,
//! encoded as one flat CBOR array `[tag, content, tag, content, …]` and
//! carried in a single WebSocket frame. The server never fragments a logical
//! message across transport frames.

use ciborium::Value;

use crate::codec;
use crate::error::NetError;

/// An ordered sequence of `(tag, content)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pairs: Vec<(u8, Value)>,
}

impl Frame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame holding a single `(tag, content)` pair.
    #[must_use]
    pub fn single(tag: u8, content: Value) -> Self {
        Self {
            pairs: vec![(tag, content)],
        }
    }

    /// Append a `(tag, content)` pair.
    pub fn push(&mut self, tag: u8, content: Value) {
        self.pairs.push((tag, content));
    }

    /// The pairs in order.
    #[must_use]
    pub fn pairs(&self) -> &[(u8, Value)] {
        &self.pairs
    }

    /// The tags in order, for logging.
    #[must_use]
    pub fn tags(&self) -> Vec<u8> {
        self.pairs.iter().map(|(tag, _)| *tag).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encode to the flat CBOR array `[tag, content, tag, content, …]`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Encode`] if serialisation fails.
    pub fn encode(&self) -> Result<Vec<u8>, NetError> {
        let mut flat = Vec::with_capacity(self.pairs.len() * 2);
        for (tag, content) in &self.pairs {
            flat.push(Value::from(*tag));
            flat.push(content.clone());
        }
        codec::encode(&Value::Array(flat))
    }

    /// Decode a flat CBOR array back into pairs.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Decode`] on invalid CBOR and
    /// [`NetError::MalformedFrame`] when the array does not alternate
    /// integer tags and contents.
    pub fn decode(bytes: &[u8]) -> Result<Self, NetError> {
        let value: Value = codec::decode(bytes)?;
        let Value::Array(flat) = value else {
            return Err(NetError::MalformedFrame("not an array".to_string()));
        };
        if flat.len() % 2 != 0 {
            return Err(NetError::MalformedFrame(format!(
                "odd element count {}",
                flat.len()
            )));
        }
        let mut pairs = Vec::with_capacity(flat.len() / 2);
        let mut elements = flat.into_iter();
        while let (Some(tag), Some(content)) = (elements.next(), elements.next()) {
            let Value::Integer(tag) = tag else {
                return Err(NetError::MalformedFrame("tag is not an integer".to_string()));
            };
            let tag = u8::try_from(i128::from(tag))
                .map_err(|_| NetError::MalformedFrame("tag out of range".to_string()))?;
            pairs.push((tag, content));
        }
        Ok(Self { pairs })
    }
}
