//! Wire-layer error types.

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to encode a value to CBOR.
    #[error("failed to encode message: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),

    /// Failed to decode a value from CBOR.
    #[error("failed to decode message: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),

    /// Failed to project a value into a CBOR tree.
    #[error("failed to build CBOR value: {0}")]
    ToValue(ciborium::value::Error),

    /// Failed to read a typed value out of a CBOR tree.
    #[error("failed to read CBOR value: {0}")]
    FromValue(ciborium::value::Error),

    /// A frame did not have the `[tag, content, …]` shape.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}
