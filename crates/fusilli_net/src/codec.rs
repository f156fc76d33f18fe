//! CBOR codec helpers.
//!
//! Thin wrappers around `ciborium` for encoding and decoding wire data. All
//! payloads are CBOR maps keyed by field name, so any CBOR decoder in any
//! language can read the fields without knowing Rust struct ordering.

use ciborium::Value;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::NetError;

/// Encode a value to CBOR bytes.
///
/// # Errors
///
/// Returns [`NetError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, NetError> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)?;
    Ok(bytes)
}

/// Decode a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`NetError::Decode`] if deserialisation fails.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, NetError> {
    Ok(ciborium::de::from_reader(bytes)?)
}

/// Project a serialisable value into a CBOR tree.
///
/// # Errors
///
/// Returns [`NetError::ToValue`] if the value cannot be represented.
pub fn to_value<T: Serialize>(value: &T) -> Result<Value, NetError> {
    Value::serialized(value).map_err(NetError::ToValue)
}

/// Read a typed value out of a CBOR tree.
///
/// # Errors
///
/// Returns [`NetError::FromValue`] on a shape mismatch.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, NetError> {
    value.deserialized().map_err(NetError::FromValue)
}
