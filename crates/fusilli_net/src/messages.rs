//! Protocol records carried inside tagged messages.

use ciborium::Value;
use serde::{Deserialize, Serialize};

use fusilli_types::{InvocationContext, MethodId, SignalId};

/// A signal invocation, broadcast to every client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoke {
    /// The signal being raised.
    pub id: SignalId,
    /// The component the signal is scoped to; absent means the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<InvocationContext>,
    pub signal_data: Vec<Value>,
}

/// A structured, client-visible method failure.
///
/// This is the only failure a handler can surface verbatim; anything else is
/// logged server-side and replaced by a generic internal error on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("method exception {code}: {message:?}")]
pub struct MethodException {
    pub code: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl MethodException {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            data: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The invocation message could not be parsed.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(Self::PARSE_ERROR, "Parse Error")
    }

    /// No such method, or the method has no bound handler.
    #[must_use]
    pub fn method_not_found() -> Self {
        Self::new(Self::METHOD_NOT_FOUND, "Method Not Found")
    }

    /// The handler supplied unusable arguments.
    #[must_use]
    pub fn invalid_params() -> Self {
        Self::new(Self::INVALID_PARAMS, "Invalid Parameters")
    }

    /// The handler failed in a way that must stay opaque to clients.
    #[must_use]
    pub fn internal_error() -> Self {
        Self::new(Self::INTERNAL_ERROR, "Internal Error")
    }
}

/// Reply to a method invocation, sent only on the invoking connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Echo of the client's invocation id; `"-1"` when it never parsed.
    pub invoke_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_exception: Option<MethodException>,
}

impl Reply {
    /// The placeholder reply used until an invocation id is known.
    #[must_use]
    pub fn unparsed() -> Self {
        Self {
            invoke_id: "-1".to_string(),
            result: None,
            method_exception: None,
        }
    }
}

/// The document update content: all current method and signal identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub methods_list: Vec<MethodId>,
    pub signals_list: Vec<SignalId>,
}

/// The first message a connecting client sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientIntro {
    pub client_name: String,
}

/// A parsed client method invocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientInvoke {
    pub method: MethodId,
    pub invoke_id: String,
    #[serde(default)]
    pub context: Option<InvocationContext>,
    pub args: Vec<Value>,
}
