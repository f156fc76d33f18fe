//! Client method invocation dispatch.
//!
//! Every invoke from a client yields exactly one reply on that connection,
//! whatever happens: parse failures, unknown methods, handler exceptions,
//! and handler panics all become structured `method_exception` replies. A
//! [`MethodException`] raised by a handler crosses the wire verbatim; every
//! other failure is logged server-side and replaced by an opaque internal
//! error.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use ciborium::Value;
use tracing::{debug, error};
use uuid::Uuid;

use fusilli_net::{Frame, MethodException, Reply, codec, tags};
use fusilli_types::{AnyId, Component, InvocationContext};

use crate::error::SceneError;
use crate::scene::Scene;

/// What a handler produces: a result value for the reply, or an error.
pub type MethodResult = Result<Value, MethodError>;

/// A registered method handler. Runs synchronously on the scene task with
/// full mutable access to the scene.
pub type MethodHandler =
    Arc<dyn Fn(&mut Scene, Option<InvocationContext>, Vec<Value>) -> MethodResult + Send + Sync>;

/// How a handler can fail.
#[derive(Debug, thiserror::Error)]
pub enum MethodError {
    /// A structured failure forwarded to the client verbatim.
    #[error(transparent)]
    Exception(#[from] MethodException),

    /// Anything else. Logged with full detail, opaque on the wire.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Scene {
    /// Handle one client invoke payload, always producing a reply.
    pub fn handle_invoke(&mut self, payload: &Value) -> Reply {
        let mut reply = Reply::unparsed();
        match self.invoke_inner(payload, &mut reply) {
            Ok(result) => reply.result = Some(result),
            Err(MethodError::Exception(exception)) => {
                debug!(code = exception.code, "method raised an exception");
                reply.method_exception = Some(exception);
            }
            Err(MethodError::Internal(detail)) => {
                error!(error = ?detail, "serverside error from method");
                reply.method_exception = Some(MethodException::internal_error());
            }
        }
        reply
    }

    fn invoke_inner(&mut self, payload: &Value, reply: &mut Reply) -> MethodResult {
        let invoke: fusilli_net::ClientInvoke = codec::from_value(payload)
            .map_err(|_| MethodError::from(MethodException::parse_error()))?;
        reply.invoke_id = invoke.invoke_id;

        let method_id: AnyId = invoke.method.into();
        let name = match self.registry.get(&method_id).map(|d| d.component()) {
            Some(Component::Method(method)) => method.name.clone(),
            _ => return Err(MethodException::method_not_found().into()),
        };
        let handler = self
            .handlers
            .get(&name)
            .cloned()
            .ok_or_else(|| MethodError::from(MethodException::method_not_found()))?;

        // A panicking handler must not take the scene task down with it.
        panic::catch_unwind(AssertUnwindSafe(|| {
            handler(self, invoke.context, invoke.args)
        }))
        .map_err(|_| MethodError::Internal(anyhow::anyhow!("method handler panicked")))?
    }

    /// Dispatch an invoke received on a connection and queue the reply on
    /// that connection, after any broadcasts the handler produced.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Net`] if the reply cannot be encoded.
    pub fn dispatch_invoke(&mut self, client: Uuid, payload: &Value) -> Result<(), SceneError> {
        let reply = self.handle_invoke(payload);
        let frame = Frame::single(tags::METHOD_REPLY, codec::to_value(&reply)?);
        self.send_to(client, &frame)
    }
}
