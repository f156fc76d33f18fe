//! # fusilli_server
//!
//! The NOODLES scene-state engine and its WebSocket server.
//!
//! One [`Scene`] is the authoritative state of a session: a typed component
//! graph with identifier recycling, reverse reference tracking, deferred
//! deletion, delta-based updates, and method dispatch. Every mutation is
//! broadcast to all connected clients as tagged CBOR messages; a newly
//! connected client receives a topologically ordered introduction it can
//! replay without ever seeing a forward reference.
//!
//! This crate provides:
//!
//! - [`Scene`] — create/update/delete/signal operations and client fan-out.
//! - [`Server`] and [`ServerConfig`] — the accept loop and its settings.
//! - [`Delegate`] — behavior overrides carrying per-component server state.
//! - [`MethodError`] / [`MethodResult`] — the handler contract.

pub mod allocator;
pub mod connection;
pub mod delegate;
pub mod dispatch;
pub mod error;
pub mod refs;
pub mod scene;
pub mod server;

pub use delegate::{BaseDelegate, Delegate, DelegateRegistry};
pub use dispatch::{MethodError, MethodHandler, MethodResult};
pub use error::SceneError;
// Handlers raise these; save embedders a direct fusilli_net dependency.
pub use fusilli_net::MethodException;
pub use scene::Scene;
pub use server::{Server, ServerConfig, ShutdownHandle};
