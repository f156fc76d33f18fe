//! # fusilli_net
//!
//! The CBOR-over-WebSocket wire contract for the NOODLES scene server.
//!
//! This crate provides:
//!
//! - [`tags`] — the static `(action, kind) → tag` table.
//! - [`frame`] — `[tag, content, …]` logical message frames.
//! - [`codec`] — CBOR serialisation/deserialisation helpers.
//! - [`messages`] — invoke/reply/intro protocol records.
//! - [`projection`] — component wire maps and update deltas.
//! - [`error`] — wire-layer error types.

pub mod codec;
pub mod error;
pub mod frame;
pub mod messages;
pub mod projection;
pub mod tags;

pub use codec::{decode, encode};
pub use error::NetError;
pub use frame::Frame;
pub use messages::{
    ClientIntro, ClientInvoke, DocumentUpdate, Invoke, MethodException, Reply,
};
