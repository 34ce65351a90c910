//! Minimal DENIC RRI client: TLS transport, length-prefixed framing and the
//! LOGIN, CHECK and LOGOUT orders.

mod client;
pub mod codec;
mod message;

pub use client::{RriConnection, RriConnector};
pub use message::{Action, Query, Response, ResultCode, PROTOCOL_VERSION};
