//! Codec and reply model for the memcached text protocol, client side.
//!
//! Requests are encoded with [`MemcachedCodec`] into a single CRLF-terminated
//! line, followed by a data block for storage commands. Responses are decoded
//! one line at a time; value blocks are length-prefixed by their `VALUE` line
//! and must be read by the caller before being checked with [`decode_block`].

mod error;
mod frame;

pub use error::{Error, ProtocolError, Result};
pub use frame::*;
