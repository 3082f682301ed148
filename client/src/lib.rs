//! Memcached text-protocol client over a single persistent byte stream.
//!
//! ```no_run
//! use client::{Connection, StoreOptions};
//!
//! # async fn example() -> client::Result<()> {
//! let mut conn = Connection::open("localhost", 11211).await?;
//! conn.set("foo", "bar", &StoreOptions::default()).await?;
//! let value = conn.get("foo").await?;
//! assert_eq!(value.map(|v| v.data), Some(b"bar".to_vec()));
//! conn.close().await
//! # }
//! ```
//!
//! A connection runs one command at a time and must be discarded after any
//! error for which [`Error::is_fatal`] returns true.

mod commands;
mod connection;
mod stream;

pub use connection::Connection;
pub use protocol::{CasValue, Error, ProtocolError, Reply, Result, StoreOptions, Value};
pub use stream::{BufferedStream, ByteStream};
