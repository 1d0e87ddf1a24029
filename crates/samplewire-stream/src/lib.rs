//! Non-blocking sample receive/send over any `Read`/`Write` transport.
//!
//! A [`Protocol`] binds one wire format for its lifetime. `receive` drains
//! whatever the transport has ready, buffers partial input, and returns the
//! decoded samples; `send` encodes a matrix and writes it out.
//!
//! Opening, discovering and reconnecting the transport is left to the host.
//! Failures never propagate as errors from `receive`/`send`; they are kept as
//! [`ProtocolWarning`]s.

pub mod config;
pub mod error;
pub mod protocol;
pub mod warning;

pub use config::{
    ProtocolConfig, StreamConfig, DEFAULT_MAX_PENDING_WARNINGS, DEFAULT_READ_CHUNK_SIZE,
};
pub use error::{ProtocolError, Result};
pub use protocol::Protocol;
pub use warning::{Direction, ProtocolWarning};
