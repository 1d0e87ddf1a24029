//! Decode and encode multi-channel sample streams from measurement devices.
//!
//! # Crate Structure
//!
//! - [`codec`]: Residue buffering and the line, table and JSON-record formats
//! - [`stream`]: The [`Protocol`](stream::Protocol) facade over `Read`/`Write`
//! - [`logging`]: `tracing` subscriber setup for hosts (behind `logging` feature)

/// Re-export codec types.
pub mod codec {
    pub use samplewire_codec::*;
}

/// Re-export stream types.
pub mod stream {
    pub use samplewire_stream::*;
}

#[cfg(feature = "logging")]
pub mod logging;

pub use samplewire_codec::{FormatCodec, FormatConfig, SampleMatrix};
pub use samplewire_stream::{Protocol, ProtocolConfig, ProtocolWarning};
