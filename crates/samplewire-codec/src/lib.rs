//! Fragment-tolerant wire formats for multi-channel numeric samples.
//!
//! Bytes from a serial or wireless link accumulate in a [`ResidualBuffer`].
//! A [`FormatCodec`] decodes every complete token in it into a
//! [`SampleMatrix`] and leaves any trailing fragment for the next delivery.
//! Three formats are available:
//! - [`LineCodec`]: one scalar per separator-terminated token
//! - [`TableCodec`]: newline-terminated rows of delimited fields
//! - [`RecordCodec`]: one JSON object per line, keyed by channel name
//!
//! Malformed input never aborts a decode pass.

pub mod error;
pub mod format;
pub mod line;
pub mod matrix;
pub mod records;
pub mod residue;
pub mod table;
pub mod warning;

pub use error::{CodecError, Result};
pub use format::{
    Capabilities, FormatCodec, FormatConfig, DEFAULT_FIELD_SEPARATOR, DEFAULT_LINE_SEPARATOR,
};
pub use line::LineCodec;
pub use matrix::SampleMatrix;
pub use records::RecordCodec;
pub use residue::ResidualBuffer;
pub use table::TableCodec;
pub use warning::{DecodeWarning, LogWarnings, WarningSink};
