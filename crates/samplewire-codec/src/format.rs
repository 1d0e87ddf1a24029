use std::fmt::Write as _;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::line::LineCodec;
use crate::matrix::SampleMatrix;
use crate::records::RecordCodec;
use crate::residue::ResidualBuffer;
use crate::table::TableCodec;
use crate::warning::WarningSink;

/// Default value separator for [`LineCodec`].
pub const DEFAULT_LINE_SEPARATOR: &str = "\n";

/// Default field separator for [`TableCodec`].
pub const DEFAULT_FIELD_SEPARATOR: &str = ",";

/// Which directions a format supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub send: bool,
    pub receive: bool,
}

impl Capabilities {
    /// Supports both encoding and decoding.
    pub const DUPLEX: Self = Self {
        send: true,
        receive: true,
    };

    pub const SEND_ONLY: Self = Self {
        send: true,
        receive: false,
    };

    pub const RECEIVE_ONLY: Self = Self {
        send: false,
        receive: true,
    };

    /// Directions supported by both `self` and `other`.
    pub fn intersect(self, other: Self) -> Self {
        Self {
            send: self.send && other.send,
            receive: self.receive && other.receive,
        }
    }
}

/// Construction-time description of a wire format.
///
/// Deserializes from an object tagged by `format`, e.g.
/// `{"format": "csv", "separator": ";"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum FormatConfig {
    /// One value per separator-terminated token.
    #[serde(alias = "simple")]
    LineDelimited {
        #[serde(default = "default_line_separator")]
        separator: String,
        /// Encode every value of channel 0 instead of only the first.
        #[serde(default)]
        emit_all: bool,
    },
    /// Newline-terminated rows of separator-delimited fields.
    #[serde(alias = "csv")]
    DelimitedTable {
        #[serde(default = "default_field_separator")]
        separator: String,
    },
    /// One JSON object per line, keyed by channel name.
    #[serde(alias = "json")]
    StructuredLines { names: Vec<String> },
}

fn default_line_separator() -> String {
    DEFAULT_LINE_SEPARATOR.to_string()
}

fn default_field_separator() -> String {
    DEFAULT_FIELD_SEPARATOR.to_string()
}

/// A wire format bound to its configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatCodec {
    LineDelimited(LineCodec),
    DelimitedTable(TableCodec),
    StructuredLines(RecordCodec),
}

impl FormatCodec {
    /// Build and validate a codec from its configuration.
    pub fn from_config(config: &FormatConfig) -> Result<Self> {
        let codec: FormatCodec = match config {
            FormatConfig::LineDelimited {
                separator,
                emit_all,
            } => LineCodec::new(separator)?.emit_all(*emit_all).into(),
            FormatConfig::DelimitedTable { separator } => TableCodec::new(separator)?.into(),
            FormatConfig::StructuredLines { names } => RecordCodec::new(names.clone())?.into(),
        };
        Ok(codec)
    }

    /// Short name used in logs and warnings.
    pub fn name(&self) -> &'static str {
        match self {
            FormatCodec::LineDelimited(_) => "line_delimited",
            FormatCodec::DelimitedTable(_) => "delimited_table",
            FormatCodec::StructuredLines(_) => "structured_lines",
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            FormatCodec::LineDelimited(_) => LineCodec::CAPABILITIES,
            FormatCodec::DelimitedTable(_) => TableCodec::CAPABILITIES,
            FormatCodec::StructuredLines(_) => RecordCodec::CAPABILITIES,
        }
    }

    pub fn can_send(&self) -> bool {
        self.capabilities().send
    }

    pub fn can_receive(&self) -> bool {
        self.capabilities().receive
    }

    /// Decode every complete token in `residue`, consuming it.
    pub fn decode(
        &self,
        residue: &mut ResidualBuffer,
        warnings: &mut dyn WarningSink,
    ) -> SampleMatrix {
        match self {
            FormatCodec::LineDelimited(codec) => codec.decode(residue),
            FormatCodec::DelimitedTable(codec) => codec.decode(residue),
            FormatCodec::StructuredLines(codec) => codec.decode(residue, warnings),
        }
    }

    /// Encode `matrix` and append the wire bytes to `dst`.
    pub fn encode(&self, matrix: &SampleMatrix, dst: &mut BytesMut) -> Result<()> {
        match self {
            FormatCodec::LineDelimited(codec) => {
                codec.encode(matrix, dst);
                Ok(())
            }
            FormatCodec::DelimitedTable(codec) => {
                codec.encode(matrix, dst);
                Ok(())
            }
            FormatCodec::StructuredLines(codec) => codec.encode(matrix, dst),
        }
    }
}

impl From<LineCodec> for FormatCodec {
    fn from(codec: LineCodec) -> Self {
        FormatCodec::LineDelimited(codec)
    }
}

impl From<TableCodec> for FormatCodec {
    fn from(codec: TableCodec) -> Self {
        FormatCodec::DelimitedTable(codec)
    }
}

impl From<RecordCodec> for FormatCodec {
    fn from(codec: RecordCodec) -> Self {
        FormatCodec::StructuredLines(codec)
    }
}

/// Parse a trimmed UTF-8 token as `f64`.
///
/// Accepts what `f64::from_str` accepts, including `inf`, `infinity` and `nan`
/// in any case so encoded non-finite values read back. Type suffixes (`1d`)
/// and hex floats are rejected.
pub(crate) fn parse_number(token: &[u8]) -> Option<f64> {
    std::str::from_utf8(token).ok()?.trim().parse().ok()
}

/// Write `value` in shortest round-trip form, always with a decimal point or exponent.
pub(crate) fn write_number(dst: &mut BytesMut, value: f64) {
    // Writing into BytesMut cannot fail.
    let _ = write!(dst, "{value:?}");
}
