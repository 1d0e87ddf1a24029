use bytes::{BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::format::{parse_number, write_number, Capabilities, DEFAULT_FIELD_SEPARATOR};
use crate::matrix::SampleMatrix;
use crate::residue::ResidualBuffer;

/// Newline-terminated rows of separator-delimited fields, one channel per column.
///
/// Wire format:
/// ```text
/// 1,2,3\n
/// 4,5,6\n
/// ```
///
/// A field that does not parse is stored as NaN so every column keeps its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCodec {
    separator: String,
}

impl TableCodec {
    pub const CAPABILITIES: Capabilities = Capabilities::DUPLEX;

    /// Create a codec using `separator` between fields.
    pub fn new(separator: &str) -> Result<Self> {
        if separator.is_empty() {
            return Err(CodecError::EmptySeparator);
        }
        if separator.contains('\n') {
            return Err(CodecError::SeparatorContainsNewline(separator.to_string()));
        }
        Ok(Self {
            separator: separator.to_string(),
        })
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Decode all complete rows.
    ///
    /// A column first seen partway through is back-filled with NaN up to the
    /// rows already decoded, so it lines up with its siblings.
    pub fn decode(&self, residue: &mut ResidualBuffer) -> SampleMatrix {
        let mut matrix = SampleMatrix::new();
        while let Some(line) = residue.take_line() {
            let line = String::from_utf8_lossy(&line);
            // Whitespace separators are significant, so only the CR of a CRLF is stripped.
            let line = line.strip_suffix('\r').unwrap_or(&line);
            // A row of only separators is a sample period of empty fields, not a blank line.
            if !line.contains(self.separator.as_str()) && line.trim().is_empty() {
                continue;
            }

            let row = matrix.row_count();
            for (column, field) in line.split(self.separator.as_str()).enumerate() {
                let value = parse_number(field.as_bytes()).unwrap_or(f64::NAN);
                let channel = matrix.ensure_channel(column);
                if channel.len() < row {
                    channel.resize(row, f64::NAN);
                }
                channel.push(value);
            }
            tracing::trace!(row, "decoded table row");
        }
        matrix
    }

    /// Encode all channels row by row until every channel is exhausted.
    ///
    /// A channel that runs out early leaves an empty field in later rows.
    pub fn encode(&self, matrix: &SampleMatrix, dst: &mut BytesMut) {
        let mut columns: Vec<_> = matrix.channels().iter().map(|c| c.iter()).collect();
        loop {
            let row_start = dst.len();
            let mut data_left = false;
            for (index, column) in columns.iter_mut().enumerate() {
                if index > 0 {
                    dst.put_slice(self.separator.as_bytes());
                }
                if let Some(&value) = column.next() {
                    data_left = true;
                    write_number(dst, value);
                }
            }
            if !data_left {
                dst.truncate(row_start);
                return;
            }
            dst.put_u8(b'\n');
        }
    }
}

impl Default for TableCodec {
    fn default() -> Self {
        Self {
            separator: DEFAULT_FIELD_SEPARATOR.to_string(),
        }
    }
}
