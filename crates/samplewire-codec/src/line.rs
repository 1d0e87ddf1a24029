use bytes::{BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::format::{parse_number, write_number, Capabilities, DEFAULT_LINE_SEPARATOR};
use crate::matrix::SampleMatrix;
use crate::residue::ResidualBuffer;

/// Single-channel stream of separator-terminated scalars.
///
/// Wire format:
/// ```text
/// 1.5<sep>2.5<sep>3<sep>...
/// ```
///
/// Tokens that do not parse as a number are dropped; no sentinel is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCodec {
    separator: Vec<u8>,
    emit_all: bool,
}

impl LineCodec {
    pub const CAPABILITIES: Capabilities = Capabilities::DUPLEX;

    /// Create a codec using `separator` between values.
    pub fn new(separator: &str) -> Result<Self> {
        if separator.is_empty() {
            return Err(CodecError::EmptySeparator);
        }
        Ok(Self {
            separator: separator.as_bytes().to_vec(),
            emit_all: false,
        })
    }

    /// Encode every value of channel 0 per call instead of only the first.
    pub fn emit_all(mut self, emit_all: bool) -> Self {
        self.emit_all = emit_all;
        self
    }

    pub fn separator(&self) -> &[u8] {
        &self.separator
    }

    /// Decode all complete tokens into channel 0.
    pub fn decode(&self, residue: &mut ResidualBuffer) -> SampleMatrix {
        let mut matrix = SampleMatrix::with_channels(1);
        while let Some(token) = residue.take_until(&self.separator) {
            match parse_number(&token) {
                Some(value) => matrix.push(0, value),
                None => {
                    tracing::debug!(
                        token = %String::from_utf8_lossy(&token),
                        "dropping malformed value"
                    );
                }
            }
        }
        matrix
    }

    /// Encode channel 0: the first value only, or all of them with `emit_all`.
    pub fn encode(&self, matrix: &SampleMatrix, dst: &mut BytesMut) {
        let Some(values) = matrix.channel(0) else {
            return;
        };
        let count = if self.emit_all { values.len() } else { 1 };
        for &value in values.iter().take(count) {
            write_number(dst, value);
            dst.put_slice(&self.separator);
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self {
            separator: DEFAULT_LINE_SEPARATOR.as_bytes().to_vec(),
            emit_all: false,
        }
    }
}
