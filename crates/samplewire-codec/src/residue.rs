use bytes::{Buf, Bytes, BytesMut};

use crate::format::FormatCodec;
use crate::matrix::SampleMatrix;
use crate::warning::WarningSink;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Bytes received but not yet decoded.
///
/// The residue only grows by appending at the end and only shrinks by
/// removing a consumed prefix, or by an explicit [`clear`](Self::clear).
#[derive(Debug, Clone)]
pub struct ResidualBuffer {
    buf: BytesMut,
}

impl ResidualBuffer {
    /// Create an empty residue.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Append newly received bytes.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// The pending bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discard everything pending.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Decode as much of the residue as `codec` can, leaving the unconsumed tail.
    pub fn decode_with(
        &mut self,
        codec: &FormatCodec,
        warnings: &mut dyn WarningSink,
    ) -> SampleMatrix {
        codec.decode(self, warnings)
    }

    /// Split off the bytes before the next `separator` and drop the separator.
    ///
    /// Returns `None` and leaves the residue untouched when no complete
    /// token is pending.
    pub fn take_until(&mut self, separator: &[u8]) -> Option<Bytes> {
        let pos = find(&self.buf, separator)?;
        let token = self.buf.split_to(pos).freeze();
        self.buf.advance(separator.len());
        Some(token)
    }

    /// Split off the next newline-terminated line, without the newline.
    pub fn take_line(&mut self) -> Option<Bytes> {
        self.take_until(b"\n")
    }
}

impl Default for ResidualBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    match needle {
        [] => None,
        [byte] => haystack.iter().position(|b| b == byte),
        _ => haystack
            .windows(needle.len())
            .position(|window| window == needle),
    }
}
