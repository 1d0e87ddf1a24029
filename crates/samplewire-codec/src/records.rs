use std::collections::HashSet;

use bytes::BytesMut;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::format::Capabilities;
use crate::matrix::SampleMatrix;
use crate::residue::ResidualBuffer;
use crate::warning::{DecodeWarning, WarningSink};

/// Newline-terminated JSON objects keyed by channel name.
///
/// Decoding reads one object per line; channel `j` is filled from the field
/// named by `names[j]`, wherever it sits in the object. A field may hold an
/// array of samples or a single sample. `null` stands for NaN.
///
/// Encoding is not line-oriented: one call writes the whole matrix as a
/// single object mapping each name to an array of that channel's samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCodec {
    names: Vec<String>,
}

impl RecordCodec {
    pub const CAPABILITIES: Capabilities = Capabilities::DUPLEX;

    /// Create a codec for the given ordered, distinct channel names.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(CodecError::MissingChannelNames);
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(CodecError::DuplicateChannelName(name.clone()));
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Decode every complete line as one record.
    ///
    /// The result always has one channel per configured name. Records that are
    /// not JSON objects, and fields that hold neither numbers nor arrays of
    /// numbers, are reported to `warnings` and skipped.
    pub fn decode(
        &self,
        residue: &mut ResidualBuffer,
        warnings: &mut dyn WarningSink,
    ) -> SampleMatrix {
        let mut matrix = SampleMatrix::with_channels(self.names.len());
        while let Some(line) = residue.take_line() {
            if line.trim_ascii().is_empty() {
                continue;
            }

            let record = match serde_json::from_slice::<Value>(&line) {
                Ok(Value::Object(record)) => record,
                Ok(other) => {
                    warnings.warn(DecodeWarning::InvalidRecord {
                        reason: format!("expected an object, found {}", kind(&other)),
                    });
                    continue;
                }
                Err(err) => {
                    warnings.warn(DecodeWarning::InvalidRecord {
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            for (index, name) in self.names.iter().enumerate() {
                let Some(field) = record.get(name) else {
                    continue;
                };
                match read_field(field) {
                    Some(values) => matrix.ensure_channel(index).extend(values),
                    None => warnings.warn(DecodeWarning::UnreadableField { name: name.clone() }),
                }
            }
            tracing::trace!(fields = record.len(), "decoded record");
        }
        matrix
    }

    /// Encode the whole matrix as one JSON object.
    ///
    /// Names without a matching channel map to an empty array; channels
    /// beyond the configured names are ignored.
    pub fn encode(&self, matrix: &SampleMatrix, dst: &mut BytesMut) -> Result<()> {
        let snapshot = Snapshot {
            names: &self.names,
            matrix,
        };
        let encoded = serde_json::to_vec(&snapshot)?;
        dst.extend_from_slice(&encoded);
        Ok(())
    }
}

/// Borrowed view serialized as `{name: [samples...], ...}` in name order.
struct Snapshot<'a> {
    names: &'a [String],
    matrix: &'a SampleMatrix,
}

impl Serialize for Snapshot<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for (index, name) in self.names.iter().enumerate() {
            let samples = self.matrix.channel(index).unwrap_or(&[]);
            map.serialize_entry(name, samples)?;
        }
        map.end()
    }
}

/// All-or-nothing: one unreadable array element rejects the whole field.
fn read_field(field: &Value) -> Option<Vec<f64>> {
    match field {
        Value::Array(items) => items.iter().map(read_sample).collect(),
        scalar => read_sample(scalar).map(|value| vec![value]),
    }
}

fn read_sample(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        Value::Null => Some(f64::NAN),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
