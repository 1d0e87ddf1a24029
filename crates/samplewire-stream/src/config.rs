use samplewire_codec::FormatConfig;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default size of each read while draining a source.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;

/// Default number of warnings kept until the host takes them.
pub const DEFAULT_MAX_PENDING_WARNINGS: usize = 64;

/// Buffering behavior of a [`Protocol`](crate::Protocol).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Bytes requested per read while draining. Default: 256.
    pub read_chunk_size: usize,
    /// Warnings kept before the oldest is dropped. Default: 64.
    pub max_pending_warnings: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_pending_warnings: DEFAULT_MAX_PENDING_WARNINGS,
        }
    }
}

/// Wire format plus buffering settings, as found in a device description.
///
/// ```json
/// {"format": "csv", "separator": ";", "stream": {"read_chunk_size": 64}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(flatten)]
    pub format: FormatConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

impl ProtocolConfig {
    /// Parse a configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<FormatConfig> for ProtocolConfig {
    fn from(format: FormatConfig) -> Self {
        Self {
            format,
            stream: StreamConfig::default(),
        }
    }
}
