use samplewire_codec::CodecError;

/// Errors that can occur while building a [`Protocol`](crate::Protocol).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The format configuration was rejected.
    #[error("invalid format: {0}")]
    Codec(#[from] CodecError),

    /// The configuration document could not be parsed.
    #[error("invalid protocol config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
