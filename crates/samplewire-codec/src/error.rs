/// Errors that can occur while building a codec or encoding samples.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A separator must contain at least one byte.
    #[error("separator must not be empty")]
    EmptySeparator,

    /// Table rows are newline-terminated, so the field separator cannot contain one.
    #[error("field separator {0:?} must not contain a newline")]
    SeparatorContainsNewline(String),

    /// Structured records need at least one channel name.
    #[error("structured lines require at least one channel name")]
    MissingChannelNames,

    /// Channel names must be distinct.
    #[error("duplicate channel name {0:?}")]
    DuplicateChannelName(String),

    /// A record could not be serialized.
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
