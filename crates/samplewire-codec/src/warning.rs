/// Recoverable problems found while decoding.
///
/// A warning never stops a decode pass; the offending record or field is
/// skipped and the remaining input is still processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeWarning {
    /// A line could not be read as a structured record.
    #[error("could not parse record: {reason}")]
    InvalidRecord { reason: String },

    /// A configured field was present but held neither a numeric array nor a number.
    #[error("could not read field {name:?} as an array or a number")]
    UnreadableField { name: String },
}

/// Receiver for decode warnings.
pub trait WarningSink {
    /// Record one warning.
    fn warn(&mut self, warning: DecodeWarning);
}

impl WarningSink for Vec<DecodeWarning> {
    fn warn(&mut self, warning: DecodeWarning) {
        self.push(warning);
    }
}

/// Sink that only logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWarnings;

impl WarningSink for LogWarnings {
    fn warn(&mut self, warning: DecodeWarning) {
        tracing::warn!(%warning, "decode warning");
    }
}
