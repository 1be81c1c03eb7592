// =============================================================================
// Pipeline errors
// =============================================================================

use thiserror::Error;

/// The only condition that aborts signal computation.  Short indicator
/// history is not an error; see `IndicatorSnapshot::missing`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },
}

impl PipelineError {
    pub fn data_unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::DataUnavailable { symbol, .. } => symbol,
        }
    }
}
