use thiserror::Error;

/// Precondition failures raised by the analytical core.
///
/// Eligibility rejections are not errors; see `analysis::player_filter::Rejection`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("{player}: {window} game history is empty")]
    EmptyGameHistory { player: String, window: &'static str },

    #[error("{player}: no statistics supplied")]
    MissingStats { player: String },

    #[error("{player}: game history is not ordered newest-first")]
    UnorderedGameHistory { player: String },

    #[error("{player}: last-5 games are not a prefix of last-10 games")]
    WindowMismatch { player: String },

    #[error("Invalid odds: {0}")]
    InvalidOdds(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for AnalyzerError
pub type Result<T> = std::result::Result<T, AnalyzerError>;
