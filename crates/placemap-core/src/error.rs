use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a search provider binding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned status {0}")]
    Status(String),

    #[error("could not decode provider response: {0}")]
    Decode(String),
}

/// User-facing outcome of a search that did not yield places.
///
/// The `Display` text is the fixed message surfaced in the view's `error` field.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("provider unavailable")]
    ProviderUnavailable,

    #[error("no places found")]
    NoPlacesFound,

    #[error("search failed, please try again")]
    Failed,
}
