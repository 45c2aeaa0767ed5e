use thiserror::Error;

/// Why a single source produced nothing usable. The resolver treats every
/// variant the same way: move on to the next source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("parse failure: {0}")]
    Parse(String),
    #[error("invalid time value: {0}")]
    Validation(String),
    #[error("source returned no usable data: {0}")]
    EmptyResult(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            SourceError::Network(format!("request timed out: {error}"))
        } else {
            SourceError::Network(error.to_string())
        }
    }
}
