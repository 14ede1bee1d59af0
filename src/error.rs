use thiserror::Error;

/// Errors surfaced to the viewer's banners.
#[derive(Error, Debug)]
pub enum ViewerError {
    /// The query matched nothing
    #[error("No records found")]
    NoRecords,

    #[error("Not connected to a database")]
    NotConnected,

    /// Connection form failed its client-side gate
    #[error("Invalid connection form: {0}")]
    InvalidForm(String),

    /// Driver-level failure (connect, run, or row decoding)
    #[error("{0}")]
    Driver(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Some error occurred")]
    BadStatus(u16),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<neo4rs::Error> for ViewerError {
    fn from(e: neo4rs::Error) -> Self {
        ViewerError::Driver(e.to_string())
    }
}

pub type ViewerResult<T> = Result<T, ViewerError>;
