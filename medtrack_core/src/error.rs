//! Errors returned by MedTrack operations.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("file access failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stored medications, users or session could not be (de)serialized
    #[error("malformed JSON data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Form input rejected; the message is shown to the user as-is
    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Auth(String),

    /// The caretaker role can log in but has no features of its own yet
    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}
