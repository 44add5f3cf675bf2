use thiserror::Error;

#[derive(Error, Debug)]
pub enum YtdlrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Input file not found: {0}")]
    MissingInput(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Could not determine media duration: {0}")]
    ProbeFailed(String),

    #[error("Transcoding failed: {0}")]
    TranscodeFailed(String),

    #[error("Vocal separation failed: {0}")]
    SeparationFailed(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, YtdlrError>;
