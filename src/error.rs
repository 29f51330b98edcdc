use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeedtestError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Logger initialization failed: {0}")]
    Logger(#[from] log::SetLoggerError),

    /// Both the primary and the secondary catalog source were unusable.
    #[error("Server directory unavailable (primary: {primary}; secondary: {secondary})")]
    DirectoryUnavailable { primary: String, secondary: String },

    #[error("No servers available")]
    DirectoryEmpty,

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, SpeedtestError>;
