// ABOUTME: Error types for output handling operations
// ABOUTME: Covers serialization of records and graphs and writing them out

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Unsupported output format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Write error: {message}")]
    WriteError { message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    YamlSerializationError(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OutputError>;
