use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Placeholder path used by operations that work on in-memory source text.
pub const INPUT_PLACEHOLDER: &str = "<input>";

/// Error types for the library
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("No class declaration found in '{}'", path.display())]
    NoClassDeclaration { path: PathBuf },

    #[error("Output directory does not exist: {}", dir.display())]
    DestinationMissing { dir: PathBuf },

    #[error("Output directory is not writable: {} ({reason})", dir.display())]
    DestinationNotWritable { dir: PathBuf, reason: String },

    #[error("Failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            path: PathBuf::from(INPUT_PLACEHOLDER),
            message: message.into(),
        }
    }

    pub(crate) fn no_class() -> Self {
        Error::NoClassDeclaration {
            path: PathBuf::from(INPUT_PLACEHOLDER),
        }
    }

    /// Attaches a real file path to errors raised while working on in-memory text.
    pub fn at(self, file: &Path) -> Self {
        match self {
            Error::Parse { message, .. } => Error::Parse {
                path: file.to_path_buf(),
                message,
            },
            Error::NoClassDeclaration { .. } => Error::NoClassDeclaration {
                path: file.to_path_buf(),
            },
            other => other,
        }
    }

    /// Stable identifier for the error kind, handy for batch reports.
    pub fn kind_code(&self) -> &'static str {
        match self {
            Error::Io { .. } => "IO_ERROR",
            Error::Parse { .. } => "PARSE_ERROR",
            Error::NoClassDeclaration { .. } => "NO_CLASS_DECLARATION",
            Error::DestinationMissing { .. } => "DESTINATION_MISSING",
            Error::DestinationNotWritable { .. } => "DESTINATION_NOT_WRITABLE",
            Error::Write { .. } => "WRITE_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}
