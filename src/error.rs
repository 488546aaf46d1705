//! Error types and handling for Shrinkem

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Shrinkem operations
pub type Result<T> = std::result::Result<T, ShrinkError>;

/// Main error type for Shrinkem operations
#[derive(Debug, Error)]
pub enum ShrinkError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image decode/encode errors
    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Neither a maximum width nor a maximum height was given
    #[error("You must specify size or width and/or height")]
    MissingBounds,

    /// Invalid resize parameters
    #[error("Invalid resize parameters: {message}")]
    InvalidParameters { message: String },

    /// Root directory does not exist
    #[error("Root path does not exist: {path:?}")]
    RootNotFound { path: PathBuf },

    /// Root path exists but is not a directory
    #[error("Root path is not a directory: {path:?}")]
    RootNotDirectory { path: PathBuf },

    /// A temp file from an earlier run is in the way
    #[error("tmp file already exists: {path:?}")]
    TempFileExists { path: PathBuf },

    /// Directory walk errors (permissions, symlink loops)
    #[error("Directory walk error: {0}")]
    WalkError(#[from] walkdir::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),

    /// Runtime errors (blocking task panics, missing terminal)
    #[error("System error: {message}")]
    SystemError { message: String },
}

impl ShrinkError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new invalid parameters error
    pub fn invalid_parameters<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create a new system error
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::SystemError {
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        match self {
            // Raised before any file is touched
            Self::ConfigError { .. }
            | Self::MissingBounds
            | Self::InvalidParameters { .. }
            | Self::RootNotFound { .. }
            | Self::RootNotDirectory { .. }
            | Self::SerdeError(_) => true,

            // Caught at the file boundary
            Self::IoError(_)
            | Self::ImageError(_)
            | Self::TempFileExists { .. }
            | Self::WalkError(_)
            | Self::SystemError { .. } => false,
        }
    }

    /// Short reason used in per-file `[error]` lines
    pub fn user_message(&self) -> String {
        match self {
            Self::IoError(e) => e.to_string(),
            Self::ImageError(e) => e.to_string(),
            Self::WalkError(e) => e.to_string(),
            Self::TempFileExists { .. } => "tmp file already exists".to_string(),
            Self::ConfigError { message }
            | Self::InvalidParameters { message }
            | Self::SystemError { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for ShrinkError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for ShrinkError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

impl From<tokio::task::JoinError> for ShrinkError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::system(format!("Task join error: {}", err))
    }
}

/// Error context extension for adding file path information
pub trait ErrorContext<T> {
    /// Prefix an I/O failure with the path it happened on
    fn with_file_context(self, file: &std::path::Path) -> Result<T>;
}

impl<T> ErrorContext<T> for std::result::Result<T, std::io::Error> {
    fn with_file_context(self, file: &std::path::Path) -> Result<T> {
        self.map_err(|e| {
            ShrinkError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {}", file.display(), e),
            ))
        })
    }
}
