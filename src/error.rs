use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the Shorts-Factory library
#[derive(Error, Debug)]
pub enum ShortsError {
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Missing or unusable inputs. These abort a run before anything is rendered.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("No {kind} assets found in directory: {path}")]
    NoAssets { kind: String, path: PathBuf },

    #[error("Outro asset missing or unreadable: {path} ({reason})")]
    MissingOutro { path: PathBuf, reason: String },

    #[error("Asset directory not readable: {path}")]
    DirectoryUnreadable { path: PathBuf },
}

/// Failures while probing sources or encoding the final container
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Encoder not available: {tool}")]
    EncoderUnavailable { tool: String },

    #[error("Source asset unreadable: {path} ({reason})")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Encoding failed: {reason}")]
    EncodingFailed {
        reason: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Encoder produced no usable output at {path}")]
    EmptyOutput { path: PathBuf },

    #[error("Failed to finalize output {path}: {reason}")]
    FinalizeFailed { path: PathBuf, reason: String },

    #[error("Render task failed: {reason}")]
    TaskFailed { reason: String },
}

/// Content generator failures
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Could not produce unique content after {attempts} attempts")]
    Exhausted { attempts: usize },

    #[error("Generator returned unusable content: {reason}")]
    Unusable { reason: String },

    #[error("Generator request failed: {reason}")]
    RequestFailed { reason: String },
}

/// Publisher failures
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Metadata update failed: {reason}")]
    MetadataFailed { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using ShortsError
pub type Result<T> = std::result::Result<T, ShortsError>;

impl ShortsError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Errors that stop a run before any render attempt
    pub fn is_configuration_fatal(&self) -> bool {
        matches!(self, Self::Asset(_) | Self::Config(_))
    }

    /// Whether rerunning the whole pipeline (with a fresh selection) may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Render(RenderError::EncoderUnavailable { .. }) => false,
            Self::Render(_) => true,
            Self::Content(ContentError::RequestFailed { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Asset(AssetError::MissingOutro { path, .. }) => {
                format!(
                    "The outro clip '{}' is required for every video. Please add it to the background folder.",
                    path.display()
                )
            }
            Self::Asset(AssetError::NoAssets { kind, path }) => {
                format!("No {} files found in '{}'.", kind, path.display())
            }
            Self::Render(RenderError::EncoderUnavailable { tool }) => {
                format!("'{}' was not found on PATH. Please install FFmpeg.", tool)
            }
            Self::Content(ContentError::Exhausted { .. }) => {
                "Failed to generate unique content. Try again later.".to_string()
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

impl RenderError {
    /// Create an encoding failure error
    pub fn encoding_failed(
        reason: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncodingFailed {
            reason: reason.into(),
            stderr,
            exit_code,
        }
    }
}
