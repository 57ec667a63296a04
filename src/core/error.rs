use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    #[error("Remote read failed: {0}")]
    RemoteRead(String),

    #[error("Record '{0}' not found")]
    NotFound(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("No cell is being edited")]
    NotEditing,

    #[error("Delete of '{0}' was not confirmed")]
    DeleteCancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TrackerError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Failures of a remote call, as opposed to local validation or state errors.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteWrite(_) | Self::RemoteRead(_) | Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
