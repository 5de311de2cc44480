//! Error types for view loading and rendering.
//!
//! [`ViewError`] covers every failure the view manager can report.
//! [`ViewError::Layout`] means the shared fragments of a set are broken and
//! the set can never be used; [`ViewError::Syntax`] concerns a single page.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for view operations.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A helper function was registered under a name templates cannot call.
    #[error("cannot register helper '{name}': {reason}")]
    Registration { name: String, reason: &'static str },

    /// A directory or file could not be opened or listed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The shared layout of a set failed to load or compile.
    #[error("invalid shared layout for set '{set}': {message}")]
    Layout { set: String, message: String },

    /// A page failed to compile against its layout.
    #[error("syntax error in page '{page}' of set '{set}': {source}")]
    Syntax {
        set: String,
        page: String,
        #[source]
        source: minijinja::Error,
    },

    /// The requested page is not part of the current set.
    #[error("template not found: page '{page}' in set '{}'", set.as_deref().unwrap_or("<none>"))]
    NotFound { set: Option<String>, page: String },

    /// The template engine failed while executing a page.
    #[error("render error: {0}")]
    Render(#[from] minijinja::Error),

    /// A configuration document could not be deserialized.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ViewError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ViewError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn layout(set: &str, message: impl Into<String>) -> Self {
        ViewError::Layout {
            set: set.to_string(),
            message: message.into(),
        }
    }

    /// Returns true for [`ViewError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, ViewError::NotFound { .. })
    }
}

impl From<serde_yaml::Error> for ViewError {
    fn from(err: serde_yaml::Error) -> Self {
        ViewError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ViewError {
    fn from(err: serde_json::Error) -> Self {
        ViewError::Config(err.to_string())
    }
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;
