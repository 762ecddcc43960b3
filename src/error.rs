//! Error type for loading listings, activity and configuration.
//!
//! The transforms in `tree`, `calendar` and `statistics` never fail; only the
//! I/O around them does.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("Git error: {message}")]
    Git { message: String },

    #[error("Not a git repository: {}", path.display())]
    NotGitRepo { path: PathBuf },
}

impl ExplorerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn git(message: impl Into<String>) -> Self {
        Self::Git {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
