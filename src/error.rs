//! Error types for the credential client and the settings store.
//!
//! Messages never include passwords or tokens.

use std::io;
use std::path::PathBuf;

/// Errors from the auth endpoints and the credential prompts.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// A required field was absent; raised before any request is sent.
    #[error("Missing {0}")]
    MissingParameter(&'static str),

    /// The API answered with `{"message": "Unauthorized"}`.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("HTTP {status}: {status_text}")]
    Http { status: u16, status_text: String },

    #[error("Invalid response from API: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Errors from interactive input collection.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Input is not a terminal; pass the value as a flag instead")]
    NotInteractive,

    #[error("Input interrupted")]
    Interrupted,

    #[error("Failed to read input: {0}")]
    Io(io::Error),
}

impl From<dialoguer::Error> for PromptError {
    fn from(err: dialoguer::Error) -> Self {
        match err {
            dialoguer::Error::IO(e) if e.kind() == io::ErrorKind::Interrupted => {
                PromptError::Interrupted
            }
            dialoguer::Error::IO(e) => PromptError::Io(e),
        }
    }
}

/// Errors from reading, writing or deleting the settings files.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,

    #[error("Could not determine current directory: {0}")]
    CurrentDirUnavailable(#[source] io::Error),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} does not contain a JSON object", .path.display())]
    NotAnObject { path: PathBuf },

    #[error("Failed to serialize settings for {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
