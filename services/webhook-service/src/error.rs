use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("read credentials file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse credentials file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid service account private key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),

    #[error("sign token assertion: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("sheets request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sheets api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("worksheet {0:?} not found in spreadsheet")]
    WorksheetNotFound(String),

    #[error("invalid sheets api url: {0}")]
    InvalidUrl(String),
}
