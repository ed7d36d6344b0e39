//! Error types for authentication and catalog operations

use std::path::PathBuf;

use crate::api::query::{ListStatus, SortOption};

/// Errors from the MAL client library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("\"{0}\" is needed as a parameter or an environment variable")]
    MissingConfiguration(String),

    #[error("no saved tokens found at {}; log in first to generate them", .0.display())]
    MissingTokens(PathBuf),

    #[error("the catalog client needs an authenticator or a token file")]
    MissingAuthenticator,

    #[error("\"{0}\" is not a valid anime status, expected one of: {}", ListStatus::valid_values())]
    InvalidAnimeStatus(String),

    #[error("\"{0}\" is not a valid sort option, expected one of: {}", SortOption::valid_values())]
    InvalidSortOption(String),

    #[error("\"{0}\" is not a valid query field")]
    InvalidQueryField(String),

    #[error("client and server states do not match")]
    StateMismatch,

    #[error("authorization redirect carried no code: {0}")]
    MissingAuthorizationCode(String),

    #[error("browser automation failed: {0}")]
    Browser(String),

    #[error("token endpoint returned {status}: {body}")]
    TokenResponse { status: u16, body: String },

    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;
