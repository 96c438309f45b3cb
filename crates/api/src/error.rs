use thiserror::Error;

/// Errors from Dropbox API calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The access token was rejected by the provider.
    #[error("invalid or expired Dropbox access token")]
    Auth,

    /// The requested path does not exist.
    #[error("path not found: {0}")]
    NotFound(String),

    /// Any other non-success API response.
    #[error("Dropbox API error ({status}): {summary}")]
    Api { status: u16, summary: String },

    /// Transport-level failure (connection, TLS, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
