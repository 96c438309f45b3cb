//! Typed client for the Dropbox HTTP API v2 read endpoints.
//!
//! Covers the five calls the file tools need: folder listing, search,
//! metadata lookup, content download, and the current-account probe used to
//! verify a token at startup. One [`DbxClient`] is created per process and
//! shared; it holds no state beyond the access token and the HTTP client.

mod client;
mod error;
mod types;

pub use client::DbxClient;
pub use error::ApiError;
pub use types::{Account, FileMetadata, FolderMetadata, Metadata};
