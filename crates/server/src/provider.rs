//! Storage provider seam between the tools and the Dropbox client.
//!
//! The tools only need four read operations, so they are expressed as a
//! trait object. Construction takes the provider explicitly; tests substitute
//! an in-memory implementation.

use async_trait::async_trait;
use dbx_api::{ApiError, DbxClient, Metadata};

/// The read operations the file tools require of a storage backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// List one page of a folder, `""` meaning the account root.
    async fn list_folder(&self, path: &str, limit: u32) -> Result<Vec<Metadata>, ApiError>;

    /// Search file names and content.
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Metadata>, ApiError>;

    /// Fetch metadata for a single path.
    async fn get_metadata(&self, path: &str) -> Result<Metadata, ApiError>;

    /// Download the raw bytes of a file.
    async fn download(&self, path: &str) -> Result<Vec<u8>, ApiError>;
}

#[async_trait]
impl Provider for DbxClient {
    async fn list_folder(&self, path: &str, limit: u32) -> Result<Vec<Metadata>, ApiError> {
        DbxClient::list_folder(self, path, limit).await
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Metadata>, ApiError> {
        DbxClient::search(self, query, max_results).await
    }

    async fn get_metadata(&self, path: &str) -> Result<Metadata, ApiError> {
        DbxClient::get_metadata(self, path).await
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        DbxClient::download(self, path).await
    }
}
