//! Serde models of the Dropbox API v2 wire format.
//!
//! Only the fields the file tools consume are modeled. Dropbox tags entry
//! variants with a `".tag"` discriminator and wraps search hits in a
//! `matches[].metadata.metadata` envelope; both are unwrapped here so callers
//! see plain [`Metadata`] values.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One entry from a listing, search, or metadata lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum Metadata {
    File(FileMetadata),
    Folder(FolderMetadata),
    /// Tombstone for a deleted path. Never surfaced by the tools.
    Deleted { name: String },
}

impl Metadata {
    /// Lowercased full path of the entry, when it has one.
    pub fn path_lower(&self) -> Option<&str> {
        match self {
            Metadata::File(f) => Some(&f.path_lower),
            Metadata::Folder(f) => Some(&f.path_lower),
            Metadata::Deleted { .. } => None,
        }
    }
}

/// Metadata for a file entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub path_lower: String,
    pub path_display: String,
    pub id: String,
    pub size: u64,
    /// Last time the file content changed on Dropbox's servers.
    pub server_modified: DateTime<Utc>,
    /// Modification time reported by the uploading client.
    pub client_modified: DateTime<Utc>,
    pub rev: String,
    pub content_hash: Option<String>,
}

/// Metadata for a folder entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderMetadata {
    pub name: String,
    pub path_lower: String,
    pub path_display: String,
    pub id: String,
}

/// The authenticated account, from `users/get_current_account`.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub email: String,
}

/// Response from `files/list_folder`. Continuation cursors are ignored; the
/// tools only ever read the first page.
#[derive(Debug, Deserialize)]
pub(crate) struct ListFolderResponse {
    pub entries: Vec<Metadata>,
}

/// Response from `files/search_v2`.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub matches: Vec<SearchMatch>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchMatch {
    pub metadata: SearchMatchMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub(crate) enum SearchMatchMetadata {
    Metadata { metadata: Metadata },
}

impl SearchMatchMetadata {
    pub fn into_inner(self) -> Metadata {
        match self {
            SearchMatchMetadata::Metadata { metadata } => metadata,
        }
    }
}

/// Error body returned with non-success statuses on RPC endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error_summary: String,
}
