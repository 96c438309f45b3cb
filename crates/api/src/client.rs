//! HTTP client for the Dropbox API v2.
//!
//! All endpoints are POST. RPC endpoints take a JSON body against
//! `api.dropboxapi.com`; the download endpoint lives on
//! `content.dropboxapi.com` and takes its argument in the `Dropbox-API-Arg`
//! header instead. Errors come back as JSON bodies with an `error_summary`
//! string; `path/not_found` summaries are mapped to [`ApiError::NotFound`]
//! so callers never have to inspect summaries themselves.

use crate::error::ApiError;
use crate::types::{
    Account, ErrorResponse, ListFolderResponse, Metadata, SearchResponse,
};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

const API_BASE: &str = "https://api.dropboxapi.com/2";
const CONTENT_BASE: &str = "https://content.dropboxapi.com/2";

/// Dropbox limits for the `limit`/`max_results` request fields.
const LIST_FOLDER_LIMIT: u32 = 2000;
const SEARCH_LIMIT: u32 = 1000;

/// Shared handle to a Dropbox account.
///
/// Holds only the bearer token and the HTTP client; safe to share across
/// concurrent tool invocations without locking.
#[derive(Debug, Clone)]
pub struct DbxClient {
    http: Client,
    token: String,
}

impl DbxClient {
    /// Create a client with the given access token and request timeout.
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            token: token.into(),
        })
    }

    /// List one page of a folder. `path` must be `""` (root) or start with
    /// `/`. The limit is advisory on Dropbox's side; callers truncate.
    pub async fn list_folder(&self, path: &str, limit: u32) -> Result<Vec<Metadata>, ApiError> {
        let body = json!({
            "path": path,
            "limit": limit.clamp(1, LIST_FOLDER_LIMIT),
        });
        let resp: ListFolderResponse = self
            .rpc("files/list_folder", &body)
            .await
            .map_err(|e| map_not_found(e, path))?;
        Ok(resp.entries)
    }

    /// Search file names and content.
    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Metadata>, ApiError> {
        let body = json!({
            "query": query,
            "options": { "max_results": max_results.clamp(1, SEARCH_LIMIT) },
        });
        let resp: SearchResponse = self.rpc("files/search_v2", &body).await?;
        Ok(resp
            .matches
            .into_iter()
            .map(|m| m.metadata.into_inner())
            .collect())
    }

    /// Fetch metadata for a single path.
    pub async fn get_metadata(&self, path: &str) -> Result<Metadata, ApiError> {
        let body = json!({ "path": path });
        self.rpc("files/get_metadata", &body)
            .await
            .map_err(|e| map_not_found(e, path))
    }

    /// Download the raw bytes of a file.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let url = format!("{CONTENT_BASE}/files/download");
        let arg = json!({ "path": path }).to_string();
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .await?;
        let resp = check(resp).await.map_err(|e| map_not_found(e, path))?;
        Ok(resp.bytes().await?.to_vec())
    }

    /// Probe the token by fetching the authenticated account.
    pub async fn current_account(&self) -> Result<Account, ApiError> {
        self.rpc("users/get_current_account", &serde_json::Value::Null)
            .await
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let url = format!("{API_BASE}/{endpoint}");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Ok(check(resp).await?.json::<T>().await?)
    }
}

/// Turn a non-success response into an [`ApiError`].
async fn check(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Auth);
    }
    let body = resp.text().await.unwrap_or_default();
    let summary = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error_summary)
        .unwrap_or(body);
    Err(ApiError::Api {
        status: status.as_u16(),
        summary,
    })
}

/// Rewrite a `path/not_found` API error into [`ApiError::NotFound`] carrying
/// the path the caller asked for.
fn map_not_found(err: ApiError, path: &str) -> ApiError {
    match err {
        ApiError::Api { ref summary, .. } if summary.contains("not_found") => {
            ApiError::NotFound(path.to_string())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_summary_maps_to_not_found() {
        let err = ApiError::Api {
            status: 409,
            summary: "path/not_found/..".into(),
        };
        match map_not_found(err, "/missing.txt") {
            ApiError::NotFound(path) => assert_eq!(path, "/missing.txt"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn other_summaries_pass_through() {
        let err = ApiError::Api {
            status: 409,
            summary: "path/malformed_path/..".into(),
        };
        assert!(matches!(
            map_not_found(err, "/x"),
            ApiError::Api { status: 409, .. }
        ));
    }
}
