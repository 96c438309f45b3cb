//! Tool implementations for the Dropbox MCP server.

use crate::DropboxServer;
use crate::extract::{self, ExtractError};
use crate::provider::Provider;
use dbx_api::{ApiError, Metadata};
use rmcp::{
    handler::server::wrapper::Parameters,
    schemars::{self, JsonSchema},
    tool, tool_router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_MAX_FILES: u32 = 20;
const DEFAULT_MAX_RESULTS: u32 = 10;
const DEFAULT_MAX_LENGTH: usize = 5000;
const DEFAULT_CONTEXT_CHARS: usize = 100;

/// Extensions that get a content preview in listings.
const PREVIEW_EXTENSIONS: &[&str] = &["txt", "md", "py", "js"];
const PREVIEW_CHARS: usize = 200;

/// Parameters for listing a folder.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFilesParams {
    /// Folder to list; empty or absent for the account root.
    pub folder_path: Option<String>,
    /// Maximum number of entries to return (default 20).
    pub max_files: Option<u32>,
}

/// Parameters for searching files by name or content.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchFilesParams {
    /// Text to match against file names and content.
    pub query: String,
    /// "all", a shorthand ("pdf", "docx", "txt"), or a comma-separated
    /// list of extensions (default "all").
    pub file_types: Option<String>,
    /// Maximum number of results (default 10).
    pub max_results: Option<u32>,
}

/// Parameters for reading a file.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFileParams {
    /// Full path of the file in Dropbox.
    pub file_path: String,
    /// Maximum characters to return, 0 for unlimited (default 5000).
    pub max_length: Option<usize>,
}

/// Parameters for fetching file metadata.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFileInfoParams {
    /// Full path of the file or folder.
    pub file_path: String,
}

/// Parameters for searching inside files.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchFileContentParams {
    /// Paths of the files to search in.
    pub file_paths: Vec<String>,
    /// Text to search for (case-insensitive).
    pub query: String,
    /// Characters of context around each match (default 100).
    pub context_chars: Option<usize>,
}

/// One listing entry.
#[derive(Debug, Serialize)]
struct EntryInfo {
    name: String,
    path: String,
    size: u64,
    is_folder: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<String>,
}

/// One name-search hit.
#[derive(Debug, Serialize)]
struct SearchHit {
    file_path: String,
    file_name: String,
    file_size: u64,
    modified: String,
}

/// Result of reading a file.
#[derive(Debug, Serialize)]
struct ReadFileResult {
    path: String,
    content: String,
    /// Character count of the extracted text before truncation.
    total_chars: usize,
    truncated: bool,
}

/// Full metadata returned by `get_file_info`.
#[derive(Debug, Serialize)]
struct FileInfo {
    name: String,
    path: String,
    size: u64,
    is_folder: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_hash: Option<String>,
}

/// Matches found in one file, or the reason it could not be searched.
#[derive(Debug, Serialize)]
struct ContentSearchResult {
    file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches: Option<Vec<ContentMatch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_matches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// A single occurrence of the query inside a file.
#[derive(Debug, Serialize)]
struct ContentMatch {
    /// Character offset of the match in the extracted text.
    position: usize,
    /// 1-based line number.
    line: usize,
    context: String,
}

/// Failure downloading or decoding one file.
#[derive(Error, Debug)]
enum ReadError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[tool_router]
impl DropboxServer {
    /// Create a server over the given storage provider.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            tool_router: Self::tool_router(),
        }
    }

    /// List files and folders in a directory.
    #[tool(description = "List files and folders in a Dropbox directory")]
    async fn list_files(
        &self,
        Parameters(params): Parameters<ListFilesParams>,
    ) -> Result<String, String> {
        let max_files = params.max_files.unwrap_or(DEFAULT_MAX_FILES);
        if max_files == 0 {
            return serde_json::to_string_pretty(&Vec::<EntryInfo>::new())
                .map_err(|e| e.to_string());
        }
        let folder = normalize_path(params.folder_path.as_deref().unwrap_or(""));
        let entries = self
            .provider
            .list_folder(&folder, max_files)
            .await
            .map_err(|e| e.to_string())?;

        let mut infos = Vec::new();
        for entry in entries.into_iter().take(max_files as usize) {
            match entry {
                Metadata::File(f) => {
                    let preview = if wants_preview(&f.path_lower) {
                        Some(self.preview(&f.path_lower).await)
                    } else {
                        None
                    };
                    infos.push(EntryInfo {
                        name: f.name,
                        path: f.path_lower,
                        size: f.size,
                        is_folder: false,
                        modified: Some(f.server_modified.to_rfc3339()),
                        preview,
                    });
                }
                Metadata::Folder(f) => infos.push(EntryInfo {
                    name: f.name,
                    path: f.path_lower,
                    size: 0,
                    is_folder: true,
                    modified: None,
                    preview: None,
                }),
                Metadata::Deleted { .. } => {}
            }
        }
        serde_json::to_string_pretty(&infos).map_err(|e| e.to_string())
    }

    /// Search for files by name or content, filtered by extension.
    #[tool(description = "Search Dropbox for files by name or content, filtered by file type")]
    async fn search_files(
        &self,
        Parameters(params): Parameters<SearchFilesParams>,
    ) -> Result<String, String> {
        let max_results = params.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let extensions = parse_file_types(params.file_types.as_deref().unwrap_or("all"));
        // Oversample: the provider search is not extension-aware.
        let candidates = self
            .provider
            .search(&params.query, max_results.saturating_mul(2))
            .await
            .map_err(|e| e.to_string())?;

        let mut hits = Vec::new();
        for entry in candidates {
            if hits.len() >= max_results as usize {
                break;
            }
            if let Metadata::File(f) = entry {
                if extensions.iter().any(|ext| f.path_lower.ends_with(ext.as_str())) {
                    hits.push(SearchHit {
                        file_path: f.path_lower,
                        file_name: f.name,
                        file_size: f.size,
                        modified: f.server_modified.to_rfc3339(),
                    });
                }
            }
        }
        serde_json::to_string_pretty(&hits).map_err(|e| e.to_string())
    }

    /// Read a file's content as text.
    #[tool(description = "Read a file's content as text (pdf, docx/doc, and plain-text formats)")]
    async fn read_file(
        &self,
        Parameters(params): Parameters<ReadFileParams>,
    ) -> Result<String, String> {
        let max_length = params.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
        let path = normalize_path(&params.file_path);
        let content = self.read_content(&path).await.map_err(|e| e.to_string())?;

        let total_chars = content.chars().count();
        let (content, truncated) = if max_length > 0 && total_chars > max_length {
            (content.chars().take(max_length).collect(), true)
        } else {
            (content, false)
        };
        let result = ReadFileResult {
            path,
            content,
            total_chars,
            truncated,
        };
        serde_json::to_string_pretty(&result).map_err(|e| e.to_string())
    }

    /// Get detailed metadata about a file or folder.
    #[tool(description = "Get detailed metadata about a file or folder")]
    async fn get_file_info(
        &self,
        Parameters(params): Parameters<GetFileInfoParams>,
    ) -> Result<String, String> {
        let path = normalize_path(&params.file_path);
        let info = match self
            .provider
            .get_metadata(&path)
            .await
            .map_err(|e| e.to_string())?
        {
            Metadata::File(f) => FileInfo {
                name: f.name,
                path: f.path_lower,
                size: f.size,
                is_folder: false,
                server_modified: Some(f.server_modified.to_rfc3339()),
                client_modified: Some(f.client_modified.to_rfc3339()),
                rev: Some(f.rev),
                content_hash: f.content_hash,
            },
            Metadata::Folder(f) => FileInfo {
                name: f.name,
                path: f.path_lower,
                size: 0,
                is_folder: true,
                server_modified: None,
                client_modified: None,
                rev: None,
                content_hash: None,
            },
            Metadata::Deleted { name } => return Err(format!("path was deleted: {name}")),
        };
        serde_json::to_string_pretty(&info).map_err(|e| e.to_string())
    }

    /// Search for text inside specific files.
    #[tool(
        description = "Search for text inside specific files, returning matches with surrounding context. Failures are reported per file"
    )]
    async fn search_file_content(
        &self,
        Parameters(params): Parameters<SearchFileContentParams>,
    ) -> Result<String, String> {
        if params.query.is_empty() {
            return Err("query must not be empty".into());
        }
        let context_chars = params.context_chars.unwrap_or(DEFAULT_CONTEXT_CHARS);

        let mut results = Vec::with_capacity(params.file_paths.len());
        for raw_path in &params.file_paths {
            let path = normalize_path(raw_path);
            let entry = match self.read_content(&path).await {
                Ok(content) => {
                    let matches = find_matches(&content, &params.query, context_chars);
                    ContentSearchResult {
                        file_path: path,
                        total_matches: Some(matches.len()),
                        matches: Some(matches),
                        error: None,
                    }
                }
                // One bad file must not block results from the others.
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "content search failed");
                    ContentSearchResult {
                        file_path: path,
                        matches: None,
                        total_matches: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(entry);
        }
        serde_json::to_string_pretty(&results).map_err(|e| e.to_string())
    }
}

impl DropboxServer {
    /// Download a file and extract its text.
    async fn read_content(&self, path: &str) -> Result<String, ReadError> {
        let bytes = self.provider.download(path).await?;
        Ok(extract::extract_text(path, &bytes)?)
    }

    /// First characters of a text file, for listings. Failures degrade to a
    /// placeholder rather than failing the listing.
    async fn preview(&self, path: &str) -> String {
        match self.read_content(path).await {
            Ok(content) => {
                let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
                if content.chars().count() > PREVIEW_CHARS {
                    preview.push_str("...");
                }
                preview
            }
            Err(_) => "[preview unavailable]".to_string(),
        }
    }
}

/// Dropbox paths are `""` for the root and `/`-prefixed otherwise.
fn normalize_path(path: &str) -> String {
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn wants_preview(path: &str) -> bool {
    extract::extension(path).is_some_and(|ext| PREVIEW_EXTENSIONS.contains(&ext.as_str()))
}

/// Expand a `file_types` argument into the extension suffixes to keep.
fn parse_file_types(arg: &str) -> Vec<String> {
    let arg = arg.trim().to_lowercase();
    let exts: Vec<&str> = match arg.as_str() {
        "all" => extract::SUPPORTED_EXTENSIONS.to_vec(),
        "pdf" => vec!["pdf"],
        "docx" => vec!["docx", "doc"],
        "txt" => vec!["txt", "md"],
        _ => {
            return arg
                .split(',')
                .map(|e| format!(".{}", e.trim().trim_start_matches('.')))
                .collect();
        }
    };
    exts.iter().map(|e| format!(".{e}")).collect()
}

/// Case-insensitive scan for `query` with up to `context_chars` characters of
/// context on each side. Offsets and context windows are computed over
/// characters so multi-byte content never splits mid-codepoint.
fn find_matches(content: &str, query: &str, context_chars: usize) -> Vec<ContentMatch> {
    let chars: Vec<char> = content.chars().collect();
    let lower: Vec<char> = chars.iter().map(|&c| fold(c)).collect();
    let needle: Vec<char> = query.chars().map(fold).collect();
    if needle.is_empty() || lower.len() < needle.len() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    let mut line = 1;
    for i in 0..=(lower.len() - needle.len()) {
        if i > 0 && chars[i - 1] == '\n' {
            line += 1;
        }
        if lower[i..i + needle.len()] == needle[..] {
            let start = i.saturating_sub(context_chars);
            let end = (i + needle.len() + context_chars).min(chars.len());
            matches.push(ContentMatch {
                position: i,
                line,
                context: chars[start..end].iter().collect(),
            });
        }
    }
    matches
}

/// One-to-one case fold so indices into the folded text stay aligned with
/// the original.
fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use dbx_api::{FileMetadata, FolderMetadata};
    use std::collections::HashMap;

    struct FakeProvider {
        entries: Vec<Metadata>,
        files: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl Provider for FakeProvider {
        async fn list_folder(&self, _path: &str, limit: u32) -> Result<Vec<Metadata>, ApiError> {
            Ok(self.entries.iter().take(limit as usize).cloned().collect())
        }

        async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Metadata>, ApiError> {
            let q = query.to_lowercase();
            Ok(self
                .entries
                .iter()
                .filter(|e| e.path_lower().is_some_and(|p| p.contains(&q)))
                .take(max_results as usize)
                .cloned()
                .collect())
        }

        async fn get_metadata(&self, path: &str) -> Result<Metadata, ApiError> {
            self.entries
                .iter()
                .find(|e| e.path_lower() == Some(path))
                .cloned()
                .ok_or_else(|| ApiError::NotFound(path.to_string()))
        }

        async fn download(&self, path: &str) -> Result<Vec<u8>, ApiError> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(path.to_string()))
        }
    }

    fn file_entry(path: &str, size: u64) -> Metadata {
        let ts = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Metadata::File(FileMetadata {
            name: path.rsplit('/').next().unwrap().to_string(),
            path_lower: path.to_string(),
            path_display: path.to_string(),
            id: format!("id:{path}"),
            size,
            server_modified: ts,
            client_modified: ts,
            rev: "015d1a48e57a0c00000001a".into(),
            content_hash: None,
        })
    }

    fn folder_entry(path: &str) -> Metadata {
        Metadata::Folder(FolderMetadata {
            name: path.rsplit('/').next().unwrap().to_string(),
            path_lower: path.to_string(),
            path_display: path.to_string(),
            id: format!("id:{path}"),
        })
    }

    fn server_with(entries: Vec<Metadata>, files: &[(&str, &[u8])]) -> DropboxServer {
        DropboxServer::new(Arc::new(FakeProvider {
            entries,
            files: files
                .iter()
                .map(|(p, b)| (p.to_string(), b.to_vec()))
                .collect(),
        }))
    }

    #[tokio::test]
    async fn list_files_truncates_to_max_files() {
        let server = server_with(
            vec![
                file_entry("/a.pdf", 1),
                file_entry("/b.pdf", 2),
                file_entry("/c.pdf", 3),
                file_entry("/d.pdf", 4),
                file_entry("/e.pdf", 5),
            ],
            &[],
        );
        let text = server
            .list_files(Parameters(ListFilesParams {
                folder_path: Some("".into()),
                max_files: Some(2),
            }))
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        // Provider order is preserved.
        assert_eq!(entries[0]["name"], "a.pdf");
        assert_eq!(entries[1]["name"], "b.pdf");
    }

    #[tokio::test]
    async fn list_files_zero_is_empty() {
        let server = server_with(vec![file_entry("/a.pdf", 1)], &[]);
        let text = server
            .list_files(Parameters(ListFilesParams {
                folder_path: None,
                max_files: Some(0),
            }))
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(parsed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_files_previews_text_files() {
        let long = "x".repeat(300);
        let server = server_with(
            vec![file_entry("/notes.txt", 300), folder_entry("/docs")],
            &[("/notes.txt", long.as_bytes())],
        );
        let text = server
            .list_files(Parameters(ListFilesParams {
                folder_path: None,
                max_files: None,
            }))
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let entries = parsed.as_array().unwrap();
        let preview = entries[0]["preview"].as_str().unwrap();
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with("..."));
        assert_eq!(entries[1]["is_folder"], true);
        assert!(entries[1].get("preview").is_none());
    }

    #[tokio::test]
    async fn read_file_truncates_and_flags() {
        let server = server_with(vec![], &[("/a.txt", b"0123456789")]);
        let text = server
            .read_file(Parameters(ReadFileParams {
                file_path: "/a.txt".into(),
                max_length: Some(4),
            }))
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["content"], "0123");
        assert_eq!(parsed["total_chars"], 10);
        assert_eq!(parsed["truncated"], true);
    }

    #[tokio::test]
    async fn read_file_zero_means_unlimited() {
        let server = server_with(vec![], &[("/a.txt", b"0123456789")]);
        let text = server
            .read_file(Parameters(ReadFileParams {
                file_path: "/a.txt".into(),
                max_length: Some(0),
            }))
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["content"], "0123456789");
        assert_eq!(parsed["truncated"], false);
    }

    #[tokio::test]
    async fn read_file_rejects_unknown_format() {
        let server = server_with(vec![], &[("/a.bin", b"\x00\x01")]);
        let err = server
            .read_file(Parameters(ReadFileParams {
                file_path: "/a.bin".into(),
                max_length: None,
            }))
            .await
            .unwrap_err();
        assert!(err.contains("unsupported file type"));
    }

    #[tokio::test]
    async fn read_file_reports_corrupt_pdf() {
        let server = server_with(vec![], &[("/a.pdf", b"%PDF-1.7 truncated garbage")]);
        let err = server
            .read_file(Parameters(ReadFileParams {
                file_path: "/a.pdf".into(),
                max_length: None,
            }))
            .await
            .unwrap_err();
        assert!(err.contains("PDF extraction failed"));
    }

    #[tokio::test]
    async fn search_files_filters_by_extension() {
        let server = server_with(
            vec![
                file_entry("/reports/report.pdf", 100),
                file_entry("/reports/report.txt", 50),
                file_entry("/reports/report_final.pdf", 120),
            ],
            &[],
        );
        let text = server
            .search_files(Parameters(SearchFilesParams {
                query: "report".into(),
                file_types: Some("pdf".into()),
                max_results: Some(10),
            }))
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let hits = parsed.as_array().unwrap();
        assert_eq!(hits.len(), 2);
        for hit in hits {
            assert!(hit["file_path"].as_str().unwrap().ends_with(".pdf"));
        }
    }

    #[tokio::test]
    async fn search_files_empty_result_is_ok() {
        let server = server_with(vec![file_entry("/a.txt", 1)], &[]);
        let text = server
            .search_files(Parameters(SearchFilesParams {
                query: "nothing-matches-this".into(),
                file_types: None,
                max_results: None,
            }))
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(parsed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_file_info_reports_not_found() {
        let server = server_with(vec![], &[]);
        let err = server
            .get_file_info(Parameters(GetFileInfoParams {
                file_path: "/missing.txt".into(),
            }))
            .await
            .unwrap_err();
        assert!(err.contains("path not found: /missing.txt"));
    }

    #[tokio::test]
    async fn get_file_info_returns_folder_metadata() {
        let server = server_with(vec![folder_entry("/docs")], &[]);
        let text = server
            .get_file_info(Parameters(GetFileInfoParams {
                file_path: "docs".into(),
            }))
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["is_folder"], true);
        assert_eq!(parsed["path"], "/docs");
        assert!(parsed.get("rev").is_none());
    }

    #[tokio::test]
    async fn content_search_isolates_per_file_failures() {
        let server = server_with(vec![], &[("/good.txt", b"say hello to the world")]);
        let text = server
            .search_file_content(Parameters(SearchFileContentParams {
                file_paths: vec!["/good.txt".into(), "/missing.txt".into()],
                query: "HELLO".into(),
                context_chars: Some(5),
            }))
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let results = parsed.as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["total_matches"], 1);
        assert!(results[0].get("error").is_none());
        assert!(
            results[1]["error"]
                .as_str()
                .unwrap()
                .contains("path not found")
        );
    }

    #[tokio::test]
    async fn content_search_rejects_empty_query() {
        let server = server_with(vec![], &[]);
        let err = server
            .search_file_content(Parameters(SearchFileContentParams {
                file_paths: vec!["/a.txt".into()],
                query: "".into(),
                context_chars: None,
            }))
            .await
            .unwrap_err();
        assert!(err.contains("query must not be empty"));
    }

    #[test]
    fn find_matches_reports_offsets_lines_and_context() {
        let content = "One\ntwo THREE\nthree four";
        let matches = find_matches(content, "three", 3);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].position, 8);
        assert_eq!(matches[0].line, 2);
        assert_eq!(matches[0].context, "wo THREE\nth");
        assert_eq!(matches[1].position, 14);
        assert_eq!(matches[1].line, 3);
    }

    #[test]
    fn find_matches_is_bounded_at_edges() {
        let matches = find_matches("abc", "abc", 100);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].position, 0);
        assert_eq!(matches[0].context, "abc");
    }

    #[test]
    fn parse_file_types_expands_shorthands() {
        assert_eq!(parse_file_types("docx"), vec![".docx", ".doc"]);
        assert_eq!(parse_file_types("txt"), vec![".txt", ".md"]);
        assert!(parse_file_types("all").contains(&".pdf".to_string()));
        assert_eq!(parse_file_types("rs, .toml"), vec![".rs", ".toml"]);
    }

    #[test]
    fn normalize_path_prefixes_relative_paths() {
        assert_eq!(normalize_path(""), "");
        assert_eq!(normalize_path("docs/a.txt"), "/docs/a.txt");
        assert_eq!(normalize_path("/docs"), "/docs");
    }
}
