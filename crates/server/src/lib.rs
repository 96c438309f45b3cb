//! MCP server exposing read-only Dropbox file tools.
//!
//! Five tools over one shared provider handle: folder listing, name search,
//! file reading with format-aware text extraction, metadata lookup, and
//! in-file content search. Every invocation is a stateless request/response
//! over the provider; nothing is cached or retried.

use crate::provider::Provider;
use rmcp::{
    ServerHandler,
    handler::server::router::tool::ToolRouter,
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool_handler,
};
use std::sync::Arc;

pub mod extract;
pub mod provider;
pub mod tools;

/// MCP server for a single Dropbox account.
#[derive(Clone)]
pub struct DropboxServer {
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) tool_router: ToolRouter<Self>,
}

#[tool_handler]
impl ServerHandler for DropboxServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "dbx-mcp".into(),
                title: Some("Dropbox File Reader".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Read-only Dropbox tools: list folders, search files by name, \
                 read file content (pdf, docx, and plain-text formats), fetch \
                 file metadata, and search for text inside files."
                    .into(),
            ),
        }
    }
}
