//! Binary entry point for the dbx-mcp server.

use anyhow::Context;
use clap::Parser;
use dbx_api::DbxClient;
use dbx_mcp::DropboxServer;
use rmcp::ServiceExt;
use std::sync::Arc;
use std::time::Duration;

/// Dropbox MCP server — read-only file tools over one Dropbox account.
///
/// Requires a `DROPBOX_ACCESS_TOKEN` environment variable.
#[derive(Parser)]
#[command(name = "dbx-mcp", version, about)]
struct Cli {
    /// Timeout in seconds for each Dropbox API request.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }
    let cli = Cli::parse();

    let token = std::env::var("DROPBOX_ACCESS_TOKEN").context(
        "DROPBOX_ACCESS_TOKEN environment variable is required \
         (create a token at https://www.dropbox.com/developers/apps)",
    )?;
    let client = DbxClient::new(token, Duration::from_secs(cli.timeout_secs))
        .context("failed to build Dropbox client")?;

    // Probe the token up front; a bad token still starts the server and
    // surfaces per call, matching the provider's error reporting.
    match client.current_account().await {
        Ok(account) => tracing::info!(email = %account.email, "connected to Dropbox"),
        Err(e) => tracing::warn!(error = %e, "Dropbox credential check failed"),
    }

    let server = DropboxServer::new(Arc::new(client));
    let transport = rmcp::transport::stdio();
    server
        .serve(transport)
        .await
        .context("failed to start server")?
        .waiting()
        .await
        .context("server error")?;
    Ok(())
}
