//! fstar-bridge binary entry point.
//!
//! stdin/stdout carry the LSP transport, so all logging goes to stderr.
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use fstar_bridge::server::Bridge;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("starting fstar-bridge");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Bridge::new).finish();
    Server::new(stdin, stdout, socket).serve(service).await;

    tracing::info!("fstar-bridge stopped");
}
