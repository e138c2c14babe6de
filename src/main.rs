use music_assistant_mcp::{Config, Dispatcher, McpServer, SessionManager, WsConnector};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("music-assistant-mcp: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        "Starting {} v{} for {}",
        music_assistant_mcp::server::SERVER_NAME,
        env!("CARGO_PKG_VERSION"),
        config.url
    );

    let server = McpServer::new(Dispatcher::new(SessionManager::new(config, WsConnector)));
    let result = server.run_stdio().await;
    server.dispatcher().sessions().shutdown().await;

    match result {
        Ok(()) => {
            tracing::info!("Client disconnected, exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("stdio transport failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
