//! # yolink-mcp
//!
//! MCP (Model Context Protocol) server that exposes a YoLink home-automation
//! account to AI agents. Runs as a stdio JSON-RPC server — designed to be
//! launched by an agent host.
//!
//! ## Architecture
//!
//! ```text
//! main.rs     — entry point, logging setup, config loading, MCP server launch
//! config.rs   — CLI flags and environment configuration
//! client.rs   — YoLink HTTP client with lazy token refresh
//! devices.rs  — YoLink wire types (requests, envelopes, devices)
//! jsonrpc.rs  — JSON-RPC 2.0 request/response types
//! mcp.rs      — MCP method router and stdio loop
//! tools.rs    — tool definitions and handlers
//! ```
//!
//! ## Tools
//!
//! - `enumerate_devices` — list all devices on the account
//! - `get_device_status` — current state of one device
//!
//! Logs go to stderr; stdout carries only protocol messages.

mod client;
mod config;
mod devices;
mod jsonrpc;
mod mcp;
mod tools;

use clap::Parser;
use tracing::{error, info, info_span};
use tracing_subscriber::EnvFilter;

use client::YoLinkClient;
use config::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing (stderr only; stdout is the protocol channel)
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_filter))
        .with_writer(std::io::stderr)
        .init();

    let resolved = match config::load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            if matches!(e, config::ConfigError::MissingSecrets(_)) {
                error!("Please set the required environment variables and try again.");
                error!("  export {}=\"your_client_id_here\"", config::ENV_CLIENT_ID);
                error!(
                    "  export {}=\"your_client_secret_here\"",
                    config::ENV_CLIENT_SECRET
                );
                error!("Get your credentials from: https://developer.yosmart.com/");
            }
            std::process::exit(1);
        }
    };

    let client = match YoLinkClient::new(
        resolved.credentials,
        resolved.endpoints,
        info_span!("yolink"),
    ) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create YoLink client: {}", e);
            std::process::exit(1);
        }
    };

    let mut server = mcp::Server::new(client, info_span!("mcp"));

    info!(
        "{} v{} starting (protocol {})",
        mcp::SERVER_NAME,
        mcp::SERVER_VERSION,
        mcp::PROTOCOL_VERSION
    );

    if let Err(e) = mcp::run_stdio(&mut server).await {
        error!("Error reading from stdin: {}", e);
        std::process::exit(1);
    }

    info!("stdin closed, shutting down");
}
