//! ticket-mail-assistant: AI-drafted support email service
//!
//! Drafts polite missing-information emails for support tickets, summarizes
//! recent unseen inbox mail, and sends HTML email. The same actions are served
//! as JSON over HTTP for the browser front end, or as MCP tools over stdio.
//!
//! # Architecture
//!
//! - [`main`]: Process entry point with env loading and transport selection
//! - [`config`]: Environment-driven configuration for IMAP, SMTP, OpenAI and EmailJS
//! - [`errors`]: Application error model with MCP error mapping
//! - [`sanitize`]: Email snippet cleanup for prompt context
//! - [`request`]: Structured generation requests
//! - [`compile`]: Request to chat-message compilation
//! - [`tools`]: Tool resolution that enriches requests with inbox context
//! - [`imap`]: IMAP transport/session operations with timeout wrappers
//! - [`mime`]: Message parsing into inbox records
//! - [`inbox`]: Recent unseen message fetcher
//! - [`generator`]: OpenAI chat-completions client
//! - [`sender`]: SMTP and EmailJS delivery
//! - [`ticket`]: Missing-field detection and subjects
//! - [`assistant`]: Action orchestration shared by both surfaces
//! - [`models`]: Input/output DTOs and schema-bearing types
//! - [`http`]: JSON HTTP endpoints
//! - [`server`]: MCP tool handlers

mod assistant;
mod compile;
mod config;
mod errors;
mod generator;
mod http;
mod imap;
mod inbox;
mod mime;
mod models;
mod request;
mod sanitize;
mod sender;
mod server;
mod ticket;
mod tools;

use assistant::MailAssistant;
use clap::{Parser, ValueEnum};
use config::ServerConfig;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ticket-mail-assistant", version, about = "AI-drafted support email service")]
struct Cli {
    /// Surface to serve
    #[arg(long, value_enum, default_value_t = Transport::Http)]
    transport: Transport,

    /// Host to bind to (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum Transport {
    Http,
    Stdio,
}

/// Application entry point
///
/// Loads `.env`, initializes tracing on stderr, and serves either the HTTP
/// endpoints or the MCP tools over stdio.
///
/// # Environment Variables
///
/// See [`ServerConfig::load_from_env`] for full configuration options.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let cli = Cli::parse();
    let mut config = ServerConfig::load_from_env()?;
    if let Some(host) = cli.host {
        config.http.host = host;
    }
    if let Some(port) = cli.port {
        config.http.port = port;
    }

    let assistant = MailAssistant::from_config(&config)?;
    match cli.transport {
        Transport::Http => {
            let addr = format!("{}:{}", config.http.host, config.http.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(%addr, "HTTP server listening");
            axum::serve(listener, http::router(assistant)).await?;
        }
        Transport::Stdio => {
            let service = server::MailAssistantServer::new(assistant)
                .serve(stdio())
                .await?;
            service.waiting().await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Transport};

    #[test]
    fn transport_defaults_to_http() {
        let cli = Cli::try_parse_from(["ticket-mail-assistant"]).expect("defaults must parse");
        assert_eq!(cli.transport, Transport::Http);
        assert!(cli.port.is_none());
    }

    #[test]
    fn stdio_transport_and_port_override_parse() {
        let cli = Cli::try_parse_from([
            "ticket-mail-assistant",
            "--transport",
            "stdio",
            "--port",
            "5000",
        ])
        .expect("flags must parse");
        assert_eq!(cli.transport, Transport::Stdio);
        assert_eq!(cli.port, Some(5000));
    }
}
