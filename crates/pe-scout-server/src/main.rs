// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! PE Scout: entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use pe_scout::{ChromiumRenderer, NoopRenderer, PipelineConfig, QuoteService, Renderer};

#[derive(Parser)]
#[command(
    name = "pe-scout",
    about = "Throttled P/E ratio and earnings lookups for a portfolio dashboard",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (default).
    Serve {
        /// Listen address (host:port).
        #[arg(long, default_value = "127.0.0.1:3100")]
        addr: SocketAddr,
    },

    /// Look up one symbol and print the result as JSON.
    Quote {
        /// Ticker, optionally with an exchange suffix (`HDFCBANK.BO`, `TCS:NSE`).
        symbol: String,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   pe-scout completions bash > ~/.local/share/bash-completion/completions/pe-scout
    ///   pe-scout completions zsh > ~/.zfunc/_pe-scout
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command.unwrap_or(Commands::Serve {
        addr: SocketAddr::from(([127, 0, 0, 1], 3100)),
    }) {
        Commands::Serve { addr } => {
            let service = build_service().await?;
            pe_scout_server::start(addr, Arc::new(service))
                .await
                .with_context(|| format!("HTTP server on {addr} stopped"))?;
        }

        Commands::Quote { symbol } => {
            let service = build_service().await?;
            let quote = service
                .quote(&symbol)
                .await
                .with_context(|| format!("no figures for {symbol}"))?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "pe-scout", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Resolve settings and launch the browser, degrading to static figures
/// when Chromium is missing.
async fn build_service() -> anyhow::Result<QuoteService> {
    let config = PipelineConfig::from_env();
    tracing::debug!(?config, "pipeline configuration");

    let renderer: Arc<dyn Renderer> = match ChromiumRenderer::new().await {
        Ok(renderer) => Arc::new(renderer),
        Err(e) => {
            tracing::warn!("{e}; live quotes disabled, serving static figures only");
            Arc::new(NoopRenderer)
        }
    };

    QuoteService::with_renderer(config, renderer).context("failed to build quote pipeline")
}
