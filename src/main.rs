use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snippetbox::{routes, App, Config, Error, Server};

/// Snippet sharing web application.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configured one.
    #[arg(long)]
    addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("snippetbox: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(config, args.addr).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "snippetbox failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, addr: Option<SocketAddr>) -> Result<(), Error> {
    let addr = match addr {
        Some(addr) => addr,
        None => config.socket_addr()?,
    };
    tracing::info!(%addr, static_dir = %config.static_dir.display(), "configuration loaded");

    let max_body = config.max_body_bytes;
    let app = Arc::new(App::in_memory(config)?);
    Server::bind(addr).max_body(max_body).serve(routes(app)?).await
}
