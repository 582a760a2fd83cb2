pub mod config;
pub mod label;
pub mod models;
pub mod service;
pub mod transport;
pub mod version;

use std::net::TcpListener;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Parser;
use log::*;
use tokio::signal::unix::{signal, SignalKind};

use config::Config;
use label::LABELS_PATH;
use version::VERSION;

#[derive(Parser)]
struct CliArgs {
    /// Variant to serve: 1 (baseline), 2 (broken) or 3 (with namespace)
    #[clap(long = "version")]
    version: Option<i64>,

    /// Address to host the server on, e.g. ":8080"
    #[clap(long = "http-addr")]
    http_addr: Option<String>,

    #[clap(long = "config", default_value = config::CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    if let Err(err) = run(args).await {
        eprintln!("err: {err}");
        std::process::exit(1);
    }
}

async fn run(args: CliArgs) -> Result<()> {
    let config = Config::load(&args.config, args.version, args.http_addr)?;

    init_logging(&config);

    info!("Canary Info v{VERSION}");
    log_environment();

    let svc = service::new(config.version(), Path::new(LABELS_PATH))
        .map_err(|err| anyhow!("Error creating service: {err}"))?;

    info!("Serving app info version {}", config.version());

    let listener = TcpListener::bind(config.http_addr())
        .map_err(|err| anyhow!("Error creating http listener on {}: {err}", config.http_addr()))?;

    transport::serve(listener, svc, shutdown_signal()).await
}

// RUST_LOG, when set, wins over the configured level
fn init_logging(config: &Config) {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level().to_string());

    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

fn log_environment() {
    info!("Environment Variables:");
    for (key, val) in std::env::vars_os() {
        info!("{}={}", key.to_string_lossy(), val.to_string_lossy());
    }
}

async fn shutdown_signal() {
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(err) => {
            error!("Failed to install SIGTERM handler: {err}");
            _ = tokio::signal::ctrl_c().await;
            info!("Received SIGINT, shutting down");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
        _ = term.recv() => info!("Received SIGTERM, shutting down"),
    }
}
