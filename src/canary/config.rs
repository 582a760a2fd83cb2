use std::net::SocketAddr;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub const CONFIG_PATH: &str = "/etc/canary-info/config.yaml";

const DEFAULT_VERSION: i64 = 1;
const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_VERSION: &str = "CANARY_INFO_VERSION";
const ENV_HTTP_ADDR: &str = "CANARY_INFO_HTTP_ADDR";
const ENV_LOG_LEVEL: &str = "CANARY_INFO_LOG_LEVEL";

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Inner {
    version: Option<i64>,

    http_addr: Option<String>,

    log_level: Option<String>,
}

/// Startup settings. Command line beats env vars, env vars beat the file.
#[derive(Debug)]
pub struct Config {
    version: i64,
    http_addr: SocketAddr,
    log_level: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(
        path: P,
        version: Option<i64>,
        http_addr: Option<String>,
    ) -> Result<Self> {
        let inner: Inner = match std::fs::File::open(path.as_ref()) {
            Ok(file) => serde_yaml::from_reader(file)
                .map_err(|err| anyhow!("Invalid config file {}: {err}", path.as_ref().display()))?,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    // Logging is not up yet, and the settings can still come
                    // from the command line or env vars.
                    eprintln!(
                        "Could not open config file at {}, {err}",
                        path.as_ref().display()
                    );
                }
                Inner::default()
            }
        };

        Ok(Self {
            version: resolve_version(version, env(ENV_VERSION), inner.version)?,
            http_addr: resolve_http_addr(http_addr, env(ENV_HTTP_ADDR), inner.http_addr)?,
            log_level: env(ENV_LOG_LEVEL)
                .or(inner.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn resolve_version(cli: Option<i64>, env: Option<String>, file: Option<i64>) -> Result<i64> {
    if let Some(v) = cli {
        return Ok(v);
    }

    if let Some(v) = env {
        return v
            .trim()
            .parse()
            .map_err(|_| anyhow!("${ENV_VERSION} is not a number: {v}"));
    }

    Ok(file.unwrap_or(DEFAULT_VERSION))
}

fn resolve_http_addr(
    cli: Option<String>,
    env: Option<String>,
    file: Option<String>,
) -> Result<SocketAddr> {
    let addr = cli
        .or(env)
        .or(file)
        .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());

    parse_addr(&addr)
}

// ":8080" listens on all interfaces
fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let full = match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => addr.to_string(),
    };

    full.parse()
        .map_err(|err| anyhow!("Invalid listen address {addr}: {err}"))
}
