use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::*;
use thiserror::Error;

use crate::label::*;
use crate::models::AppInfo;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown version request: {0}")]
    UnknownVersion(i64),

    #[error("open {}: {source}", .path.display())]
    OpenLabels {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("read {}: {source}", .path.display())]
    ReadLabels {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("something went wrong")]
    Broken,
}

/// A failed lookup, along with whatever was already known about the pod
/// when the error happened.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct InfoFailure {
    pub partial: AppInfo,
    pub error: Error,
}

impl InfoFailure {
    fn new(partial: AppInfo, error: Error) -> Self {
        Self { partial, error }
    }
}

pub trait InfoService {
    fn app_info(&self) -> Result<AppInfo, InfoFailure>;
}

pub type InfoServicePtr = Arc<dyn InfoService + Send + Sync>;

/// Picks the implementation for the lifetime of the process.
pub fn new(version: i64, labels_path: &Path) -> Result<InfoServicePtr, Error> {
    match version {
        1 => Ok(Arc::new(Baseline::new(labels_path))),
        2 => Ok(Arc::new(Broken)),
        3 => Ok(Arc::new(WithNamespace::new(labels_path))),
        v => Err(Error::UnknownVersion(v)),
    }
}

/// Reads the pod labels but never fills in the namespace.
pub struct Baseline {
    labels_path: PathBuf,
}

impl Baseline {
    pub fn new(labels_path: &Path) -> Self {
        Self {
            labels_path: labels_path.to_path_buf(),
        }
    }
}

impl InfoService for Baseline {
    fn app_info(&self) -> Result<AppInfo, InfoFailure> {
        let info = AppInfo {
            pod_name: env_or_empty(ENV_POD_NAME),
            ..Default::default()
        };

        read_labels(&self.labels_path, info)
    }
}

/// Fails every call.
pub struct Broken;

impl InfoService for Broken {
    fn app_info(&self) -> Result<AppInfo, InfoFailure> {
        Err(InfoFailure::new(AppInfo::default(), Error::Broken))
    }
}

/// Baseline with the namespace filled in.
pub struct WithNamespace {
    labels_path: PathBuf,
}

impl WithNamespace {
    pub fn new(labels_path: &Path) -> Self {
        Self {
            labels_path: labels_path.to_path_buf(),
        }
    }
}

impl InfoService for WithNamespace {
    fn app_info(&self) -> Result<AppInfo, InfoFailure> {
        let info = AppInfo {
            pod_name: env_or_empty(ENV_POD_NAME),
            namespace: env_or_empty(ENV_POD_NAMESPACE),
            ..Default::default()
        };

        read_labels(&self.labels_path, info)
    }
}

fn env_or_empty(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

// Opened fresh on every call so label changes on the pod show up
// without a restart.
fn read_labels(path: &Path, mut info: AppInfo) -> Result<AppInfo, InfoFailure> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            let error = Error::OpenLabels {
                path: path.to_path_buf(),
                source: err,
            };
            return Err(InfoFailure::new(info, error));
        }
    };

    match parse_labels(BufReader::new(file), &mut info) {
        Ok(()) => {
            debug!("Loaded {} labels from {}", info.labels.len(), path.display());
            Ok(info)
        }
        Err(err) => {
            let error = Error::ReadLabels {
                path: path.to_path_buf(),
                source: err,
            };
            Err(InfoFailure::new(info, error))
        }
    }
}

/// Fills `info` from `key=value` lines. The last line wins for repeated keys.
pub fn parse_labels<R: BufRead>(mut rd: R, info: &mut AppInfo) -> std::io::Result<()> {
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match rd.read_until(b'\n', &mut buf) {
            Ok(0) => return Ok(()),
            Ok(_) => parse_line(&String::from_utf8_lossy(&buf), info),
            Err(err) => {
                // whatever was read before the error still counts
                if !buf.is_empty() {
                    parse_line(&String::from_utf8_lossy(&buf), info);
                }
                return Err(err);
            }
        }
    }
}

fn parse_line(line: &str, info: &mut AppInfo) {
    let (key, value) = match line.split_once('=') {
        Some(kv) => kv,
        None => return,
    };

    let key = key.trim();
    if key.is_empty() {
        return;
    }

    // app="billing" -> billing
    let value = value.trim().replace('"', "");

    match key {
        LABEL_APP => info.app_name = value,
        LABEL_RELEASE => info.release = value,
        _ => {
            info.labels.insert(key.to_string(), value);
        }
    }
}
