use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::cancel::{CancelReader, CancelToken};
use crate::error::{EnvError, Result};

const DEFAULT_USER_AGENT: &str = concat!("ktenv/", env!("CARGO_PKG_VERSION"));
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where an archive comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    Http(Url),
    Local(PathBuf),
}

impl ArchiveSource {
    /// Accepts `http(s)://` and `file://` URLs or an absolute filesystem path.
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        if Path::new(source).is_absolute() {
            return Ok(ArchiveSource::Local(PathBuf::from(source)));
        }

        let url = Url::parse(source)
            .map_err(|err| EnvError::Download(format!("invalid install URL '{source}': {err}")))?;
        match url.scheme() {
            "http" | "https" => Ok(ArchiveSource::Http(url)),
            "file" => url
                .to_file_path()
                .map(ArchiveSource::Local)
                .map_err(|_| EnvError::Download(format!("invalid file URL '{source}'"))),
            other => Err(EnvError::Download(format!(
                "unsupported URL scheme '{other}' in '{source}'"
            ))),
        }
    }

    /// Final path segment, used to pick the archive format.
    pub fn file_name(&self) -> Option<String> {
        match self {
            ArchiveSource::Http(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            ArchiveSource::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        }
    }
}

/// Downloads (or copies) SDK archives while hashing them.
#[derive(Clone)]
pub struct Fetcher {
    http: Client,
    user_agent: String,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|err| EnvError::Download(format!("failed to build HTTP client: {err}")))?;
        let user_agent = std::env::var("KTENV_USER_AGENT")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        Ok(Self { http, user_agent })
    }

    /// Fetch `source` into `dest`, returning the SHA-256 of the bytes written.
    pub fn fetch(&self, source: &ArchiveSource, dest: &Path, cancel: &CancelToken) -> Result<[u8; 32]> {
        cancel.check()?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                EnvError::Download(format!(
                    "failed to create download directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        match source {
            ArchiveSource::Http(url) => {
                info!(url = %url, "downloading");
                let response = self
                    .http
                    .get(url.clone())
                    .header(USER_AGENT, &self.user_agent)
                    .send()
                    .map_err(|err| EnvError::Download(format!("failed to download from {url}: {err}")))?;
                cancel.check()?;

                let status = response.status();
                if !status.is_success() {
                    return Err(EnvError::Download(format!(
                        "download from {url} failed with status {status}"
                    )));
                }

                copy_hashed(response, dest, cancel, url.as_str())
            }
            ArchiveSource::Local(path) => {
                debug!(path = %path.display(), "copying local archive");
                let file = File::open(path).map_err(|err| {
                    EnvError::Download(format!("failed to open archive {}: {err}", path.display()))
                })?;
                copy_hashed(file, dest, cancel, &path.display().to_string())
            }
        }
    }
}

fn copy_hashed<R: Read>(reader: R, dest: &Path, cancel: &CancelToken, origin: &str) -> Result<[u8; 32]> {
    let mut reader = CancelReader::new(reader, cancel);
    let mut file = File::create(dest).map_err(|err| {
        EnvError::Download(format!("failed to create file {}: {err}", dest.display()))
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    let mut total = 0u64;

    loop {
        cancel.check()?;
        let read = reader
            .read(&mut buffer)
            .map_err(|err| match cancel.check() {
                Err(cancelled) => cancelled,
                Ok(()) => EnvError::Download(format!("failed while reading {origin}: {err}")),
            })?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read]).map_err(|err| {
            EnvError::Download(format!("failed while writing {}: {err}", dest.display()))
        })?;
        hasher.update(&buffer[..read]);
        total += read as u64;
    }

    file.flush().map_err(|err| {
        EnvError::Download(format!("failed to flush {}: {err}", dest.display()))
    })?;

    debug!(bytes = total, dest = %dest.display(), "fetched archive");
    Ok(hasher.finalize().into())
}

/// Parse a `sha256:<hex>` checksum.
pub fn parse_sha256(value: &str) -> Result<[u8; 32]> {
    let trimmed = value.trim();
    let digest = trimmed.strip_prefix("sha256:").ok_or_else(|| {
        EnvError::Validation("checksum must use `sha256:<hex>` format".to_string())
    })?;

    if digest.len() != 64 {
        return Err(EnvError::Validation(
            "SHA256 checksum must be exactly 64 hex characters".to_string(),
        ));
    }

    let bytes = hex::decode(digest)
        .map_err(|err| EnvError::Validation(format!("failed to decode SHA256 checksum: {err}")))?;
    let mut array = [0u8; 32];
    array.copy_from_slice(&bytes);
    Ok(array)
}

pub fn format_digest(bytes: &[u8; 32]) -> String {
    hex::encode(bytes)
}
