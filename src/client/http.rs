// reqwest-backed transport for the download backend

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::errors::TransportError;
use super::models::NetworkConfig;
use super::traits::Transport;

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, network: &NetworkConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = network.timeout {
            builder = builder.timeout(Duration::from_secs(u64::from(timeout)));
        }

        if let Some(proxy_url) = network.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                TransportError::Network(format!("Invalid proxy URL {}: {}", proxy_url, e))
            })?;
            tracing::info!("[Http] Using proxy: {}", proxy_url);
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, TransportError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
                message: error_field(&text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            code: status.as_u16(),
            message: error_field(&text),
        })
    }
}

/// `{"error": "..."}` payload of a failed request, if any
fn error_field(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
}

/// File name from a Content-Disposition header
fn disposition_filename(header: &str) -> Option<String> {
    lazy_static::lazy_static! {
        static ref FILENAME_RE: Regex = Regex::new(r#"filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).unwrap();
    }

    let raw = FILENAME_RE.captures(header)?.get(1)?.as_str().trim();
    // Never let the server pick a directory
    let name = Path::new(raw).file_name()?.to_string_lossy().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// `dir/name`, or `dir/stem (n).ext` when that file already exists
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let first = dir.join(name);
    if !first.exists() {
        return first;
    }
    let path = Path::new(name);
    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let ext = path.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
    (1..)
        .map(|n| dir.join(format!("{} ({}){}", stem, n, ext)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Write a byte stream to `<dest>.part`, then move it to `dest`.
/// A failed transfer leaves neither file behind.
async fn save_stream<S, B, E>(stream: S, dest: &Path) -> Result<u64, TransportError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<TransportError>,
{
    let mut part = dest.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let result = match write_part(stream, &part).await {
        Ok(written) => tokio::fs::rename(&part, dest)
            .await
            .map(|_| written)
            .map_err(|e| TransportError::Io(format!("{}: {}", dest.display(), e))),
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = tokio::fs::remove_file(&part).await;
    }
    result
}

async fn write_part<S, B, E>(stream: S, part: &Path) -> Result<u64, TransportError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<TransportError>,
{
    let io_err = |e: std::io::Error| TransportError::Io(format!("{}: {}", part.display(), e));
    let mut stream = Box::pin(stream);
    let mut file = tokio::fs::File::create(part).await.map_err(io_err)?;
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        file.write_all(chunk.as_ref()).await.map_err(io_err)?;
        written += chunk.as_ref().len() as u64;
    }
    file.flush().await.map_err(io_err)?;
    Ok(written)
}

#[async_trait]
impl Transport for HttpTransport {
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        let url = self.endpoint(path);
        tracing::debug!("[Http] POST {}", url);
        let response = self.client.post(&url).json(&body).send().await?;
        Self::read_json(response).await
    }

    async fn get_json(&self, path: &str) -> Result<Value, TransportError> {
        let url = self.endpoint(path);
        tracing::debug!("[Http] GET {}", url);
        let response = self.client.get(&url).send().await?;
        Self::read_json(response).await
    }

    async fn download_to(
        &self,
        path: &str,
        dir: &Path,
        fallback_name: &str,
    ) -> Result<PathBuf, TransportError> {
        let url = self.endpoint(path);
        tracing::info!("[Http] Fetching file {}", url);
        let response = Self::check_status(self.client.get(&url).send().await?).await?;

        let name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|h| h.to_str().ok())
            .and_then(disposition_filename)
            .unwrap_or_else(|| fallback_name.to_string());
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| TransportError::Io(format!("{}: {}", dir.display(), e)))?;
        let dest = unique_path(dir, &name);

        let written = save_stream(response.bytes_stream(), &dest).await?;
        tracing::info!("[Http] Saved {} ({} bytes)", dest.display(), written);
        Ok(dest)
    }
}
