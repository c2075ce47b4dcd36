// Seams between the client core and the outside world

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::errors::TransportError;

/// JSON-over-HTTP access to the download backend
#[async_trait]
pub trait Transport: Send + Sync {
    /// Absolute URL for an API path (used for file links shown to the user)
    fn endpoint(&self, path: &str) -> String;

    /// POST a JSON body, return the decoded JSON response
    async fn post_json(&self, path: &str, body: Value) -> Result<Value, TransportError>;

    /// GET a JSON document
    async fn get_json(&self, path: &str) -> Result<Value, TransportError>;

    /// Stream a binary response into `dir`. The file name comes from the
    /// response's Content-Disposition header, else `fallback_name`.
    async fn download_to(
        &self,
        path: &str,
        dir: &Path,
        fallback_name: &str,
    ) -> Result<PathBuf, TransportError>;
}

/// Timer used by the poll loop, so tests can run without real delays
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Real timer backed by tokio
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
