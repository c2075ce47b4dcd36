// Scripted fakes for unit tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::errors::TransportError;
use super::traits::{Scheduler, Transport};

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

type Hook = Box<dyn Fn(usize) + Send + Sync>;

/// Transport answering from per-path queues and recording every call
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, TransportError>>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<Call>>,
    on_get: Option<Hook>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, path: &str, response: Result<Value, TransportError>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn respond_ok(self, path: &str, body: Value) -> Self {
        self.respond(path, Ok(body))
    }

    pub fn serve_file(self, path: &str, bytes: &[u8]) -> Self {
        self.files.lock().unwrap().insert(path.to_string(), bytes.to_vec());
        self
    }

    /// Runs before each GET is answered, with the 1-based count of GETs so far
    pub fn on_get(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_get = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path == path)
            .count()
    }

    fn record(&self, method: &'static str, path: &str, body: Option<Value>) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Call {
            method,
            path: path.to_string(),
            body,
        });
        calls.iter().filter(|c| c.method == method).count()
    }

    fn next(&self, path: &str) -> Result<Value, TransportError> {
        self.responses
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(TransportError::Network(format!("no scripted response for {}", path))))
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn endpoint(&self, path: &str) -> String {
        format!("http://backend.test{}", path)
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        self.record("POST", path, Some(body));
        self.next(path)
    }

    async fn get_json(&self, path: &str) -> Result<Value, TransportError> {
        let n = self.record("GET", path, None);
        if let Some(hook) = &self.on_get {
            hook(n);
        }
        self.next(path)
    }

    async fn download_to(
        &self,
        path: &str,
        dir: &Path,
        fallback_name: &str,
    ) -> Result<PathBuf, TransportError> {
        self.record("GET", path, None);
        let bytes = self.files.lock().unwrap().get(path).cloned().ok_or(TransportError::Status {
            code: 404,
            message: Some("File not ready".to_string()),
        })?;
        let dest = dir.join(fallback_name);
        std::fs::write(&dest, bytes).map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(dest)
    }
}

/// Scheduler that returns immediately and remembers every requested delay
#[derive(Default)]
pub struct RecordingScheduler {
    delays: Mutex<Vec<Duration>>,
    on_sleep: Option<Hook>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs on each sleep, with the 1-based count of sleeps so far
    pub fn on_sleep(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_sleep = Some(Box::new(hook));
        self
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn sleep(&self, delay: Duration) {
        let n = {
            let mut delays = self.delays.lock().unwrap();
            delays.push(delay);
            delays.len()
        };
        if let Some(hook) = &self.on_sleep {
            hook(n);
        }
    }
}
