//! Endpoint prober - concurrent health classification of sensor API URLs.
//!
//! Each URL gets one GET with a fixed timeout. The outcome is folded into a
//! tri-state [`ProbeStatus`]; nothing escapes as an error. Transport failures,
//! non-200 statuses and unusable bodies are all `Bad`. The finer
//! [`ProbeFailure`] reason is kept for logs only.
//!
//! The HTTP layer is behind [`ProbeTransport`] so tests can substitute a fake
//! that counts calls or stalls.

use crate::pool::{WorkerPool, DEFAULT_POOL_WIDTH};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

/// Per-call timeout in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;

/// Health classification for one monitored endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeStatus {
    Good,
    Bad,
    #[serde(rename = "No Link")]
    NoLink,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Bad => "Bad",
            Self::NoLink => "No Link",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a probe came back Bad (or NoLink)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailure {
    NotAUrl,
    Timeout,
    Connect,
    Request,
    HttpStatus(u16),
    EmptyBody,
    InvalidJson,
    FalsyJson,
    WorkerLost,
}

impl ProbeFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAUrl => "not_a_url",
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::HttpStatus(_) => "http_status",
            Self::EmptyBody => "empty_body",
            Self::InvalidJson => "invalid_json",
            Self::FalsyJson => "falsy_json",
            Self::WorkerLost => "worker_lost",
        }
    }
}

/// Status plus diagnostic detail for one probed URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ProbeFailure>,
    pub elapsed_ms: u64,
}

impl ProbeReport {
    fn good(elapsed_ms: u64) -> Self {
        Self { status: ProbeStatus::Good, failure: None, elapsed_ms }
    }

    fn bad(failure: ProbeFailure, elapsed_ms: u64) -> Self {
        Self { status: ProbeStatus::Bad, failure: Some(failure), elapsed_ms }
    }

    fn no_link() -> Self {
        Self {
            status: ProbeStatus::NoLink,
            failure: Some(ProbeFailure::NotAUrl),
            elapsed_ms: 0,
        }
    }
}

/// Raw response handed back by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Transport failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    fn failure(&self) -> ProbeFailure {
        match self {
            Self::Timeout => ProbeFailure::Timeout,
            Self::Connect(_) => ProbeFailure::Connect,
            Self::Request(_) => ProbeFailure::Request,
        }
    }
}

/// Issues one GET and returns status + body
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<ProbeResponse, TransportError>;
}

/// reqwest-backed transport used in production
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        // Probes go straight to the device, never through an env proxy
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .user_agent(concat!("sensorboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    fn classify_error(err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl ProbeTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<ProbeResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify_error(&e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::classify_error(&e))?;

        Ok(ProbeResponse { status, body: body.to_vec() })
    }
}

/// True when the string is worth a network call: non-blank and carrying an
/// http:// or https:// scheme.
pub fn is_probe_target(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lower = trimmed.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Classify a completed response. Good needs status 200 and a truthy JSON body.
pub fn classify_response(response: &ProbeResponse) -> Result<(), ProbeFailure> {
    if response.status != 200 {
        return Err(ProbeFailure::HttpStatus(response.status));
    }
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Err(ProbeFailure::EmptyBody);
    }
    let value: serde_json::Value =
        serde_json::from_slice(&response.body).map_err(|_| ProbeFailure::InvalidJson)?;
    if is_truthy(&value) {
        Ok(())
    } else {
        Err(ProbeFailure::FalsyJson)
    }
}

/// Loose truthiness: no shape check, any non-empty/non-zero value passes.
fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Runs probe cycles. Holds no state between cycles.
#[derive(Clone)]
pub struct EndpointProber {
    transport: Arc<dyn ProbeTransport>,
    pool: WorkerPool,
    timeout: Duration,
}

impl EndpointProber {
    pub fn new(transport: Arc<dyn ProbeTransport>) -> Self {
        Self {
            transport,
            pool: WorkerPool::new(DEFAULT_POOL_WIDTH),
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }

    /// Production prober: reqwest transport with the same timeout.
    pub fn http(timeout: Duration, workers: usize) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(timeout)?;
        Ok(Self::new(Arc::new(transport))
            .with_timeout(timeout)
            .with_workers(workers))
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.pool = WorkerPool::new(workers);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn workers(&self) -> usize {
        self.pool.width()
    }

    /// One probe cycle. Output has the length and order of `targets`.
    pub async fn probe_all<S: AsRef<str>>(&self, targets: &[S]) -> Vec<ProbeStatus> {
        self.probe_reports(targets)
            .await
            .into_iter()
            .map(|r| r.status)
            .collect()
    }

    /// One probe cycle with per-URL diagnostics.
    pub async fn probe_reports<S: AsRef<str>>(&self, targets: &[S]) -> Vec<ProbeReport> {
        let started = Instant::now();
        let owned: Vec<String> = targets.iter().map(|t| t.as_ref().to_string()).collect();

        let slots = self
            .pool
            .run(owned, |url| {
                let transport = self.transport.clone();
                let timeout = self.timeout;
                async move { probe_one(transport.as_ref(), &url, timeout).await }
            })
            .await;

        let reports: Vec<ProbeReport> = slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|_| ProbeReport::bad(ProbeFailure::WorkerLost, 0)))
            .collect();

        let good = reports.iter().filter(|r| r.status == ProbeStatus::Good).count();
        let bad = reports.iter().filter(|r| r.status == ProbeStatus::Bad).count();
        info!(
            "Probe cycle complete: targets={}, good={}, bad={}, no_link={}, elapsed_ms={}",
            reports.len(),
            good,
            bad,
            reports.len() - good - bad,
            started.elapsed().as_millis()
        );

        reports
    }
}

async fn probe_one(transport: &dyn ProbeTransport, url: &str, timeout: Duration) -> ProbeReport {
    if !is_probe_target(url) {
        return ProbeReport::no_link();
    }

    let url = url.trim();
    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, transport.get(url)).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let report = match outcome {
        Err(_) => ProbeReport::bad(ProbeFailure::Timeout, elapsed_ms),
        Ok(Err(e)) => ProbeReport::bad(e.failure(), elapsed_ms),
        Ok(Ok(response)) => match classify_response(&response) {
            Ok(()) => ProbeReport::good(elapsed_ms),
            Err(failure) => ProbeReport::bad(failure, elapsed_ms),
        },
    };

    match &report.failure {
        Some(failure) => debug!("Probe {} -> {} ({})", url, report.status, failure.as_str()),
        None => debug!("Probe {} -> {}", url, report.status),
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> ProbeResponse {
        ProbeResponse { status, body: body.as_bytes().to_vec() }
    }

    #[test]
    fn test_probe_target_detection() {
        assert!(is_probe_target("http://10.0.0.1/api"));
        assert!(is_probe_target("  HTTPS://example.com "));
        assert!(!is_probe_target(""));
        assert!(!is_probe_target("   "));
        assert!(!is_probe_target("ftp://example.com"));
        assert!(!is_probe_target("example.com/status"));
        assert!(!is_probe_target("nan"));
    }

    #[test]
    fn test_classify_good() {
        assert_eq!(classify_response(&response(200, r#"{"temp": 21.5}"#)), Ok(()));
        assert_eq!(classify_response(&response(200, "[1]")), Ok(()));
        assert_eq!(classify_response(&response(200, "true")), Ok(()));
        assert_eq!(classify_response(&response(200, r#""up""#)), Ok(()));
    }

    #[test]
    fn test_classify_bad_bodies() {
        assert_eq!(classify_response(&response(200, "")), Err(ProbeFailure::EmptyBody));
        assert_eq!(classify_response(&response(200, " \n")), Err(ProbeFailure::EmptyBody));
        assert_eq!(
            classify_response(&response(200, "<html>ok</html>")),
            Err(ProbeFailure::InvalidJson)
        );
        for falsy in ["{}", "[]", "null", "false", "0", "\"\""] {
            assert_eq!(
                classify_response(&response(200, falsy)),
                Err(ProbeFailure::FalsyJson),
                "body {}",
                falsy
            );
        }
    }

    #[test]
    fn test_classify_non_200() {
        assert_eq!(
            classify_response(&response(500, r#"{"ok": true}"#)),
            Err(ProbeFailure::HttpStatus(500))
        );
        assert_eq!(
            classify_response(&response(204, "")),
            Err(ProbeFailure::HttpStatus(204))
        );
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ProbeStatus::NoLink.to_string(), "No Link");
        assert_eq!(
            serde_json::to_string(&ProbeStatus::NoLink).unwrap(),
            "\"No Link\""
        );
        assert_eq!(serde_json::to_string(&ProbeStatus::Good).unwrap(), "\"Good\"");
    }
}
