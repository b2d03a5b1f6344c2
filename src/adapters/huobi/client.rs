//! Huobi HTTP Client - Signed REST Transport
//!
//! Wraps reqwest with signing, a fixed timeout, GET retries and
//! response-envelope normalization. Every call goes through one
//! boundary that logs the outcome with its elapsed time, reports
//! failures to the circuit breaker and turns them into
//! `ExchangeError::Transport`. Nothing below that boundary can crash the
//! periodic task that issued the call.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::auth::{HuobiSigner, encode_query};
use crate::adapters::metrics::MetricsRegistry;
use crate::domain::failure::FailureCategory;
use crate::error::{BootstrapError, ExchangeError, TransportError};
use crate::ports::exchange::Credentials;
use crate::ports::failure::FailureSink;

/// Production REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.huobi.pro";

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Configuration for the REST transport.
#[derive(Debug, Clone)]
pub struct RestConfig {
  /// Base URL for the REST API.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum retries on transient errors (GET only).
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for RestConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout: Duration::from_secs(5),
      max_retries: 1,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

/// Signed REST transport for one credential set.
pub struct HuobiRest {
  /// Underlying HTTP client.
  http: Client,
  /// Base URL without trailing slash.
  base_url: String,
  /// Request signer.
  signer: HuobiSigner,
  /// Transport configuration.
  config: RestConfig,
  /// Adapter identity for logs and failure reports.
  name: String,
  /// Circuit breaker intake.
  failures: Arc<dyn FailureSink>,
  /// Request counters and latency.
  metrics: Option<Arc<MetricsRegistry>>,
}

impl HuobiRest {
  /// Create a transport.
  ///
  /// # Errors
  /// Fails when the base URL has no host or the HTTP client cannot be built.
  pub fn new(
    name: &str,
    credentials: &Credentials,
    config: RestConfig,
    failures: Arc<dyn FailureSink>,
  ) -> Result<Self, BootstrapError> {
    let base_url = config.base_url.trim_end_matches('/').to_string();
    let host = Url::parse(&base_url)
      .ok()
      .and_then(|u| u.host_str().map(str::to_lowercase))
      .ok_or_else(|| BootstrapError::Endpoint(config.base_url.clone()))?;

    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()?;

    info!(venue = %name, url = %base_url, "REST transport ready");

    Ok(Self {
      http,
      base_url,
      signer: HuobiSigner::new(&credentials.key, &credentials.secret, &host),
      config,
      name: name.to_string(),
      failures,
      metrics: None,
    })
  }

  /// Attach a metrics registry.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Issue a GET and decode the normalized payload.
  pub async fn get<T: DeserializeOwned>(
    &self,
    operation: &'static str,
    path: &str,
    params: BTreeMap<String, String>,
    signed: bool,
  ) -> Result<T, ExchangeError> {
    self
      .call(operation, Method::GET, path, params, None, signed)
      .await
  }

  /// Issue a signed POST with a JSON body and decode the normalized payload.
  pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
    &self,
    operation: &'static str,
    path: &str,
    body: &B,
  ) -> Result<T, ExchangeError> {
    let body = match serde_json::to_string(body) {
      Ok(body) => body,
      Err(e) => {
        return Err(ExchangeError::InvalidRequest(format!(
          "{operation}: body not serializable: {e}"
        )));
      }
    };
    self
      .call(operation, Method::POST, path, BTreeMap::new(), Some(body), true)
      .await
  }

  /// The failure boundary: time, log, report, translate.
  async fn call<T: DeserializeOwned>(
    &self,
    operation: &'static str,
    method: Method,
    path: &str,
    params: BTreeMap<String, String>,
    body: Option<String>,
    signed: bool,
  ) -> Result<T, ExchangeError> {
    let started = Instant::now();
    let result = self
      .execute(&method, path, &params, body.as_deref(), signed)
      .await
      .and_then(|value| serde_json::from_value::<T>(value).map_err(TransportError::from));
    let elapsed = started.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;

    match result {
      Ok(value) => {
        info!(venue = %self.name, operation, %method, path, elapsed_ms, "request succeeded");
        self.observe(operation, "ok", elapsed);
        Ok(value)
      }
      Err(e) => {
        warn!(venue = %self.name, operation, %method, path, elapsed_ms, error = %e, "request failed");
        self.observe(operation, "error", elapsed);
        self
          .failures
          .report(FailureCategory::Request, &self.name, &format!("{operation}: {e}"));
        Err(ExchangeError::Transport {
          operation,
          message: e.to_string(),
        })
      }
    }
  }

  fn observe(&self, operation: &str, outcome: &str, elapsed: Duration) {
    if let Some(metrics) = &self.metrics {
      metrics.observe_request(&self.name, operation, outcome, elapsed);
    }
  }

  /// Send with retries. Only GET is retried; a POST may have reached the
  /// venue even when its response was lost.
  async fn execute(
    &self,
    method: &Method,
    path: &str,
    params: &BTreeMap<String, String>,
    body: Option<&str>,
    signed: bool,
  ) -> Result<Value, TransportError> {
    let attempts = if *method == Method::GET {
      self.config.max_retries + 1
    } else {
      1
    };

    let mut attempt = 0;
    loop {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.saturating_pow(attempt - 1);
        debug!(attempt, delay_ms = delay.as_millis() as u64, path, "Retrying request");
        sleep(delay).await;
      }
      attempt += 1;

      match self.send_once(method, path, params, body, signed).await {
        Ok(value) => return Ok(value),
        Err(e) if attempt < attempts && e.is_transient() => {
          warn!(error = %e, attempt, path, "Transient failure");
        }
        Err(e) => return Err(e),
      }
    }
  }

  async fn send_once(
    &self,
    method: &Method,
    path: &str,
    params: &BTreeMap<String, String>,
    body: Option<&str>,
    signed: bool,
  ) -> Result<Value, TransportError> {
    // Signed queries carry a fresh timestamp, so re-sign on every attempt.
    let query = if signed {
      self
        .signer
        .signed_query(method.as_str(), path, params.clone(), Utc::now())
    } else {
      encode_query(params)
    };
    let url = if query.is_empty() {
      format!("{}{}", self.base_url, path)
    } else {
      format!("{}{}?{}", self.base_url, path, query)
    };

    let mut request = self.http.request(method.clone(), &url);
    request = if *method == Method::POST {
      request
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .body(body.unwrap_or("{}").to_string())
    } else {
      request.header("Content-Type", "application/x-www-form-urlencoded")
    };

    let response = tokio::time::timeout(self.config.timeout, request.send())
      .await
      .map_err(|_| TransportError::Timeout)??;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
      return Err(TransportError::Status {
        status: status.as_u16(),
        body: text.chars().take(MAX_ERROR_BODY).collect(),
      });
    }

    normalize_envelope(serde_json::from_str(&text)?)
  }
}

/// Unwrap the venue's response envelope.
///
/// - `{"status": "error", "err-code": .., "err-msg": ..}` → failure
/// - `{"status": "ok", "data": X}` → `X`
/// - anything else (e.g. market data with `tick`) → the whole body
pub fn normalize_envelope(value: Value) -> Result<Value, TransportError> {
  let Value::Object(mut map) = value else {
    return Ok(value);
  };

  if map.get("status").and_then(Value::as_str) == Some("error") {
    let field = |key: &str| {
      map
        .get(key)
        .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
        .unwrap_or_default()
    };
    return Err(TransportError::Envelope {
      code: field("err-code"),
      message: field("err-msg"),
    });
  }

  Ok(map.remove("data").unwrap_or(Value::Object(map)))
}
