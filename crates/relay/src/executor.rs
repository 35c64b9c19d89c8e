//! Retrying request executor
//!
//! `execute` runs one logical call. Each attempt takes the next proxy from
//! the rotator, sends with merged default headers and a per-attempt timeout,
//! and on failure hands the raw facts to `classify`. The resulting kind alone
//! decides between returning, swapping proxy, and backing off.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::classify::{AttemptFault, FailureKind, classify};
use crate::error::{Error, Result};
use crate::headers;
use crate::policy::RetryPolicy;
use crate::rotator::{ProxyEntry, ProxyRotator};
use crate::telemetry;

/// Longest error body kept in `ServerError`/`ClientError`.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Description of one logical HTTP call.
#[derive(Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    /// Attach `Authorization: Bearer <token>`. A token that is not a valid
    /// header value is skipped with a warning.
    pub fn bearer(mut self, token: &str) -> Self {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "skipping invalid bearer token header"),
        }
        self
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(HeaderName::from_static(name), value);
            }
            Err(e) => warn!(header = name, error = %e, "skipping invalid header value"),
        }
        self
    }
}

// Bodies and header values may carry passwords or tokens.
impl std::fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSpec")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Ephemeral bookkeeping for one in-flight logical call.
#[derive(Debug, Default)]
struct RequestAttempt {
    /// HTTP attempts made, proxy faults included
    tries: u32,
    /// Retryable failures charged against the attempt budget
    retries: u32,
    proxy_swaps: u32,
    proxy: Option<String>,
    delay: Duration,
    last_error: Option<Error>,
}

/// Executes logical requests with proxy rotation, classification and backoff.
///
/// Owns its rotator, so the proxy cursor is shared by every account using
/// this executor and by nothing else. Proxied clients are built once per
/// proxy entry and cached.
pub struct RequestExecutor {
    rotator: ProxyRotator,
    policy: RetryPolicy,
    direct: reqwest::Client,
    proxied: Mutex<HashMap<String, reqwest::Client>>,
}

impl RequestExecutor {
    pub fn new(rotator: ProxyRotator, policy: RetryPolicy) -> Result<Self> {
        let direct = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))?;
        Ok(Self {
            rotator,
            policy,
            direct,
            proxied: Mutex::new(HashMap::new()),
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn proxy_count(&self) -> usize {
        self.rotator.len()
    }

    /// Run one logical request and decode a 2xx JSON body into `T`.
    ///
    /// `label` identifies the account in logs and should already be masked.
    #[instrument(
        skip_all,
        fields(
            account = %label,
            method = %spec.method,
            url = %spec.url,
            request_id = %new_request_id(),
        )
    )]
    pub async fn execute<T: DeserializeOwned>(&self, spec: &RequestSpec, label: &str) -> Result<T> {
        let started = Instant::now();
        let user_agent = headers::random_user_agent();
        let headers = headers::merged_headers(&user_agent, &spec.headers);
        let mut record = RequestAttempt::default();

        loop {
            let proxy = self.rotator.next();
            record.tries += 1;
            record.proxy = proxy.map(ProxyEntry::redacted);

            let fault = match self.attempt::<T>(spec, &headers, proxy).await {
                Ok(value) => {
                    telemetry::record_attempt("success");
                    telemetry::record_request("success", started.elapsed().as_secs_f64());
                    debug!(tries = record.tries, proxy = ?record.proxy, "request succeeded");
                    return Ok(value);
                }
                Err(fault) => fault,
            };

            let kind = classify(&fault);
            telemetry::record_attempt(kind.label());
            let error = fault.into_error(kind, &spec.url);

            match kind {
                FailureKind::Proxy => {
                    record.proxy_swaps += 1;
                    warn!(
                        proxy = ?record.proxy,
                        swaps = record.proxy_swaps,
                        error = %error,
                        "proxy failure, rotating"
                    );
                    record.last_error = Some(error);
                    if record.proxy_swaps >= self.policy.max_proxy_swaps {
                        break;
                    }
                    tokio::time::sleep(self.policy.proxy_retry_delay).await;
                }
                kind if kind.is_retryable() => {
                    record.retries += 1;
                    if kind == FailureKind::Unclassified {
                        warn!(
                            attempt = record.retries,
                            error = %error,
                            "unrecognized failure, retrying as fallback"
                        );
                    } else {
                        warn!(
                            attempt = record.retries,
                            kind = kind.label(),
                            proxy = ?record.proxy,
                            error = %error,
                            "retryable failure"
                        );
                    }
                    record.last_error = Some(error);
                    if record.retries >= self.policy.max_attempts {
                        break;
                    }
                    record.delay = self.policy.delay_for(kind, record.retries);
                    debug!(delay_ms = record.delay.as_millis() as u64, "backing off");
                    tokio::time::sleep(record.delay).await;
                }
                kind => {
                    debug!(kind = kind.label(), error = %error, "terminal failure");
                    telemetry::record_request(kind.label(), started.elapsed().as_secs_f64());
                    return Err(error);
                }
            }
        }

        telemetry::record_request("exhausted", started.elapsed().as_secs_f64());
        let last = record
            .last_error
            .take()
            .unwrap_or_else(|| Error::Unclassified("no attempt recorded".to_string()));
        warn!(
            tries = record.tries,
            proxy_swaps = record.proxy_swaps,
            last_error = %last,
            "request budget exhausted"
        );
        Err(Error::RequestExhausted {
            attempts: record.tries,
            last: Box::new(last),
        })
    }

    /// One HTTP exchange.
    async fn attempt<T: DeserializeOwned>(
        &self,
        spec: &RequestSpec,
        headers: &HeaderMap,
        proxy: Option<&ProxyEntry>,
    ) -> std::result::Result<T, AttemptFault> {
        let client = self.client_for(proxy).await?;
        let proxy_label = proxy.map(ProxyEntry::redacted);

        let mut request = client
            .request(spec.method.clone(), &spec.url)
            .headers(headers.clone())
            .timeout(self.policy.request_timeout);
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AttemptFault::transport(&e, proxy_label.clone()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptFault::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AttemptFault::transport(&e, proxy_label))?;
        serde_json::from_slice(&bytes).map_err(|e| AttemptFault::Decode {
            message: e.to_string(),
        })
    }

    /// Direct client, or the cached client routed through `proxy`.
    async fn client_for(
        &self,
        proxy: Option<&ProxyEntry>,
    ) -> std::result::Result<reqwest::Client, AttemptFault> {
        let Some(entry) = proxy else {
            return Ok(self.direct.clone());
        };

        let mut cache = self.proxied.lock().await;
        if let Some(client) = cache.get(entry.as_str()) {
            return Ok(client.clone());
        }

        let setup_fault = |message: String| AttemptFault::ProxySetup {
            proxy: entry.redacted(),
            message,
        };
        let reqwest_proxy = entry.to_reqwest().map_err(setup_fault)?;
        let client = reqwest::Client::builder()
            .proxy(reqwest_proxy)
            .build()
            .map_err(|e| setup_fault(e.to_string()))?;
        cache.insert(entry.as_str().to_string(), client.clone());
        Ok(client)
    }
}

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().simple())
}
