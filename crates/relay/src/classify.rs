//! Attempt outcome classification
//!
//! Each failed attempt is captured as an `AttemptFault` holding only
//! structural facts (status code, transport fault category, whether a proxy
//! was in the path). `classify` maps those facts to a closed `FailureKind`,
//! and the executor branches on the kind alone.

use crate::error::Error;

/// Category of a transport-level failure, read from reqwest's error flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    /// Connect or overall request timeout
    Timeout,
    /// TCP/TLS connect failed (refused, DNS resolution, tunnel refused)
    Connect,
    /// The request failed while being sent (e.g. connection reset)
    Request,
    /// The response body stream was aborted or undecodable
    Body,
    /// None of the flags above were set
    Other,
}

impl TransportFault {
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportFault::Timeout
        } else if err.is_connect() {
            TransportFault::Connect
        } else if err.is_body() || err.is_decode() {
            TransportFault::Body
        } else if err.is_request() {
            TransportFault::Request
        } else {
            TransportFault::Other
        }
    }
}

/// Raw facts about one failed attempt.
#[derive(Debug, Clone)]
pub enum AttemptFault {
    /// The proxied transport could not be built (bad scheme, bad address)
    ProxySetup { proxy: String, message: String },
    /// The HTTP exchange failed below the status-line level
    Transport {
        fault: TransportFault,
        proxy: Option<String>,
        message: String,
    },
    /// The server answered with a non-2xx status
    Status { status: u16, body: String },
    /// The server answered 2xx but the body did not have the expected shape
    Decode { message: String },
}

impl AttemptFault {
    pub fn transport(err: &reqwest::Error, proxy: Option<String>) -> Self {
        AttemptFault::Transport {
            fault: TransportFault::from_reqwest(err),
            proxy,
            message: error_chain(err),
        }
    }

    /// Convert into the caller-facing error for the given kind.
    pub fn into_error(self, kind: FailureKind, url: &str) -> Error {
        match (kind, self) {
            (FailureKind::Proxy, AttemptFault::ProxySetup { proxy, message }) => {
                Error::ProxyFailure { proxy, message }
            }
            (
                FailureKind::Proxy,
                AttemptFault::Transport { proxy, message, .. },
            ) => Error::ProxyFailure {
                proxy: proxy.unwrap_or_else(|| "<direct>".to_string()),
                message,
            },
            (FailureKind::Unauthorized, _) => Error::Unauthorized {
                url: url.to_string(),
            },
            (FailureKind::RateLimited, _) => Error::RateLimited {
                url: url.to_string(),
            },
            (FailureKind::ServerError, AttemptFault::Status { status, body }) => {
                Error::ServerError { status, body }
            }
            (FailureKind::ClientError, AttemptFault::Status { status, body }) => {
                Error::ClientError { status, body }
            }
            (FailureKind::Malformed, AttemptFault::Decode { message }) => {
                Error::MalformedResponse(message)
            }
            (FailureKind::Transient, AttemptFault::Transport { fault, message, .. }) => {
                Error::TransientNetwork(format!("{fault:?}: {message}"))
            }
            (_, fault) => Error::Unclassified(fault.describe()),
        }
    }

    fn describe(&self) -> String {
        match self {
            AttemptFault::ProxySetup { proxy, message } => format!("proxy {proxy}: {message}"),
            AttemptFault::Transport { fault, message, .. } => format!("{fault:?}: {message}"),
            AttemptFault::Status { status, body } => format!("status {status}: {body}"),
            AttemptFault::Decode { message } => message.clone(),
        }
    }
}

/// Closed set of failure kinds the executor acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Swap proxy after a short pause, outside the backoff ledger
    Proxy,
    /// 401, terminal for this call; the caller invalidates tokens
    Unauthorized,
    /// 429, retry with the extended delay
    RateLimited,
    /// Timeout/reset/DNS/aborted stream, retry with the standard delay
    Transient,
    /// 5xx, retry with the standard delay
    ServerError,
    /// Other non-2xx, terminal
    ClientError,
    /// 2xx with an unexpected body, terminal
    Malformed,
    /// Fallback for faults nothing above recognizes; retried
    Unclassified,
}

impl FailureKind {
    /// Whether the executor retries this kind against the attempt budget.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FailureKind::RateLimited
                | FailureKind::Transient
                | FailureKind::ServerError
                | FailureKind::Unclassified
        )
    }

    /// Label for logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Proxy => "proxy",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::Transient => "transient",
            FailureKind::ServerError => "server_error",
            FailureKind::ClientError => "client_error",
            FailureKind::Malformed => "malformed",
            FailureKind::Unclassified => "unclassified",
        }
    }
}

/// Classify a failed attempt.
///
/// A connect failure with a proxy in the path is a proxy fault: the TCP
/// connection (or CONNECT tunnel) is made to the proxy, not the service.
/// Connect timeouts stay transient even through a proxy.
pub fn classify(fault: &AttemptFault) -> FailureKind {
    match fault {
        AttemptFault::ProxySetup { .. } => FailureKind::Proxy,
        AttemptFault::Transport {
            fault: TransportFault::Connect,
            proxy: Some(_),
            ..
        } => FailureKind::Proxy,
        AttemptFault::Transport {
            fault:
                TransportFault::Timeout
                | TransportFault::Connect
                | TransportFault::Request
                | TransportFault::Body,
            ..
        } => FailureKind::Transient,
        AttemptFault::Transport {
            fault: TransportFault::Other,
            ..
        } => FailureKind::Unclassified,
        AttemptFault::Status { status, .. } => match status {
            401 => FailureKind::Unauthorized,
            429 => FailureKind::RateLimited,
            500..=599 => FailureKind::ServerError,
            _ => FailureKind::ClientError,
        },
        AttemptFault::Decode { .. } => FailureKind::Malformed,
    }
}

/// Render a reqwest error with its source chain.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> AttemptFault {
        AttemptFault::Status {
            status: code,
            body: String::new(),
        }
    }

    fn transport(fault: TransportFault, proxy: Option<&str>) -> AttemptFault {
        AttemptFault::Transport {
            fault,
            proxy: proxy.map(str::to_string),
            message: "boom".into(),
        }
    }

    #[test]
    fn status_401_is_unauthorized() {
        assert_eq!(classify(&status(401)), FailureKind::Unauthorized);
    }

    #[test]
    fn status_429_is_rate_limited() {
        assert_eq!(classify(&status(429)), FailureKind::RateLimited);
    }

    #[test]
    fn status_5xx_is_server_error() {
        for code in [500, 502, 503, 504, 599] {
            assert_eq!(classify(&status(code)), FailureKind::ServerError, "{code}");
        }
    }

    #[test]
    fn other_statuses_are_client_errors() {
        for code in [400, 403, 404, 408, 418] {
            assert_eq!(classify(&status(code)), FailureKind::ClientError, "{code}");
        }
    }

    #[test]
    fn proxy_setup_is_proxy_fault() {
        let fault = AttemptFault::ProxySetup {
            proxy: "ftp://x:1".into(),
            message: "unsupported proxy scheme: ftp".into(),
        };
        assert_eq!(classify(&fault), FailureKind::Proxy);
    }

    #[test]
    fn connect_through_proxy_is_proxy_fault() {
        assert_eq!(
            classify(&transport(TransportFault::Connect, Some("http://p:1"))),
            FailureKind::Proxy
        );
    }

    #[test]
    fn connect_direct_is_transient() {
        assert_eq!(
            classify(&transport(TransportFault::Connect, None)),
            FailureKind::Transient
        );
    }

    #[test]
    fn timeouts_and_resets_are_transient_even_via_proxy() {
        for fault in [
            TransportFault::Timeout,
            TransportFault::Request,
            TransportFault::Body,
        ] {
            assert_eq!(
                classify(&transport(fault, Some("http://p:1"))),
                FailureKind::Transient,
                "{fault:?}"
            );
        }
    }

    #[test]
    fn unknown_transport_fault_is_unclassified_and_retryable() {
        let kind = classify(&transport(TransportFault::Other, None));
        assert_eq!(kind, FailureKind::Unclassified);
        assert!(kind.is_retryable());
    }

    #[test]
    fn decode_is_malformed_and_terminal() {
        let kind = classify(&AttemptFault::Decode {
            message: "expected value".into(),
        });
        assert_eq!(kind, FailureKind::Malformed);
        assert!(!kind.is_retryable());
    }

    #[test]
    fn terminal_kinds_are_not_retryable() {
        assert!(!FailureKind::Unauthorized.is_retryable());
        assert!(!FailureKind::ClientError.is_retryable());
        assert!(!FailureKind::Proxy.is_retryable());
    }

    #[test]
    fn into_error_maps_status_faults() {
        let err = status(503).into_error(FailureKind::ServerError, "https://svc/x");
        assert!(matches!(err, Error::ServerError { status: 503, .. }));

        let err = status(401).into_error(FailureKind::Unauthorized, "https://svc/x");
        assert!(matches!(err, Error::Unauthorized { ref url } if url == "https://svc/x"));
    }

    #[test]
    fn into_error_maps_proxy_connect_fault() {
        let err = transport(TransportFault::Connect, Some("http://p:1"))
            .into_error(FailureKind::Proxy, "https://svc/x");
        assert!(matches!(err, Error::ProxyFailure { ref proxy, .. } if proxy == "http://p:1"));
    }

    #[test]
    fn into_error_unclassified_keeps_description() {
        let err = transport(TransportFault::Other, None)
            .into_error(FailureKind::Unclassified, "https://svc/x");
        match err {
            Error::Unclassified(msg) => assert!(msg.contains("boom"), "got: {msg}"),
            other => panic!("expected Unclassified, got {other:?}"),
        }
    }
}
