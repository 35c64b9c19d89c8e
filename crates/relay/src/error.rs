//! Error types for request execution

/// Terminal outcome of a logical request.
///
/// Leaf variants describe a single attempt. `RequestExhausted` wraps the last
/// of them once the retry budget is spent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("proxy failure via {proxy}: {message}")]
    ProxyFailure { proxy: String, message: String },

    #[error("unauthorized (401) for {url}")]
    Unauthorized { url: String },

    #[error("rate limited (429) for {url}")]
    RateLimited { url: String },

    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("client error {status}: {body}")]
    ClientError { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("unclassified failure: {0}")]
    Unclassified(String),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("request failed after {attempts} attempts: {last}")]
    RequestExhausted {
        attempts: u32,
        #[source]
        last: Box<Error>,
    },
}

impl Error {
    /// Whether this error is a 401. Use `root()` first to look through an
    /// exhausted request.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }

    /// The final attempt's error for exhausted requests, otherwise `self`.
    pub fn root(&self) -> &Error {
        match self {
            Error::RequestExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

/// Result alias for request execution.
pub type Result<T> = std::result::Result<T, Error>;
