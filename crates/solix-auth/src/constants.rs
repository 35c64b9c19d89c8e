//! Solix API endpoints
//!
//! Paths are fixed by the service; only the base URL is configurable.

/// Production API base URL
pub const DEFAULT_API_BASE: &str = "https://api.solixdepin.net";

/// Password login, returns the access/refresh token pair
pub const LOGIN_PATH: &str = "/api/auth/login-password";

/// Aggregate metric: total points for the account
pub const TOTAL_POINT_PATH: &str = "/api/point/get-total-point";

/// Lightweight status: current connection quality
pub const CONNECTION_QUALITY_PATH: &str = "/api/point/get-connection-quality";

/// Absolute endpoint URLs for one API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn login(&self) -> String {
        format!("{}{LOGIN_PATH}", self.base)
    }

    pub fn total_point(&self) -> String {
        format!("{}{TOTAL_POINT_PATH}", self.base)
    }

    pub fn connection_quality(&self) -> String {
        format!("{}{CONNECTION_QUALITY_PATH}", self.base)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}
