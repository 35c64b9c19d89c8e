//! Account credential loading
//!
//! Credentials are read once at startup from a YAML document of the form
//! `accounts: [{ email, password }]`. The identity (email) is the unique key
//! everywhere else in the workspace.

use std::collections::HashSet;
use std::path::Path;

use common::{Secret, mask_identity};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Login identity and secret for one account.
#[derive(Debug, Clone)]
pub struct AccountCredential {
    pub identity: String,
    pub secret: Secret<String>,
}

impl AccountCredential {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: Secret::new(secret.into()),
        }
    }

    /// Identity masked for logs.
    pub fn label(&self) -> String {
        mask_identity(&self.identity)
    }
}

#[derive(Deserialize)]
struct CredentialDocument {
    #[serde(default)]
    accounts: Vec<RawCredential>,
}

#[derive(Deserialize)]
struct RawCredential {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Parse a credential document.
///
/// Entries without an email are skipped. Duplicate identities collapse to
/// the first occurrence.
pub fn parse_credentials(contents: &str) -> Result<Vec<AccountCredential>> {
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document: CredentialDocument = serde_yaml::from_str(contents)
        .map_err(|e| Error::CredentialParse(format!("parsing account list: {e}")))?;

    let mut seen = HashSet::new();
    let mut credentials = Vec::with_capacity(document.accounts.len());
    for (index, raw) in document.accounts.into_iter().enumerate() {
        let identity = raw.email.trim().to_string();
        if identity.is_empty() {
            warn!(index, "skipping account entry without email");
            continue;
        }
        if !seen.insert(identity.clone()) {
            warn!(account = %mask_identity(&identity), "duplicate account entry ignored");
            continue;
        }
        credentials.push(AccountCredential::new(identity, raw.password));
    }
    Ok(credentials)
}

/// Load credentials from `path`. A missing file yields an empty list; the
/// caller decides whether that is fatal.
pub async fn load_credentials(path: &Path) -> Result<Vec<AccountCredential>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "account file not found");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(Error::Io(format!(
                "reading account file {}: {e}",
                path.display()
            )));
        }
    };

    let credentials = parse_credentials(&contents)?;
    info!(path = %path.display(), accounts = credentials.len(), "loaded accounts");
    Ok(credentials)
}
