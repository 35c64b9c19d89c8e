//! Session state and its durable storage
//!
//! The session document is read and written whole. `YamlSessionFile` stores
//! it as `accounts: [{ email, accessToken, refreshToken }]` using atomic
//! temp-file + rename writes with 0600 permissions.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Access/refresh token pair returned by a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenPair([REDACTED])")
    }
}

/// Tokens held for one identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(rename = "email")]
    pub identity: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl SessionState {
    /// A tokenless entry for a newly configured identity.
    pub fn placeholder(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            access_token: None,
            refresh_token: None,
        }
    }

    /// Either token absent or empty.
    pub fn needs_login(&self) -> bool {
        fn missing(token: &Option<String>) -> bool {
            token.as_deref().is_none_or(str::is_empty)
        }
        missing(&self.access_token) || missing(&self.refresh_token)
    }

    /// The access token, if present and non-empty.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether the stored tokens already equal `tokens`.
    pub fn holds(&self, tokens: &TokenPair) -> bool {
        self.access_token.as_deref() == Some(tokens.access_token.as_str())
            && self.refresh_token.as_deref() == Some(tokens.refresh_token.as_str())
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = |token: &Option<String>| match token.as_deref() {
            Some(t) if !t.is_empty() => "[REDACTED]",
            _ => "<none>",
        };
        f.debug_struct("SessionState")
            .field("identity", &self.identity)
            .field("access_token", &shown(&self.access_token))
            .field("refresh_token", &shown(&self.refresh_token))
            .finish()
    }
}

/// The whole persisted collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDocument {
    #[serde(default)]
    pub accounts: Vec<SessionState>,
}

/// Whole-document read/write storage for session state.
///
/// Uses `Pin<Box<dyn Future>>` return types so stores can hold
/// `Arc<dyn SessionRepository>`.
pub trait SessionRepository: Send + Sync {
    /// Read the stored document. A store that has never been written
    /// returns an empty document.
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<SessionDocument>> + Send + '_>>;

    /// Replace the stored document.
    fn save<'a>(
        &'a self,
        document: &'a SessionDocument,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// YAML file-backed session repository.
pub struct YamlSessionFile {
    path: PathBuf,
}

impl YamlSessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionRepository for YamlSessionFile {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<SessionDocument>> + Send + '_>> {
        Box::pin(async move {
            let contents = match tokio::fs::read_to_string(&self.path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!(path = %self.path.display(), "session file not found, starting empty");
                    return Ok(SessionDocument::default());
                }
                Err(e) => return Err(Error::Io(format!("reading session file: {e}"))),
            };
            if contents.trim().is_empty() {
                return Ok(SessionDocument::default());
            }
            let document: SessionDocument = serde_yaml::from_str(&contents)
                .map_err(|e| Error::SessionParse(format!("parsing session file: {e}")))?;
            info!(path = %self.path.display(), sessions = document.accounts.len(), "loaded sessions");
            Ok(document)
        })
    }

    fn save<'a>(
        &'a self,
        document: &'a SessionDocument,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(write_atomic(&self.path, document))
    }
}

/// Write the session document atomically (temp file in the same directory,
/// then rename). The file holds tokens, so it is created 0600 on unix.
async fn write_atomic(path: &Path, document: &SessionDocument) -> Result<()> {
    let yaml = serde_yaml::to_string(document)
        .map_err(|e| Error::SessionParse(format!("serializing sessions: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;
    let tmp_path = dir.join(format!(".sessions.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, yaml.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), sessions = document.accounts.len(), "persisted sessions");
    Ok(())
}
