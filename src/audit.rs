//! Audit trail for diagnostic runs
//!
//! One JSON object per line, appended to a file. Credentials never
//! reach the log unmasked.

use crate::error::Result;
use crate::transport::AuthScheme;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Mask a secret for display, keeping its length.
///
/// Secrets of four characters or fewer are fully masked; longer ones
/// keep their first two characters.
///
/// # Examples
///
/// ```
/// use jmap_probe::mask_secret;
///
/// assert_eq!(mask_secret("hunter2"), "hu*****");
/// assert_eq!(mask_secret("abc"), "***");
/// assert_eq!(mask_secret(""), "");
/// ```
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let visible: String = secret.chars().take(2).collect();
    format!("{visible}{}", "*".repeat(len - 2))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
    Cancelled,
}

/// One audited action.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub host: String,
    pub auth_scheme: AuthScheme,
    /// Masked with [`mask_secret`].
    pub username: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u64,
}

impl AuditRecord {
    /// A record stamped now. `username` is masked here.
    #[must_use]
    pub fn new(
        action: impl Into<String>,
        host: impl Into<String>,
        auth_scheme: AuthScheme,
        username: &str,
        outcome: Outcome,
        elapsed: Duration,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            host: host.into(),
            auth_scheme,
            username: mask_secret(username),
            outcome,
            detail: None,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Append-only JSON-lines audit file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn append(&self, record: &AuditRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record).map_err(std::io::Error::other)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        Ok(())
    }
}
