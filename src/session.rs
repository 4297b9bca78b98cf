//! JMAP Session resource (RFC 8620 section 2)

use crate::error::{Error, Result};
use crate::protocol::{CAPABILITY_MAIL, CAPABILITY_SUBMISSION};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The Session resource served at `/.well-known/jmap`.
///
/// Capability and account maps have no defined order; use
/// [`Session::capability_names`] for a stable listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub capabilities: HashMap<String, Value>,
    #[serde(default)]
    pub accounts: HashMap<String, Account>,
    #[serde(default)]
    pub primary_accounts: HashMap<String, String>,
    #[serde(default)]
    pub username: String,
    pub api_url: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub upload_url: String,
    #[serde(default)]
    pub event_source_url: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_personal: bool,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub account_capabilities: HashMap<String, Value>,
}

/// An additional sanity check run by [`Session::validate_with`].
pub trait SessionCheck {
    fn check(&self, session: &Session) -> Result<()>;
}

impl<F> SessionCheck for F
where
    F: Fn(&Session) -> Result<()>,
{
    fn check(&self, session: &Session) -> Result<()> {
        self(session)
    }
}

/// Requires `apiUrl`, and every non-empty URL template, to be an
/// absolute URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellFormedUrls;

impl SessionCheck for WellFormedUrls {
    fn check(&self, session: &Session) -> Result<()> {
        let urls = [
            ("apiUrl", &session.api_url),
            ("downloadUrl", &session.download_url),
            ("uploadUrl", &session.upload_url),
            ("eventSourceUrl", &session.event_source_url),
        ];
        for (field, url) in urls {
            if url.is_empty() && field != "apiUrl" {
                continue;
            }
            Url::parse(url).map_err(|e| Error::Validation(format!("{field} {url:?}: {e}")))?;
        }
        Ok(())
    }
}

impl Session {
    /// Decode a Session resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if `bytes` is not JSON, or lacks
    /// `capabilities` or `apiUrl`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| Error::Parse {
            what: "session",
            source,
        })
    }

    /// A session is usable when it has an API URL and at least one
    /// capability.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first unmet condition.
    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(Error::Validation("apiUrl is empty".into()));
        }
        if self.capabilities.is_empty() {
            return Err(Error::Validation("no capabilities advertised".into()));
        }
        Ok(())
    }

    /// [`Session::validate`] followed by each extra check in order.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Session::validate`] or a check.
    pub fn validate_with(&self, checks: &[&dyn SessionCheck]) -> Result<()> {
        self.validate()?;
        for check in checks {
            check.check(self)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Capability URIs, sorted.
    #[must_use]
    pub fn capability_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn has_mail_capability(&self) -> bool {
        self.capabilities.contains_key(CAPABILITY_MAIL)
    }

    #[must_use]
    pub fn has_submission_capability(&self) -> bool {
        self.capabilities.contains_key(CAPABILITY_SUBMISSION)
    }

    /// The account to use for mail data, if the server names one.
    #[must_use]
    pub fn primary_mail_account_id(&self) -> Option<&str> {
        self.primary_accounts
            .get(CAPABILITY_MAIL)
            .map(String::as_str)
    }
}
