//! JMAP connection configuration

use crate::error::{Error, Result};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Default HTTPS port; omitted from discovery URLs.
pub const DEFAULT_PORT: u16 = 443;

/// Which `Authorization` scheme to send.
///
/// Parsing never fails: values other than `auto`, `basic` and `bearer`
/// become [`AuthMethod::Other`], which sends no header at all.
/// Restricting the accepted values is left to the caller (the CLI does
/// so through clap).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthMethod {
    /// Bearer if a token is set, else basic if a password is set.
    #[default]
    Auto,
    Basic,
    Bearer,
    Other(String),
}

impl AuthMethod {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Auto => "auto",
            Self::Basic => "basic",
            Self::Bearer => "bearer",
            Self::Other(s) => s,
        }
    }
}

impl FromStr for AuthMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "auto" | "" => Self::Auto,
            "basic" => Self::Basic,
            "bearer" => Self::Bearer,
            _ => Self::Other(s.to_string()),
        })
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JMAP server location and credentials
#[derive(Debug, Clone)]
pub struct JmapConfig {
    /// Host name, or a base URL with an explicit scheme.
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Bearer access token.
    pub token: String,
    pub auth_method: AuthMethod,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Sent as the HTTP `User-Agent`.
    pub user_agent: String,
}

impl JmapConfig {
    /// Configuration for `host` with default port, no credentials and
    /// `auto` authentication.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            token: String::new(),
            auth_method: AuthMethod::Auto,
            insecure: false,
            user_agent: default_user_agent(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `JMAP_HOST`
    ///
    /// Optional (with defaults):
    /// - `JMAP_PORT` (default: `443`)
    /// - `JMAP_USERNAME`, `JMAP_PASSWORD`, `JMAP_TOKEN` (default: empty)
    /// - `JMAP_AUTH_METHOD` (default: `auto`)
    /// - `JMAP_INSECURE` (default: `false`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `JMAP_HOST` is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_host(None)
    }

    /// Like [`JmapConfig::from_env`], but `JMAP_HOST` may be absent when
    /// the caller supplies the host some other way.
    ///
    /// # Errors
    ///
    /// Same as [`JmapConfig::from_env`].
    pub fn from_env_with_host(host: Option<String>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = host
            .or_else(|| env::var("JMAP_HOST").ok())
            .ok_or_else(|| Error::Config("JMAP_HOST not set".into()))?;
        Self::from_lookup(host, |key| env::var(key).ok())
    }

    fn from_lookup(host: String, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("JMAP_PORT") {
            Some(p) => p
                .parse()
                .map_err(|e| Error::Config(format!("Invalid JMAP_PORT: {e}")))?,
            None => DEFAULT_PORT,
        };
        let insecure = match lookup("JMAP_INSECURE") {
            Some(v) => parse_bool(&v)
                .ok_or_else(|| Error::Config(format!("Invalid JMAP_INSECURE: {v}")))?,
            None => false,
        };
        let auth_method = lookup("JMAP_AUTH_METHOD")
            .map(|m| m.parse().unwrap_or_default())
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            username: lookup("JMAP_USERNAME").unwrap_or_default(),
            password: lookup("JMAP_PASSWORD").unwrap_or_default(),
            token: lookup("JMAP_TOKEN").unwrap_or_default(),
            auth_method,
            insecure,
            user_agent: default_user_agent(),
        })
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
