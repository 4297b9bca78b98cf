//! JMAP diagnostic client library
//!
//! Discovers a JMAP server's Session resource (RFC 8620), authenticates
//! with basic or bearer credentials, and issues `Mailbox/get` and
//! `Email/query` calls to report what the server exposes.
//!
//! [`JmapClient`] performs the network I/O; [`protocol`] holds the
//! wire codec for JMAP's `[name, arguments, callId]` method tuples.

mod audit;
mod client;
mod config;
mod email;
mod error;
mod mailbox;
pub mod protocol;
mod session;
mod transport;

pub use audit::{AuditLog, AuditRecord, Outcome, mask_secret};
pub use client::JmapClient;
pub use config::{AuthMethod, DEFAULT_PORT, JmapConfig};
pub use email::{Comparator, EmailFilter, QueryEmailsRequest, QueryEmailsResponse};
pub use error::{Error, Result};
pub use mailbox::{GetMailboxesRequest, GetMailboxesResponse, Mailbox, MailboxRights, Role};
pub use protocol::{
    Arguments, MethodCall, MethodError, MethodResponse, Request, Response, is_error_response,
};
pub use session::{Account, Session, SessionCheck, WellFormedUrls};
pub use transport::{AuthScheme, REQUEST_TIMEOUT, WELL_KNOWN_PATH, discovery_url};
pub use tokio_util::sync::CancellationToken;
