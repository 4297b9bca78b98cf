//! JMAP Mailbox objects (RFC 8621 section 2)
//!
//! Holds the `Mailbox` record returned by `Mailbox/get`, the typed
//! request/response argument shapes for that method, and a
//! strongly-typed view of the well-known mailbox roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A well-known mailbox role (RFC 8457 registry).
///
/// Roles the server reports but that are not listed here use the
/// `Custom` variant.
///
/// # Examples
///
/// ```
/// use jmap_probe::Role;
///
/// assert_eq!(Role::from("inbox"), Role::Inbox);
/// assert_eq!(Role::Junk.as_str(), "junk");
/// assert_eq!(Role::from("important").as_str(), "important");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Inbox,
    Sent,
    Drafts,
    Trash,
    /// Spam / junk messages.
    Junk,
    Archive,
    /// Any role outside the list above.
    Custom(String),
}

impl Role {
    /// The role as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
            Self::Drafts => "drafts",
            Self::Trash => "trash",
            Self::Junk => "junk",
            Self::Archive => "archive",
            Self::Custom(role) => role,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "inbox" => Self::Inbox,
            "sent" => Self::Sent,
            "drafts" => Self::Drafts,
            "trash" => Self::Trash,
            "junk" => Self::Junk,
            "archive" => Self::Archive,
            _ => Self::Custom(s.to_string()),
        }
    }
}

/// Access rights the authenticated user holds on a mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct MailboxRights {
    pub may_read_items: bool,
    pub may_add_items: bool,
    pub may_remove_items: bool,
    pub may_set_seen: bool,
    pub may_set_keywords: bool,
    pub may_create_child: bool,
    pub may_rename: bool,
    pub may_delete: bool,
    pub may_submit: bool,
}

/// A mailbox as returned by `Mailbox/get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mailbox {
    pub id: String,
    pub name: String,
    /// `None` for top-level mailboxes.
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub sort_order: u32,
    #[serde(default)]
    pub total_emails: u64,
    #[serde(default)]
    pub unread_emails: u64,
    #[serde(default)]
    pub total_threads: u64,
    #[serde(default)]
    pub unread_threads: u64,
    #[serde(default)]
    pub my_rights: Option<MailboxRights>,
    #[serde(default)]
    pub is_subscribed: bool,
}

impl Mailbox {
    /// Typed view of [`Mailbox::role`].
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().map(Role::from)
    }
}

/// Arguments of a `Mailbox/get` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMailboxesRequest {
    pub account_id: String,
    /// `None` fetches every mailbox.
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    /// `None` returns all properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<String>>,
}

/// Arguments of a `Mailbox/get` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMailboxesResponse {
    pub account_id: String,
    #[serde(default)]
    pub state: String,
    pub list: Vec<Mailbox>,
    #[serde(default)]
    pub not_found: Vec<String>,
}
