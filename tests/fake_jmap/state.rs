//! Test data model for the fake JMAP server
//!
//! Provides a builder-style API for constructing server state:
//!
//! ```ignore
//! let state = StateBuilder::new("alice@example.com")
//!     .account("A", "alice@example.com")
//!         .mailbox("mb1", "Inbox", Some("inbox"), 100, 5)
//!             .email("e1")
//!             .email("e2")
//!         .mailbox("mb2", "Sent", Some("sent"), 10, 0)
//!     .build();
//! ```
//!
//! The first account added becomes the primary mail account unless
//! `.no_primary_mail_account()` is called.

use jmap_probe::Mailbox;
use jmap_probe::protocol::{CAPABILITY_CORE, CAPABILITY_MAIL, CAPABILITY_SUBMISSION};
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Everything the fake server knows.
#[derive(Debug, Clone)]
pub struct FakeState {
    pub username: String,
    pub capabilities: Vec<String>,
    pub accounts: Vec<FakeAccount>,
    pub primary_mail_account: Option<String>,
    /// Exact `Authorization` header value the server demands, if any.
    pub authorization: Option<String>,
    /// Delay before answering session discovery.
    pub discovery_delay: Option<Duration>,
    pub session_state: String,
}

#[derive(Debug, Clone)]
pub struct FakeAccount {
    pub id: String,
    pub name: String,
    pub mailboxes: Vec<FakeMailbox>,
}

/// A mailbox plus the ids of the emails it contains.
#[derive(Debug, Clone)]
pub struct FakeMailbox {
    pub mailbox: Mailbox,
    pub email_ids: Vec<String>,
}

impl FakeState {
    pub fn account(&self, id: &str) -> Option<&FakeAccount> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// The Session resource, with URLs rooted at `base`.
    pub fn session_json(&self, base: &str) -> Value {
        let capabilities: Map<String, Value> = self
            .capabilities
            .iter()
            .map(|c| (c.clone(), json!({})))
            .collect();

        let accounts: Map<String, Value> = self
            .accounts
            .iter()
            .map(|a| {
                (
                    a.id.clone(),
                    json!({
                        "name": a.name,
                        "isPersonal": true,
                        "isReadOnly": false,
                        "accountCapabilities": { CAPABILITY_MAIL: {} }
                    }),
                )
            })
            .collect();

        let mut primary = Map::new();
        if let Some(id) = &self.primary_mail_account {
            primary.insert(CAPABILITY_MAIL.to_string(), json!(id));
        }
        if let Some(first) = self.accounts.first() {
            primary.insert(CAPABILITY_CORE.to_string(), json!(first.id));
        }

        json!({
            "capabilities": capabilities,
            "accounts": accounts,
            "primaryAccounts": primary,
            "username": self.username,
            "apiUrl": format!("{base}/jmap"),
            "downloadUrl": format!("{base}/download/{{accountId}}/{{blobId}}/{{name}}?type={{type}}"),
            "uploadUrl": format!("{base}/upload/{{accountId}}/"),
            "eventSourceUrl": format!("{base}/eventsource/?types={{types}}"),
            "state": self.session_state
        })
    }
}

/// Builder for constructing a `FakeState` step by step.
pub struct StateBuilder {
    state: FakeState,
    primary_mail: bool,
}

impl StateBuilder {
    pub fn new(username: &str) -> Self {
        Self {
            state: FakeState {
                username: username.to_string(),
                capabilities: vec![CAPABILITY_CORE.to_string(), CAPABILITY_MAIL.to_string()],
                accounts: Vec::new(),
                primary_mail_account: None,
                authorization: None,
                discovery_delay: None,
                session_state: "s1".to_string(),
            },
            primary_mail: true,
        }
    }

    /// Add an account. Subsequent `.mailbox()` calls add to it.
    pub fn account(mut self, id: &str, name: &str) -> Self {
        self.state.accounts.push(FakeAccount {
            id: id.to_string(),
            name: name.to_string(),
            mailboxes: Vec::new(),
        });
        self
    }

    /// Add a mailbox to the most recently added account.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.account()` call.
    pub fn mailbox(
        mut self,
        id: &str,
        name: &str,
        role: Option<&str>,
        total: u64,
        unread: u64,
    ) -> Self {
        let sort_order = u32::try_from(self.current_account().mailboxes.len()).unwrap();
        self.current_account().mailboxes.push(FakeMailbox {
            mailbox: Mailbox {
                id: id.to_string(),
                name: name.to_string(),
                parent_id: None,
                role: role.map(ToString::to_string),
                sort_order,
                total_emails: total,
                unread_emails: unread,
                total_threads: total,
                unread_threads: unread,
                my_rights: None,
                is_subscribed: true,
            },
            email_ids: Vec::new(),
        });
        self
    }

    /// Add an email id to the most recently added mailbox.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.mailbox()` call.
    pub fn email(mut self, id: &str) -> Self {
        self.current_account()
            .mailboxes
            .last_mut()
            .expect("call .mailbox() before .email()")
            .email_ids
            .push(id.to_string());
        self
    }

    pub fn with_submission(mut self) -> Self {
        self.state.capabilities.push(CAPABILITY_SUBMISSION.to_string());
        self
    }

    pub fn no_capabilities(mut self) -> Self {
        self.state.capabilities.clear();
        self
    }

    pub fn no_primary_mail_account(mut self) -> Self {
        self.primary_mail = false;
        self
    }

    /// Answer 401 unless the request carries exactly this header value.
    pub fn require_authorization(mut self, header: &str) -> Self {
        self.state.authorization = Some(header.to_string());
        self
    }

    pub fn discovery_delay(mut self, delay: Duration) -> Self {
        self.state.discovery_delay = Some(delay);
        self
    }

    pub fn build(mut self) -> FakeState {
        if self.primary_mail {
            self.state.primary_mail_account = self.state.accounts.first().map(|a| a.id.clone());
        }
        self.state
    }

    fn current_account(&mut self) -> &mut FakeAccount {
        self.state
            .accounts
            .last_mut()
            .expect("call .account() before .mailbox()")
    }
}
