//! JMAP protocol client

use crate::config::JmapConfig;
use crate::email::{Comparator, EmailFilter, QueryEmailsResponse};
use crate::error::{Error, Result};
use crate::mailbox::Mailbox;
use crate::protocol::{MethodResponse, Request, Response};
use crate::session::Session;
use crate::transport::{self, AuthScheme};
use reqwest::header::CONTENT_TYPE;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Diagnostic JMAP client.
///
/// Holds one HTTP client and the most recently discovered
/// [`Session`]. A session, once discovered, is only ever replaced by
/// a newer discovery; build a new client to start over.
pub struct JmapClient {
    config: JmapConfig,
    http: reqwest::Client,
    session: Option<Session>,
}

impl JmapClient {
    /// Create a client. No network traffic happens until the first
    /// call.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: JmapConfig) -> Result<Self> {
        let http = transport::http_client(&config)?;
        Ok(Self {
            config,
            http,
            session: None,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &JmapConfig {
        &self.config
    }

    /// The cached session, if [`JmapClient::discover`] has succeeded.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn discovery_url(&self) -> String {
        transport::discovery_url(&self.config.host, self.config.port)
    }

    /// The authentication scheme requests will use.
    #[must_use]
    pub fn auth_scheme(&self) -> AuthScheme {
        AuthScheme::resolve(&self.config)
    }

    /// Fetch, validate and cache the Session resource
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled, the
    /// server answers with a status other than 200, or the body is not
    /// a valid Session.
    pub async fn discover(&mut self, cancel: &CancellationToken) -> Result<&Session> {
        let url = self.discovery_url();
        debug!("Discovering JMAP session at {}", url);

        let request = transport::authorize(self.http.get(&url), &self.config);
        let body = transport::send(request, &url, cancel).await?;

        let session = Session::parse(&body)?;
        session.validate()?;

        info!(
            "Discovered session for {:?} with {} account(s)",
            session.username,
            session.account_count()
        );
        Ok(&*self.session.insert(session))
    }

    /// POST a request to the session's API URL
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] before a successful discovery, and
    /// otherwise the same transport, status and parse errors as
    /// [`JmapClient::discover`].
    pub async fn api_call(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let session = self.session.as_ref().ok_or(Error::NoSession)?;
        let url = session.api_url.as_str();
        debug!(
            "Calling {} with {} method call(s)",
            url,
            request.method_calls.len()
        );

        let http_request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(request.encode()?);
        let body = transport::send(transport::authorize(http_request, &self.config), url, cancel)
            .await?;

        let response = Response::decode(&body)?;
        if let Some(state) = &response.session_state
            && *state != session.state
        {
            debug!("Session state changed: {} -> {}", session.state, state);
        }
        Ok(response)
    }

    /// List every mailbox of the primary mail account
    ///
    /// Discovers the session first if none is cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPrimaryAccount`] if the session names no
    /// primary mail account, [`Error::Method`] if the server answers
    /// with a method-level error, and any discovery or API call error.
    pub async fn list_mailboxes(&mut self, cancel: &CancellationToken) -> Result<Vec<Mailbox>> {
        let account_id = self.primary_mail_account(cancel).await?;
        let request = Request::get_mailboxes(account_id, None);

        let response = self.api_call(&request, cancel).await?;
        let mailboxes = first_success(&response)?.mailboxes()?;
        info!("Listed {} mailbox(es)", mailboxes.list.len());
        Ok(mailboxes.list)
    }

    /// Run `Email/query` in the primary mail account
    ///
    /// Discovers the session first if none is cached.
    ///
    /// # Errors
    ///
    /// Same as [`JmapClient::list_mailboxes`].
    pub async fn query_emails(
        &mut self,
        filter: Option<EmailFilter>,
        sort: Vec<Comparator>,
        limit: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<QueryEmailsResponse> {
        let account_id = self.primary_mail_account(cancel).await?;
        let request = Request::query_emails(account_id, filter, sort, limit, true);

        let response = self.api_call(&request, cancel).await?;
        first_success(&response)?.email_query()
    }

    // -- private helpers --

    async fn primary_mail_account(&mut self, cancel: &CancellationToken) -> Result<String> {
        if self.session.is_none() {
            self.discover(cancel).await?;
        }
        self.session
            .as_ref()
            .ok_or(Error::NoSession)?
            .primary_mail_account_id()
            .map(ToString::to_string)
            .ok_or(Error::NoPrimaryAccount)
    }
}

/// The first method response, unless it is a method-level error.
fn first_success(response: &Response) -> Result<&MethodResponse> {
    let first = response.first()?;
    match first.method_error() {
        Some(error) => Err(Error::Method(error)),
        None => Ok(first),
    }
}
