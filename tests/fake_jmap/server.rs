//! In-process fake JMAP server for integration testing
//!
//! # How JMAP works (short overview)
//!
//! JMAP (RFC 8620) is JSON over HTTP. A client first fetches the
//! **Session resource** from a well-known URL. The session lists the
//! server's capabilities, the accounts the user can access, and the
//! `apiUrl` every subsequent request goes to:
//!
//! ```text
//!   GET /.well-known/jmap
//!       -> {"capabilities": {...}, "accounts": {...}, "apiUrl": ".../jmap", ...}
//! ```
//!
//! API requests batch one or more **method calls**. Each call is a
//! three-element array of method name, arguments and a client-chosen
//! call id, and the server answers with one array per call in the same
//! order:
//!
//! ```text
//!   POST /jmap
//!   {"using": [...], "methodCalls": [["Mailbox/get", {"accountId": "A"}, "0"]]}
//!       -> {"methodResponses": [["Mailbox/get", {"list": [...]}, "0"]], "sessionState": "s1"}
//! ```
//!
//! A call that fails on its own is answered with the method name
//! `error` instead of failing the whole HTTP request.

use super::handlers::dispatch;
use super::state::FakeState;
use jmap_probe::Request as JmapRequest;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// A fake JMAP server on localhost with an OS-assigned port.
///
/// Plain HTTP; the client is pointed at it with an explicit `http://`
/// host so no certificates are involved.
pub struct FakeJmapServer {
    server: MockServer,
}

impl FakeJmapServer {
    /// Start a new fake server serving `state`.
    ///
    /// The server runs until the `FakeJmapServer` is dropped.
    pub async fn start(state: FakeState) -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(state);

        Mock::given(method("GET"))
            .and(path("/.well-known/jmap"))
            .respond_with(SessionResponder {
                state: state.clone(),
                base: server.uri(),
            })
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/jmap"))
            .respond_with(ApiResponder { state })
            .mount(&server)
            .await;

        Self { server }
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

fn authorized(state: &FakeState, request: &Request) -> bool {
    let Some(expected) = &state.authorization else {
        return true;
    };
    request
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str())
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_string("Unauthorized")
}

struct SessionResponder {
    state: Arc<FakeState>,
    base: String,
}

impl Respond for SessionResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if !authorized(&self.state, request) {
            return unauthorized();
        }
        let response =
            ResponseTemplate::new(200).set_body_json(self.state.session_json(&self.base));
        match self.state.discovery_delay {
            Some(delay) => response.set_delay(delay),
            None => response,
        }
    }
}

struct ApiResponder {
    state: Arc<FakeState>,
}

impl Respond for ApiResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if !authorized(&self.state, request) {
            return unauthorized();
        }

        let Ok(api_request) = serde_json::from_slice::<JmapRequest>(&request.body) else {
            return ResponseTemplate::new(400).set_body_json(json!({
                "type": "urn:ietf:params:jmap:error:notRequest",
                "status": 400
            }));
        };

        let responses: Vec<_> = api_request
            .method_calls
            .iter()
            .map(|call| dispatch(&self.state, call))
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({
            "methodResponses": responses,
            "sessionState": self.state.session_state
        }))
    }
}
