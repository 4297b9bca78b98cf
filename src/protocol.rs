//! JMAP wire codec (RFC 8620 section 3)
//!
//! JMAP encodes each method call and method response as a
//! three-element JSON array rather than an object:
//!
//! ```text
//!   ["Mailbox/get", {"accountId": "A", "ids": null}, "0"]
//!    ^ name          ^ arguments                     ^ call id
//! ```
//!
//! Outgoing calls carry [`Arguments`], a tagged union of the typed
//! request shapes this crate knows plus a raw JSON fallback. Incoming
//! responses keep their arguments as undecoded JSON text until the
//! caller picks a decoder based on the method name.
//!
//! Arrays whose length is not exactly three are rejected.

use crate::email::{Comparator, EmailFilter, QueryEmailsRequest, QueryEmailsResponse};
use crate::error::{Error, Result};
use crate::mailbox::{GetMailboxesRequest, GetMailboxesResponse};
use serde::de::{self, DeserializeOwned, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

pub const CAPABILITY_CORE: &str = "urn:ietf:params:jmap:core";
pub const CAPABILITY_MAIL: &str = "urn:ietf:params:jmap:mail";
pub const CAPABILITY_SUBMISSION: &str = "urn:ietf:params:jmap:submission";

pub const METHOD_MAILBOX_GET: &str = "Mailbox/get";
pub const METHOD_MAILBOX_QUERY: &str = "Mailbox/query";
pub const METHOD_EMAIL_GET: &str = "Email/get";
pub const METHOD_EMAIL_QUERY: &str = "Email/query";
pub const METHOD_EMAIL_SET: &str = "Email/set";

/// Method name the server uses for a method-level error.
pub const ERROR_RESPONSE: &str = "error";

/// Call id used by the single-call request constructors.
pub const DEFAULT_CALL_ID: &str = "0";

/// Whether a method response name marks a method-level error.
#[must_use]
pub fn is_error_response(name: &str) -> bool {
    name == ERROR_RESPONSE
}

/// Arguments of an outgoing method call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Arguments {
    GetMailboxes(GetMailboxesRequest),
    QueryEmails(QueryEmailsRequest),
    /// Arguments for methods without a typed shape, or not yet routed.
    Raw(Value),
}

impl From<GetMailboxesRequest> for Arguments {
    fn from(args: GetMailboxesRequest) -> Self {
        Self::GetMailboxes(args)
    }
}

impl From<QueryEmailsRequest> for Arguments {
    fn from(args: QueryEmailsRequest) -> Self {
        Self::QueryEmails(args)
    }
}

impl From<Value> for Arguments {
    fn from(args: Value) -> Self {
        Self::Raw(args)
    }
}

/// A single `[name, arguments, callId]` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub name: String,
    pub arguments: Arguments,
    pub call_id: String,
}

impl MethodCall {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        arguments: impl Into<Arguments>,
        call_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            call_id: call_id.into(),
        }
    }

    /// Serialize to the wire array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the arguments fail to serialize.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| Error::Parse {
            what: "method call",
            source,
        })
    }

    /// Parse a wire array. Arguments come back as [`Arguments::Raw`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] unless `bytes` is an array of exactly a
    /// string name, arguments and a string call id.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| Error::Parse {
            what: "method call",
            source,
        })
    }

    /// Route raw arguments to the typed shape for this method name.
    ///
    /// Methods without a typed shape, and arguments that are already
    /// typed, are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the arguments do not fit the
    /// method's shape.
    pub fn typed_arguments(&self) -> Result<Arguments> {
        let Arguments::Raw(raw) = &self.arguments else {
            return Ok(self.arguments.clone());
        };
        let mismatch = |source: serde_json::Error| Error::TypeMismatch {
            method: self.name.clone(),
            source,
        };
        match self.name.as_str() {
            METHOD_MAILBOX_GET => serde_json::from_value(raw.clone())
                .map(Arguments::GetMailboxes)
                .map_err(mismatch),
            METHOD_EMAIL_QUERY => serde_json::from_value(raw.clone())
                .map(Arguments::QueryEmails)
                .map_err(mismatch),
            _ => Ok(self.arguments.clone()),
        }
    }
}

impl Serialize for MethodCall {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.name)?;
        tuple.serialize_element(&self.arguments)?;
        tuple.serialize_element(&self.call_id)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for MethodCall {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (name, arguments, call_id) =
            deserializer.deserialize_seq(TripleVisitor::<Value>(PhantomData))?;
        Ok(Self {
            name,
            arguments: Arguments::Raw(arguments),
            call_id,
        })
    }
}

/// A single `[name, arguments, callId]` response.
#[derive(Debug, Clone)]
pub struct MethodResponse {
    pub name: String,
    /// Undecoded JSON; see [`MethodResponse::decode_arguments`].
    pub arguments: Box<RawValue>,
    pub call_id: String,
}

impl MethodResponse {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        arguments: Box<RawValue>,
        call_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            call_id: call_id.into(),
        }
    }

    /// Serialize to the wire array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| Error::Parse {
            what: "method response",
            source,
        })
    }

    /// Parse a wire array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] unless `bytes` is a three-element
    /// `[name, arguments, callId]` array.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| Error::Parse {
            what: "method response",
            source,
        })
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        is_error_response(&self.name)
    }

    /// The error payload, when this is an `error` response.
    ///
    /// A payload that does not look like an error object is reported
    /// with type `unknown` and the raw JSON as description.
    #[must_use]
    pub fn method_error(&self) -> Option<MethodError> {
        if !self.is_error() {
            return None;
        }
        Some(
            serde_json::from_str(self.arguments.get()).unwrap_or_else(|_| MethodError {
                kind: "unknown".to_string(),
                description: Some(self.arguments.get().to_string()),
            }),
        )
    }

    /// Decode the arguments into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the arguments do not fit `T`.
    pub fn decode_arguments<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(self.arguments.get()).map_err(|source| Error::TypeMismatch {
            method: self.name.clone(),
            source,
        })
    }

    /// Decode a `Mailbox/get` response.
    ///
    /// # Errors
    ///
    /// See [`MethodResponse::decode_arguments`].
    pub fn mailboxes(&self) -> Result<GetMailboxesResponse> {
        self.decode_arguments()
    }

    /// Decode an `Email/query` response.
    ///
    /// # Errors
    ///
    /// See [`MethodResponse::decode_arguments`].
    pub fn email_query(&self) -> Result<QueryEmailsResponse> {
        self.decode_arguments()
    }
}

impl Serialize for MethodResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.name)?;
        tuple.serialize_element(&self.arguments)?;
        tuple.serialize_element(&self.call_id)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for MethodResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (name, arguments, call_id) =
            deserializer.deserialize_seq(TripleVisitor::<Box<RawValue>>(PhantomData))?;
        Ok(Self {
            name,
            arguments,
            call_id,
        })
    }
}

struct TripleVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for TripleVisitor<T> {
    type Value = (String, T, String);

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a [name, arguments, callId] array")
    }

    fn visit_seq<A: SeqAccess<'de>>(
        self,
        mut seq: A,
    ) -> std::result::Result<Self::Value, A::Error> {
        let name: String = seq
            .next_element()?
            .ok_or_else(|| <A::Error as de::Error>::invalid_length(0, &self))?;
        let arguments: T = seq
            .next_element()?
            .ok_or_else(|| <A::Error as de::Error>::invalid_length(1, &self))?;
        let call_id: String = seq
            .next_element()?
            .ok_or_else(|| <A::Error as de::Error>::invalid_length(2, &self))?;

        let mut len = 3;
        while seq.next_element::<IgnoredAny>()?.is_some() {
            len += 1;
        }
        if len != 3 {
            return Err(de::Error::invalid_length(len, &self));
        }

        Ok((name, arguments, call_id))
    }
}

/// Payload of an `error` method response (RFC 8620 section 3.6.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodError {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {description}", self.kind),
            None => f.write_str(&self.kind),
        }
    }
}

/// The POST body sent to the session's API URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub using: Vec<String>,
    pub method_calls: Vec<MethodCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_ids: Option<HashMap<String, String>>,
}

impl Request {
    /// An empty request declaring the given capabilities.
    #[must_use]
    pub fn new<I, S>(using: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            using: using.into_iter().map(Into::into).collect(),
            method_calls: Vec::new(),
            created_ids: None,
        }
    }

    /// Append a call. Calls are answered in the order they are added.
    #[must_use]
    pub fn with_call(mut self, call: MethodCall) -> Self {
        self.method_calls.push(call);
        self
    }

    /// `Mailbox/get` for every mailbox of `account_id`.
    ///
    /// `properties` limits the returned fields; `None` returns all.
    #[must_use]
    pub fn get_mailboxes(account_id: impl Into<String>, properties: Option<Vec<String>>) -> Self {
        let args = GetMailboxesRequest {
            account_id: account_id.into(),
            ids: None,
            properties,
        };
        Self::new([CAPABILITY_CORE, CAPABILITY_MAIL]).with_call(MethodCall::new(
            METHOD_MAILBOX_GET,
            args,
            DEFAULT_CALL_ID,
        ))
    }

    /// `Email/query` in `account_id`.
    ///
    /// An empty `sort` leaves the order to the server.
    #[must_use]
    pub fn query_emails(
        account_id: impl Into<String>,
        filter: Option<EmailFilter>,
        sort: Vec<Comparator>,
        limit: Option<u64>,
        calculate_total: bool,
    ) -> Self {
        let args = QueryEmailsRequest {
            account_id: account_id.into(),
            filter,
            sort: (!sort.is_empty()).then_some(sort),
            limit,
            calculate_total,
        };
        Self::new([CAPABILITY_CORE, CAPABILITY_MAIL]).with_call(MethodCall::new(
            METHOD_EMAIL_QUERY,
            args,
            DEFAULT_CALL_ID,
        ))
    }

    /// Serialize to the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if a call's arguments fail to serialize.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| Error::Parse {
            what: "request",
            source,
        })
    }
}

/// The body returned from the session's API URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub method_responses: Vec<MethodResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_ids: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_state: Option<String>,
}

impl Response {
    /// Parse an API response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the body is not a response envelope
    /// or any method response is malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| Error::Parse {
            what: "API response",
            source,
        })
    }

    /// The response to the first call of the request.
    ///
    /// # Errors
    ///
    /// A response with no method responses at all is an [`Error::Parse`].
    pub fn first(&self) -> Result<&MethodResponse> {
        self.method_responses.first().ok_or_else(|| Error::Parse {
            what: "API response",
            source: de::Error::custom("methodResponses is empty"),
        })
    }
}
