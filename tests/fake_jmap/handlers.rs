//! JMAP method handlers.
//!
//! Each handler takes the call's arguments and returns the
//! `(name, arguments)` pair of the method response. A handler that
//! cannot serve the call returns an `error` response instead, as a
//! real server would (RFC 8620 section 3.6.2).

use super::state::{FakeAccount, FakeState};
use jmap_probe::MethodCall;
use serde_json::{Value, json};

/// Route one method call to its handler.
pub fn dispatch(state: &FakeState, call: &MethodCall) -> Value {
    let args = serde_json::to_value(&call.arguments).unwrap_or(Value::Null);
    let (name, response) = match call.name.as_str() {
        "Mailbox/get" => mailbox_get(state, &args),
        "Email/query" => email_query(state, &args),
        _ => method_error("unknownMethod", None),
    };
    json!([name, response, call.call_id])
}

/// An `error` response with the given type.
pub fn method_error(kind: &str, description: Option<&str>) -> (String, Value) {
    let mut error = json!({ "type": kind });
    if let Some(description) = description {
        error["description"] = json!(description);
    }
    ("error".to_string(), error)
}

fn account<'a>(state: &'a FakeState, args: &Value) -> Result<&'a FakeAccount, (String, Value)> {
    let Some(id) = args.get("accountId").and_then(Value::as_str) else {
        return Err(method_error("invalidArguments", Some("accountId is required")));
    };
    state
        .account(id)
        .ok_or_else(|| method_error("accountNotFound", None))
}

/// `Mailbox/get` -- returns every mailbox, or only the requested ids.
pub fn mailbox_get(state: &FakeState, args: &Value) -> (String, Value) {
    let account = match account(state, args) {
        Ok(account) => account,
        Err(error) => return error,
    };

    let wanted: Option<Vec<&str>> = args
        .get("ids")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).collect());

    let list: Vec<Value> = account
        .mailboxes
        .iter()
        .filter(|m| wanted.as_ref().is_none_or(|ids| ids.contains(&m.mailbox.id.as_str())))
        .map(|m| serde_json::to_value(&m.mailbox).unwrap())
        .collect();

    let not_found: Vec<&str> = wanted
        .unwrap_or_default()
        .into_iter()
        .filter(|id| !account.mailboxes.iter().any(|m| m.mailbox.id == *id))
        .collect();

    (
        "Mailbox/get".to_string(),
        json!({
            "accountId": account.id,
            "state": state.session_state,
            "list": list,
            "notFound": not_found
        }),
    )
}

/// `Email/query` -- supports the `inMailbox` filter, `limit` and
/// `calculateTotal`.
pub fn email_query(state: &FakeState, args: &Value) -> (String, Value) {
    let account = match account(state, args) {
        Ok(account) => account,
        Err(error) => return error,
    };

    let in_mailbox = args
        .get("filter")
        .and_then(|f| f.get("inMailbox"))
        .and_then(Value::as_str);

    let ids: Vec<&str> = account
        .mailboxes
        .iter()
        .filter(|m| in_mailbox.is_none_or(|id| m.mailbox.id == id))
        .flat_map(|m| m.email_ids.iter().map(String::as_str))
        .collect();
    let total = ids.len();

    let limit = args
        .get("limit")
        .and_then(Value::as_u64)
        .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
    let page: Vec<&str> = ids.into_iter().take(limit).collect();

    let mut response = json!({
        "accountId": account.id,
        "queryState": "q1",
        "canCalculateChanges": false,
        "position": 0,
        "ids": page
    });
    if args.get("calculateTotal").and_then(Value::as_bool) == Some(true) {
        response["total"] = json!(total);
    }

    ("Email/query".to_string(), response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_jmap::state::StateBuilder;

    fn state() -> FakeState {
        StateBuilder::new("alice")
            .account("A", "alice")
            .mailbox("mb1", "Inbox", Some("inbox"), 2, 1)
            .email("e1")
            .email("e2")
            .mailbox("mb2", "Sent", Some("sent"), 1, 0)
            .email("e3")
            .build()
    }

    #[test]
    fn mailbox_get_lists_all() {
        let (name, response) = mailbox_get(&state(), &json!({ "accountId": "A", "ids": null }));
        assert_eq!(name, "Mailbox/get");
        assert_eq!(response["list"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn mailbox_get_unknown_account() {
        let (name, response) = mailbox_get(&state(), &json!({ "accountId": "Z" }));
        assert_eq!(name, "error");
        assert_eq!(response["type"], "accountNotFound");
    }

    #[test]
    fn mailbox_get_reports_not_found() {
        let args = json!({ "accountId": "A", "ids": ["mb2", "nope"] });
        let (_, response) = mailbox_get(&state(), &args);
        assert_eq!(response["list"].as_array().unwrap().len(), 1);
        assert_eq!(response["notFound"], json!(["nope"]));
    }

    #[test]
    fn email_query_filters_and_limits() {
        let (_, response) = email_query(
            &state(),
            &json!({
                "accountId": "A",
                "filter": { "inMailbox": "mb1" },
                "limit": 1,
                "calculateTotal": true
            }),
        );
        assert_eq!(response["ids"], json!(["e1"]));
        assert_eq!(response["total"], 2);
    }

    #[test]
    fn email_query_without_total() {
        let (_, response) = email_query(&state(), &json!({ "accountId": "A" }));
        assert_eq!(response["ids"], json!(["e1", "e2", "e3"]));
        assert!(response.get("total").is_none());
    }
}
