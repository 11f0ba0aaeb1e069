//! Web query response envelope
//!
//! The HTTP interface answers every command with a JSON document:
//!
//! ```json
//! {"body": [{"clid": "1", "client_nickname": "serveradmin"}],
//!  "status": {"code": 0, "message": "ok"}}
//! ```
//!
//! A non-zero status code becomes a [`QueryError`] carrying the
//! supplementary `extra_message`. Body objects are turned into the same
//! [`FieldMap`]s the line protocol produces, so the regular decoders apply.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, QueryError, Result};
use crate::escape::unescape;
use crate::response::FieldMap;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    body: Vec<serde_json::Map<String, Value>>,
    status: Status,
}

#[derive(Debug, Deserialize)]
struct Status {
    code: u32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    extra_message: String,
}

/// Decode a web query response body into wire objects
pub fn decode_web_response(body: &[u8]) -> Result<Vec<FieldMap>> {
    let envelope: Envelope = serde_json::from_slice(body)?;

    if envelope.status.code != 0 {
        return Err(Error::Query(
            QueryError::new(envelope.status.code, envelope.status.message)
                .with_extra_message(envelope.status.extra_message),
        ));
    }

    Ok(envelope
        .body
        .into_iter()
        .map(|object| {
            object
                .into_iter()
                .map(|(key, value)| (key, field_text(value)))
                .collect()
        })
        .collect())
}

fn field_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => unescape(&s),
        Value::Bool(b) => (if b { "1" } else { "0" }).to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{unmarshal_response, DecodeError};

    crate::record! {
        struct Client {
            id: u32 => "clid",
            nickname: String => "client_nickname",
            away: bool => "client_away",
        }
    }

    #[test]
    fn test_body_objects() {
        let body = br#"{"body":[{"clid":"1","client_nickname":"server\\sadmin","client_away":true},
                                {"clid":5,"client_nickname":"Some User","client_away":null}],
                        "status":{"code":0,"message":"ok"}}"#;
        let objects = decode_web_response(body).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0]["client_nickname"], "server admin");
        assert_eq!(objects[0]["client_away"], "1");
        assert_eq!(objects[1]["clid"], "5");
        assert_eq!(objects[1]["client_away"], "");

        let mut clients: Vec<Client> = Vec::new();
        unmarshal_response(&objects, &mut clients).unwrap();
        assert_eq!(clients[1].id, 5);
        assert!(clients[0].away);
        assert!(!clients[1].away);
    }

    #[test]
    fn test_error_status() {
        let body = br#"{"status":{"code":1234,"message":"This is a test","extra_message":"A very serious test"}}"#;
        let err = decode_web_response(body).unwrap_err();
        assert_eq!(
            err,
            Error::Query(
                QueryError::new(1234, "This is a test").with_extra_message("A very serious test")
            )
        );
        assert_eq!(
            err.to_string(),
            "query error(1234): This is a test (extra message: A very serious test)"
        );
    }

    #[test]
    fn test_missing_body_is_empty() {
        let objects = decode_web_response(br#"{"status":{"code":0,"message":"ok"}}"#).unwrap();
        assert!(objects.is_empty());

        let mut one = Client::default();
        assert_eq!(
            unmarshal_response(&objects, &mut one).unwrap_err(),
            DecodeError::EmptyResponse
        );
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            decode_web_response(b"not json"),
            Err(Error::Json(_))
        ));
    }
}
