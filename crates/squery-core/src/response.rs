//! Reply and notification splitting
//!
//! A reply line holds one or more objects separated by `|`, each object a
//! space separated list of `key=value` tokens with escaped values:
//!
//! ```text
//! clid=1 client_nickname=serveradmin|clid=5 client_nickname=Some\sUser
//! ```

use std::collections::HashMap;

use crate::decode::Record;
use crate::error::{DecodeError, FieldError, QueryError};
use crate::escape::unescape;
use crate::{FromField, ERROR_SENTINEL};

/// One wire object: field name to unescaped value
pub type FieldMap = HashMap<String, String>;

/// Field whose value the server escapes twice
const DOUBLE_ESCAPED_FIELD: &str = "client_default_channel";

/// Split a reply line into its objects
pub fn split_response(line: &str) -> Vec<FieldMap> {
    line.trim()
        .trim_matches('|')
        .split('|')
        .map(parse_object)
        .collect()
}

fn parse_object(object: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    for token in object.split(' ').filter(|t| !t.is_empty()) {
        match token.split_once('=') {
            Some((key, value)) => {
                let mut value = unescape(value);
                if key.contains(DOUBLE_ESCAPED_FIELD) {
                    value = unescape(&value);
                }
                fields.insert(key.to_string(), value);
            }
            None => {
                fields.insert(token.to_string(), String::new());
            }
        }
    }
    fields
}

/// Check whether a line is the error sentinel
///
/// Returns `Ok(None)` for ordinary data lines and `Ok(Some(err))` for a
/// sentinel, including the `id=0` success sentinel. A sentinel whose fields
/// cannot be decoded yields the decode error.
pub fn detect_error(line: &str) -> std::result::Result<Option<QueryError>, DecodeError> {
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    if head != ERROR_SENTINEL {
        return Ok(None);
    }

    let objects = split_response(rest);
    let mut error = QueryError::default();
    crate::decode::unmarshal_one(&mut error, &objects)?;
    Ok(Some(error))
}

impl Record for QueryError {
    fn set_field(&mut self, name: &str, value: &str) -> std::result::Result<(), FieldError> {
        match name {
            "id" => {
                self.id = u32::from_field(value)
                    .map_err(|reason| FieldError::new(name, u32::KIND, value, reason))?;
            }
            "msg" => self.message = value.to_string(),
            "extra_msg" | "extra_message" => {
                self.extra_message = Some(value.to_string()).filter(|m| !m.is_empty());
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_error_sentinel() {
        let objects = split_response("error id=0 msg=");
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0]["id"], "0");
        assert_eq!(objects[0]["msg"], "");
        assert_eq!(objects[0]["error"], "");
    }

    #[test]
    fn test_split_multiple_objects() {
        let objects = split_response("a=1 b=2|a=3 b=4");
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0]["a"], "1");
        assert_eq!(objects[0]["b"], "2");
        assert_eq!(objects[1]["a"], "3");
        assert_eq!(objects[1]["b"], "4");
    }

    #[test]
    fn test_split_trims_enclosing_pipes_and_whitespace() {
        let objects = split_response("  |a=1|a=2|\r\n");
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[1]["a"], "2");
    }

    #[test]
    fn test_split_unescapes_values() {
        let objects = split_response("msg=hello\\sworld\\p\\/ path=a\\\\b");
        assert_eq!(objects[0]["msg"], "hello world|/");
        assert_eq!(objects[0]["path"], "a\\b");
    }

    #[test]
    fn test_value_may_contain_equals() {
        let objects = split_response("token=abc=def");
        assert_eq!(objects[0]["token"], "abc=def");
    }

    #[test]
    fn test_client_default_channel_double_unescaped() {
        // "/Lobby" escaped twice: "/" -> "\/" -> "\\\/"
        let objects = split_response("client_default_channel=\\\\\\/Lobby other=\\\\\\/Lobby");
        assert_eq!(objects[0]["client_default_channel"], "/Lobby");
        assert_eq!(objects[0]["other"], "\\/Lobby");
    }

    #[test]
    fn test_detect_success() {
        let err = detect_error("error id=0 msg=ok").unwrap().unwrap();
        assert_eq!(err.id, 0);
        assert!(err.is_ok());
        assert_eq!(err.message, "ok");
    }

    #[test]
    fn test_detect_failure() {
        let err = detect_error("error id=1234 msg=it\\sworked").unwrap().unwrap();
        assert_eq!(err, QueryError::new(1234, "it worked"));
    }

    #[test]
    fn test_detect_extra_message() {
        let err = detect_error("error id=2568 msg=insufficient\\sclient\\spermissions failed_permid=4 extra_msg=more")
            .unwrap()
            .unwrap();
        assert_eq!(err.id, 2568);
        assert_eq!(err.extra_message.as_deref(), Some("more"));
    }

    #[test]
    fn test_detect_data_line() {
        assert_eq!(detect_error("test").unwrap(), None);
        assert_eq!(detect_error("errors id=1").unwrap(), None);
        assert_eq!(detect_error("clid=1 error=1").unwrap(), None);
    }

    #[test]
    fn test_detect_malformed() {
        let err = detect_error("error id=abc msg=").unwrap_err();
        assert!(matches!(err, DecodeError::Fields(ref f) if f[0].field == "id"));
    }
}
