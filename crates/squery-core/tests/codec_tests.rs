//! Wire codec tests

use squery_core::{detect_error, escape, split_response, unescape, ArgValue, QueryError, Request};

#[test]
fn test_escape_unescape_roundtrip() {
    let samples = [
        "",
        "plain",
        "hello world",
        "a|b|c",
        "/path/to/thing",
        "back\\slash",
        "\u{7}\u{8}\u{c}\n\r\t\u{b}",
        "\\s is not a space",
        "mixed | / \\ \t done",
        "unicode: héllo wörld ✓",
    ];
    for s in samples {
        assert_eq!(unescape(&escape(s)), s, "roundtrip failed for {:?}", s);
    }
}

#[test]
fn test_escaped_text_has_no_separators() {
    let escaped = escape("a b|c\nd");
    assert!(!escaped.contains(' '));
    assert!(!escaped.contains('|'));
    assert!(!escaped.contains('\n'));
}

#[test]
fn test_request_line() {
    let r = Request::new("servernotifyregister")
        .arg("event", "channel")
        .arg("id", 0);
    assert_eq!(r.to_string(), "servernotifyregister event=channel id=0\n");
    assert_eq!(r.get("event"), Some(&ArgValue::Scalar("channel".to_string())));
}

#[test]
fn test_request_reply_roundtrip_through_split() {
    let r = Request::new("cmd").arg("name", "Some User|Admin");
    let line = r.to_string();
    let (_, rest) = line.trim_end().split_once(' ').unwrap();
    let objects = split_response(rest);
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0]["name"], "Some User|Admin");
}

#[test]
fn test_sentinel_detection() {
    let objects = split_response("error id=0 msg=");
    assert_eq!(objects[0]["id"], "0");

    let ok = detect_error("error id=0 msg=").unwrap().unwrap();
    assert_eq!(ok.id, 0);

    let failed = detect_error("error id=1234 msg=it\\sworked").unwrap().unwrap();
    assert_eq!(failed, QueryError::new(1234, "it worked"));
    assert_eq!(failed.to_string(), "query error(1234): it worked");
}

#[test]
fn test_multi_object_reply() {
    let objects = split_response("a=1 b=2|a=3 b=4");
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0]["a"], "1");
    assert_eq!(objects[1]["b"], "4");
}
