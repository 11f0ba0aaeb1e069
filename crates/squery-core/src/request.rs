//! Request encoding
//!
//! ```text
//! clientkick clid=1|clid=2 reasonid=5 reasonmsg=Go\saway\n
//! ```
//!
//! Sequence arguments expand into one `key=value` group per element joined
//! by `|`, which is how bulk commands address several objects at once.

use bytes::Bytes;
use std::fmt;

use crate::escape::escape;

/// Value of one request argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// A single value
    Scalar(String),
    /// One group per element, joined by `|`
    List(Vec<String>),
    /// A bare `-flag` with no value
    Flag,
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Scalar(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Scalar(v)
    }
}

impl From<&String> for ArgValue {
    fn from(v: &String) -> Self {
        ArgValue::Scalar(v.clone())
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Scalar(if v { "1" } else { "0" }.to_string())
    }
}

macro_rules! impl_arg_from_display {
    ($($t:ty),*) => {$(
        impl From<$t> for ArgValue {
            fn from(v: $t) -> Self {
                ArgValue::Scalar(v.to_string())
            }
        }

        impl From<Vec<$t>> for ArgValue {
            fn from(v: Vec<$t>) -> Self {
                ArgValue::List(v.iter().map(|x| x.to_string()).collect())
            }
        }

        impl From<&[$t]> for ArgValue {
            fn from(v: &[$t]) -> Self {
                ArgValue::List(v.iter().map(|x| x.to_string()).collect())
            }
        }
    )*};
}

impl_arg_from_display!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

impl From<Vec<String>> for ArgValue {
    fn from(v: Vec<String>) -> Self {
        ArgValue::List(v)
    }
}

impl From<Vec<&str>> for ArgValue {
    fn from(v: Vec<&str>) -> Self {
        ArgValue::List(v.into_iter().map(str::to_string).collect())
    }
}

/// A command sent to the server
///
/// Arguments are written in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    /// Virtual server the command targets (0 = none selected)
    pub server_id: u32,
    /// Command name
    pub command: String,
    /// Arguments in insertion order
    pub args: Vec<(String, ArgValue)>,
}

impl Request {
    /// Create a new request for `command`
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            server_id: 0,
            command: command.into(),
            args: Vec::new(),
        }
    }

    /// Target a virtual server
    pub fn server(mut self, server_id: u32) -> Self {
        self.server_id = server_id;
        self
    }

    /// Add an argument
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }

    /// Add a bare flag such as `-keepfiles`
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        let mut name = name.into();
        if !name.starts_with('-') {
            name.insert(0, '-');
        }
        self.args.push((name, ArgValue::Flag));
        self
    }

    /// Look up an argument by name
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Encode to wire bytes, terminated by a single newline
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_string())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let command = self.command.strip_suffix('\n').unwrap_or(&self.command);
        f.write_str(command)?;

        for (name, value) in &self.args {
            match value {
                ArgValue::Scalar(v) => write!(f, " {}={}", name, escape(v))?,
                ArgValue::List(items) => {
                    for (i, item) in items.iter().enumerate() {
                        f.write_str(if i == 0 { " " } else { "|" })?;
                        write!(f, "{}={}", name, escape(item))?;
                    }
                }
                ArgValue::Flag => write!(f, " {}", name)?,
            }
        }

        f.write_str("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_command() {
        assert_eq!(Request::new("version").to_string(), "version\n");
    }

    #[test]
    fn test_trailing_newline_not_duplicated() {
        assert_eq!(Request::new("cmd\n").to_string(), "cmd\n");
    }

    #[test]
    fn test_scalar_args_escaped() {
        let r = Request::new("sendtextmessage")
            .arg("targetmode", 3)
            .arg("msg", "hello world|/");
        assert_eq!(
            r.to_string(),
            "sendtextmessage targetmode=3 msg=hello\\sworld\\p\\/\n"
        );
    }

    #[test]
    fn test_list_args_expand() {
        let r = Request::new("clientkick")
            .arg("clid", vec![1, 2, 3])
            .arg("reasonid", 5);
        assert_eq!(
            r.to_string(),
            "clientkick clid=1|clid=2|clid=3 reasonid=5\n"
        );
    }

    #[test]
    fn test_empty_list_emits_nothing() {
        let r = Request::new("cmd").arg("ids", Vec::<u32>::new());
        assert_eq!(r.to_string(), "cmd\n");
    }

    #[test]
    fn test_flag_and_bool() {
        let r = Request::new("serversnapshotdeploy")
            .flag("keepfiles")
            .arg("mapping", true);
        assert_eq!(r.to_string(), "serversnapshotdeploy -keepfiles mapping=1\n");
    }

    #[test]
    fn test_server_and_bytes() {
        let r = Request::new("clientlist").server(9);
        assert_eq!(r.server_id, 9);
        assert_eq!(r.to_bytes(), Bytes::from_static(b"clientlist\n"));
        assert_eq!(r.get("missing"), None);
    }
}
