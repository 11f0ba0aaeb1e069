//! Value escaping
//!
//! Every value on the wire is escaped with a fixed table of two-character
//! sequences starting with a backslash:
//!
//! ```text
//! \   -> \\        BEL -> \a        CR  -> \r
//! /   -> \/        BS  -> \b        TAB -> \t
//! ' ' -> \s        FF  -> \f        VT  -> \v
//! |   -> \p        LF  -> \n
//! ```

/// Raw character and the letter following the backslash in its escape
pub const ESCAPE_TABLE: [(char, char); 11] = [
    ('\\', '\\'),
    ('/', '/'),
    (' ', 's'),
    ('|', 'p'),
    ('\x07', 'a'),
    ('\x08', 'b'),
    ('\x0c', 'f'),
    ('\n', 'n'),
    ('\r', 'r'),
    ('\t', 't'),
    ('\x0b', 'v'),
];

#[inline]
fn escape_code(c: char) -> Option<char> {
    ESCAPE_TABLE
        .iter()
        .find(|(raw, _)| *raw == c)
        .map(|(_, code)| *code)
}

#[inline]
fn unescape_code(code: char) -> Option<char> {
    ESCAPE_TABLE
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(raw, _)| *raw)
}

/// Escape a value for the wire
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 8);
    for c in value.chars() {
        match escape_code(c) {
            Some(code) => {
                out.push('\\');
                out.push(code);
            }
            None => out.push(c),
        }
    }
    out
}

/// Reverse [`escape`]
///
/// Unknown sequences and a trailing lone backslash are kept as they are.
pub fn unescape(value: &str) -> String {
    if !value.contains('\\') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(code) => match unescape_code(code) {
                Some(raw) => out.push(raw),
                None => {
                    out.push('\\');
                    out.push(code);
                }
            },
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_table() {
        assert_eq!(escape("a b"), "a\\sb");
        assert_eq!(escape("a|b"), "a\\pb");
        assert_eq!(escape("a/b"), "a\\/b");
        assert_eq!(escape("\\"), "\\\\");
        assert_eq!(escape("\x07\x08\x0c\n\r\t\x0b"), "\\a\\b\\f\\n\\r\\t\\v");
    }

    #[test]
    fn test_backslash_not_double_escaped() {
        // An already escaped looking value must survive untouched
        assert_eq!(escape("\\s"), "\\\\s");
        assert_eq!(unescape(&escape("\\s")), "\\s");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("it\\sworked"), "it worked");
        assert_eq!(unescape("a\\pb\\/c"), "a|b/c");
        assert_eq!(unescape("plain"), "plain");
    }

    #[test]
    fn test_unescape_unknown_sequence_kept() {
        assert_eq!(unescape("a\\qb"), "a\\qb");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn test_roundtrip() {
        let samples = [
            "",
            "simple",
            "with space and | pipe",
            "path/to\\file",
            "line\nbreak\r\ttab\x0bvt\x0cff\x07bell\x08bs",
            "\\\\s\\p",
            "unicode ✓ ünïcödé",
        ];
        for s in samples {
            assert_eq!(unescape(&escape(s)), s, "roundtrip failed for {:?}", s);
        }
    }
}
