//! Reply → display text.
//!
//! Rendering follows redis-cli:
//! - bools as `true` / `false`, integers in decimal, values as raw text
//! - lists as `<index>) "<value>"`, indices right-aligned
//! - maps sorted by key, nested maps indented four spaces per level
//!
//! An empty list or map renders as empty text; the REPL prints its own
//! placeholder for that.

use crate::error::ShellError;
use crate::reply::{Field, Reply};
use std::collections::BTreeMap;

/// Indentation added per level of map nesting.
const INDENT: &str = "    ";

/// Format a successful reply.
pub fn format_reply(reply: &Reply) -> String {
    match reply {
        Reply::Bool(value) => value.to_string(),
        Reply::Integer(value) => value.to_string(),
        Reply::Bytes(value) => String::from_utf8_lossy(value).into_owned(),
        Reply::List(items) => format_list(items),
        Reply::Map(fields) => format_map(fields, ""),
    }
}

/// Format an error.
pub fn format_error(err: &ShellError) -> String {
    format!("ERR {err}")
}

fn format_list(items: &[String]) -> String {
    let width = items.len().to_string().len();
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{:>width$}) \"{item}\"", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_map(fields: &BTreeMap<String, Field>, prefix: &str) -> String {
    fields
        .iter()
        .map(|(key, field)| match field {
            Field::Bytes(value) => {
                format!("{prefix}{key}) \"{}\"", String::from_utf8_lossy(value))
            }
            Field::Integer(value) => format!("{prefix}{key}) \"{value}\""),
            Field::Map(nested) if nested.is_empty() => format!("{prefix}{key})"),
            Field::Map(nested) => {
                let inner = format_map(nested, &format!("{prefix}{INDENT}"));
                format!("{prefix}{key})\n{inner}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn scalars() {
        assert_eq!(format_reply(&Reply::Bool(true)), "true");
        assert_eq!(format_reply(&Reply::Bool(false)), "false");
        assert_eq!(format_reply(&Reply::Integer(42)), "42");
        assert_eq!(format_reply(&Reply::Bytes(Bytes::from_static(b"value"))), "value");
        assert_eq!(format_reply(&Reply::Bytes(Bytes::new())), "");
    }

    #[test]
    fn list_indices_are_right_aligned() {
        let items: Vec<String> = (0..10).map(|i| format!("key_{i}")).collect();
        let text = format_reply(&Reply::List(items));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], " 1) \"key_0\"");
        assert_eq!(lines[9], "10) \"key_9\"");
    }

    #[test]
    fn short_list_has_no_padding() {
        let text = format_reply(&Reply::List(vec!["a".into(), "b".into()]));
        assert_eq!(text, "1) \"a\"\n2) \"b\"");
    }

    #[test]
    fn empty_collections_render_empty() {
        assert_eq!(format_reply(&Reply::List(Vec::new())), "");
        assert_eq!(format_reply(&Reply::Map(BTreeMap::new())), "");
    }

    #[test]
    fn nested_map_is_indented() {
        let mut inner = BTreeMap::new();
        inner.insert("c1".to_string(), Field::Integer(30));
        let mut fields = BTreeMap::new();
        fields.insert("b".to_string(), Field::Bytes(Bytes::from_static(b"20")));
        fields.insert("a".to_string(), Field::Bytes(Bytes::from_static(b"10")));
        fields.insert("c".to_string(), Field::Map(inner));

        assert_eq!(
            format_reply(&Reply::Map(fields)),
            "a) \"10\"\nb) \"20\"\nc)\n    c1) \"30\""
        );
    }

    #[test]
    fn errors_are_prefixed() {
        let err = ShellError::UnknownCommand("nope".into());
        assert_eq!(format_error(&err), "ERR unknown command 'nope'");
    }
}
