//! Moniker identifier codec.
//!
//! Identifiers have the shape `<path>:<name>`; a literal `:` inside the path
//! part is escaped by doubling it. The name part is never escaped, so the
//! separator is the last `:` that is not part of a `::` pair.

/// Escape a path part for embedding in an identifier.
fn escape(path: &str) -> String {
    path.replace(':', "::")
}

fn unescape(path: &str) -> String {
    path.replace("::", ":")
}

/// Build an identifier from a name and an optional path.
pub fn create(name: &str, path: Option<&str>) -> String {
    match path {
        Some(path) => format!("{}:{}", escape(path), name),
        None => name.to_string(),
    }
}

/// Split an identifier back into `(path, name)`.
///
/// The separator is the last unescaped `:`; identifiers without one are a
/// bare name.
pub fn parse(identifier: &str) -> (Option<String>, String) {
    let bytes = identifier.as_bytes();
    let mut separator = None;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            if i + 1 < bytes.len() && bytes[i + 1] == b':' {
                i += 2;
                continue;
            }
            separator = Some(i);
        }
        i += 1;
    }

    match separator {
        Some(at) => (
            Some(unescape(&identifier[..at])),
            identifier[at + 1..].to_string(),
        ),
        None => (None, identifier.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_without_path_is_bare_name() {
        assert_eq!(create("x", None), "x");
    }

    #[test]
    fn test_create_escapes_colons_in_path() {
        assert_eq!(create("x", Some("a:b")), "a::b:x");
        assert_eq!(create("x", Some("a")), "a:x");
    }

    #[test]
    fn test_parse_splits_at_last_unescaped_separator() {
        assert_eq!(parse("a:x"), (Some("a".to_string()), "x".to_string()));
        assert_eq!(parse("a::b:x"), (Some("a:b".to_string()), "x".to_string()));
        assert_eq!(parse("x"), (None, "x".to_string()));
    }

    #[test]
    fn test_parse_handles_trailing_escape_pair_before_separator() {
        // "a:::b" is path "a:" followed by name "b".
        assert_eq!(parse("a:::b"), (Some("a:".to_string()), "b".to_string()));
    }

    #[test]
    fn test_round_trip_with_colon_in_path() {
        for (name, path) in [
            ("then", Some("lib:Thenable")),
            ("x", Some("a:b:c")),
            ("default", Some("src/index")),
            ("y", None),
        ] {
            let identifier = create(name, path);
            let (parsed_path, parsed_name) = parse(&identifier);
            assert_eq!(parsed_path.as_deref(), path);
            assert_eq!(parsed_name, name);
        }
    }

    #[test]
    fn test_empty_path_still_produces_separator() {
        // The global-module rule mints identifiers like ":x".
        assert_eq!(create("x", Some("")), ":x");
        assert_eq!(parse(":x"), (Some(String::new()), "x".to_string()));
    }
}
