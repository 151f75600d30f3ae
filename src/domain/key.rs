//! Key validation and slash-separated path handling.

use itertools::Itertools;

use crate::domain::DomainError;

/// Separator between path components.
pub const SEPARATOR: char = '/';

/// Characters allowed in a key besides ASCII letters and digits.
const EXTRA_KEY_CHARS: &[char] = &['_', '-', '@'];

pub fn is_valid_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || EXTRA_KEY_CHARS.contains(&c)
}

/// Check a single key: non-empty, only `[A-Za-z0-9_@-]`.
pub fn check_key(key: &str) -> Result<(), DomainError> {
    if key.is_empty() {
        return Err(DomainError::invalid_key(key, "empty string"));
    }
    match key.chars().find(|c| !is_valid_key_char(*c)) {
        Some(c) => Err(DomainError::invalid_key(
            key,
            format!("invalid key char '{}'", c),
        )),
        None => Ok(()),
    }
}

/// Split a path into its non-empty components, without validating them.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}

/// Split a path and validate every component.
///
/// Empty components are dropped, so `""` and `"//"` yield no segments.
pub fn parse_path(path: &str) -> Result<Vec<&str>, DomainError> {
    let segments: Vec<&str> = split_path(path).collect();
    for segment in &segments {
        check_key(segment)?;
    }
    Ok(segments)
}

/// Join components with the separator, skipping empty ones.
pub fn join_path<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .join(&SEPARATOR.to_string())
}

/// Append a key to a base path. An empty base yields the key itself.
pub fn child_path(base: &str, key: &str) -> String {
    join_path([base, key])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a")]
    #[case("backend-1")]
    #[case("vif@0")]
    #[case("dom_U")]
    #[case("0")]
    fn given_valid_key_when_checking_then_accepts(#[case] key: &str) {
        assert!(check_key(key).is_ok());
    }

    #[rstest]
    #[case("", "empty string")]
    #[case("bad key", "invalid key char ' '")]
    #[case("a.b", "invalid key char '.'")]
    #[case("a/b", "invalid key char '/'")]
    #[case("über", "invalid key char 'ü'")]
    fn given_invalid_key_when_checking_then_reports_reason(
        #[case] key: &str,
        #[case] reason: &str,
    ) {
        let err = check_key(key).unwrap_err();
        assert_eq!(err, DomainError::invalid_key(key, reason));
    }

    #[test]
    fn given_path_with_empty_segments_when_parsing_then_drops_them() {
        assert_eq!(parse_path("/a//b/c/").unwrap(), vec!["a", "b", "c"]);
        assert!(parse_path("").unwrap().is_empty());
        assert!(parse_path("///").unwrap().is_empty());
    }

    #[test]
    fn given_path_with_bad_segment_when_parsing_then_fails() {
        assert!(parse_path("a/b c/d").is_err());
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("", "a"), "a");
        assert_eq!(child_path("a/b", "c"), "a/b/c");
    }
}
