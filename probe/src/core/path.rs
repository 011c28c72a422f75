//! Syntactic checks on fact path expressions.
//!
//! A path is a `/`-separated list of segments. A segment is a literal name,
//! `#<uuid>` naming one element of a collection, or `*` standing for an element
//! that has not been chosen yet. Wildcard paths describe collection shape and
//! must never be dispatched to the engine.

use thiserror::Error;

/// Substring that marks an unresolved collection wildcard.
pub const WILDCARD_MARKER: &str = "/*";

/// Required length of a `#` identifier, hyphens included.
pub const IDENTIFIER_LEN: usize = 36;

/// Why a path was refused before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathRejection {
    #[error("unresolved wildcard in '{path}': supply a concrete identifier instead of *")]
    UnresolvedWildcard { path: String },
    #[error(
        "malformed identifier '#{token}': expected {IDENTIFIER_LEN} characters including hyphens, found {len}"
    )]
    MalformedIdentifier { token: String, len: usize },
}

pub type ValidationResult = Result<(), PathRejection>;

/// Check a path before it is sent to the engine.
///
/// Rules apply in order and the first match wins:
/// 1. any `/*` substring is an unresolved wildcard;
/// 2. any `#` token whose length is not [`IDENTIFIER_LEN`] is malformed;
/// 3. everything else passes.
///
/// The check is purely syntactic; it never asks whether the path exists.
pub fn validate_path(path: &str) -> ValidationResult {
    if path.contains(WILDCARD_MARKER) {
        return Err(PathRejection::UnresolvedWildcard {
            path: path.to_string(),
        });
    }

    for token in identifier_tokens(path) {
        let len = token.chars().count();
        if len != IDENTIFIER_LEN {
            return Err(PathRejection::MalformedIdentifier {
                token: token.to_string(),
                len,
            });
        }
    }

    Ok(())
}

/// Tokens following each `#`, running up to the next `/` or the end.
pub fn identifier_tokens(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('#').map(move |(start, _)| {
        let rest = &path[start + 1..];
        match rest.find('/') {
            Some(end) => &rest[..end],
            None => rest,
        }
    })
}

/// Prefix that concrete paths under a collection start with.
///
/// `/formW2s` and `/formW2s/*` both yield `/formW2s/`.
pub fn collection_prefix(base: &str) -> String {
    let base = base.trim();
    let base = base.strip_suffix(WILDCARD_MARKER).unwrap_or(base);
    format!("{}/", base.trim_end_matches('/'))
}

/// Paths that live under the collection named by `base`, in engine order.
pub fn paths_under<'a>(paths: &'a [String], base: &str) -> Vec<&'a str> {
    let prefix = collection_prefix(base);
    paths
        .iter()
        .map(String::as_str)
        .filter(|path| path.starts_with(&prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "123e4567-e89b-12d3-a456-426614174000";

    #[test]
    fn plain_paths_pass() {
        for path in ["/filingStatus", "/a/b/c", "", "/"] {
            assert_eq!(validate_path(path), Ok(()), "path {path:?}");
        }
    }

    #[test]
    fn wildcard_anywhere_is_rejected() {
        for path in ["/formW2s/*/wages", "/formW2s/*", "/a/*b"] {
            assert!(matches!(
                validate_path(path),
                Err(PathRejection::UnresolvedWildcard { .. })
            ));
        }
    }

    #[test]
    fn wildcard_wins_over_identifier_check() {
        let err = validate_path("/formW2s/#short/*").expect_err("rejected");
        assert!(matches!(err, PathRejection::UnresolvedWildcard { .. }));
    }

    #[test]
    fn full_length_identifier_passes() {
        let path = format!("/formW2s/#{UUID}/wages");
        assert_eq!(validate_path(&path), Ok(()));
    }

    #[test]
    fn identifier_at_end_of_path_passes() {
        let path = format!("/formW2s/#{UUID}");
        assert_eq!(validate_path(&path), Ok(()));
    }

    #[test]
    fn short_and_long_identifiers_are_rejected() {
        let long = format!("{UUID}0");
        for token in ["123", &UUID[..35], long.as_str(), ""] {
            let path = format!("/formW2s/#{token}/wages");
            assert_eq!(
                validate_path(&path),
                Err(PathRejection::MalformedIdentifier {
                    token: token.to_string(),
                    len: token.len(),
                }),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn every_identifier_is_checked() {
        let path = format!("/a/#{UUID}/b/#bad/c");
        let err = validate_path(&path).expect_err("second token is malformed");
        assert_eq!(
            err,
            PathRejection::MalformedIdentifier {
                token: "bad".to_string(),
                len: 3,
            }
        );
    }

    #[test]
    fn collection_prefix_strips_wildcard_and_slashes() {
        assert_eq!(collection_prefix("/formW2s"), "/formW2s/");
        assert_eq!(collection_prefix("/formW2s/*"), "/formW2s/");
        assert_eq!(collection_prefix(" /formW2s/ "), "/formW2s/");
    }

    #[test]
    fn paths_under_filters_by_prefix() {
        let paths = vec!["/formW2s/*/wages".to_string(), "/other/x".to_string()];
        assert_eq!(paths_under(&paths, "/formW2s"), vec!["/formW2s/*/wages"]);
    }

    #[test]
    fn paths_under_does_not_match_sibling_names() {
        let paths = vec!["/formW2sExtra/*/x".to_string()];
        assert!(paths_under(&paths, "/formW2s").is_empty());
    }
}
