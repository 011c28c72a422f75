//! Errors surfaced at the adapter boundary.

use thiserror::Error;

use crate::core::messages::{Action, Locale};
use crate::core::outcome::LimitViolation;
use crate::core::path::PathRejection;

/// Broad classes of failure the user can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caught before dispatch; the user can correct the input.
    Validation,
    /// The engine rejected or failed the call.
    Engine,
    /// The write ran but business rules failed.
    Violation,
}

#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("no fact dictionary loaded")]
    NoGraph { action: Action },

    #[error(transparent)]
    Path(#[from] PathRejection),

    #[error("collection path is empty")]
    EmptyCollectionPath,

    #[error("dictionary rejected: {detail}")]
    Dictionary { detail: String },

    #[error("engine error: {detail}")]
    Engine { detail: String },

    #[error("write rejected: {message}")]
    Violation {
        message: String,
        violations: Vec<LimitViolation>,
    },
}

impl AdapterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::NoGraph { .. }
            | AdapterError::Path(_)
            | AdapterError::EmptyCollectionPath => ErrorKind::Validation,
            AdapterError::Dictionary { .. } | AdapterError::Engine { .. } => ErrorKind::Engine,
            AdapterError::Violation { .. } => ErrorKind::Violation,
        }
    }

    /// Text for the user in `locale`. Not yet sanitized.
    pub fn localized(&self, locale: Locale) -> String {
        match self {
            AdapterError::NoGraph { action } => locale.no_graph(*action).to_string(),
            AdapterError::Path(PathRejection::UnresolvedWildcard { .. }) => {
                locale.unresolved_wildcard()
            }
            AdapterError::Path(PathRejection::MalformedIdentifier { .. }) => {
                locale.malformed_identifier().to_string()
            }
            AdapterError::EmptyCollectionPath => locale.empty_collection_path().to_string(),
            AdapterError::Dictionary { detail } => locale.dictionary_rejected(detail),
            AdapterError::Engine { detail } => detail.clone(),
            AdapterError::Violation { message, .. } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let wildcard = AdapterError::from(PathRejection::UnresolvedWildcard {
            path: "/a/*".to_string(),
        });
        assert_eq!(wildcard.kind(), ErrorKind::Validation);
        assert_eq!(
            AdapterError::NoGraph {
                action: Action::Query
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            AdapterError::Dictionary {
                detail: "bad xml".to_string()
            }
            .kind(),
            ErrorKind::Engine
        );
        assert_eq!(
            AdapterError::Violation {
                message: "rule: max".to_string(),
                violations: Vec::new(),
            }
            .kind(),
            ErrorKind::Violation
        );
    }

    #[test]
    fn engine_detail_passes_through_unchanged() {
        let err = AdapterError::Engine {
            detail: "path not found".to_string(),
        };
        assert_eq!(err.localized(Locale::ZhTw), "path not found");
    }

    #[test]
    fn malformed_identifier_is_localized() {
        let err = AdapterError::from(PathRejection::MalformedIdentifier {
            token: "abc".to_string(),
            len: 3,
        });
        assert_eq!(
            err.localized(Locale::ZhTw),
            Locale::ZhTw.malformed_identifier()
        );
    }
}
