//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Broad failure classes, used by callers that only care whether a failure
/// came from bad input structure or from API misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No valid root, disconnected graph or cycle.
    Structure,
    /// Root-only operation on a non-root node, or similar caller misuse.
    Precondition,
    /// Weight initialization on an already weighted tree.
    DoubleInit,
    /// A referenced node or child does not exist.
    NotFound,
}

/// Domain errors represent violations of the tree invariants or misuse of
/// the tree operations. None of them are retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("no root found: exactly one edge must map a name to itself")]
    NoRoot,

    #[error("multiple roots found: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),

    #[error("hierarchy rooted at '{root}' is not a tree, unreachable or cyclic: {}", unreachable.join(", "))]
    InvalidStructure {
        root: String,
        unreachable: Vec<String>,
    },

    #[error("operation requires the root node, got '{0}'")]
    NotRoot(String),

    #[error("node '{0}' has no children to separate")]
    NoChildren(String),

    #[error("cannot extract '{0}': it is the root of its tree")]
    RootExtraction(String),

    #[error("cannot attach '{child}' under '{parent}': {reason}")]
    InvalidAttach {
        parent: String,
        child: String,
        reason: String,
    },

    #[error("weight overflow at '{name}': adding {delta} leaves the i64 range")]
    WeightOverflow { name: String, delta: i64 },

    #[error("tree already carries initial weight: root subtree size is {subtree_size}")]
    AlreadyInitialized { subtree_size: i64 },

    #[error("'{child}' is not a child of '{parent}'")]
    ChildNotFound { parent: String, child: String },

    #[error("unknown node name: {0}")]
    UnknownName(String),

    #[error("node handle does not belong to this tree")]
    UnknownNode,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NoRoot
            | DomainError::MultipleRoots(_)
            | DomainError::InvalidStructure { .. } => ErrorKind::Structure,
            DomainError::NotRoot(_)
            | DomainError::NoChildren(_)
            | DomainError::RootExtraction(_)
            | DomainError::WeightOverflow { .. }
            | DomainError::InvalidAttach { .. } => ErrorKind::Precondition,
            DomainError::AlreadyInitialized { .. } => ErrorKind::DoubleInit,
            DomainError::ChildNotFound { .. }
            | DomainError::UnknownName(_)
            | DomainError::UnknownNode => ErrorKind::NotFound,
        }
    }
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_each_variant_when_kind_then_maps_to_taxonomy() {
        assert_eq!(DomainError::NoRoot.kind(), ErrorKind::Structure);
        assert_eq!(
            DomainError::NotRoot("b".into()).kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            DomainError::RootExtraction("a".into()).kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            DomainError::WeightOverflow {
                name: "a".into(),
                delta: 1
            }
            .kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            DomainError::AlreadyInitialized { subtree_size: 3 }.kind(),
            ErrorKind::DoubleInit
        );
        assert_eq!(
            DomainError::ChildNotFound {
                parent: "a".into(),
                child: "b".into()
            }
            .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn given_structure_error_when_displayed_then_lists_names() {
        let err = DomainError::InvalidStructure {
            root: "a".into(),
            unreachable: vec!["x".into(), "y".into()],
        };
        assert_eq!(
            err.to_string(),
            "hierarchy rooted at 'a' is not a tree, unreachable or cyclic: x, y"
        );
    }
}
