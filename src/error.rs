//! Error types for the generator.
//!
//! Two tiers: bad *input* is skipped or reported as a [`ValidationError`]
//! diagnostic, while a broken *model* at emission time is an [`EmitError`]
//! that aborts the whole pass.
use std::path::PathBuf;

use thiserror::Error;

use crate::model::Role;

/// Top-level error for a generation pass.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid host metadata ({origin}): {message}")]
    Metadata { origin: String, message: String },

    #[error("JSON pointer {pointer} selects nothing in {origin}")]
    MissingPointer { origin: String, pointer: String },

    #[error("code emission failed: {0}")]
    Emit(#[from] EmitError),
}

/// Invariant violations found while rendering a `StubModel`.
///
/// These mean the host handed over metadata the generator cannot express;
/// they are never recovered from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("{what} `{name}` is not a valid identifier")]
    InvalidIdentifier { what: &'static str, name: String },

    #[error("unsupported type name `{0}`")]
    UnsupportedTypeName(String),
}

/// Name clashes that would produce uncompilable stubs or ambiguous wire keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{role} method `{name}` is declared more than once (in {})", interfaces.join(", "))]
    DuplicateMethod {
        role: Role,
        name: String,
        interfaces: Vec<String>,
    },

    #[error("incoming methods {} all map to handler `{handler}`", methods.join(", "))]
    HandlerCollision { handler: String, methods: Vec<String> },

    #[error("`{name}` is used by both an incoming and an outgoing method")]
    CrossRoleCollision { name: String },

    #[error("artifact `{hint_name}` is already produced by another declaration")]
    DuplicateArtifact { hint_name: String },
}
