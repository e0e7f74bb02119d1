//! The sea_orm binding's error type: core `keyset_pager` failures plus
//! backend I/O failures, kept distinct rather than collapsed into one enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A C1-C5 failure from the backend-agnostic core (bad cursor,
    /// disallowed field, missing ordering, unsupported AST shape, ...).
    #[error(transparent)]
    Core(#[from] keyset_pager::Error),

    /// A field referenced by a filter/ordering/cursor is not on this
    /// entity's safelist.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A filter literal's runtime type does not match the field's
    /// declared `FieldKind`.
    #[error("type mismatch for field {field}: expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// The underlying database call failed.
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

pub type Result<T> = std::result::Result<T, Error>;
