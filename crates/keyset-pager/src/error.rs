//! The error hierarchy shared by every component (C1-C5).
//!
//! Flat `thiserror` enum rather than a class hierarchy: each fallible
//! operation returns `Result<_, Error>` and the variant names the
//! component that raised it, matching the five kinds the filter/ordering/
//! cursor/pagination contract distinguishes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// C3: the expression is empty or syntactically invalid CEL.
    #[error("failed to parse filter expression: {0}")]
    Parse(String),

    /// C3: the expression references a name that is not on the safelist.
    #[error("filter references disallowed field(s): {0:?}")]
    Validation(Vec<String>),

    /// C2: the ordering string is empty, malformed, or names a disallowed field.
    #[error("invalid ordering: {0}")]
    Ordering(String),

    /// C1/C5: the cursor is empty, malformed, mismatches the current
    /// ordering, or is missing values for one of its ordering keys.
    #[error("invalid cursor: {0}")]
    Cursor(String),

    /// C5: the ordering spec is empty, or the underlying query has no
    /// deterministic ORDER BY to seek against.
    #[error("pagination error: {0}")]
    Pagination(String),

    /// C4: the AST uses a construct the predicate lowerer does not support
    /// (an unknown method name, a field-to-field comparison, a bare
    /// literal/identifier where a full expression was expected).
    #[error("cannot lower filter expression: {0}")]
    Lowering(String),

    /// The CEL frontend was built without the `with-cel-parser` feature.
    #[error("CEL parsing is unavailable: the `with-cel-parser` feature is disabled")]
    ParsingUnavailable,
}

pub type Result<T> = std::result::Result<T, Error>;
