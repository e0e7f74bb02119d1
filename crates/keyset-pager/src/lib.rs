//! Backend-agnostic core of a safelisted CEL filter, a safelisted
//! ordering mini-language, and keyset (seek-method) pagination over an
//! opaque, self-describing cursor.
//!
//! This crate has no knowledge of any particular database or ORM: C4
//! (predicate lowering) and C5 (the paginator) are generic over the
//! [`predicate::PredicateBuilder`] and [`paginate::QueryOps`] capability
//! traits. A concrete backend binding (for example `keyset-pager-sea-orm`)
//! implements both traits once against its native query/column types.

pub mod ast;
pub mod cel;
pub mod cursor;
pub mod error;
pub mod limits;
pub mod ordering;
pub mod paginate;
pub mod predicate;

pub use ast::{CompareOperator, Expr, StringMethod, Value};
pub use cursor::{Cursor, NavDirection};
pub use error::{Error, Result};
pub use limits::Limits;
pub use ordering::{OrderKey, OrderingSpec, SortDir};
pub use paginate::{build_seek_predicate, paginate, PageOptions, Paginated, QueryOps};
pub use predicate::{lower, PredicateBuilder};
