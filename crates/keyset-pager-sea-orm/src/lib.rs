//! `sea_orm` binding for `keyset_pager`: a [`field::FieldMap`] safelist, a
//! `PredicateBuilder`/`QueryOps` implementation over `sea_orm::Select<E>`,
//! and a [`pager::SeaOrmPager`] fluent builder tying them to a single
//! `paginate` call.

pub mod backend;
pub mod error;
pub mod field;
pub mod pager;

pub use backend::{parse_cursor_value, ResolvedField, SeaOrmPredicateBuilder, SeaOrmQuery};
pub use error::{Error, Result};
pub use field::{CursorExtractor, Field, FieldKind, FieldMap};
pub use pager::SeaOrmPager;
