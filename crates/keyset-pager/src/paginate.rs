//! Keyset paginator (C5): combines an already-filtered, already-ordered
//! query with a possibly-null cursor into a page of items plus forward and
//! backward navigation cursors.
//!
//! Generic over two small capability traits rather than a base-class
//! paginator: [`PredicateBuilder`] (reused from C4, for the seek
//! predicate) and [`QueryOps`] (count/fetch/ordering manipulation). A
//! backend binding implements both once against its native query type.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::ast::{CompareOperator, Value};
use crate::cursor::{self, Cursor, NavDirection};
use crate::error::{Error, Result};
use crate::ordering::OrderingSpec;
use crate::predicate::PredicateBuilder;

/// Immutable pagination request. `size` is validated into `[1, 100]` at
/// construction; there is no setter, only `new`.
#[derive(Clone, Debug)]
pub struct PageOptions {
    pub(crate) cursor: Option<Cursor>,
    pub(crate) size: u32,
    pub(crate) include_prev_cursor: bool,
}

impl PageOptions {
    /// Decodes `cursor` (if present) and validates `size`.
    ///
    /// # Errors
    /// Returns [`Error::Cursor`] if `cursor` fails to decode, or
    /// [`Error::Pagination`] if `size` is outside `[1, 100]`.
    pub fn new(cursor: Option<&str>, size: u32, include_prev_cursor: bool) -> Result<Self> {
        if !(1..=100).contains(&size) {
            return Err(Error::Pagination(format!(
                "page size {size} is outside the allowed range [1, 100]"
            )));
        }
        let cursor = cursor.map(cursor::decode).transpose()?;
        Ok(Self {
            cursor,
            size,
            include_prev_cursor,
        })
    }
}

/// The result of a single `paginate` call.
#[derive(Debug)]
pub struct Paginated<T> {
    /// Count of the filtered base query, independent of cursor and size.
    pub total_size: u64,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub items: Vec<T>,
}

/// Backend capability for the two I/O points and the query composition
/// steps a paginate call needs. Every composition method borrows `self`
/// and returns a new, independent query value — no query is mutated in
/// place.
#[async_trait]
pub trait QueryOps: Sized + Send + Sync {
    type Predicate: Send;
    type Item: Send;
    /// The backend's own error type; must be constructible from this
    /// crate's [`Error`] so pure C1-C4 failures and backend I/O failures
    /// share one `Result` in the caller's code.
    type Err: From<Error> + Send;

    /// Reads back the ordering already applied to this query.
    ///
    /// # Errors
    /// Returns an error wrapping [`Error::Pagination`] if the query has no
    /// ordering applied.
    fn extract_ordering(&self) -> std::result::Result<OrderingSpec, Self::Err>;

    /// Returns a new query with `predicate` added as an additional conjunct.
    fn with_predicate(&self, predicate: Self::Predicate) -> Self;

    /// Returns a new query with its ordering replaced by `ordering`.
    fn with_order(&self, ordering: &OrderingSpec) -> Self;

    /// Returns a new query limited to `limit` rows.
    fn with_limit(&self, limit: u64) -> Self;

    /// Counts rows matching the query's filter, ignoring any limit/order.
    async fn count(&self) -> std::result::Result<u64, Self::Err>;

    /// Fetches rows for the query as currently composed.
    async fn fetch(&self) -> std::result::Result<Vec<Self::Item>, Self::Err>;

    /// Extracts the ordering-key values of `item`, keyed by field name, for
    /// building the response cursors.
    fn cursor_values(&self, item: &Self::Item) -> BTreeMap<String, Json>;
}

/// Builds the seek predicate described in the component design: a
/// disjunction of `n` conjunctions, one per ordering axis, selecting rows
/// strictly after (or, for backward navigation, strictly before) the
/// cursor row under the given ordering.
///
/// # Errors
/// Propagates [`Error::Lowering`] from the builder if a cursor field is
/// not a recognized backend column, or [`Error::Cursor`] if a cursor value
/// is missing or of a JSON shape this crate cannot represent as a literal.
pub fn build_seek_predicate<B: PredicateBuilder>(
    builder: &B,
    ordering: &OrderingSpec,
    values: &BTreeMap<String, Json>,
    is_prev: bool,
) -> Result<B::Predicate> {
    let mut disjuncts = Vec::with_capacity(ordering.0.len());
    for i in 0..ordering.0.len() {
        let mut conjuncts = Vec::with_capacity(i + 1);
        for key in &ordering.0[..i] {
            let field = builder.field(&key.field)?;
            let value = json_to_value(values, &key.field)?;
            conjuncts.push(builder.compare(field, CompareOperator::Eq, &value)?);
        }
        let axis = &ordering.0[i];
        let field = builder.field(&axis.field)?;
        let value = json_to_value(values, &axis.field)?;
        let op = seek_operator(axis.dir, is_prev);
        conjuncts.push(builder.compare(field, op, &value)?);

        disjuncts.push(if conjuncts.len() == 1 {
            conjuncts
                .into_iter()
                .next()
                .unwrap_or_else(|| unreachable!("len checked to be 1 above"))
        } else {
            builder.and(conjuncts)
        });
    }

    Ok(if disjuncts.len() == 1 {
        disjuncts
            .into_iter()
            .next()
            .unwrap_or_else(|| unreachable!("len checked to be 1 above"))
    } else {
        builder.or(disjuncts)
    })
}

fn seek_operator(dir: crate::ordering::SortDir, is_prev: bool) -> CompareOperator {
    use crate::ordering::SortDir;
    match (dir, is_prev) {
        (SortDir::Asc, false) | (SortDir::Desc, true) => CompareOperator::Gt,
        (SortDir::Desc, false) | (SortDir::Asc, true) => CompareOperator::Lt,
    }
}

fn json_to_value(values: &BTreeMap<String, Json>, field: &str) -> Result<Value> {
    let json = values
        .get(field)
        .ok_or_else(|| Error::Cursor(format!("cursor is missing a value for field {field:?}")))?;
    match json {
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Number(n) => {
            let decimal: bigdecimal::BigDecimal = n
                .to_string()
                .parse()
                .map_err(|e| Error::Cursor(format!("cursor value for {field:?} is not a decimal number: {e}")))?;
            Ok(Value::Number(decimal))
        }
        other => Err(Error::Cursor(format!(
            "cursor value for {field:?} has an unsupported JSON shape: {other:?}"
        ))),
    }
}

/// Runs a single paginate call: extracts and validates ordering, counts
/// the base query, applies the seek predicate and (for backward
/// navigation) the reversed ordering, fetches `size + 1` rows, trims and
/// reverses as needed, and builds the `prev`/`next` cursors.
///
/// # Errors
/// Returns an error if the query has no ordering, if a supplied cursor's
/// ordering does not match the query's, if the seek predicate cannot be
/// built for one of the cursor's fields, or if the backend's count/fetch
/// calls fail.
pub async fn paginate<Q, B>(
    query: &Q,
    builder: &B,
    options: &PageOptions,
) -> std::result::Result<Paginated<Q::Item>, Q::Err>
where
    Q: QueryOps<Predicate = B::Predicate>,
    B: PredicateBuilder,
{
    let ordering = query.extract_ordering()?;
    if ordering.0.is_empty() {
        return Err(Error::Pagination(
            "query has no ordering; keyset pagination requires a deterministic total order".to_owned(),
        )
        .into());
    }

    let total_size = query.count().await?;

    let is_prev = matches!(
        options.cursor.as_ref().map(|c| c.direction),
        Some(NavDirection::Prev)
    );

    tracing::debug!(
        size = options.size,
        has_cursor = options.cursor.is_some(),
        is_prev,
        total_size,
        "running keyset paginate"
    );

    let mut working = query.with_order(&ordering);

    if let Some(cursor) = &options.cursor {
        if let Err(err) = cursor::validate_ordering(&cursor.ordering, &ordering) {
            tracing::warn!(?err, "cursor ordering mismatch, rejecting request");
            return Err(err.into());
        }
        let seek = build_seek_predicate(builder, &ordering, &cursor.values, is_prev)?;
        working = working.with_predicate(seek);
    }

    let fetch_ordering = if is_prev { ordering.reversed() } else { ordering.clone() };
    working = working.with_order(&fetch_ordering).with_limit(u64::from(options.size) + 1);

    let mut rows = working.fetch().await?;
    let has_more = rows.len() as u64 > u64::from(options.size);
    if has_more {
        rows.pop();
    }
    if is_prev {
        rows.reverse();
    }

    let has_previous = if is_prev { has_more } else { options.cursor.is_some() };
    let has_next = if is_prev { true } else { has_more };

    let next = if has_next {
        match rows.last() {
            Some(item) => {
                let values = query.cursor_values(item);
                Some(cursor::encode(&ordering, &values, NavDirection::Next)?)
            }
            None => None,
        }
    } else {
        None
    };

    let want_prev = has_previous || (options.include_prev_cursor && !rows.is_empty());
    let prev = if want_prev {
        match rows.first() {
            Some(item) => {
                let values = query.cursor_values(item);
                Some(cursor::encode(&ordering, &values, NavDirection::Prev)?)
            }
            None => None,
        }
    } else {
        None
    };

    Ok(Paginated {
        total_size,
        prev,
        next,
        items: rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StringMethod;
    use crate::ordering::{OrderKey, SortDir};
    use serde_json::json;

    struct NoopBuilder;

    impl PredicateBuilder for NoopBuilder {
        type Predicate = String;
        type Field = String;

        fn field(&self, name: &str) -> Result<Self::Field> {
            Ok(name.to_owned())
        }

        fn and(&self, children: Vec<Self::Predicate>) -> Self::Predicate {
            format!("AND({})", children.join(","))
        }

        fn or(&self, children: Vec<Self::Predicate>) -> Self::Predicate {
            format!("OR({})", children.join(","))
        }

        fn not(&self, child: Self::Predicate) -> Self::Predicate {
            format!("NOT({child})")
        }

        fn compare(&self, field: Self::Field, op: CompareOperator, value: &Value) -> Result<Self::Predicate> {
            Ok(format!("{field}{op:?}{value:?}"))
        }

        fn in_list(&self, field: Self::Field, values: &[Value]) -> Result<Self::Predicate> {
            Ok(format!("{field} IN {values:?}"))
        }

        fn string_method(&self, field: Self::Field, method: StringMethod, arg: &str) -> Result<Self::Predicate> {
            Ok(format!("{field}.{method:?}({arg})"))
        }
    }

    fn ordering() -> OrderingSpec {
        OrderingSpec(vec![
            OrderKey { field: "category".to_owned(), dir: SortDir::Asc },
            OrderKey { field: "price".to_owned(), dir: SortDir::Desc },
            OrderKey { field: "id".to_owned(), dir: SortDir::Asc },
        ])
    }

    #[test]
    fn page_options_rejects_out_of_range_size() {
        assert!(PageOptions::new(None, 0, false).is_err());
        assert!(PageOptions::new(None, 101, false).is_err());
        assert!(PageOptions::new(None, 1, false).is_ok());
        assert!(PageOptions::new(None, 100, false).is_ok());
    }

    #[test]
    fn seek_predicate_single_field_collapses_to_one_comparison() {
        let builder = NoopBuilder;
        let ordering = OrderingSpec(vec![OrderKey { field: "id".to_owned(), dir: SortDir::Asc }]);
        let values = BTreeMap::from([("id".to_owned(), json!(5))]);
        let pred = build_seek_predicate(&builder, &ordering, &values, false).unwrap();
        assert!(!pred.starts_with("OR("));
        assert!(pred.contains("Gt"));
    }

    #[test]
    fn seek_predicate_multi_field_is_a_disjunction_of_conjunctions() {
        let builder = NoopBuilder;
        let values = BTreeMap::from([
            ("category".to_owned(), json!("books")),
            ("price".to_owned(), json!(199)),
            ("id".to_owned(), json!(5)),
        ]);
        let pred = build_seek_predicate(&builder, &ordering(), &values, false).unwrap();
        assert!(pred.starts_with("OR("));
        // third disjunct has two equalities and one strict comparison
        assert!(pred.matches("AND(").count() >= 2);
    }

    #[test]
    fn seek_operator_flips_for_backward_navigation() {
        assert_eq!(seek_operator(SortDir::Asc, false), CompareOperator::Gt);
        assert_eq!(seek_operator(SortDir::Desc, false), CompareOperator::Lt);
        assert_eq!(seek_operator(SortDir::Asc, true), CompareOperator::Lt);
        assert_eq!(seek_operator(SortDir::Desc, true), CompareOperator::Gt);
    }
}
