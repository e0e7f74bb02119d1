//! `sea_orm` implementations of the `keyset_pager` capability traits.
//!
//! [`SeaOrmPredicateBuilder`] implements `PredicateBuilder` (C4) and
//! [`SeaOrmQuery`] implements `QueryOps` (C5), both parameterized by a
//! [`FieldMap`] safelist. Coercion of an AST literal or a decoded cursor
//! value into `sea_orm::Value` is driven entirely by the field's
//! `FieldKind`; the CEL frontend never coerces, by contract (§9).

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use keyset_pager::ast::{CompareOperator, StringMethod, Value as AstValue};
use keyset_pager::ordering::OrderingSpec;
use keyset_pager::predicate::PredicateBuilder;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr as SeaExpr, Func, LikeExpr, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Value as SeaValue,
};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::field::{FieldKind, FieldMap};

/// Lowers filter AST nodes into `sea_orm::Condition` using a [`FieldMap`]
/// safelist for field resolution and type coercion.
pub struct SeaOrmPredicateBuilder<'a, E: EntityTrait> {
    pub fields: &'a FieldMap<E>,
}

/// A resolved safelist field handle: the backend column plus the kind
/// needed to coerce literals against it. Carrying `kind` alongside `col`
/// avoids ever needing to look a column back up by equality, since
/// `ColumnTrait` does not require `PartialEq`/`Eq`.
#[derive(Clone, Copy)]
pub struct ResolvedField<E: EntityTrait> {
    pub col: E::Column,
    pub kind: FieldKind,
}

impl<E: EntityTrait> PredicateBuilder for SeaOrmPredicateBuilder<'_, E> {
    type Predicate = Condition;
    type Field = ResolvedField<E>;

    fn field(&self, name: &str) -> keyset_pager::Result<Self::Field> {
        self.fields
            .get(name)
            .map(|f| ResolvedField { col: f.col, kind: f.kind })
            .ok_or_else(|| lowering_error(Error::UnknownField(name.to_owned())))
    }

    fn and(&self, children: Vec<Self::Predicate>) -> Self::Predicate {
        children.into_iter().fold(Condition::all(), |acc, child| acc.add(child))
    }

    fn or(&self, children: Vec<Self::Predicate>) -> Self::Predicate {
        children.into_iter().fold(Condition::any(), |acc, child| acc.add(child))
    }

    fn not(&self, child: Self::Predicate) -> Self::Predicate {
        Condition::all().not().add(child)
    }

    fn compare(
        &self,
        field: Self::Field,
        op: CompareOperator,
        value: &AstValue,
    ) -> keyset_pager::Result<Self::Predicate> {
        let sea_value = coerce(field.kind, value).map_err(lowering_error)?;
        Ok(Condition::all().add(apply_compare(field.col, op, sea_value)))
    }

    fn in_list(&self, field: Self::Field, values: &[AstValue]) -> keyset_pager::Result<Self::Predicate> {
        if values.is_empty() {
            // An empty IN list matches nothing; emit an always-false condition
            // rather than letting sea_orm render a syntactically invalid `IN ()`.
            return Ok(Condition::all().add(SeaExpr::val(1).eq(0)));
        }
        let coerced = values
            .iter()
            .map(|v| coerce(field.kind, v))
            .collect::<std::result::Result<Vec<SeaValue>, Error>>()
            .map_err(lowering_error)?;
        Ok(Condition::all().add(field.col.is_in(coerced)))
    }

    fn string_method(
        &self,
        field: Self::Field,
        method: StringMethod,
        arg: &str,
    ) -> keyset_pager::Result<Self::Predicate> {
        if field.kind != FieldKind::String {
            return Err(lowering_error(Error::TypeMismatch {
                field: format!("{:?}", field.col),
                expected: "String".to_owned(),
                actual: field.kind.to_string(),
            }));
        }
        // Case-insensitive match is expressed portably as `LOWER(column)
        // LIKE LOWER(pattern)` rather than a backend-specific ILIKE
        // keyword, since sqlite (the binding's test backend) has no ILIKE.
        let lowered_column: SimpleExpr = Func::lower(SeaExpr::col(field.col).into()).into();
        let pattern = like_pattern(method, &arg.to_lowercase());
        let like = LikeExpr::str(&pattern).escape('\\');
        Ok(Condition::all().add(lowered_column.like(like)))
    }
}

fn lowering_error(e: Error) -> keyset_pager::Error {
    keyset_pager::Error::Lowering(e.to_string())
}

fn apply_compare(field: impl ColumnTrait, op: CompareOperator, value: SeaValue) -> SimpleExpr {
    match op {
        CompareOperator::Eq => field.eq(value),
        CompareOperator::Ne => field.ne(value),
        CompareOperator::Lt => field.lt(value),
        CompareOperator::Le => field.lte(value),
        CompareOperator::Gt => field.gt(value),
        CompareOperator::Ge => field.gte(value),
    }
}

/// Escapes `%`, `_`, and `\` so a user-supplied substring cannot smuggle
/// its own LIKE wildcards, then wraps it per the requested method.
fn like_pattern(method: StringMethod, raw: &str) -> String {
    let escaped = raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    match method {
        StringMethod::Contains => format!("%{escaped}%"),
        StringMethod::StartsWith => format!("{escaped}%"),
        StringMethod::EndsWith => format!("%{escaped}"),
    }
}

/// Coerces an AST literal into the `sea_orm::Value` its column's
/// `FieldKind` expects. Type coercion is intentionally delegated here, not
/// performed by the CEL frontend (§9).
fn coerce(kind: FieldKind, value: &AstValue) -> std::result::Result<SeaValue, Error> {
    match (kind, value) {
        (FieldKind::String, AstValue::String(s)) => Ok(SeaValue::from(s.clone())),
        (FieldKind::Bool, AstValue::Bool(b)) => Ok(SeaValue::from(*b)),
        (FieldKind::I64, AstValue::Number(n)) => n
            .to_string()
            .parse::<i64>()
            .map(SeaValue::from)
            .map_err(|_| type_mismatch(kind, value)),
        (FieldKind::F64, AstValue::Number(n)) => n
            .to_string()
            .parse::<f64>()
            .map(SeaValue::from)
            .map_err(|_| type_mismatch(kind, value)),
        (FieldKind::Decimal, AstValue::Number(n)) => Decimal::from_str(&n.to_string())
            .map(SeaValue::from)
            .map_err(|_| type_mismatch(kind, value)),
        (FieldKind::Uuid, AstValue::String(s)) => {
            Uuid::parse_str(s).map(SeaValue::from).map_err(|_| type_mismatch(kind, value))
        }
        (FieldKind::DateTimeUtc, AstValue::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| SeaValue::from(dt.with_timezone(&Utc)))
            .map_err(|_| type_mismatch(kind, value)),
        (FieldKind::Date, AstValue::String(s)) => NaiveDate::from_str(s)
            .map(SeaValue::from)
            .map_err(|_| type_mismatch(kind, value)),
        (FieldKind::Time, AstValue::String(s)) => NaiveTime::from_str(s)
            .map(SeaValue::from)
            .map_err(|_| type_mismatch(kind, value)),
        _ => Err(type_mismatch(kind, value)),
    }
}

fn type_mismatch(kind: FieldKind, value: &AstValue) -> Error {
    let actual = match value {
        AstValue::Bool(_) => "Bool",
        AstValue::Number(_) => "Number",
        AstValue::String(_) => "String",
    };
    Error::TypeMismatch {
        field: String::new(),
        expected: kind.to_string(),
        actual: actual.to_owned(),
    }
}

/// Parses a cursor's JSON scalar back into a typed `sea_orm::Value`, per
/// the field's `FieldKind` — the other half of the "backend binding must
/// document how non-scalar ordering keys are serialized and parsed"
/// contract (§4.1).
fn json_to_sea_value(kind: FieldKind, json: &Json) -> std::result::Result<SeaValue, Error> {
    match (kind, json) {
        (FieldKind::String, Json::String(s)) => Ok(SeaValue::from(s.clone())),
        (FieldKind::Bool, Json::Bool(b)) => Ok(SeaValue::from(*b)),
        (FieldKind::I64, Json::Number(n)) => n
            .as_i64()
            .map(SeaValue::from)
            .ok_or_else(|| json_type_mismatch(kind, json)),
        (FieldKind::F64, Json::Number(n)) => n
            .as_f64()
            .map(SeaValue::from)
            .ok_or_else(|| json_type_mismatch(kind, json)),
        (FieldKind::Decimal, Json::Number(n)) => Decimal::from_str(&n.to_string())
            .map(SeaValue::from)
            .map_err(|_| json_type_mismatch(kind, json)),
        (FieldKind::Uuid, Json::String(s)) => {
            Uuid::parse_str(s).map(SeaValue::from).map_err(|_| json_type_mismatch(kind, json))
        }
        (FieldKind::DateTimeUtc, Json::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| SeaValue::from(dt.with_timezone(&Utc)))
            .map_err(|_| json_type_mismatch(kind, json)),
        (FieldKind::Date, Json::String(s)) => NaiveDate::from_str(s)
            .map(SeaValue::from)
            .map_err(|_| json_type_mismatch(kind, json)),
        (FieldKind::Time, Json::String(s)) => NaiveTime::from_str(s)
            .map(SeaValue::from)
            .map_err(|_| json_type_mismatch(kind, json)),
        _ => Err(json_type_mismatch(kind, json)),
    }
}

fn json_type_mismatch(kind: FieldKind, json: &Json) -> Error {
    Error::TypeMismatch {
        field: String::new(),
        expected: kind.to_string(),
        actual: format!("{json:?}"),
    }
}

/// A `sea_orm::Select<E>` bound to a [`FieldMap`] safelist and a live
/// connection, implementing `QueryOps` (C5).
///
/// `base` never carries an `ORDER BY` or `LIMIT` — those are applied fresh
/// in [`Self::fetch`] from `ordering`/`limit` each time, so re-deriving the
/// backward-navigation ordering never appends onto a stale one.
pub struct SeaOrmQuery<'a, E: EntityTrait, C: ConnectionTrait> {
    base: Select<E>,
    fields: &'a FieldMap<E>,
    ordering: OrderingSpec,
    limit: Option<u64>,
    conn: &'a C,
}

impl<E: EntityTrait, C: ConnectionTrait> Clone for SeaOrmQuery<'_, E, C> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            fields: self.fields,
            ordering: self.ordering.clone(),
            limit: self.limit,
            conn: self.conn,
        }
    }
}

impl<'a, E: EntityTrait, C: ConnectionTrait> SeaOrmQuery<'a, E, C> {
    /// Builds a query over `select`, filtered and ordered by the caller
    /// through `keyset_pager::ordering::parse` and `keyset_pager::lower`
    /// before this point. `ordering` is the ordering already applied to
    /// `select`.
    pub fn new(select: Select<E>, fields: &'a FieldMap<E>, ordering: OrderingSpec, conn: &'a C) -> Self {
        Self { base: select, fields, ordering, limit: None, conn }
    }

    fn build_fetch_select(&self) -> std::result::Result<Select<E>, Error> {
        let mut select = self.base.clone();
        for key in &self.ordering.0 {
            let field = self
                .fields
                .get(&key.field)
                .ok_or_else(|| Error::UnknownField(key.field.clone()))?;
            select = match key.dir {
                keyset_pager::SortDir::Asc => select.order_by_asc(field.col),
                keyset_pager::SortDir::Desc => select.order_by_desc(field.col),
            };
        }
        if let Some(limit) = self.limit {
            select = select.limit(limit);
        }
        Ok(select)
    }
}

#[async_trait::async_trait]
impl<E, C> keyset_pager::QueryOps for SeaOrmQuery<'_, E, C>
where
    E: EntityTrait + Send + Sync,
    E::Model: Send + Sync,
    C: ConnectionTrait + Send + Sync,
{
    type Predicate = Condition;
    type Item = E::Model;
    type Err = Error;

    fn extract_ordering(&self) -> Result<OrderingSpec> {
        if self.ordering.0.is_empty() {
            return Err(Error::Core(keyset_pager::Error::Pagination(
                "query has no ordering applied".to_owned(),
            )));
        }
        Ok(self.ordering.clone())
    }

    fn with_predicate(&self, predicate: Self::Predicate) -> Self {
        let mut next = self.clone();
        next.base = next.base.filter(predicate);
        next
    }

    fn with_order(&self, ordering: &OrderingSpec) -> Self {
        let mut next = self.clone();
        next.ordering = ordering.clone();
        next
    }

    fn with_limit(&self, limit: u64) -> Self {
        let mut next = self.clone();
        next.limit = Some(limit);
        next
    }

    async fn count(&self) -> Result<u64> {
        let n = self.base.clone().count(self.conn).await?;
        tracing::trace!(count = n, "counted base query");
        Ok(n)
    }

    async fn fetch(&self) -> Result<Vec<Self::Item>> {
        let select = self.build_fetch_select()?;
        let rows = select.all(self.conn).await?;
        tracing::trace!(rows = rows.len(), "fetched page rows");
        Ok(rows)
    }

    fn cursor_values(&self, item: &Self::Item) -> BTreeMap<String, Json> {
        self.fields.encode_model_key(item, &self.ordering)
    }
}

/// Parses a cursor's decoded JSON value for `field` into a typed
/// `sea_orm::Value`, looking the field's kind up in `fields`. Exposed for
/// callers building their own seek predicates outside of
/// `keyset_pager::paginate`.
///
/// # Errors
/// Returns [`Error::UnknownField`] if `field` is not in the safelist, or
/// [`Error::TypeMismatch`] if `json` does not match the field's kind.
pub fn parse_cursor_value<E: EntityTrait>(
    fields: &FieldMap<E>,
    field: &str,
    json: &Json,
) -> Result<SeaValue> {
    let entry = fields.get(field).ok_or_else(|| Error::UnknownField(field.to_owned()))?;
    Ok(json_to_sea_value(entry.kind, json)?)
}
