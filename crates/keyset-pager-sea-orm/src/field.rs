//! The logical type of a backend column, and the safelist mapping from a
//! field name to `(column, kind, cursor extractor)`.

use std::collections::BTreeMap;
use std::fmt;

use keyset_pager::ordering::OrderingSpec;
use sea_orm::EntityTrait;
use serde_json::Value as Json;

/// The logical type of a field, used to coerce a filter literal or a
/// decoded cursor value into the backend's native `sea_orm::Value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    I64,
    F64,
    Bool,
    Uuid,
    DateTimeUtc,
    Date,
    Time,
    Decimal,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "String"),
            FieldKind::I64 => write!(f, "I64"),
            FieldKind::F64 => write!(f, "F64"),
            FieldKind::Bool => write!(f, "Bool"),
            FieldKind::Uuid => write!(f, "Uuid"),
            FieldKind::DateTimeUtc => write!(f, "DateTimeUtc"),
            FieldKind::Date => write!(f, "Date"),
            FieldKind::Time => write!(f, "Time"),
            FieldKind::Decimal => write!(f, "Decimal"),
        }
    }
}

/// Converts a model's field into the string form a cursor stores for it.
pub type CursorExtractor<E> = fn(&<E as EntityTrait>::Model) -> String;

/// One safelisted field: its column, its logical type, and (optionally)
/// how to read it back off a fetched model for cursor construction.
pub struct Field<E: EntityTrait> {
    pub col: E::Column,
    pub kind: FieldKind,
    pub to_string_for_cursor: Option<CursorExtractor<E>>,
}

/// The safelist: every field name a filter/ordering/cursor is allowed to
/// reference, mapped to its backend column.
pub struct FieldMap<E: EntityTrait> {
    fields: BTreeMap<String, Field<E>>,
}

impl<E: EntityTrait> Default for FieldMap<E> {
    fn default() -> Self {
        Self { fields: BTreeMap::new() }
    }
}

impl<E: EntityTrait> FieldMap<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn insert(mut self, name: &str, col: E::Column, kind: FieldKind) -> Self {
        self.fields.insert(
            name.to_owned(),
            Field { col, kind, to_string_for_cursor: None },
        );
        self
    }

    #[must_use]
    pub fn insert_with_extractor(
        mut self,
        name: &str,
        col: E::Column,
        kind: FieldKind,
        extractor: CursorExtractor<E>,
    ) -> Self {
        self.fields.insert(
            name.to_owned(),
            Field { col, kind, to_string_for_cursor: Some(extractor) },
        );
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field<E>> {
        self.fields.get(name)
    }

    /// The safelisted field names, for use with `keyset_pager::ordering::parse`
    /// and `keyset_pager::cel::validate_fields`.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Reads the cursor value for each field named in `ordering` off
    /// `model`, encoded as the JSON scalar its `FieldKind` implies (numbers
    /// stay numbers, everything else is the extractor's canonical string
    /// form). A cursor's `v` keys must be exactly the names appearing in its
    /// `o`, so this only ever visits the ordering's own fields, never the
    /// full safelist. Fields without a registered extractor are skipped.
    #[must_use]
    pub fn encode_model_key(&self, model: &E::Model, ordering: &OrderingSpec) -> BTreeMap<String, Json> {
        ordering
            .0
            .iter()
            .filter_map(|key| {
                let field = self.fields.get(&key.field)?;
                let extractor = field.to_string_for_cursor?;
                Some((key.field.clone(), kind_to_json(field.kind, &extractor(model))))
            })
            .collect()
    }
}

/// Renders a field's stringified cursor value as the JSON scalar its kind
/// implies. Falls back to the raw string if it does not parse as the
/// expected numeric/boolean shape, rather than panicking on a malformed
/// extractor.
fn kind_to_json(kind: FieldKind, s: &str) -> Json {
    match kind {
        FieldKind::I64 => s
            .parse::<i64>()
            .map(Json::from)
            .unwrap_or_else(|_| Json::String(s.to_owned())),
        FieldKind::F64 | FieldKind::Decimal => s
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String(s.to_owned())),
        FieldKind::Bool => s
            .parse::<bool>()
            .map(Json::Bool)
            .unwrap_or_else(|_| Json::String(s.to_owned())),
        FieldKind::String | FieldKind::Uuid | FieldKind::DateTimeUtc | FieldKind::Date | FieldKind::Time => {
            Json::String(s.to_owned())
        }
    }
}
