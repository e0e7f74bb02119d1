//! Opaque cursor codec (C1).
//!
//! The wire form is URL-safe, unpadded base64 of a compact JSON object with
//! three keys: `o` (ordering tokens), `v` (last-seen values by field name),
//! `d` (`"next"` or `"prev"`). A missing `d` decodes as `next`, for
//! cursors minted before direction was tracked.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{Error, Result};
use crate::ordering::OrderingSpec;

/// Which way the client is paging, embedded in the cursor so the paginator
/// knows whether to flip the seek comparison and the ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavDirection {
    Next,
    Prev,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCursor {
    o: Vec<String>,
    v: BTreeMap<String, Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    d: Option<NavDirection>,
}

/// A decoded cursor: the ordering it was minted against, the last-seen
/// value per ordering field, and the navigation direction.
#[derive(Clone, Debug, PartialEq)]
pub struct Cursor {
    pub ordering: OrderingSpec,
    pub values: BTreeMap<String, Json>,
    pub direction: NavDirection,
}

/// Encodes an ordering, its last-seen values, and a navigation direction
/// into an opaque base64 token.
///
/// # Errors
/// Returns [`Error::Cursor`] if `ordering` is empty or `values` is missing
/// an entry for one of the ordering's fields.
pub fn encode(
    ordering: &OrderingSpec,
    values: &BTreeMap<String, Json>,
    direction: NavDirection,
) -> Result<String> {
    if ordering.0.is_empty() {
        return Err(Error::Cursor("cannot encode an empty ordering".to_owned()));
    }
    for key in &ordering.0 {
        if !values.contains_key(&key.field) {
            return Err(Error::Cursor(format!(
                "missing cursor value for ordering field {:?}",
                key.field
            )));
        }
    }

    let wire = WireCursor {
        o: ordering.to_tokens(),
        v: values.clone(),
        d: Some(direction),
    };
    let bytes = serde_json::to_vec(&wire)
        .map_err(|e| Error::Cursor(format!("failed to serialize cursor: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Decodes an opaque cursor token back into its logical triple.
///
/// # Errors
/// Returns [`Error::Cursor`] on blank input, invalid base64, invalid JSON,
/// a JSON value that is not an object, a missing/malformed `o` or `v`, or
/// an unrecognized `d`.
pub fn decode(token: &str) -> Result<Cursor> {
    if token.trim().is_empty() {
        return Err(Error::Cursor("cursor is empty".to_owned()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| Error::Cursor(format!("cursor is not valid base64: {e}")))?;

    let json: Json = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Cursor(format!("cursor payload is not valid JSON: {e}")))?;

    let obj = json
        .as_object()
        .ok_or_else(|| Error::Cursor("cursor payload is not a JSON object".to_owned()))?;

    let o = obj
        .get("o")
        .ok_or_else(|| Error::Cursor("cursor is missing the 'o' key".to_owned()))?
        .as_array()
        .ok_or_else(|| Error::Cursor("cursor 'o' is not a list".to_owned()))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(ToOwned::to_owned)
                .ok_or_else(|| Error::Cursor("cursor 'o' entries must be strings".to_owned()))
        })
        .collect::<Result<Vec<String>>>()?;

    let v = obj
        .get("v")
        .ok_or_else(|| Error::Cursor("cursor is missing the 'v' key".to_owned()))?
        .as_object()
        .ok_or_else(|| Error::Cursor("cursor 'v' is not an object".to_owned()))?
        .iter()
        .map(|(k, val)| (k.clone(), val.clone()))
        .collect::<BTreeMap<String, Json>>();

    let direction = match obj.get("d") {
        None => NavDirection::Next,
        Some(Json::String(s)) if s == "next" => NavDirection::Next,
        Some(Json::String(s)) if s == "prev" => NavDirection::Prev,
        Some(other) => {
            return Err(Error::Cursor(format!(
                "cursor 'd' must be \"next\" or \"prev\", got {other:?}"
            )));
        }
    };

    let ordering = OrderingSpec::from_tokens(&o)?;

    Ok(Cursor {
        ordering,
        values: v,
        direction,
    })
}

/// Rejects a cursor whose ordering does not exactly match `expected`,
/// field-for-field and direction-for-direction.
///
/// # Errors
/// Returns [`Error::Cursor`] on mismatch.
pub fn validate_ordering(cursor_ordering: &OrderingSpec, expected: &OrderingSpec) -> Result<()> {
    if cursor_ordering != expected {
        return Err(Error::Cursor(
            "cursor ordering does not match the current query ordering".to_owned(),
        ));
    }
    Ok(())
}

/// Rejects a cursor whose values are missing an entry for any name in
/// `expected_fields`.
///
/// # Errors
/// Returns [`Error::Cursor`] on a missing field.
pub fn validate_fields(values: &BTreeMap<String, Json>, expected_fields: &[String]) -> Result<()> {
    for field in expected_fields {
        if !values.contains_key(field) {
            return Err(Error::Cursor(format!(
                "cursor is missing a value for field {field:?}"
            )));
        }
    }
    Ok(())
}
