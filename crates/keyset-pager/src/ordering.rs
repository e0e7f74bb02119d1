//! Ordering mini-language (C2): `"category,-price,id"` -> [`OrderingSpec`].

use crate::error::{Error, Result};

/// Sort direction of a single ordering axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }

    #[must_use]
    pub fn prefix(self) -> char {
        match self {
            SortDir::Asc => '+',
            SortDir::Desc => '-',
        }
    }
}

/// One `(field, direction)` axis of an ordering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderKey {
    pub field: String,
    pub dir: SortDir,
}

/// A non-empty, ordered sequence of sort axes. Order of the vector is
/// significant: it is the tuple order the keyset paginator seeks against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderingSpec(pub Vec<OrderKey>);

impl OrderingSpec {
    #[must_use]
    pub fn reversed(&self) -> Self {
        OrderingSpec(
            self.0
                .iter()
                .map(|k| OrderKey {
                    field: k.field.clone(),
                    dir: k.dir.reverse(),
                })
                .collect(),
        )
    }

    /// Adds `field` as a final ascending tiebreaker axis unless it is
    /// already present anywhere in the ordering.
    pub fn ensure_tiebreaker(&mut self, field: &str) {
        if self.0.iter().any(|k| k.field == field) {
            return;
        }
        self.0.push(OrderKey {
            field: field.to_owned(),
            dir: SortDir::Asc,
        });
    }

    /// The `o` array of the cursor wire format: `"+field"` / `"-field"` tokens.
    #[must_use]
    pub fn to_tokens(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|k| format!("{}{}", k.dir.prefix(), k.field))
            .collect()
    }

    /// Parses the `o` array back into an `OrderingSpec`.
    pub fn from_tokens(tokens: &[String]) -> Result<Self> {
        if tokens.is_empty() {
            return Err(Error::Cursor("ordering token list is empty".to_owned()));
        }
        let mut keys = Vec::with_capacity(tokens.len());
        for token in tokens {
            if token.len() < 2 {
                return Err(Error::Cursor(format!(
                    "malformed ordering token: {token:?}"
                )));
            }
            let mut chars = token.chars();
            let prefix = chars
                .next()
                .ok_or_else(|| Error::Cursor(format!("malformed ordering token: {token:?}")))?;
            let dir = match prefix {
                '+' => SortDir::Asc,
                '-' => SortDir::Desc,
                _ => {
                    return Err(Error::Cursor(format!(
                        "ordering token must start with '+' or '-': {token:?}"
                    )));
                }
            };
            let field: String = chars.collect();
            if field.is_empty() {
                return Err(Error::Cursor(format!(
                    "ordering token has an empty field name: {token:?}"
                )));
            }
            keys.push(OrderKey { field, dir });
        }
        Ok(OrderingSpec(keys))
    }
}

/// Parses `"field1,-field2,field3"` into an [`OrderingSpec`], validating
/// every field name against `allowed`.
///
/// # Errors
/// Fails with [`Error::Ordering`] when the input is empty/blank, when any
/// comma-separated part reduces to just a `-`, or when a field name is not
/// present in `allowed`.
pub fn parse(order_by: &str, allowed: &[&str]) -> Result<OrderingSpec> {
    if order_by.trim().is_empty() {
        return Err(Error::Ordering("ordering string cannot be empty".to_owned()));
    }

    let parts: Vec<&str> = order_by.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return Err(Error::Ordering(
            "ordering string must contain at least one field".to_owned(),
        ));
    }

    let mut keys = Vec::with_capacity(parts.len());
    for part in parts {
        let (field, dir) = if let Some(stripped) = part.strip_prefix('-') {
            (stripped, SortDir::Desc)
        } else {
            (part, SortDir::Asc)
        };

        if field.is_empty() {
            return Err(Error::Ordering(format!("invalid ordering field: {part:?}")));
        }

        if !allowed.contains(&field) {
            let mut sorted = allowed.to_vec();
            sorted.sort_unstable();
            return Err(Error::Ordering(format!(
                "field {field:?} not allowed, allowed fields: {sorted:?}"
            )));
        }

        keys.push(OrderKey {
            field: field.to_owned(),
            dir,
        });
    }

    Ok(OrderingSpec(keys))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_directions_in_input_order() {
        let spec = parse("category,-price,id", &["category", "price", "id"]).unwrap();
        assert_eq!(
            spec.0,
            vec![
                OrderKey { field: "category".to_owned(), dir: SortDir::Asc },
                OrderKey { field: "price".to_owned(), dir: SortDir::Desc },
                OrderKey { field: "id".to_owned(), dir: SortDir::Asc },
            ]
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse("", &["id"]).is_err());
        assert!(parse("   ", &["id"]).is_err());
        assert!(parse(",,", &["id"]).is_err());
    }

    #[test]
    fn rejects_disallowed_field() {
        let err = parse("secret", &["id"]).unwrap_err();
        assert!(matches!(err, Error::Ordering(_)));
    }

    #[test]
    fn totality_over_allowed_identifiers() {
        let allowed = ["a", "b", "c"];
        for input in ["a", "-a", "a,b", "-a,-b,c", "a, -b , c"] {
            assert!(parse(input, &allowed).is_ok(), "expected {input:?} to parse");
        }
    }

    #[test]
    fn tokens_round_trip() {
        let spec = parse("category,-price", &["category", "price"]).unwrap();
        let tokens = spec.to_tokens();
        assert_eq!(tokens, vec!["+category".to_owned(), "-price".to_owned()]);
        let back = OrderingSpec::from_tokens(&tokens).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn ensure_tiebreaker_appends_when_missing() {
        let mut spec = parse("price", &["price", "id"]).unwrap();
        spec.ensure_tiebreaker("id");
        assert_eq!(spec.0.last().unwrap().field, "id");
    }

    #[test]
    fn ensure_tiebreaker_is_noop_when_present() {
        let mut spec = parse("price,id", &["price", "id"]).unwrap();
        spec.ensure_tiebreaker("id");
        assert_eq!(spec.0.len(), 2);
    }
}
