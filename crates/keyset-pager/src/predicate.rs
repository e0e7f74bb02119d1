//! Predicate lowering (C4): walks a validated [`Expr`] and emits a
//! backend predicate through the [`PredicateBuilder`] capability trait.
//!
//! No inheritance: a backend binding implements `PredicateBuilder` once
//! (see `keyset-pager-sea-orm`) and `lower` drives it generically over any
//! implementation.

use crate::ast::{CompareOperator, Expr, StringMethod, Value};
use crate::error::{Error, Result};

/// Backend capability for turning filter AST nodes into native predicates.
///
/// `Predicate` is the backend's boolean-condition type (e.g.
/// `sea_orm::Condition`); `Field` is the backend's resolved column handle.
pub trait PredicateBuilder {
    type Predicate;
    type Field;

    /// Resolves a safelisted field name to a backend column handle.
    ///
    /// # Errors
    /// Implementations return [`Error::Lowering`] for a name outside the
    /// allowed mapping (a defensive re-check: the AST should already have
    /// passed `validate_fields`).
    fn field(&self, name: &str) -> Result<Self::Field>;

    fn and(&self, children: Vec<Self::Predicate>) -> Self::Predicate;
    fn or(&self, children: Vec<Self::Predicate>) -> Self::Predicate;
    fn not(&self, child: Self::Predicate) -> Self::Predicate;

    /// # Errors
    /// Implementations return [`Error::Lowering`] when `op` is not
    /// comparable against `value`'s runtime type for this field.
    fn compare(&self, field: Self::Field, op: CompareOperator, value: &Value) -> Result<Self::Predicate>;

    /// # Errors
    /// Implementations return [`Error::Lowering`] on a non-literal list
    /// element (guaranteed not to happen from this crate's AST, but kept
    /// fallible for backend symmetry).
    fn in_list(&self, field: Self::Field, values: &[Value]) -> Result<Self::Predicate>;

    /// # Errors
    /// Implementations return [`Error::Lowering`] for a field whose
    /// backend column is not string-typed.
    fn string_method(&self, field: Self::Field, method: StringMethod, arg: &str) -> Result<Self::Predicate>;
}

/// Lowers `expr` into a backend predicate via `builder`.
///
/// # Errors
/// Returns [`Error::Lowering`] when the expression uses a construct this
/// visitor does not support (a bare identifier or literal where a full
/// boolean expression was expected, a field-to-field comparison, an
/// unknown method, or a wrong argument count), or when `builder` rejects a
/// field name or a value's type.
pub fn lower<B: PredicateBuilder>(builder: &B, expr: &Expr) -> Result<B::Predicate> {
    match expr {
        Expr::And(children) => lower_logical(builder, children, true),
        Expr::Or(children) => lower_logical(builder, children, false),
        Expr::Not(inner) => Ok(builder.not(lower(builder, inner)?)),
        Expr::Compare(left, op, right) => lower_compare(builder, left, *op, right),
        Expr::In(left, items) => lower_in(builder, left, items),
        Expr::Method(receiver, method, arg) => lower_method(builder, receiver, *method, arg),
        Expr::Identifier(name) => Err(Error::Lowering(format!(
            "bare identifier {name:?} is not a valid filter expression"
        ))),
        Expr::Value(_) => Err(Error::Lowering(
            "bare literal is not a valid filter expression".to_owned(),
        )),
    }
}

fn lower_logical<B: PredicateBuilder>(builder: &B, children: &[Expr], is_and: bool) -> Result<B::Predicate> {
    let mut lowered = Vec::with_capacity(children.len());
    for child in children {
        lowered.push(lower(builder, child)?);
    }
    if lowered.len() == 1 {
        return Ok(lowered.into_iter().next().unwrap_or_else(|| {
            unreachable!("len checked to be 1 above")
        }));
    }
    Ok(if is_and { builder.and(lowered) } else { builder.or(lowered) })
}

fn lower_compare<B: PredicateBuilder>(
    builder: &B,
    left: &Expr,
    op: CompareOperator,
    right: &Expr,
) -> Result<B::Predicate> {
    let (field_expr, value_expr, op) = match (left, right) {
        (Expr::Identifier(name), Expr::Value(_)) => (name, right, op),
        (Expr::Value(_), Expr::Identifier(name)) => (name, left, flip(op)),
        (Expr::Identifier(_), Expr::Identifier(_)) => {
            return Err(Error::Lowering(
                "field-to-field comparisons are not supported".to_owned(),
            ));
        }
        _ => {
            return Err(Error::Lowering(
                "comparison requires an identifier and a literal".to_owned(),
            ));
        }
    };
    let Expr::Value(value) = value_expr else {
        return Err(Error::Lowering("comparison right-hand side must be a literal".to_owned()));
    };
    let field = builder.field(field_expr)?;
    builder.compare(field, op, value)
}

/// `<=` and `>=`/`<`/`>` are not symmetric under swap, so a literal-on-the-
/// left comparison (`5 < price`) needs its operator mirrored, not just its
/// operands.
fn flip(op: CompareOperator) -> CompareOperator {
    match op {
        CompareOperator::Eq => CompareOperator::Eq,
        CompareOperator::Ne => CompareOperator::Ne,
        CompareOperator::Lt => CompareOperator::Gt,
        CompareOperator::Le => CompareOperator::Ge,
        CompareOperator::Gt => CompareOperator::Lt,
        CompareOperator::Ge => CompareOperator::Le,
    }
}

fn lower_in<B: PredicateBuilder>(builder: &B, left: &Expr, items: &[Expr]) -> Result<B::Predicate> {
    let Expr::Identifier(name) = left else {
        return Err(Error::Lowering("'in' requires an identifier on the left".to_owned()));
    };
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        let Expr::Value(v) = item else {
            return Err(Error::Lowering("'in' list elements must be literals".to_owned()));
        };
        values.push(v.clone());
    }
    let field = builder.field(name)?;
    builder.in_list(field, &values)
}

fn lower_method<B: PredicateBuilder>(
    builder: &B,
    receiver: &Expr,
    method: StringMethod,
    arg: &Expr,
) -> Result<B::Predicate> {
    let Expr::Identifier(name) = receiver else {
        return Err(Error::Lowering("method receiver must be an identifier".to_owned()));
    };
    let Expr::Value(Value::String(s)) = arg else {
        return Err(Error::Lowering("method argument must be a string literal".to_owned()));
    };
    let field = builder.field(name)?;
    builder.string_method(field, method, s)
}
