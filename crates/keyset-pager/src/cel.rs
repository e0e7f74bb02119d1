//! CEL frontend (C3): parse a filter expression string to [`Expr`], collect
//! identifiers, and validate them against a safelist.
//!
//! The parser itself lives behind the `with-cel-parser` feature so that a
//! caller who only needs C1/C2/C4/C5 (or who builds the AST some other
//! way) is not forced to pull in a CEL grammar. This mirrors the
//! feature-gated frontend pattern used elsewhere for optional parser
//! dependencies: the conversion from the third-party parse tree into this
//! crate's own `ast::Expr` lives in one small, clearly bounded module so
//! that any shape drift in the upstream crate is isolated here.

use std::collections::BTreeSet;

use crate::ast::Expr;
use crate::error::{Error, Result};

/// Parses `source` as a CEL fragment.
///
/// # Errors
/// Returns [`Error::Parse`] if `source` is empty/blank or fails to parse as
/// CEL, and [`Error::ParsingUnavailable`] if built without `with-cel-parser`.
#[cfg(feature = "with-cel-parser")]
pub fn parse(source: &str) -> Result<Expr> {
    if source.trim().is_empty() {
        return Err(Error::Parse("filter expression is empty".to_owned()));
    }
    tracing::trace!(len = source.len(), "parsing CEL filter expression");
    let parsed = cel_parser::parse(source)
        .map_err(|e| Error::Parse(format!("{source:?}: {e}")))?;
    convert::to_ast(&parsed)
}

#[cfg(not(feature = "with-cel-parser"))]
pub fn parse(_source: &str) -> Result<Expr> {
    Err(Error::ParsingUnavailable)
}

/// Collects every identifier used as a field reference (receivers of a
/// method call count; the method name never does).
#[must_use]
pub fn extract_identifiers(ast: &Expr) -> BTreeSet<String> {
    ast.identifiers()
}

/// Fails with [`Error::Validation`] if `ast` references any identifier
/// outside `allowed`.
///
/// # Errors
/// Returns [`Error::Validation`] naming every disallowed identifier found.
pub fn validate_fields(ast: &Expr, allowed: &[&str]) -> Result<()> {
    let used = extract_identifiers(ast);
    let disallowed: Vec<String> = used
        .into_iter()
        .filter(|name| !allowed.contains(&name.as_str()))
        .collect();
    if disallowed.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(disallowed))
    }
}

#[cfg(feature = "with-cel-parser")]
mod convert {
    use bigdecimal::BigDecimal;
    use cel_parser::{Atom, Expression, Member, RelationOp};

    use crate::ast::{CompareOperator, Expr, StringMethod, Value};
    use crate::error::{Error, Result};

    pub(super) fn to_ast(expr: &Expression) -> Result<Expr> {
        match expr {
            Expression::And(lhs, rhs) => Ok(flatten_and(to_ast(lhs)?, to_ast(rhs)?)),
            Expression::Or(lhs, rhs) => Ok(flatten_or(to_ast(lhs)?, to_ast(rhs)?)),
            Expression::Unary(cel_parser::UnaryOp::Not, inner) => to_not(to_ast(inner)?),
            Expression::Unary(_, inner) => to_ast(inner),
            Expression::Relation(lhs, RelationOp::In, rhs) => {
                let left = to_ast(lhs)?;
                let items = match &**rhs {
                    Expression::List(items) => items
                        .iter()
                        .map(to_ast)
                        .collect::<Result<Vec<_>>>()?,
                    _ => {
                        return Err(Error::Lowering(
                            "'in' requires a list literal on the right".to_owned(),
                        ));
                    }
                };
                Ok(Expr::In(Box::new(left), items))
            }
            Expression::Relation(lhs, op, rhs) => {
                let op = match op {
                    RelationOp::Equals => CompareOperator::Eq,
                    RelationOp::NotEquals => CompareOperator::Ne,
                    RelationOp::LessThan => CompareOperator::Lt,
                    RelationOp::LessThanEq => CompareOperator::Le,
                    RelationOp::GreaterThan => CompareOperator::Gt,
                    RelationOp::GreaterThanEq => CompareOperator::Ge,
                    RelationOp::In => unreachable!("handled above"),
                };
                Ok(Expr::Compare(Box::new(to_ast(lhs)?), op, Box::new(to_ast(rhs)?)))
            }
            Expression::Member(receiver, member) => to_member(receiver, member),
            Expression::Ident(name) => Ok(Expr::Identifier(name.as_str().to_owned())),
            Expression::Atom(atom) => Ok(Expr::Value(to_value(atom)?)),
            Expression::List(_) => Err(Error::Lowering(
                "a bare list literal is not a valid filter expression".to_owned(),
            )),
            Expression::Arithmetic(..) | Expression::Ternary(..) | Expression::Map(_) => {
                Err(Error::Lowering(
                    "arithmetic, ternary, and map expressions are not supported".to_owned(),
                ))
            }
            Expression::FunctionCall(function, this, args) => to_call(function, this, args),
        }
    }

    fn to_member(receiver: &Expression, member: &Member) -> Result<Expr> {
        let _ = receiver;
        match member {
            Member::Attribute(name) => Err(Error::Lowering(format!(
                "unsupported member access: {name}"
            ))),
            Member::FunctionCall(_) => Err(Error::Lowering(
                "unsupported member-call shape".to_owned(),
            )),
            Member::Index(_) => Err(Error::Lowering("index access is not supported".to_owned())),
            Member::Fields(_) => {
                Err(Error::Lowering("struct literals are not supported".to_owned()))
            }
        }
    }

    /// `receiver.method(arg)` parses as `FunctionCall(Ident(method),
    /// Some(receiver), [arg])`; a bare function call (no receiver) is not a
    /// valid filter construct in this safelisted dialect.
    fn to_call(
        function: &Expression,
        this: &Option<Box<Expression>>,
        args: &[Expression],
    ) -> Result<Expr> {
        let Expression::Ident(name) = function else {
            return Err(Error::Lowering(
                "function call target must be a plain method name".to_owned(),
            ));
        };
        let Some(receiver) = this else {
            return Err(Error::Lowering(format!(
                "bare function calls are not supported: {name}"
            )));
        };
        let Some(method) = StringMethod::from_name(name.as_str()) else {
            return Err(Error::Lowering(format!("unsupported method: {name}")));
        };
        let [arg] = args else {
            return Err(Error::Lowering(format!(
                "{name} takes exactly one argument, got {}",
                args.len()
            )));
        };
        Ok(Expr::Method(
            Box::new(to_ast(receiver)?),
            method,
            Box::new(to_ast(arg)?),
        ))
    }

    fn to_not(inner: Expr) -> Result<Expr> {
        if let Expr::Compare(left, op, right) = inner {
            Ok(Expr::Compare(left, op.inverse(), right))
        } else {
            Ok(Expr::Not(Box::new(inner)))
        }
    }

    fn flatten_and(lhs: Expr, rhs: Expr) -> Expr {
        let mut children = Vec::new();
        push_flat(&mut children, lhs, |e| matches!(e, Expr::And(_)));
        push_flat(&mut children, rhs, |e| matches!(e, Expr::And(_)));
        Expr::And(children)
    }

    fn flatten_or(lhs: Expr, rhs: Expr) -> Expr {
        let mut children = Vec::new();
        push_flat(&mut children, lhs, |e| matches!(e, Expr::Or(_)));
        push_flat(&mut children, rhs, |e| matches!(e, Expr::Or(_)));
        Expr::Or(children)
    }

    fn push_flat(out: &mut Vec<Expr>, expr: Expr, is_same: impl Fn(&Expr) -> bool) {
        if is_same(&expr) {
            match expr {
                Expr::And(children) | Expr::Or(children) => out.extend(children),
                other => out.push(other),
            }
        } else {
            out.push(expr);
        }
    }

    fn to_value(atom: &Atom) -> Result<Value> {
        match atom {
            Atom::Int(i) => Ok(Value::Number(BigDecimal::from(*i))),
            Atom::UInt(u) => Ok(Value::Number(BigDecimal::from(*u))),
            Atom::Float(f) => BigDecimal::try_from(*f)
                .map(Value::Number)
                .map_err(|e| Error::Parse(format!("invalid floating literal: {e}"))),
            Atom::String(s) => Ok(Value::String(s.as_str().to_owned())),
            Atom::Bool(b) => Ok(Value::Bool(*b)),
            Atom::Bytes(_) | Atom::Null => {
                Err(Error::Lowering("byte literals and null are not supported".to_owned()))
            }
        }
    }
}

#[cfg(all(test, feature = "with-cel-parser"))]
mod tests {
    use super::*;
    use crate::ast::{CompareOperator, Value};

    #[test]
    fn extracts_receiver_but_not_method_name() {
        let ast = Expr::Method(
            Box::new(Expr::Identifier("name".to_owned())),
            crate::ast::StringMethod::Contains,
            Box::new(Expr::Value(Value::String("x".to_owned()))),
        );
        let ids = extract_identifiers(&ast);
        assert!(ids.contains("name"));
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn validate_fields_rejects_unknown_identifier() {
        let ast = Expr::Compare(
            Box::new(Expr::Identifier("secret".to_owned())),
            CompareOperator::Eq,
            Box::new(Expr::Value(Value::Bool(true))),
        );
        let err = validate_fields(&ast, &["price"]).unwrap_err();
        assert!(matches!(err, Error::Validation(names) if names == vec!["secret".to_owned()]));
    }

    #[test]
    fn validate_fields_accepts_safelisted_identifier() {
        let ast = Expr::Compare(
            Box::new(Expr::Identifier("price".to_owned())),
            CompareOperator::Gt,
            Box::new(Expr::Value(Value::Bool(true))),
        );
        assert!(validate_fields(&ast, &["price"]).is_ok());
    }
}

#[cfg(all(test, not(feature = "with-cel-parser")))]
mod disabled_tests {
    use super::*;

    #[test]
    fn parse_is_unavailable_without_the_feature() {
        assert!(matches!(parse("a == 1"), Err(Error::ParsingUnavailable)));
    }
}
