//! The filter expression syntax tree.
//!
//! A CEL fragment is parsed into an [`Expr`] tree before it is validated
//! against a safelist and lowered into a backend predicate. The tree is a
//! plain discriminated union — no visitor base class, no inheritance —
//! so that lowering (see `predicate`) is a direct match on the variant.

use std::collections::BTreeSet;

use bigdecimal::BigDecimal;

/// A scalar literal that appears in a filter expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(BigDecimal),
    String(String),
}

/// The six CEL comparison operators this crate supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOperator {
    /// The operator that selects the complementary set of rows, used when
    /// lowering `!(field == lit)` into `field != lit` instead of a NOT wrapper.
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            CompareOperator::Eq => CompareOperator::Ne,
            CompareOperator::Ne => CompareOperator::Eq,
            CompareOperator::Lt => CompareOperator::Ge,
            CompareOperator::Le => CompareOperator::Gt,
            CompareOperator::Gt => CompareOperator::Le,
            CompareOperator::Ge => CompareOperator::Lt,
        }
    }
}

/// The three string-receiver methods the predicate lowerer knows how to
/// translate; any other method name is a lowering error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringMethod {
    Contains,
    StartsWith,
    EndsWith,
}

impl StringMethod {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "contains" => Some(StringMethod::Contains),
            "startsWith" => Some(StringMethod::StartsWith),
            "endsWith" => Some(StringMethod::EndsWith),
            _ => None,
        }
    }
}

/// A parsed filter expression.
///
/// `And`/`Or` carry two or more children (a binary parse tree is flattened
/// during lowering so a chain of `&&`/`||` never produces a single-child
/// wrapper). `Compare` and `In` reference a field by identifier; the
/// identifier is resolved against a safelist-backed field map during
/// lowering, not during parsing.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare(Box<Expr>, CompareOperator, Box<Expr>),
    In(Box<Expr>, Vec<Expr>),
    Method(Box<Expr>, StringMethod, Box<Expr>),
    Identifier(String),
    Value(Value),
}

impl Expr {
    /// Collects every identifier used as a field reference.
    ///
    /// A method receiver contributes its identifier; the method name itself
    /// is not a field reference and is never collected.
    #[must_use]
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::And(children) | Expr::Or(children) => {
                for child in children {
                    child.collect_identifiers(out);
                }
            }
            Expr::Not(inner) => inner.collect_identifiers(out),
            Expr::Compare(left, _, right) => {
                left.collect_identifiers(out);
                right.collect_identifiers(out);
            }
            Expr::In(left, items) => {
                left.collect_identifiers(out);
                for item in items {
                    item.collect_identifiers(out);
                }
            }
            Expr::Method(receiver, _, arg) => {
                receiver.collect_identifiers(out);
                arg.collect_identifiers(out);
            }
            Expr::Identifier(name) => {
                out.insert(name.clone());
            }
            Expr::Value(_) => {}
        }
    }
}
