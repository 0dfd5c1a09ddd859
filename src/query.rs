//! Query construction: the tagged [`Query`] union consumed by
//! [`crate::engine::RetrievalEngine::retrieve`], plus a small builder
//! ([`QueryExpr`]) for composing textual expressions algebraically
//! instead of formatting strings by hand.
//!
//! The duck-typed "does this query object carry a `.value` string or
//! behave like a histogram" dispatch of the distilled source becomes an
//! explicit two-variant enum here (REDESIGN FLAGS) — a query either
//! names an expression to parse, or already is a probe histogram to
//! intersect against the corpus.

use std::hash::BuildHasher;
use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Rem};

use rustc_hash::FxBuildHasher;

use crate::histogram::Histogram;

/// A query handed to [`crate::engine::RetrievalEngine::retrieve`].
#[derive(Debug, Clone)]
pub enum Query<S = FxBuildHasher> {
    /// An expression over group names, to be parsed and evaluated
    /// against the corpus (spec.md §4.C, §4.D).
    Expression(String),
    /// A probe histogram; candidates come from the union of posting
    /// lists for the probe's own keys, scored by `(probe * hist).sum()`.
    Probe(Histogram<S>),
}

impl<S> Query<S> {
    #[must_use]
    pub fn expression(text: impl Into<String>) -> Self {
        Self::Expression(text.into())
    }

    #[must_use]
    pub fn probe(hist: Histogram<S>) -> Self {
        Self::Probe(hist)
    }
}

impl<S: BuildHasher + Default> From<QueryExpr> for Query<S> {
    fn from(expr: QueryExpr) -> Self {
        Self::Expression(expr.0)
    }
}

/// A composable expression builder. Each combinator wraps its operands
/// in parentheses so the resulting text parses back to exactly the tree
/// that built it, regardless of how deeply combinators are nested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExpr(String);

impl QueryExpr {
    /// A single-dim group name or raw key atom.
    #[must_use]
    pub fn group(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_string())
    }

    /// A multi-dim `(n0, n1, ..)` tuple atom.
    #[must_use]
    pub fn tuple<I, T>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let joined = names
            .into_iter()
            .map(|n| n.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self(format!("({joined})"))
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }

    fn combine(self, sign: &str, rhs: Self) -> Self {
        Self(format!("({}) {sign} ({})", self.0, rhs.0))
    }

    #[must_use]
    pub fn union(self, rhs: Self) -> Self {
        self.combine("+", rhs)
    }

    #[must_use]
    pub fn intersection(self, rhs: Self) -> Self {
        self.combine("*", rhs)
    }

    #[must_use]
    pub fn difference(self, rhs: Self) -> Self {
        self.combine("/", rhs)
    }

    #[must_use]
    pub fn weighted_and(self, rhs: Self) -> Self {
        self.combine("&", rhs)
    }

    #[must_use]
    pub fn weighted_or(self, rhs: Self) -> Self {
        self.combine("|", rhs)
    }

    #[must_use]
    pub fn xor_by_mass(self, rhs: Self) -> Self {
        self.combine("#|", rhs)
    }

    #[must_use]
    pub fn gated_difference(self, rhs: Self) -> Self {
        self.combine("#/", rhs)
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self(format!("-({})", self.0))
    }

    pub fn into_query<S: BuildHasher + Default>(self) -> Query<S> {
        Query::Expression(self.0)
    }
}

impl Add for QueryExpr {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl Mul for QueryExpr {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl Div for QueryExpr {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        self.difference(rhs)
    }
}

impl BitAnd for QueryExpr {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        self.weighted_and(rhs)
    }
}

impl BitOr for QueryExpr {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.weighted_or(rhs)
    }
}

/// Maps to `#|` (xor-by-mass); Rust has no literal `#|` operator token,
/// so `^` is the closest built-in stand-in for a symmetric combinator.
impl BitXor for QueryExpr {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> Self {
        self.xor_by_mass(rhs)
    }
}

/// Maps to `#/` (gated difference); `%` is a stand-in, chosen only
/// because no other unused binary operator trait remains.
impl Rem for QueryExpr {
    type Output = Self;
    fn rem(self, rhs: Self) -> Self {
        self.gated_difference(rhs)
    }
}

impl Neg for QueryExpr {
    type Output = Self;
    fn neg(self) -> Self {
        self.negate()
    }
}
