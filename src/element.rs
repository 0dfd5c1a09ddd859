//! Low-level elements and the element-set algebra (component A).
//!
//! An [`Element`] is a `(key, value)` pair drawn from a document's
//! histogram. An [`ElementSet`] is the set-valued result of applying one
//! of the seven binary operators below to two such sets.

use std::collections::HashMap;

use compact_str::CompactString;

/// An element key: a bare token for a 1-D corpus, or an ordered tuple of
/// tokens for a d-dimensional one. The tuple length *is* the
/// dimensionality, so 1-D and N-D corpora share this one type.
pub type Key = Vec<CompactString>;

/// A `(key, value)` pair. Equality and hashing depend only on `key`,
/// matching the Python original's `HElement.__eq__`/`__hash__`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Element {
    pub key: Key,
    pub value: f64,
}

impl Element {
    #[must_use]
    pub fn new(key: Key, value: f64) -> Self {
        Self { key, value }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Element {}

/// A set of elements with a key-uniqueness invariant: at most one
/// `Element` per key. Backed by a map rather than a true `HashSet` since
/// we always need the value alongside the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSet {
    values: HashMap<Key, f64>,
}

impl ElementSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn singleton(key: Key, value: f64) -> Self {
        let mut set = Self::new();
        set.add(key, value);
        set
    }

    pub fn from_map(values: HashMap<Key, f64>) -> Self {
        Self { values }
    }

    /// Insert `key` with `value`, replacing any prior value for `key`.
    pub fn add(&mut self, key: Key, value: f64) {
        self.values.insert(key, value);
    }

    /// Remove `key`, if present.
    pub fn discard(&mut self, key: &Key) {
        self.values.remove(key);
    }

    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum of all values. Callers use this as the relevance score of a
    /// scored document.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.values.values().sum()
    }

    /// Product of all values.
    #[must_use]
    pub fn prod(&self) -> f64 {
        self.values.values().product()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.values.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &f64> {
        self.values.values()
    }

    #[must_use]
    pub fn to_map(&self) -> HashMap<Key, f64> {
        self.values.clone()
    }

    /// Negate every value in place. Used for `"unary -"` in score
    /// evaluation (spec.md §4.D).
    pub fn negate(&mut self) {
        for v in self.values.values_mut() {
            *v = -*v;
        }
    }

    /// Apply a binary [`SetOp`] to two operands, producing a new
    /// `ElementSet` per the rules of spec.md §4.A.
    #[must_use]
    pub fn apply(op: SetOp, lhs: &Self, rhs: &Self) -> Self {
        match op {
            SetOp::Union => Self::union(lhs, rhs),
            SetOp::Intersection => Self::intersection(lhs, rhs),
            SetOp::Difference => Self::difference(lhs, rhs),
            SetOp::WeightedAnd => Self::smaller_mass(lhs, rhs).clone(),
            SetOp::WeightedOr => Self::union(lhs, rhs),
            SetOp::XorByMass => Self::larger_mass(lhs, rhs).clone(),
            SetOp::GatedDifference => {
                if rhs.sum() > 0.0 {
                    Self::new()
                } else {
                    lhs.clone()
                }
            }
        }
    }

    /// Union: every key from both operands. Where a key is present on
    /// both sides the resulting value is the key-wise *sum* — the Open
    /// Question in spec.md §9 is resolved this way to match histogram
    /// `+`, rather than the left-wins policy the Python source happened
    /// to exhibit on some call paths.
    fn union(lhs: &Self, rhs: &Self) -> Self {
        let mut out = lhs.clone();
        for (key, value) in &rhs.values {
            out.values
                .entry(key.clone())
                .and_modify(|v| *v += value)
                .or_insert(*value);
        }
        out
    }

    /// Intersection: keys present in both, value = min of the two.
    fn intersection(lhs: &Self, rhs: &Self) -> Self {
        let (small, large) = if lhs.len() <= rhs.len() {
            (lhs, rhs)
        } else {
            (rhs, lhs)
        };
        let mut out = Self::new();
        for (key, value) in &small.values {
            if let Some(other) = large.values.get(key) {
                out.add(key.clone(), value.min(*other));
            }
        }
        out
    }

    /// Difference: elements in `lhs` whose key is absent from `rhs`.
    fn difference(lhs: &Self, rhs: &Self) -> Self {
        let mut out = Self::new();
        for (key, value) in &lhs.values {
            if !rhs.values.contains_key(key) {
                out.add(key.clone(), *value);
            }
        }
        out
    }

    fn smaller_mass<'a>(lhs: &'a Self, rhs: &'a Self) -> &'a Self {
        if lhs.sum() <= rhs.sum() {
            lhs
        } else {
            rhs
        }
    }

    fn larger_mass<'a>(lhs: &'a Self, rhs: &'a Self) -> &'a Self {
        if lhs.sum() > rhs.sum() {
            lhs
        } else {
            rhs
        }
    }
}

impl FromIterator<(Key, f64)> for ElementSet {
    fn from_iter<T: IntoIterator<Item = (Key, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

// `Key` is a `Vec`, which serde_json cannot use as a map key, so an
// `ElementSet` (de)serializes as a flat sequence of `(key, value)` pairs
// rather than as its backing map directly.
#[cfg(feature = "serde")]
impl serde::Serialize for ElementSet {
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        serializer.collect_seq(self.values.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ElementSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = Vec::<(Key, f64)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

/// The closed set of binary set/histogram operators from spec.md §4.A.
/// Resolved once at parse time so the evaluator never does a
/// string-keyed operator lookup (REDESIGN FLAGS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOp {
    /// `+` union, key-wise sum on collision.
    Union,
    /// `*` intersection, value = min of the two.
    Intersection,
    /// `/` difference, values unchanged.
    Difference,
    /// `&` weighted-and: keep the operand with the *smaller* mass.
    WeightedAnd,
    /// `|` weighted-or: identical to union.
    WeightedOr,
    /// `#|` xor-by-mass: keep the operand with the *larger* mass.
    XorByMass,
    /// `#/` gated-difference: empty if rhs has any mass, else lhs verbatim.
    GatedDifference,
}

impl SetOp {
    /// Parse an operator sign. `None` for unknown signs.
    #[must_use]
    pub fn from_sign(sign: &str) -> Option<Self> {
        match sign {
            "+" => Some(Self::Union),
            "*" => Some(Self::Intersection),
            "/" => Some(Self::Difference),
            "&" => Some(Self::WeightedAnd),
            "|" => Some(Self::WeightedOr),
            "#|" => Some(Self::XorByMass),
            "#/" => Some(Self::GatedDifference),
            _ => None,
        }
    }

    #[must_use]
    pub fn sign(self) -> &'static str {
        match self {
            Self::Union => "+",
            Self::Intersection => "*",
            Self::Difference => "/",
            Self::WeightedAnd => "&",
            Self::WeightedOr => "|",
            Self::XorByMass => "#|",
            Self::GatedDifference => "#/",
        }
    }
}
