//! The sparse, keyed value store at the heart of the corpus (component B).
//!
//! A [`Histogram`] maps element [`Key`]s to non-negative weights. It
//! supports value-accumulating inserts, normalisation against either its
//! own running total or an externally supplied reference size, and the
//! two histogram-level operators (`+`, `*`) that combine a pair of
//! histograms into a new one.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use compact_str::CompactString;
use rustc_hash::FxBuildHasher;

use crate::element::{ElementSet, Key};
use crate::groups::{GroupDictionary, Leaf, ANY};

/// A histogram with the default (fast, non-DoS-resistant) hasher,
/// matching the teacher's `rustc_hash::FxHasher` use for n-gram keys.
/// Construct with [`Histogram::with_hasher`] to plug in a different one,
/// e.g. `RandomState` when keys come from an untrusted source.
#[derive(Debug, Clone)]
pub struct Histogram<S = FxBuildHasher> {
    map: HashMap<Key, f64, S>,
    size: f64,
    normalized: bool,
}

impl Histogram<FxBuildHasher> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(FxBuildHasher::default())
    }
}

impl Default for Histogram<FxBuildHasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram<RandomState> {
    /// A histogram using the standard library's DoS-resistant hasher.
    #[must_use]
    pub fn with_random_state() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<S: BuildHasher> Histogram<S> {
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            map: HashMap::with_hasher(hasher),
            size: 0.0,
            normalized: false,
        }
    }

    #[must_use]
    pub fn num_categories(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    #[must_use]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Add one occurrence of `(key, value)`, accumulating onto any prior
    /// value for `key` and bumping `size` by `value` (spec.md §4.B).
    pub fn add(&mut self, key: Key, value: f64) {
        *self.map.entry(key).or_insert(0.0) += value;
        self.size += value;
        self.normalized = false;
    }

    /// Merge `other`'s entries into `self`, value-accumulating.
    pub fn append(&mut self, other: Self) {
        for (key, value) in other.map {
            self.add(key, value);
        }
    }

    /// Divide every value by `size` (or the histogram's own stored
    /// `size` if `None`). Idempotent: once normalized, a repeated call
    /// with no explicit `size` is a no-op — without this guard, a
    /// second `normalize(None)` would divide by the same stored `size`
    /// again, since that field does not change from a `None` call.
    /// Passing an explicit `size` always re-normalizes against that
    /// reference, even if already normalized (spec.md §4.B).
    pub fn normalize(&mut self, size: Option<f64>) {
        if size.is_none() && self.normalized {
            return;
        }
        let divisor = size.unwrap_or(self.size);
        if let Some(s) = size {
            self.size = s;
        }
        if divisor == 0.0 {
            return;
        }
        for value in self.map.values_mut() {
            *value /= divisor;
        }
        self.normalized = true;
    }

    #[must_use]
    pub fn get(&self, key: &Key) -> Option<f64> {
        self.map.get(key).copied()
    }

    #[must_use]
    pub fn contains_key(&self, key: &Key) -> bool {
        self.map.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.map.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, f64)> {
        self.map.iter().map(|(k, v)| (k, *v))
    }

    #[must_use]
    pub fn to_element_set(&self) -> ElementSet {
        self.map.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// Resolve a parsed leaf atom against this histogram, expanding
    /// through `dict` when the atom names a high-level group rather
    /// than a literal key (spec.md §4.B).
    #[must_use]
    pub fn call(&self, leaf: &Leaf, dict: &GroupDictionary) -> ElementSet {
        match leaf {
            Leaf::Name(name) => self.call_single(name, dict),
            Leaf::Tuple(names) => self.call_tuple(names, dict),
        }
    }

    fn call_single(&self, name: &str, dict: &GroupDictionary) -> ElementSet {
        let direct: Key = vec![CompactString::from(name)];
        if let Some(value) = self.get(&direct) {
            return ElementSet::singleton(direct, value);
        }
        if name == ANY {
            let members = dict.resolve_single(ANY);
            return self.filter_keys(|k| k.len() == 1 && members.contains(&k[0]));
        }
        if dict.contains_group(0, name) {
            let members = dict.resolve_single(name);
            return self.filter_keys(|k| k.len() == 1 && members.contains(&k[0]));
        }
        log::debug!("leaf {name:?} is neither a known group nor a literal key; resolving empty");
        ElementSet::new()
    }

    fn call_tuple(&self, names: &[CompactString], dict: &GroupDictionary) -> ElementSet {
        if names.len() != dict.dimensions() {
            log::debug!(
                "tuple atom has {} slot(s) but the dictionary has {} dimension(s); treating as no match",
                names.len(),
                dict.dimensions()
            );
            return ElementSet::new();
        }

        let per_dim: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(dim, name)| dict.resolve_dim(dim, name))
            .collect();

        self.filter_keys(|key| {
            key.len() == per_dim.len() && key.iter().zip(&per_dim).all(|(k, set)| set.contains(k))
        })
    }

    fn filter_keys(&self, mut pred: impl FnMut(&Key) -> bool) -> ElementSet {
        self.map
            .iter()
            .filter(|(k, _)| pred(k))
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

// As with `ElementSet`, a `Key` cannot be a JSON map key, so a
// `Histogram` (de)serializes as its entries plus `size`/`normalized`
// rather than as the backing map directly.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct HistogramData {
    entries: Vec<(Key, f64)>,
    size: f64,
    normalized: bool,
}

#[cfg(feature = "serde")]
impl<S: BuildHasher + Default> serde::Serialize for Histogram<S> {
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        use serde::Serialize;
        HistogramData {
            entries: self.map.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            size: self.size,
            normalized: self.normalized,
        }
        .serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, S: BuildHasher + Default> serde::Deserialize<'de> for Histogram<S> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::Deserialize;
        let data = HistogramData::deserialize(deserializer)?;
        let mut map = HashMap::with_hasher(S::default());
        for (key, value) in data.entries {
            map.insert(key, value);
        }
        Ok(Self {
            map,
            size: data.size,
            normalized: data.normalized,
        })
    }
}

impl<K, S> FromIterator<K> for Histogram<S>
where
    K: Into<CompactString>,
    S: BuildHasher + Default,
{
    /// Build a 1-D histogram from an iterator of tokens, each occurrence
    /// adding `1.0`.
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut hist = Self::with_hasher(S::default());
        for item in iter {
            hist.add(vec![item.into()], 1.0);
        }
        hist
    }
}

/// Key-wise sum. The smaller operand is iterated first for cache
/// efficiency (spec.md §4.A).
#[must_use]
pub fn union<S: BuildHasher + Default>(lhs: &Histogram<S>, rhs: &Histogram<S>) -> Histogram<S> {
    let (small, large) = if lhs.num_categories() <= rhs.num_categories() {
        (lhs, rhs)
    } else {
        (rhs, lhs)
    };
    let mut out = Histogram::with_hasher(S::default());
    for (key, value) in large.iter() {
        out.add(key.clone(), value);
    }
    for (key, value) in small.iter() {
        out.add(key.clone(), value);
    }
    out
}

/// Key-wise min over the intersection of key sets. The smaller operand
/// is iterated first (spec.md §4.A).
#[must_use]
pub fn intersection<S: BuildHasher + Default>(
    lhs: &Histogram<S>,
    rhs: &Histogram<S>,
) -> Histogram<S> {
    let (small, large) = if lhs.num_categories() <= rhs.num_categories() {
        (lhs, rhs)
    } else {
        (rhs, lhs)
    };
    let mut out = Histogram::with_hasher(S::default());
    for (key, value) in small.iter() {
        if let Some(other) = large.get(key) {
            out.add(key.clone(), value.min(other));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(s: &str) -> Key {
        vec![CompactString::from(s)]
    }

    #[test]
    fn add_accumulates() {
        let mut h = Histogram::new();
        h.add(k("a"), 1.0);
        h.add(k("a"), 2.0);
        assert_eq!(h.get(&k("a")), Some(3.0));
        assert_eq!(h.size(), 3.0);
    }

    #[test]
    fn normalize_sums_to_one() {
        let mut h = Histogram::new();
        h.add(k("a"), 1.0);
        h.add(k("b"), 3.0);
        h.normalize(None);
        let total: f64 = h.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_against_external_size() {
        let mut h = Histogram::new();
        h.add(k("a"), 5.0);
        h.normalize(Some(10.0));
        assert_eq!(h.get(&k("a")), Some(0.5));
    }

    #[test]
    fn normalize_twice_is_idempotent() {
        let mut h = Histogram::new();
        h.add(k("a"), 1.0);
        h.add(k("b"), 3.0);
        h.normalize(None);
        let after_first: Vec<(Key, f64)> = h.iter().map(|(key, v)| (key.clone(), v)).collect();
        h.normalize(None);
        let after_second: Vec<(Key, f64)> = h.iter().map(|(key, v)| (key.clone(), v)).collect();
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn union_sums_and_intersection_takes_min() {
        let mut a = Histogram::new();
        a.add(k("x"), 1.0);
        a.add(k("y"), 2.0);
        let mut b = Histogram::new();
        b.add(k("y"), 5.0);
        b.add(k("z"), 9.0);

        let u = union(&a, &b);
        assert_eq!(u.get(&k("x")), Some(1.0));
        assert_eq!(u.get(&k("y")), Some(7.0));
        assert_eq!(u.get(&k("z")), Some(9.0));

        let i = intersection(&a, &b);
        assert_eq!(i.num_categories(), 1);
        assert_eq!(i.get(&k("y")), Some(2.0));
    }

    #[test]
    fn intersection_idempotent_after_normalize() {
        let mut h = Histogram::new();
        h.add(k("a"), 1.0);
        h.add(k("b"), 3.0);
        h.normalize(None);
        let i = intersection(&h, &h);
        for (key, value) in h.iter() {
            assert_eq!(i.get(key), Some(value));
        }
    }

    #[test]
    fn call_direct_hit() {
        let mut h = Histogram::new();
        h.add(k("e17"), 0.5);
        let dict = GroupDictionary::single_dim(HashMap::new()).unwrap();
        let result = h.call(&Leaf::Name("e17".into()), &dict);
        assert_eq!(result.sum(), 0.5);
    }

    #[test]
    fn call_expands_group() {
        use std::collections::HashSet;
        let mut h = Histogram::new();
        h.add(k("e1"), 0.6);
        h.add(k("e31"), 0.4);

        let mut groups = HashMap::new();
        groups.insert(
            CompactString::from("green"),
            HashSet::from([CompactString::from("e1"), CompactString::from("e2")]),
        );
        let dict = GroupDictionary::single_dim(groups).unwrap();

        let result = h.call(&Leaf::Name("green".into()), &dict);
        assert_eq!(result.sum(), 0.6);
    }

    #[test]
    fn call_unknown_group_is_empty() {
        let h = Histogram::<FxBuildHasher>::new();
        let dict = GroupDictionary::single_dim(HashMap::new()).unwrap();
        let result = h.call(&Leaf::Name("unknown".into()), &dict);
        assert!(result.is_empty());
    }
}
