//! The group dictionary: named high-level elements over the low-level
//! key universe (component C).

use std::collections::{HashMap, HashSet};

use compact_str::CompactString;
use thiserror::Error;

/// The reserved group name denoting "every group in this dimension".
/// Never materialised into a dictionary's maps; expanded lazily at
/// lookup time (spec.md §3).
pub const ANY: &str = "any";

/// A single-dim or multi-dim atom appearing in a parsed expression, or
/// passed directly to [`crate::histogram::Histogram::call`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Leaf {
    /// A bare group name, `"any"`, or a raw low-level key.
    Name(CompactString),
    /// A parenthesised `(n0, n1, ...)` tuple atom from a multi-dim query.
    Tuple(Vec<CompactString>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupDictionaryError {
    #[error("group name {0:?} is reserved and cannot be defined by caller data")]
    ReservedName(String),
}

/// Mapping from group name to the per-dimension tokens it covers. Every
/// group — single-dim or one slot of a multi-dim tuple — resolves to a
/// set of bare tokens in that dimension's universe, never to full
/// multi-dim keys; the cartesian expander (component G) is what
/// assembles full keys out of per-dimension token sets.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupDictionary {
    SingleDim(HashMap<CompactString, HashSet<CompactString>>),
    MultiDim(Vec<HashMap<CompactString, HashSet<CompactString>>>),
}

impl GroupDictionary {
    pub fn single_dim(
        groups: HashMap<CompactString, HashSet<CompactString>>,
    ) -> Result<Self, GroupDictionaryError> {
        Self::reject_reserved(groups.keys())?;
        Ok(Self::SingleDim(groups))
    }

    pub fn multi_dim(
        dims: Vec<HashMap<CompactString, HashSet<CompactString>>>,
    ) -> Result<Self, GroupDictionaryError> {
        for dim in &dims {
            Self::reject_reserved(dim.keys())?;
        }
        Ok(Self::MultiDim(dims))
    }

    fn reject_reserved<'a>(
        names: impl Iterator<Item = &'a CompactString>,
    ) -> Result<(), GroupDictionaryError> {
        for name in names {
            if name == ANY {
                return Err(GroupDictionaryError::ReservedName(name.to_string()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        match self {
            Self::SingleDim(_) => 1,
            Self::MultiDim(dims) => dims.len(),
        }
    }

    /// Resolve a single-dim group name to its member tokens. `"any"`
    /// returns the union of every group in dimension 0, built on the fly.
    #[must_use]
    pub fn resolve_single(&self, name: &str) -> HashSet<CompactString> {
        self.resolve_dim(0, name)
    }

    /// Resolve a group name within dimension `dim` to its member tokens.
    #[must_use]
    pub fn resolve_dim(&self, dim: usize, name: &str) -> HashSet<CompactString> {
        let groups = match self {
            Self::SingleDim(groups) => groups,
            Self::MultiDim(dims) => &dims[dim],
        };
        if name == ANY {
            let mut out = HashSet::new();
            for members in groups.values() {
                out.extend(members.iter().cloned());
            }
            out
        } else {
            groups.get(name).cloned().unwrap_or_default()
        }
    }

    #[must_use]
    pub fn contains_group(&self, dim: usize, name: &str) -> bool {
        if name == ANY {
            return true;
        }
        match self {
            Self::SingleDim(groups) => groups.contains_key(name),
            Self::MultiDim(dims) => dims.get(dim).is_some_and(|g| g.contains_key(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hs(items: &[&str]) -> HashSet<CompactString> {
        items.iter().map(|s| CompactString::from(*s)).collect()
    }

    #[test]
    fn any_unions_every_group() {
        let mut groups = HashMap::new();
        groups.insert(CompactString::from("green"), hs(&["e1", "e2"]));
        groups.insert(CompactString::from("red"), hs(&["e31", "e32"]));
        let dict = GroupDictionary::single_dim(groups).unwrap();

        let mut any = dict.resolve_single(ANY).into_iter().collect::<Vec<_>>();
        any.sort();
        let mut expected = hs(&["e1", "e2", "e31", "e32"])
            .into_iter()
            .collect::<Vec<_>>();
        expected.sort();
        assert_eq!(any, expected);
    }

    #[test]
    fn rejects_reserved_name() {
        let mut groups = HashMap::new();
        groups.insert(CompactString::from("any"), hs(&["e1"]));
        assert_eq!(
            GroupDictionary::single_dim(groups),
            Err(GroupDictionaryError::ReservedName("any".into()))
        );
    }

    #[test]
    fn unknown_group_resolves_empty() {
        let dict = GroupDictionary::single_dim(HashMap::new()).unwrap();
        assert!(dict.resolve_single("nonexistent").is_empty());
    }
}
