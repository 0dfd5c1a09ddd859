//! Cartesian expansion of high-level elements across dimensions
//! (component G).
//!
//! A multi-dim tuple atom like `(top, green)` names one group per
//! dimension; each group resolves independently to a set of tokens in
//! that dimension's universe, and the full set of element keys it
//! denotes is the cartesian product of those per-dimension sets.
//! `"any"` in any slot expands to the union of all groups of that
//! dimension before the product is taken (spec.md §4.D).

use std::collections::HashSet;

use compact_str::CompactString;
use itertools::Itertools;

use crate::element::Key;
use crate::error::EvalError;
use crate::groups::GroupDictionary;

/// Expand a single-dim group name (or `"any"`, or a raw key) to the set
/// of 1-tuple keys it denotes.
#[must_use]
pub fn expand_single(dict: &GroupDictionary, name: &str) -> HashSet<Key> {
    dict.resolve_single(name)
        .into_iter()
        .map(|token| vec![token])
        .collect()
}

/// Expand a `(n0, n1, ..)` tuple atom to the cartesian product of
/// per-dimension member tokens, yielding full multi-dim keys.
///
/// # Errors
/// Returns [`EvalError::DimensionMismatch`] if `names.len()` does not
/// match the dictionary's dimensionality.
pub fn expand_tuple(dict: &GroupDictionary, names: &[CompactString]) -> Result<HashSet<Key>, EvalError> {
    if names.len() != dict.dimensions() {
        return Err(EvalError::DimensionMismatch {
            atom_dims: names.len(),
            dict_dims: dict.dimensions(),
        });
    }

    let per_dim: Vec<Vec<CompactString>> = names
        .iter()
        .enumerate()
        .map(|(dim, name)| dict.resolve_dim(dim, name).into_iter().collect())
        .collect();

    if per_dim.iter().any(Vec::is_empty) {
        return Ok(HashSet::new());
    }

    let product = per_dim
        .iter()
        .map(|tokens| tokens.iter())
        .multi_cartesian_product();

    Ok(product
        .map(|combo| combo.into_iter().cloned().collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn dict() -> GroupDictionary {
        let mut dim0 = HashMap::new();
        dim0.insert(
            CompactString::from("top"),
            HashSet::from([CompactString::from("1"), CompactString::from("3")]),
        );
        dim0.insert(
            CompactString::from("center"),
            HashSet::from([CompactString::from("8")]),
        );
        let mut dim1 = HashMap::new();
        dim1.insert(
            CompactString::from("green"),
            HashSet::from([CompactString::from("e1"), CompactString::from("e2")]),
        );
        dim1.insert(
            CompactString::from("red"),
            HashSet::from([CompactString::from("e31")]),
        );
        GroupDictionary::multi_dim(vec![dim0, dim1]).unwrap()
    }

    #[test]
    fn cartesian_expansion_covers_every_combination() {
        let keys = expand_tuple(&dict(), &[CompactString::from("top"), CompactString::from("green")]).unwrap();
        assert_eq!(keys.len(), 4); // {1,3} x {e1,e2}
        assert!(keys.contains(&vec![CompactString::from("3"), CompactString::from("e2")]));
    }

    #[test]
    fn any_expands_to_union_of_dimension() {
        let keys = expand_tuple(&dict(), &[CompactString::from("any"), CompactString::from("red")]).unwrap();
        // dim0 any = {1, 3, 8}
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let err = expand_tuple(&dict(), &[CompactString::from("top")]).unwrap_err();
        assert_eq!(
            err,
            EvalError::DimensionMismatch {
                atom_dims: 1,
                dict_dims: 2
            }
        );
    }
}
