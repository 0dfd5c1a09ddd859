//! The inverted index shared by the S2 and S3 retrieval strategies
//! (the indexing half of component F).
//!
//! Built once from a corpus and never mutated again: every key that
//! appears in any document's histogram gets a posting list of the
//! documents containing it, and the corpus's histograms are kept
//! alongside for the score pass. Because both maps are derived from the
//! same corpus in one pass, the "every key production implies exactly
//! one posting membership" invariant (spec.md §8 item 4) holds by
//! construction — there is no code path that can update one without the
//! other.

use std::collections::{HashMap, HashSet};
use std::hash::BuildHasher;

use rustc_hash::FxBuildHasher;

use crate::element::Key;
use crate::histogram::Histogram;

pub type DocId = u64;

#[derive(Debug, Clone)]
pub struct InvertedIndex<S = FxBuildHasher> {
    postings: HashMap<Key, HashSet<DocId>, S>,
    histograms: HashMap<DocId, Histogram<S>, S>,
    /// Corpus order at construction time, kept so candidate sets — which
    /// come back out of `HashSet`s with no defined order — can still be
    /// ranked with the same insertion-order tie-break S1 gets for free
    /// from iterating the corpus `Vec` directly (spec.md §4.E).
    order: Vec<DocId>,
}

impl<S: BuildHasher + Default + Clone> InvertedIndex<S> {
    /// Build the index from a corpus. Single-threaded; the engine is
    /// immutable once this returns (spec.md §5).
    #[must_use]
    pub fn build(corpus: Vec<(DocId, Histogram<S>)>) -> Self {
        let mut postings: HashMap<Key, HashSet<DocId>, S> = HashMap::with_hasher(S::default());
        let mut histograms: HashMap<DocId, Histogram<S>, S> = HashMap::with_hasher(S::default());
        let mut order = Vec::with_capacity(corpus.len());
        for (doc_id, hist) in corpus {
            for key in hist.keys() {
                postings
                    .entry(key.clone())
                    .or_insert_with(|| HashSet::with_hasher(S::default()))
                    .insert(doc_id);
            }
            histograms.insert(doc_id, hist);
            order.push(doc_id);
        }
        Self {
            postings,
            histograms,
            order,
        }
    }

    /// Filter `ids` down to exactly those present, in original corpus
    /// insertion order.
    #[must_use]
    pub fn in_insertion_order(&self, ids: &HashSet<DocId>) -> Vec<DocId> {
        self.order.iter().copied().filter(|id| ids.contains(id)).collect()
    }

    #[must_use]
    pub fn postings_for(&self, key: &Key) -> Option<&HashSet<DocId>> {
        self.postings.get(key)
    }

    #[must_use]
    pub fn histogram(&self, doc_id: DocId) -> Option<&Histogram<S>> {
        self.histograms.get(&doc_id)
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.histograms.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Union of the posting lists for every key in the probe histogram.
    /// Used by `RetrievalEngine::retrieve` when the query is a raw
    /// probe rather than a textual expression (spec.md §4.E).
    #[must_use]
    pub fn candidates_for_probe(&self, probe: &Histogram<S>) -> HashSet<DocId> {
        probe
            .keys()
            .filter_map(|k| self.postings_for(k))
            .flatten()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact_str::CompactString;

    fn k(s: &str) -> Key {
        vec![CompactString::from(s)]
    }

    #[test]
    fn postings_reflect_every_histogram_key() {
        let mut h1 = Histogram::<FxBuildHasher>::new();
        h1.add(k("a"), 1.0);
        h1.add(k("b"), 2.0);
        let mut h2 = Histogram::<FxBuildHasher>::new();
        h2.add(k("b"), 1.0);

        let index = InvertedIndex::build(vec![(1, h1), (2, h2)]);
        assert_eq!(index.postings_for(&k("a")).unwrap(), &HashSet::from([1]));
        assert_eq!(index.postings_for(&k("b")).unwrap(), &HashSet::from([1, 2]));
        assert!(index.postings_for(&k("missing")).is_none());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn probe_candidates_union_posting_lists() {
        let mut h1 = Histogram::<FxBuildHasher>::new();
        h1.add(k("a"), 1.0);
        let mut h2 = Histogram::<FxBuildHasher>::new();
        h2.add(k("b"), 1.0);
        let index = InvertedIndex::build(vec![(1, h1), (2, h2)]);

        let mut probe = Histogram::<FxBuildHasher>::new();
        probe.add(k("a"), 1.0);
        probe.add(k("b"), 1.0);
        assert_eq!(index.candidates_for_probe(&probe), HashSet::from([1, 2]));
    }

    #[test]
    fn in_insertion_order_matches_corpus_order() {
        let mut h = Histogram::<FxBuildHasher>::new();
        h.add(k("x"), 1.0);
        let index = InvertedIndex::build(vec![
            (3, h.clone()),
            (1, h.clone()),
            (2, h),
        ]);
        let ordered = index.in_insertion_order(&HashSet::from([1, 2, 3]));
        assert_eq!(ordered, vec![3, 1, 2]);
    }
}
