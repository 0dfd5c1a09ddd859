//! S2: inverted-index candidate shortlist, then scoring on the
//! shortlist only. The principal strategy the system is designed
//! around (spec.md §4.E).

use std::hash::BuildHasher;

use crate::engine::{CancellationToken, ScoredDoc};
use crate::error::EngineError;
use crate::eval::Evaluator;
use crate::groups::GroupDictionary;
use crate::histogram::{self, Histogram};
use crate::index::{DocId, InvertedIndex};
use crate::parser::Parser;
use crate::query::Query;

#[derive(Debug, Clone)]
pub struct InvertedIndexEngine<S> {
    index: InvertedIndex<S>,
    dict: GroupDictionary,
}

impl<S: BuildHasher + Default + Clone> InvertedIndexEngine<S> {
    #[must_use]
    pub fn new(corpus: Vec<(DocId, Histogram<S>)>, dict: GroupDictionary) -> Self {
        Self {
            index: InvertedIndex::build(corpus),
            dict,
        }
    }

    #[must_use]
    pub fn index(&self) -> &InvertedIndex<S> {
        &self.index
    }

    pub(super) fn score(
        &self,
        query: &Query<S>,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<ScoredDoc>>, EngineError> {
        match query {
            Query::Expression(text) => {
                let postfix = Parser::new().parse(text)?;
                let evaluator = Evaluator::new(&self.dict);
                let (doc_ids, _) = evaluator.eval_expression(&postfix, &self.index)?;
                let ordered = self.index.in_insertion_order(&doc_ids);

                let mut out = Vec::with_capacity(ordered.len());
                for doc_id in ordered {
                    if cancel.is_cancelled() {
                        return Ok(None);
                    }
                    let hist = self
                        .index
                        .histogram(doc_id)
                        .expect("candidate doc ids come from this index's own postings");
                    let score = evaluator.eval(&postfix, hist)?.sum();
                    out.push(ScoredDoc { doc_id, score });
                }
                Ok(Some(out))
            }
            Query::Probe(probe) => {
                let candidates = self.index.candidates_for_probe(probe);
                let ordered = self.index.in_insertion_order(&candidates);

                let mut out = Vec::with_capacity(ordered.len());
                for doc_id in ordered {
                    if cancel.is_cancelled() {
                        return Ok(None);
                    }
                    let hist = self
                        .index
                        .histogram(doc_id)
                        .expect("candidate doc ids come from this index's own postings");
                    let score = histogram::intersection(probe, hist).iter().map(|(_, v)| v).sum();
                    out.push(ScoredDoc { doc_id, score });
                }
                Ok(Some(out))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Key;
    use compact_str::CompactString;
    use rustc_hash::FxBuildHasher;
    use std::collections::HashMap;

    fn k(s: &str) -> Key {
        vec![CompactString::from(s)]
    }

    fn dict_with(groups: &[(&str, &[&str])]) -> GroupDictionary {
        let mut map = HashMap::new();
        for (name, members) in groups {
            map.insert(
                CompactString::from(*name),
                members.iter().map(|m| CompactString::from(*m)).collect(),
            );
        }
        GroupDictionary::single_dim(map).unwrap()
    }

    #[test]
    fn shortlists_then_scores_only_candidates() {
        let mut h1 = Histogram::<FxBuildHasher>::new();
        h1.add(k("e1"), 0.6);
        let mut h2 = Histogram::<FxBuildHasher>::new();
        h2.add(k("e31"), 0.4);

        let dict = dict_with(&[("green", &["e1", "e2"]), ("red", &["e31"])]);
        let engine = InvertedIndexEngine::new(vec![(1, h1), (2, h2)], dict);

        let scored = engine
            .score(&Query::expression("green"), &CancellationToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].doc_id, 1);
    }

    #[test]
    fn agrees_with_full_scan_on_a_union_query() {
        use crate::engine::full_scan::FullScanEngine;

        let mut h1 = Histogram::<FxBuildHasher>::new();
        h1.add(k("e1"), 0.6);
        let mut h2 = Histogram::<FxBuildHasher>::new();
        h2.add(k("e31"), 0.4);
        let dict = dict_with(&[("green", &["e1", "e2"]), ("red", &["e31"])]);

        let full = FullScanEngine::new(vec![(1, h1.clone()), (2, h2.clone())], dict.clone());
        let inverted = InvertedIndexEngine::new(vec![(1, h1), (2, h2)], dict);

        let query = Query::expression("green + red");
        let mut full_scores = full.score(&query, &CancellationToken::new()).unwrap().unwrap();
        let mut inverted_scores = inverted.score(&query, &CancellationToken::new()).unwrap().unwrap();
        full_scores.sort_by_key(|d| d.doc_id);
        inverted_scores.sort_by_key(|d| d.doc_id);
        assert_eq!(full_scores, inverted_scores);
    }
}
