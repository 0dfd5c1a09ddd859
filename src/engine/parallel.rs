//! S3: identical candidate generation to S2, scoring fanned out across
//! a bounded worker pool sized to available cores (spec.md §4.E, §5).

use std::hash::BuildHasher;
use std::sync::Arc;

use rayon::prelude::*;

use crate::engine::{CancellationToken, ScoredDoc};
use crate::error::EngineError;
use crate::eval::Evaluator;
use crate::groups::GroupDictionary;
use crate::histogram::{self, Histogram};
use crate::index::{DocId, InvertedIndex};
use crate::parser::Parser;
use crate::query::Query;

#[derive(Debug, Clone)]
pub struct ParallelEngine<S> {
    index: InvertedIndex<S>,
    dict: GroupDictionary,
    pool: Arc<rayon::ThreadPool>,
}

impl<S: BuildHasher + Default + Clone> ParallelEngine<S> {
    #[must_use]
    pub fn new(corpus: Vec<(DocId, Histogram<S>)>, dict: GroupDictionary) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_cpus::get())
            .build()
            .expect("spawning a handful of worker threads should never fail");
        Self {
            index: InvertedIndex::build(corpus),
            dict,
            pool: Arc::new(pool),
        }
    }

    #[must_use]
    pub fn index(&self) -> &InvertedIndex<S> {
        &self.index
    }
}

impl<S: BuildHasher + Default + Clone + Sync> ParallelEngine<S> {
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
                self.score_ordered(ordered, cancel, |_doc_id, hist| {
                    evaluator.eval(&postfix, hist).map(|set| set.sum())
                })
            }
            Query::Probe(probe) => {
                let candidates = self.index.candidates_for_probe(probe);
                let ordered = self.index.in_insertion_order(&candidates);
                self.score_ordered(ordered, cancel, |_doc_id, hist| {
                    Ok(histogram::intersection(probe, hist).iter().map(|(_, v)| v).sum())
                })
            }
        }
    }

    /// Score `doc_ids` (already in corpus insertion order) concurrently
    /// on this engine's pool, preserving that order in the result.
    /// Every task checks `cancel` at its own start; if any observed it
    /// set, the whole call reports cancellation rather than a partial
    /// ranking — "checked between candidates" generalised to a fan-out
    /// where candidates run concurrently rather than strictly in turn.
    fn score_ordered<F>(
        &self,
        doc_ids: Vec<DocId>,
        cancel: &CancellationToken,
        scorer: F,
    ) -> Result<Option<Vec<ScoredDoc>>, EngineError>
    where
        F: Fn(DocId, &Histogram<S>) -> Result<f64, crate::error::EvalError> + Sync,
    {
        let results: Vec<Result<Option<ScoredDoc>, EngineError>> = self.pool.install(|| {
            doc_ids
                .par_iter()
                .map(|&doc_id| {
                    if cancel.is_cancelled() {
                        return Ok(None);
                    }
                    let hist = self
                        .index
                        .histogram(doc_id)
                        .expect("candidate doc ids come from this index's own postings");
                    let score = scorer(doc_id, hist)?;
                    Ok(Some(ScoredDoc { doc_id, score }))
                })
                .collect()
        });

        let mut out = Vec::with_capacity(results.len());
        for result in results {
            match result? {
                Some(doc) => out.push(doc),
                None => return Ok(None),
            }
        }
        Ok(Some(out))
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
    fn agrees_with_serial_inverted_index_strategy() {
        use crate::engine::inverted_index::InvertedIndexEngine;

        let mut h1 = Histogram::<FxBuildHasher>::new();
        h1.add(k("e1"), 0.6);
        let mut h2 = Histogram::<FxBuildHasher>::new();
        h2.add(k("e31"), 0.4);
        let dict = dict_with(&[("green", &["e1", "e2"]), ("red", &["e31"])]);

        let serial = InvertedIndexEngine::new(vec![(1, h1.clone()), (2, h2.clone())], dict.clone());
        let parallel = ParallelEngine::new(vec![(1, h1), (2, h2)], dict);

        let query = Query::expression("green + red");
        let mut serial_scores = serial.score(&query, &CancellationToken::new()).unwrap().unwrap();
        let mut parallel_scores = parallel.score(&query, &CancellationToken::new()).unwrap().unwrap();
        serial_scores.sort_by_key(|d| d.doc_id);
        parallel_scores.sort_by_key(|d| d.doc_id);
        assert_eq!(serial_scores, parallel_scores);
    }

    #[test]
    fn cancellation_before_scoring_reports_cancelled() {
        let mut h1 = Histogram::<FxBuildHasher>::new();
        h1.add(k("e1"), 0.6);
        let dict = dict_with(&[("green", &["e1"])]);
        let engine = ParallelEngine::new(vec![(1, h1)], dict);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let scored = engine.score(&Query::expression("green"), &cancel).unwrap();
        assert!(scored.is_none());
    }
}
