//! S1: full corpus scan.

use std::hash::BuildHasher;

use crate::engine::{CancellationToken, ScoredDoc};
use crate::error::EngineError;
use crate::eval::Evaluator;
use crate::groups::GroupDictionary;
use crate::histogram::{self, Histogram};
use crate::index::DocId;
use crate::parser::Parser;
use crate::query::Query;

/// Iterates every `(doc_id, histogram)` pair and scores each directly,
/// `O(corpus_len · expression_cost)`. No index to keep consistent; the
/// baseline the other two strategies are checked against for strategy
/// equivalence (spec.md §8 item 5).
#[derive(Debug, Clone)]
pub struct FullScanEngine<S> {
    corpus: Vec<(DocId, Histogram<S>)>,
    dict: GroupDictionary,
}

impl<S> FullScanEngine<S> {
    #[must_use]
    pub fn new(corpus: Vec<(DocId, Histogram<S>)>, dict: GroupDictionary) -> Self {
        Self { corpus, dict }
    }
}

impl<S: BuildHasher + Default> FullScanEngine<S> {
    pub(super) fn score(
        &self,
        query: &Query<S>,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<ScoredDoc>>, EngineError> {
        match query {
            Query::Expression(text) => {
                let postfix = Parser::new().parse(text)?;
                let evaluator = Evaluator::new(&self.dict);
                let mut out = Vec::with_capacity(self.corpus.len());
                for (doc_id, hist) in &self.corpus {
                    if cancel.is_cancelled() {
                        return Ok(None);
                    }
                    let score = evaluator.eval(&postfix, hist)?.sum();
                    out.push(ScoredDoc {
                        doc_id: *doc_id,
                        score,
                    });
                }
                Ok(Some(out))
            }
            Query::Probe(probe) => {
                let mut out = Vec::with_capacity(self.corpus.len());
                for (doc_id, hist) in &self.corpus {
                    if cancel.is_cancelled() {
                        return Ok(None);
                    }
                    let score = histogram::intersection(probe, hist).iter().map(|(_, v)| v).sum();
                    out.push(ScoredDoc {
                        doc_id: *doc_id,
                        score,
                    });
                }
                Ok(Some(out))
            }
        }
    }
}
