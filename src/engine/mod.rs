//! The retrieval engine: corpus lifecycle, three interchangeable query
//! strategies, and the one `retrieve` contract they share (component F).

pub mod full_scan;
pub mod inverted_index;
pub mod parallel;

use std::hash::BuildHasher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxBuildHasher;

use crate::error::EngineError;
use crate::groups::GroupDictionary;
use crate::histogram::Histogram;
use crate::index::DocId;
use crate::query::Query;

/// A single scored document, as produced by any strategy before the
/// shared threshold/sort/top-N pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

/// The result of a [`RetrievalEngine::retrieve`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    Ranked {
        top: Vec<ScoredDoc>,
        tail: Option<Vec<ScoredDoc>>,
    },
    Cancelled,
}

/// A cheap, clonable cancellation flag checked between candidates
/// (never mid-expression) by [`RetrievalEngine::retrieve_cancelable`]
/// (spec.md §5). The same atomic-flag family the crate's bucket-id
/// counter uses elsewhere for cross-thread coordination.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Which of the three strategies (or the unimplemented native backend)
/// an engine is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    /// S1 full scan.
    Default,
    /// S2 inverted index — the principal strategy.
    Classic,
    /// S3 inverted index with candidate scoring fanned out over `rayon`.
    Parallel,
    /// Native/FFI backend. Always fails to construct in this build
    /// (DESIGN.md): the pyo3/`ctypes` plumbing it would wrap is out of
    /// scope for a pure-language rewrite.
    Dll,
}

impl Default for RetrievalMode {
    fn default() -> Self {
        Self::Classic
    }
}

/// A constructed, queryable engine over one corpus. Immutable once
/// built (spec.md §5) — indexing, where a strategy needs it, happens
/// entirely inside `build`.
#[derive(Debug, Clone)]
pub enum RetrievalEngine<S = FxBuildHasher> {
    FullScan(full_scan::FullScanEngine<S>),
    InvertedIndex(inverted_index::InvertedIndexEngine<S>),
    Parallel(parallel::ParallelEngine<S>),
}

impl<S> RetrievalEngine<S>
where
    S: BuildHasher + Default + Clone + Send + Sync,
{
    /// Build an engine over `corpus` using `mode`, resolving high-level
    /// elements against `dict`.
    ///
    /// # Errors
    /// Returns [`EngineError::NativeBackendUnavailable`] for
    /// [`RetrievalMode::Dll`]; every other mode always succeeds (§7 —
    /// resource acquisition failure for the native backend is the one
    /// fatal construction-time error this crate can produce, and it
    /// never allocates a handle in that case).
    pub fn build(
        corpus: Vec<(DocId, Histogram<S>)>,
        mode: RetrievalMode,
        dict: GroupDictionary,
    ) -> Result<Self, EngineError> {
        match mode {
            RetrievalMode::Default => Ok(Self::FullScan(full_scan::FullScanEngine::new(corpus, dict))),
            RetrievalMode::Classic => Ok(Self::InvertedIndex(
                inverted_index::InvertedIndexEngine::new(corpus, dict),
            )),
            RetrievalMode::Parallel => Ok(Self::Parallel(parallel::ParallelEngine::new(corpus, dict))),
            RetrievalMode::Dll => Err(EngineError::NativeBackendUnavailable),
        }
    }

    /// Highest-scoring documents whose score strictly exceeds
    /// `threshold`, descending, ties broken by corpus insertion order;
    /// `last_n`, if given, additionally returns the bottom tail of the
    /// same filtered-and-sorted ranking (spec.md §4.E).
    pub fn retrieve(
        &self,
        query: &Query<S>,
        top_n: Option<usize>,
        last_n: Option<usize>,
        threshold: f64,
    ) -> Result<RetrievalOutcome, EngineError> {
        self.retrieve_cancelable(query, top_n, last_n, threshold, &CancellationToken::new())
    }

    /// As [`RetrievalEngine::retrieve`], but checks `cancel` between
    /// candidates and returns [`RetrievalOutcome::Cancelled`] as soon as
    /// it is observed set.
    pub fn retrieve_cancelable(
        &self,
        query: &Query<S>,
        top_n: Option<usize>,
        last_n: Option<usize>,
        threshold: f64,
        cancel: &CancellationToken,
    ) -> Result<RetrievalOutcome, EngineError> {
        let scored = match self {
            Self::FullScan(engine) => engine.score(query, cancel)?,
            Self::InvertedIndex(engine) => engine.score(query, cancel)?,
            Self::Parallel(engine) => engine.score(query, cancel)?,
        };
        Ok(match scored {
            None => RetrievalOutcome::Cancelled,
            Some(scored) => finish(scored, top_n, last_n, threshold),
        })
    }
}

/// Shared post-processing: threshold filter, descending stable sort,
/// top-N head and optional last-N tail (spec.md §4.E).
fn finish(
    mut scored: Vec<ScoredDoc>,
    top_n: Option<usize>,
    last_n: Option<usize>,
    threshold: f64,
) -> RetrievalOutcome {
    scored.retain(|doc| doc.score > threshold);
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let top = match top_n {
        Some(n) => scored.iter().copied().take(n).collect(),
        None => scored.clone(),
    };
    let tail = last_n.map(|n| {
        let start = scored.len().saturating_sub(n);
        scored[start..].to_vec()
    });
    RetrievalOutcome::Ranked { top, tail }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: DocId, score: f64) -> ScoredDoc {
        ScoredDoc { doc_id: id, score }
    }

    #[test]
    fn finish_filters_sorts_and_truncates() {
        let scored = vec![doc(1, 0.2), doc(2, 0.9), doc(3, 0.0), doc(4, 0.5)];
        let outcome = finish(scored, Some(2), None, 0.001);
        match outcome {
            RetrievalOutcome::Ranked { top, tail } => {
                assert_eq!(top, vec![doc(2, 0.9), doc(4, 0.5)]);
                assert_eq!(tail, None);
            }
            RetrievalOutcome::Cancelled => panic!("unexpected cancellation"),
        }
    }

    #[test]
    fn finish_ties_keep_insertion_order() {
        let scored = vec![doc(1, 0.5), doc(2, 0.5), doc(3, 0.5)];
        let outcome = finish(scored, None, None, 0.0);
        match outcome {
            RetrievalOutcome::Ranked { top, .. } => {
                assert_eq!(top, vec![doc(1, 0.5), doc(2, 0.5), doc(3, 0.5)]);
            }
            RetrievalOutcome::Cancelled => panic!("unexpected cancellation"),
        }
    }

    #[test]
    fn finish_last_n_is_the_tail_of_the_same_ranking() {
        let scored = vec![doc(1, 0.9), doc(2, 0.5), doc(3, 0.1)];
        let outcome = finish(scored, None, Some(2), 0.0);
        match outcome {
            RetrievalOutcome::Ranked { tail, .. } => {
                assert_eq!(tail, Some(vec![doc(2, 0.5), doc(3, 0.1)]));
            }
            RetrievalOutcome::Cancelled => panic!("unexpected cancellation"),
        }
    }
}
