#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

//! Content-based retrieval over sparse, weighted element histograms.
//!
//! A corpus is a set of documents, each reduced to a [`Histogram`] of
//! weighted [`element::Key`]s — however a document's features were
//! extracted is outside this crate. Queries are either a textual
//! expression over named groups of keys (parsed by [`parser::Parser`],
//! evaluated by [`eval::Evaluator`]) or a probe histogram to intersect
//! directly against the corpus. [`engine::RetrievalEngine`] ties parsing,
//! evaluation and an inverted index together behind one
//! strategy-independent `retrieve` call.
//!
//! ```rust
//! use histoquery::element::Key;
//! use histoquery::engine::{RetrievalEngine, RetrievalMode, RetrievalOutcome};
//! use histoquery::groups::GroupDictionary;
//! use histoquery::histogram::Histogram;
//! use histoquery::query::Query;
//! use std::collections::{HashMap, HashSet};
//!
//! fn key(s: &str) -> Key {
//!     vec![s.into()]
//! }
//!
//! let mut warm = Histogram::new();
//! warm.add(key("e1"), 0.6);
//! let mut cool = Histogram::new();
//! cool.add(key("e31"), 0.4);
//!
//! let mut groups = HashMap::new();
//! groups.insert("green".into(), HashSet::from(["e1".into(), "e2".into()]));
//! groups.insert("red".into(), HashSet::from(["e31".into()]));
//! let dict = GroupDictionary::single_dim(groups).unwrap();
//!
//! let engine = RetrievalEngine::build(vec![(1, warm), (2, cool)], RetrievalMode::Classic, dict).unwrap();
//! let outcome = engine.retrieve(&Query::expression("green"), None, None, 0.0).unwrap();
//! match outcome {
//!     RetrievalOutcome::Ranked { top, .. } => assert_eq!(top[0].doc_id, 1),
//!     RetrievalOutcome::Cancelled => unreachable!(),
//! }
//! ```

pub mod element;
pub mod engine;
pub mod error;
pub mod eval;
pub mod expand;
pub mod groups;
pub mod histogram;
pub mod index;
pub mod parser;
pub mod query;

pub use element::{Element, ElementSet, Key, SetOp};
pub use engine::{CancellationToken, RetrievalEngine, RetrievalMode, RetrievalOutcome, ScoredDoc};
pub use error::{EngineError, EvalError, ParseError};
pub use eval::Evaluator;
pub use groups::{GroupDictionary, GroupDictionaryError, Leaf};
pub use histogram::Histogram;
pub use index::{DocId, InvertedIndex};
pub use parser::{Parser, PostfixToken};
pub use query::{Query, QueryExpr};
