//! Ad-hoc corpus querying from the command line (`cli` feature).
//!
//! Loads a corpus and group dictionary from a JSON file and prints a
//! ranked result table for a query string or probe histogram. This is
//! the crate's own convenience entry point, not a reimplementation of
//! the out-of-scope synthetic image generator/feature extractors —
//! those remain external collaborators whose output (a histogram per
//! document) is exactly the shape this binary expects as input.

use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::PathBuf;

use clap::Parser as ClapParser;
use color_eyre::eyre::{eyre, Result};
use rustc_hash::FxBuildHasher;
use serde::Deserialize;

use histoquery::{
    DocId, GroupDictionary, Histogram, Query, RetrievalEngine, RetrievalMode, RetrievalOutcome,
};

#[derive(ClapParser, Debug, Clone)]
struct Args {
    /// Path to a JSON file holding `{"corpus": [...], "groups": {...}}`.
    corpus: PathBuf,

    /// Expression to evaluate, e.g. `"green + red"`. Omit to probe with
    /// `--probe` instead.
    #[clap(long)]
    query: Option<String>,

    /// Path to a JSON histogram `[["key0"], value0]` pairs to use as a
    /// probe instead of `--query`.
    #[clap(long, conflicts_with = "query")]
    probe: Option<PathBuf>,

    #[clap(long, default_value_t = 10)]
    top_n: usize,

    #[clap(long, default_value_t = 0.001)]
    threshold: f64,

    #[clap(long, value_enum, default_value = "classic")]
    mode: Mode,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum Mode {
    Default,
    Classic,
    Parallel,
}

impl From<Mode> for RetrievalMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Default => Self::Default,
            Mode::Classic => Self::Classic,
            Mode::Parallel => Self::Parallel,
        }
    }
}

#[derive(Deserialize)]
struct CorpusFile {
    corpus: Vec<CorpusDoc>,
    /// One map per dimension; a single entry means a 1-D corpus.
    groups: Vec<HashMap<String, Vec<String>>>,
}

#[derive(Deserialize)]
struct CorpusDoc {
    doc_id: DocId,
    /// `(key, value)` pairs; `key` is an ordered tuple of tokens, one
    /// per dimension.
    elements: Vec<(Vec<String>, f64)>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();
    let args = Args::parse();

    let data = read_to_string(&args.corpus)?;
    let file: CorpusFile = serde_json::from_str(&data)?;

    let dict = build_dict(file.groups)?;
    let corpus = file
        .corpus
        .into_iter()
        .map(|doc| {
            let mut hist = Histogram::<FxBuildHasher>::new();
            for (key, value) in doc.elements {
                hist.add(key.into_iter().map(Into::into).collect(), value);
            }
            (doc.doc_id, hist)
        })
        .collect();

    let engine = RetrievalEngine::build(corpus, args.mode.into(), dict)?;

    let query = match (&args.query, &args.probe) {
        (Some(text), None) => Query::expression(text.clone()),
        (None, Some(path)) => {
            let probe_data = read_to_string(path)?;
            let pairs: Vec<(Vec<String>, f64)> = serde_json::from_str(&probe_data)?;
            let mut probe = Histogram::<FxBuildHasher>::new();
            for (key, value) in pairs {
                probe.add(key.into_iter().map(Into::into).collect(), value);
            }
            Query::probe(probe)
        }
        _ => return Err(eyre!("exactly one of --query or --probe must be given")),
    };

    let outcome = engine.retrieve(&query, Some(args.top_n), None, args.threshold)?;
    match outcome {
        RetrievalOutcome::Ranked { top, .. } => {
            for doc in top {
                println!("{}\t{:.6}", doc.doc_id, doc.score);
            }
        }
        RetrievalOutcome::Cancelled => unreachable!("no cancellation token is ever set by this binary"),
    }

    Ok(())
}

fn build_dict(dims: Vec<HashMap<String, Vec<String>>>) -> Result<GroupDictionary> {
    let as_sets = |dim: HashMap<String, Vec<String>>| {
        dim.into_iter()
            .map(|(name, members)| (name.into(), members.into_iter().map(Into::into).collect()))
            .collect()
    };
    match dims.len() {
        0 => Err(eyre!("corpus file must declare at least one dimension's groups")),
        1 => Ok(GroupDictionary::single_dim(as_sets(
            dims.into_iter().next().unwrap(),
        ))?),
        _ => Ok(GroupDictionary::multi_dim(
            dims.into_iter().map(as_sets).collect(),
        )?),
    }
}
