//! Error types shared across the parser, evaluator and retrieval engine
//! (spec.md §7). Ordinary misses — unknown group names, empty
//! intersections, below-threshold scores — are not represented here;
//! they are normal outcomes, not failures.

use thiserror::Error;

use crate::groups::GroupDictionaryError;

/// A failure to parse a query expression. Carries the byte offset of
/// the failing token so callers can point at the bad input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of input at position {position}")]
    UnexpectedEnd { position: usize },
    #[error("unmatched '(' opened at position {position}")]
    UnmatchedOpenParen { position: usize },
    #[error("unmatched ')' at position {position}")]
    UnmatchedCloseParen { position: usize },
    #[error("unknown operator {sign:?} at position {position}")]
    UnknownOperator { sign: String, position: usize },
    #[error("malformed element at position {position}")]
    MalformedElement { position: usize },
}

/// A failure during postfix evaluation. Unlike `ParseError` these can
/// only arise from a dimension mismatch between a tuple atom and the
/// group dictionary it is evaluated against — every other case (unknown
/// group, empty candidate set) resolves to an empty result instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("tuple atom has {atom_dims} slot(s) but the dictionary has {dict_dims} dimension(s)")]
    DimensionMismatch { atom_dims: usize, dict_dims: usize },
    #[error("postfix expression is malformed: operator {op:?} found too few operands")]
    StarvedOperator { op: &'static str },
    #[error(transparent)]
    GroupDictionary(#[from] GroupDictionaryError),
}

/// A failure constructing or querying a [`crate::engine::RetrievalEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("native (dll) retrieval backend is not available in this build")]
    NativeBackendUnavailable,
}
