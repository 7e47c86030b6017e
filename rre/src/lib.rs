//! Static detection of catastrophic backtracking (ReDoS) in regular expressions.
//!
//! A pattern's syntax [`Tree`] is compiled into an [`Automaton`] in which every repetition is kept
//! behind a deferred placeholder. The [`Explorer`] walks the automaton, expanding repetitions as
//! it reaches them, and in [`Mode::Redos`] asks [`find_overlap`] whether a repeated body can
//! consume the same input in two different ways. If so, the input that forces a backtracking
//! matcher through every partition is rendered as a proof string.
//!
//! ```
//! let proof = rre::find_redos_str("(a+)+h").unwrap();
//! assert!(proof.is_some());
//!
//! let example = rre::find_match_str("[a-c]x").unwrap();
//! assert_eq!(example.as_deref(), Some("ax"));
//! ```
//!
//! The search is bounded (see [`Limits`]). A `None` from [`find_redos`] means no proof was found,
//! not that the pattern is safe.

use thiserror::Error;

mod analyze;
mod automaton;
mod builder;
mod byteset;
mod explore;
mod overlap;
mod render;

#[cfg(feature = "dot")]
mod dot;

pub use analyze::{Analyzer, Limits};
pub use automaton::{
    Allocator, Automaton, DeferredTable, Pin, Position, Repetition, Target, Transition,
};
pub use builder::Builder;
pub use byteset::ByteRangeSet;
pub use explore::{Explorer, Mode, Outcome, Route};
pub use overlap::{find_overlap, Overlap};
pub use render::{render, representative};
pub use rre_syntax::{parse_pattern, tag, SyntaxError, Tree};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),
    #[error("invalid repetition bounds {{{min},{max}}}")]
    InvalidRepetitionBounds { min: u32, max: u32 },
    /// The automaton or the deferred table is inconsistent. This is a bug, not bad input.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// An example string accepted by the pattern, using the default [`Limits`].
pub fn find_match(tree: &Tree) -> Result<Option<String>, Error> {
    Analyzer::new().find_match(tree)
}

/// A proof string for catastrophic backtracking, using the default [`Limits`].
pub fn find_redos(tree: &Tree) -> Result<Option<String>, Error> {
    Analyzer::new().find_redos(tree)
}

/// Parses `pattern` and calls [`find_match`].
pub fn find_match_str(pattern: impl AsRef<str>) -> Result<Option<String>, Error> {
    Analyzer::new().find_match_str(pattern)
}

/// Parses `pattern` and calls [`find_redos`].
///
/// A trailing `$` is replaced by `h` first, so that a proof has a byte after the vulnerable
/// repetition to fail on.
pub fn find_redos_str(pattern: impl AsRef<str>) -> Result<Option<String>, Error> {
    Analyzer::new().find_redos_str(pattern)
}
