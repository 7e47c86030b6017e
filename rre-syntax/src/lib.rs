//! Syntax trees for the regular expressions analyzed by `rre`.
//!
//! A pattern is described by a [`Tree`] of tagged nodes following the grammar in [`tag`].
//! Trees can be written by hand or produced from a pattern string with [`parse_pattern`].

use thiserror::Error;

mod parse;
mod tree;

pub use tree::{tag, Literal, Shorthand, Tree};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid pattern at byte {offset}: {reason}")]
pub struct SyntaxError {
    /// Byte offset into the pattern where parsing stopped.
    pub offset: usize,
    pub reason: String,
}

/// parse a pattern string to a syntax tree rooted at an `RE` node
pub fn parse_pattern(pattern: impl AsRef<str>) -> Result<Tree, SyntaxError> {
    parse::parse(pattern.as_ref())
}
