use rre_syntax::{parse_pattern, Tree};

use crate::{render, Allocator, Builder, Error, Explorer, Mode, Outcome};

/// Bounds on the work done per analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// How often the overlapping input is repeated in a proof.
    pub stress_repetitions: usize,
    /// How many tasks the overlap search may process per repetition.
    pub task_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            stress_repetitions: 40,
            task_limit: 2000,
        }
    }
}

/// Runs match and ReDoS searches with a fixed set of [`Limits`].
///
/// ```
/// # use rre::Analyzer;
/// let analyzer = Analyzer::new().with_stress_repetitions(3);
/// let proof = analyzer.find_redos_str("(a|a)*h").unwrap();
/// assert_eq!(proof.as_deref(), Some("aaa!"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    limits: Limits,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_stress_repetitions(mut self, stress_repetitions: usize) -> Self {
        self.limits.stress_repetitions = stress_repetitions;
        self
    }

    pub fn with_task_limit(mut self, task_limit: usize) -> Self {
        self.limits.task_limit = task_limit;
        self
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    fn run(&self, tree: &Tree, mode: Mode) -> Result<Outcome, Error> {
        let mut alloc = Allocator::new();
        let (mut automaton, mut table) = Builder::new(&mut alloc).build(tree)?;
        Explorer::new(&mut alloc, &mut table, mode, self.limits).search(&mut automaton)
    }

    /// An example input accepted by the pattern, if it accepts anything.
    pub fn find_match(&self, tree: &Tree) -> Result<Option<String>, Error> {
        Ok(match self.run(tree, Mode::Match)? {
            Outcome::Routes(routes) => routes.first().map(|route| render(&route.consumed)),
            Outcome::Proven(route) => Some(render(&route.consumed)),
        })
    }

    /// An input that makes a backtracking matcher take exponential time, if one was found.
    pub fn find_redos(&self, tree: &Tree) -> Result<Option<String>, Error> {
        Ok(match self.run(tree, Mode::Redos)? {
            Outcome::Proven(proof) => Some(render(&proof.consumed)),
            Outcome::Routes(_) => None,
        })
    }

    pub fn find_match_str(&self, pattern: impl AsRef<str>) -> Result<Option<String>, Error> {
        self.find_match(&parse_pattern(pattern)?)
    }

    pub fn find_redos_str(&self, pattern: impl AsRef<str>) -> Result<Option<String>, Error> {
        let pattern = anchor_to_byte(pattern.as_ref());
        self.find_redos(&parse_pattern(pattern)?)
    }
}

/// Replaces a trailing, unescaped `$` by `h`.
fn anchor_to_byte(pattern: &str) -> String {
    let Some(rest) = pattern.strip_suffix('$') else {
        return pattern.to_string();
    };

    let backslashes = rest.bytes().rev().take_while(|&b| b == b'\\').count();
    if backslashes % 2 == 0 {
        format!("{rest}h")
    } else {
        pattern.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_anchor() {
        assert_eq!(anchor_to_byte("(a+)+$"), "(a+)+h");
        assert_eq!(anchor_to_byte(r"a\$"), r"a\$");
        assert_eq!(anchor_to_byte(r"a\\$"), r"a\\h");
        assert_eq!(anchor_to_byte("a$b"), "a$b");
        assert_eq!(anchor_to_byte(""), "");
    }

    #[test]
    fn builder_style_configuration() {
        let analyzer = Analyzer::new().with_task_limit(10).with_stress_repetitions(2);
        assert_eq!(
            analyzer.limits(),
            Limits {
                stress_repetitions: 2,
                task_limit: 10
            }
        );
        assert_eq!(Analyzer::new().limits(), Limits::default());
    }

    #[test]
    fn stress_repetitions_shape_the_proof() {
        let proof = Analyzer::new()
            .with_stress_repetitions(5)
            .find_redos_str("(a|a)+h")
            .unwrap()
            .unwrap();
        assert!(proof.ends_with("aaaaa!"));
    }

    #[test]
    fn zero_task_limit_finds_nothing() {
        let analyzer = Analyzer::new().with_task_limit(0);
        assert_eq!(analyzer.find_redos_str("(a|a)*h").unwrap(), None);
    }

    #[test]
    fn unanchored_end_is_still_analyzed() {
        assert!(Analyzer::new().find_redos_str("^(a+)+$").unwrap().is_some());
    }
}
