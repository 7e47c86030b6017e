use rre_syntax::{tag, Literal, Shorthand, Tree};

use crate::{Allocator, Automaton, ByteRangeSet, DeferredTable, Error};

/// A bounded repetition with more optional copies than this is built as a star instead.
const MAX_OPTIONAL_COPIES: u32 = 10;

/// For every tag, the sequences of child tags it may contain.
const PRODUCTIONS: &[(&str, &[&[&str]])] = &[
    (
        tag::RE,
        &[&[tag::UNION], &[tag::SIMPLE_RE], &[tag::SIMPLE_RE, tag::UNION]],
    ),
    (
        tag::SIMPLE_RE,
        &[
            &[tag::CONCATENATION],
            &[tag::BASIC_RE],
            &[tag::BASIC_RE, tag::CONCATENATION],
        ],
    ),
    (
        tag::UNION,
        &[&[tag::RE], &[tag::SIMPLE_RE], &[tag::SIMPLE_RE, tag::UNION]],
    ),
    (
        tag::CONCATENATION,
        &[&[tag::SIMPLE_RE], &[tag::SIMPLE_RE, tag::BASIC_RE]],
    ),
    (
        tag::BASIC_RE,
        &[
            &[tag::STAR],
            &[tag::PLUS],
            &[tag::QUESTION],
            &[tag::NUM_COPY],
            &[tag::ELEMENTARY_RE],
        ],
    ),
    (tag::STAR, &[&[tag::ELEMENTARY_RE]]),
    (tag::PLUS, &[&[tag::ELEMENTARY_RE]]),
    (tag::QUESTION, &[&[tag::ELEMENTARY_RE]]),
    (
        tag::NUM_COPY,
        &[&[tag::ELEMENTARY_RE, tag::NUM_COPY_STRUCT]],
    ),
    (tag::NUM_COPY_STRUCT, &[&[]]),
    (
        tag::ELEMENTARY_RE,
        &[
            &[tag::GROUP],
            &[tag::ANY],
            &[tag::EOS],
            &[tag::SOS],
            &[tag::CHAR],
            &[tag::CHAR_GROUP],
            &[tag::SET],
        ],
    ),
    (tag::GROUP, &[&[tag::RE]]),
    (tag::ANY, &[&[]]),
    (tag::EOS, &[&[]]),
    (tag::SOS, &[&[]]),
    (tag::CHAR, &[&[]]),
    (tag::CHAR_GROUP, &[&[]]),
    (tag::SET, &[&[tag::POSITIVE_SET], &[tag::NEGATIVE_SET]]),
    (tag::POSITIVE_SET, &[&[tag::SET_ITEMS]]),
    (tag::NEGATIVE_SET, &[&[tag::SET_ITEMS]]),
    (
        tag::SET_ITEMS,
        &[&[tag::SET_ITEM], &[tag::SET_ITEM, tag::SET_ITEMS]],
    ),
    (
        tag::SET_ITEM,
        &[&[tag::RANGE], &[tag::CHAR], &[tag::CHAR_GROUP]],
    ),
    (tag::RANGE, &[&[tag::CHAR, tag::CHAR]]),
];

/// Checks `tree` against [`PRODUCTIONS`] and returns its tag and its child nodes.
fn production(tree: &Tree) -> Result<(&str, Vec<&Tree>), Error> {
    let Tree::Node { tag, children } = tree else {
        return Err(Error::UnsupportedConstruct(format!(
            "{tree} where a tagged node was expected"
        )));
    };

    let (_, signatures) = PRODUCTIONS
        .iter()
        .find(|(name, _)| *name == tag.as_str())
        .ok_or_else(|| Error::UnsupportedConstruct(format!("unknown tag `{tag}`")))?;

    let nodes: Vec<&Tree> = children.iter().filter(|c| c.tag().is_some()).collect();
    let found: Vec<&str> = nodes.iter().filter_map(|c| c.tag()).collect();
    if !signatures.iter().any(|signature| *signature == found.as_slice()) {
        return Err(Error::UnsupportedConstruct(format!(
            "`{tag}` cannot contain [{}]",
            found.join(", ")
        )));
    }

    Ok((tag.as_str(), nodes))
}

fn literal(tree: &Tree) -> Result<Literal, Error> {
    match tree.children() {
        [Tree::Literal(literal)] => Ok(*literal),
        _ => Err(Error::UnsupportedConstruct(format!(
            "{tree} does not hold exactly one literal"
        ))),
    }
}

pub(crate) fn shorthand_set(shorthand: Shorthand) -> ByteRangeSet {
    let space: ByteRangeSet = [b'\n', b'\r', b'\t', 0x0c].into_iter().collect();
    let mut word = ByteRangeSet::range(b'a', b'z');
    word.add(b'A', b'Z').add(b'0', b'9').add_one(b'_');

    match shorthand {
        Shorthand::Space => space,
        Shorthand::NotSpace => space.complement(),
        Shorthand::Word => word,
        Shorthand::NotWord => word.complement(),
    }
}

/// The bytes a `char`, `char_group` or `set` subtree consumes.
fn byte_set(tree: &Tree) -> Result<ByteRangeSet, Error> {
    let (name, nodes) = production(tree)?;
    match (name, nodes.as_slice()) {
        (tag::CHAR, []) | (tag::CHAR_GROUP, []) => Ok(match literal(tree)? {
            Literal::Byte(b) => ByteRangeSet::single(b),
            Literal::Shorthand(s) => shorthand_set(s),
        }),
        (tag::SET | tag::POSITIVE_SET | tag::SET_ITEM, [inner]) => byte_set(inner),
        (tag::NEGATIVE_SET, [inner]) => Ok(byte_set(inner)?.complement()),
        (tag::SET_ITEMS, [item]) => byte_set(item),
        (tag::SET_ITEMS, [item, rest]) => Ok(byte_set(item)?.union(&byte_set(rest)?)),
        (tag::RANGE, [lo, hi]) => {
            let (Literal::Byte(lo), Literal::Byte(hi)) = (literal(lo)?, literal(hi)?) else {
                return Err(Error::UnsupportedConstruct(format!(
                    "{tree} has a character class as a bound"
                )));
            };
            // an inverted range is empty
            Ok(ByteRangeSet::range(lo, hi))
        }
        _ => Err(Error::UnsupportedConstruct(format!(
            "{tree} does not describe a set of bytes"
        ))),
    }
}

fn bounds(tree: &Tree) -> Result<(u32, Option<u32>), Error> {
    match tree.children() {
        [Tree::Num(exact)] => Ok((*exact, None)),
        [Tree::Num(min), Tree::Num(max)] if min > max => Err(Error::InvalidRepetitionBounds {
            min: *min,
            max: *max,
        }),
        [Tree::Num(min), Tree::Num(max)] => Ok((*min, Some(*max))),
        _ => Err(Error::UnsupportedConstruct(format!(
            "{tree} does not hold one or two bounds"
        ))),
    }
}

/// Compiles a syntax tree into an [`Automaton`] whose repetitions are deferred.
///
/// `A*` becomes a single epsilon transition into a [`Pin`](crate::Pin), recorded in the
/// [`DeferredTable`] together with the automaton for `A`. `A+` is one copy of `A` followed by
/// such a placeholder.
pub struct Builder<'a> {
    alloc: &'a mut Allocator,
    table: DeferredTable,
}

impl<'a> Builder<'a> {
    pub fn new(alloc: &'a mut Allocator) -> Self {
        Self {
            alloc,
            table: DeferredTable::new(),
        }
    }

    pub fn build(mut self, tree: &Tree) -> Result<(Automaton, DeferredTable), Error> {
        let automaton = self.fragment(tree)?.wrap(self.alloc);
        log::debug!(
            "built {tree}: {} positions, {} deferred repetitions",
            automaton.len(),
            self.table.len()
        );
        Ok((automaton, self.table))
    }

    fn fragment(&mut self, tree: &Tree) -> Result<Automaton, Error> {
        let (name, nodes) = production(tree)?;

        match (name, nodes.as_slice()) {
            (
                tag::CHAR
                | tag::CHAR_GROUP
                | tag::SET
                | tag::POSITIVE_SET
                | tag::NEGATIVE_SET
                | tag::SET_ITEMS
                | tag::SET_ITEM
                | tag::RANGE,
                _,
            ) => Ok(Automaton::literal(self.alloc, byte_set(tree)?)),
            (tag::ANY, _) => Ok(Automaton::literal(self.alloc, ByteRangeSet::full())),
            (tag::EOS | tag::SOS, _) => Ok(Automaton::epsilon(self.alloc)),
            (tag::STAR, [body]) => {
                let body = self.fragment(body)?;
                Ok(Automaton::deferred(body, self.alloc, &mut self.table))
            }
            (tag::PLUS, [body]) => {
                let body = self.fragment(body)?;
                let first = body.remap(self.alloc, &mut self.table)?;
                let rest = Automaton::deferred(body, self.alloc, &mut self.table);
                Ok(first.concat(rest))
            }
            (tag::QUESTION, [body]) => Ok(self.fragment(body)?.optional(self.alloc)),
            (tag::NUM_COPY, [body, bounds]) => self.repeat(body, bounds),
            (_, [single]) => self.fragment(single),
            (_, [first, second]) => {
                let (first, second_tag) = (self.fragment(first)?, second.tag());
                let second = self.fragment(second)?;
                match second_tag {
                    Some(tag::UNION) => Ok(first.union(second, self.alloc)),
                    Some(tag::CONCATENATION) => Ok(first.concat(second)),
                    _ => Err(Error::UnsupportedConstruct(format!(
                        "`{name}` cannot combine its children"
                    ))),
                }
            }
            _ => Err(Error::UnsupportedConstruct(format!(
                "`{name}` does not build an automaton"
            ))),
        }
    }

    /// `body{min}` and `body{min,max}`.
    fn repeat(&mut self, body: &Tree, bounds_tree: &Tree) -> Result<Automaton, Error> {
        let (min, max) = bounds(bounds_tree)?;
        let body = self.fragment(body)?;

        let mut repeated = Automaton::epsilon(self.alloc);
        for _ in 0..min {
            repeated = repeated.concat(body.remap(self.alloc, &mut self.table)?);
        }

        let slack = max.map_or(0, |max| max - min);
        if slack > MAX_OPTIONAL_COPIES {
            let rest = Automaton::deferred(body, self.alloc, &mut self.table);
            repeated = repeated.concat(rest);
        } else {
            for _ in 0..slack {
                let copy = body.remap(self.alloc, &mut self.table)?;
                repeated = repeated.concat(copy.optional(self.alloc));
            }
        }

        Ok(repeated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Target;
    use pretty_assertions::assert_eq;
    use rre_syntax::parse_pattern;

    fn build(pattern: &str) -> Result<(Automaton, DeferredTable), Error> {
        let tree = parse_pattern(pattern).unwrap();
        Builder::new(&mut Allocator::new()).build(&tree)
    }

    /// Every byte label in the automaton, in position order.
    fn labels(automaton: &Automaton) -> Vec<ByteRangeSet> {
        automaton
            .positions()
            .flat_map(|p| automaton.transitions(p).iter().filter_map(|t| t.label))
            .collect()
    }

    #[test]
    fn shorthand_classes() {
        assert_eq!(shorthand_set(Shorthand::Space).len(), 4);
        assert!(shorthand_set(Shorthand::Space).contains(0x0c));
        assert_eq!(shorthand_set(Shorthand::Word).len(), 63);
        assert_eq!(
            shorthand_set(Shorthand::NotWord),
            shorthand_set(Shorthand::Word).complement()
        );
        assert!(!shorthand_set(Shorthand::NotSpace).contains(b'\t'));
    }

    #[test]
    fn sets() {
        let (automaton, _) = build(r"[a-c_\s]").unwrap();
        let mut expected = ByteRangeSet::range(b'a', b'c');
        expected.add_one(b'_');
        let expected = expected.union(&shorthand_set(Shorthand::Space));
        assert_eq!(labels(&automaton), vec![expected]);

        let (automaton, _) = build("[^a]").unwrap();
        assert_eq!(labels(&automaton), vec![ByteRangeSet::single(b'a').complement()]);
    }

    #[test]
    fn any_and_anchors() {
        let (automaton, table) = build("^.$").unwrap();
        assert_eq!(labels(&automaton), vec![ByteRangeSet::full()]);
        assert!(table.is_empty());
    }

    #[test]
    fn star_is_deferred() {
        let (automaton, table) = build("a*").unwrap();
        assert_eq!(table.len(), 1);
        assert!(labels(&automaton).is_empty());

        let deferred = automaton.deferred_transitions();
        let [(from, pin)] = deferred[..] else {
            panic!("expected one deferred transition")
        };
        assert!(automaton.transitions(from)[0].is_epsilon());
        let body = &table.get(pin).unwrap().body;
        assert_eq!(labels(body), vec![ByteRangeSet::single(b'a')]);
    }

    #[test]
    fn plus_consumes_once_before_the_loop() {
        let (automaton, table) = build("a+").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(labels(&automaton), vec![ByteRangeSet::single(b'a')]);
        assert_eq!(automaton.deferred_transitions().len(), 1);
    }

    #[test]
    fn nested_plus_copies_the_inner_repetition() {
        let (automaton, table) = build("(a+)+").unwrap();
        // inner pin, its copy in the mandatory iteration, and the outer pin
        assert_eq!(table.len(), 3);
        assert_eq!(automaton.deferred_transitions().len(), 2);
    }

    #[test]
    fn exact_repetition() {
        let (automaton, table) = build("a{3}").unwrap();
        assert_eq!(labels(&automaton).len(), 3);
        assert!(table.is_empty());
    }

    #[test]
    fn small_slack_is_optional_copies() {
        let (automaton, table) = build("a{1,3}").unwrap();
        assert_eq!(labels(&automaton).len(), 3);
        assert!(table.is_empty());
    }

    #[test]
    fn large_slack_is_a_star() {
        let (automaton, table) = build("a{2,20}").unwrap();
        assert_eq!(labels(&automaton).len(), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn inverted_bounds() {
        let tree = Tree::node(
            tag::RE,
            vec![Tree::node(
                tag::SIMPLE_RE,
                vec![Tree::node(
                    tag::BASIC_RE,
                    vec![Tree::node(
                        tag::NUM_COPY,
                        vec![
                            Tree::node(tag::ELEMENTARY_RE, vec![Tree::char(b'a')]),
                            Tree::node(tag::NUM_COPY_STRUCT, vec![Tree::num(5), Tree::num(2)]),
                        ],
                    )],
                )],
            )],
        );

        assert_eq!(
            Builder::new(&mut Allocator::new()).build(&tree).err(),
            Some(Error::InvalidRepetitionBounds { min: 5, max: 2 })
        );
    }

    #[test]
    fn unknown_tags() {
        let tree = Tree::node(tag::RE, vec![Tree::node("lookahead", vec![])]);
        assert!(matches!(
            Builder::new(&mut Allocator::new()).build(&tree),
            Err(Error::UnsupportedConstruct(_))
        ));

        let tree = Tree::node("backreference", vec![Tree::num(1)]);
        assert!(matches!(
            Builder::new(&mut Allocator::new()).build(&tree),
            Err(Error::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn misplaced_children() {
        let tree = Tree::node(tag::STAR, vec![Tree::char(b'a')]);
        assert!(matches!(
            Builder::new(&mut Allocator::new()).build(&tree),
            Err(Error::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn union_branches_from_a_fresh_entry() {
        let (automaton, _) = build("a|b").unwrap();
        // the wrapper leads into the union
        let [start] = automaton.transitions(automaton.entry()) else {
            panic!("expected one transition")
        };
        let Target::Concrete(union) = start.target else {
            panic!("expected a concrete target")
        };
        assert_eq!(automaton.transitions(union).len(), 2);
    }
}
