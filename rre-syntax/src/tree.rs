use std::fmt::{Display, Formatter};

/// Grammar tags understood by the automaton builder.
pub mod tag {
    pub const RE: &str = "RE";
    pub const UNION: &str = "union";
    pub const SIMPLE_RE: &str = "simple_RE";
    pub const CONCATENATION: &str = "concatenation";
    pub const BASIC_RE: &str = "basic_RE";
    pub const STAR: &str = "star";
    pub const PLUS: &str = "plus";
    pub const QUESTION: &str = "question";
    pub const NUM_COPY: &str = "num_copy";
    pub const NUM_COPY_STRUCT: &str = "num_copy_struct";
    pub const ELEMENTARY_RE: &str = "elementary_RE";
    pub const GROUP: &str = "group";
    pub const ANY: &str = "any";
    pub const EOS: &str = "eos";
    pub const SOS: &str = "sos";
    pub const CHAR: &str = "char";
    pub const CHAR_GROUP: &str = "char_group";
    pub const SET: &str = "set";
    pub const POSITIVE_SET: &str = "positive_set";
    pub const NEGATIVE_SET: &str = "negative_set";
    pub const SET_ITEMS: &str = "set_items";
    pub const SET_ITEM: &str = "set_item";
    pub const RANGE: &str = "range";
}

/// The `\s`, `\S`, `\w` and `\W` character classes.
#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shorthand {
    Space,
    NotSpace,
    Word,
    NotWord,
}

impl Shorthand {
    pub fn from_escape(c: char) -> Option<Self> {
        match c {
            's' => Some(Self::Space),
            'S' => Some(Self::NotSpace),
            'w' => Some(Self::Word),
            'W' => Some(Self::NotWord),
            _ => None,
        }
    }

    pub fn escape(&self) -> &'static str {
        match self {
            Self::Space => r"\s",
            Self::NotSpace => r"\S",
            Self::Word => r"\w",
            Self::NotWord => r"\W",
        }
    }
}

#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Byte(u8),
    Shorthand(Shorthand),
}

#[derive(Hash, Debug, Clone, PartialEq, Eq)]
pub enum Tree {
    Node { tag: String, children: Vec<Tree> },
    Literal(Literal),
    Num(u32),
}

impl Tree {
    pub fn node(tag: impl Into<String>, children: Vec<Tree>) -> Self {
        Self::Node {
            tag: tag.into(),
            children,
        }
    }

    /// `(char 'c')`
    pub fn char(byte: u8) -> Self {
        Self::node(tag::CHAR, vec![Self::Literal(Literal::Byte(byte))])
    }

    /// `(char_group \s)`
    pub fn char_group(shorthand: Shorthand) -> Self {
        Self::node(tag::CHAR_GROUP, vec![Self::Literal(Literal::Shorthand(shorthand))])
    }

    pub fn num(value: u32) -> Self {
        Self::Num(value)
    }

    /// The tag of a node, `None` for leaves.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Node { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Tree] {
        match self {
            Self::Node { children, .. } => children,
            _ => &[],
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Byte(b) => write!(f, "'{}'", b.escape_ascii()),
            Self::Shorthand(s) => write!(f, "{}", s.escape()),
        }
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node { tag, children } => {
                write!(f, "({tag}")?;
                for child in children {
                    write!(f, " {child}")?;
                }
                write!(f, ")")
            }
            Self::Literal(l) => write!(f, "{l}"),
            Self::Num(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_as_s_expression() {
        let tree = Tree::node(
            tag::SET_ITEMS,
            vec![
                Tree::node(tag::SET_ITEM, vec![Tree::char(b'a')]),
                Tree::node(
                    tag::SET_ITEMS,
                    vec![Tree::node(tag::SET_ITEM, vec![Tree::char_group(Shorthand::Word)])],
                ),
            ],
        );

        assert_eq!(
            tree.to_string(),
            r"(set_items (set_item (char 'a')) (set_items (set_item (char_group \w))))"
        );
        assert_eq!(Tree::char(b'\n').to_string(), r"(char '\n')");
    }

    #[test]
    fn leaves_have_no_tag() {
        assert_eq!(Tree::num(3).tag(), None);
        assert!(Tree::num(3).children().is_empty());
        assert_eq!(Tree::char(b'x').tag(), Some(tag::CHAR));
    }
}
