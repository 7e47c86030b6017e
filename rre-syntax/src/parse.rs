use std::iter;

use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, delimited, eof, opt, preceded, repeat, terminated};
use winnow::error::{ContextError, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of};

use crate::tree::{tag, Shorthand, Tree};
use crate::SyntaxError;

/// Characters that must be escaped outside of a set.
const SPECIALS: &str = ".[]^$()*+?|{}";
/// Characters that must be escaped inside of a set.
const SET_SPECIALS: &str = "^-]";

pub(crate) fn parse(pattern: &str) -> Result<Tree, SyntaxError> {
    terminated(re, eof).parse(pattern).map_err(|e| {
        let reason = e.inner().to_string();
        SyntaxError {
            offset: e.offset(),
            reason: if reason.is_empty() {
                "unexpected input".to_string()
            } else {
                reason
            },
        }
    })
}

/// Folds `items` right to left, so that `[a, b, c]` becomes `wrap(a, wrap(b, wrap(c, None)))`.
fn nest(items: Vec<Tree>, mut wrap: impl FnMut(Tree, Option<Tree>) -> Tree) -> Option<Tree> {
    items
        .into_iter()
        .rev()
        .fold(None, |rest, item| Some(wrap(item, rest)))
}

fn with_rest(head: Tree, rest: Option<Tree>) -> Vec<Tree> {
    iter::once(head).chain(rest).collect()
}

fn to_byte(c: char) -> Option<u8> {
    u8::try_from(c).ok()
}

// RE ::= simple_RE union?
// union ::= "|" simple_RE union?
fn re(input: &mut &str) -> PResult<Tree> {
    let first = simple_re(input)?;
    let rest: Vec<Tree> = repeat(0.., preceded('|', cut_err(simple_re))).parse_next(input)?;
    let union = nest(rest, |alternative, rest| {
        Tree::node(tag::UNION, with_rest(alternative, rest))
    });
    Ok(Tree::node(tag::RE, with_rest(first, union)))
}

// simple_RE ::= basic_RE concatenation?
// concatenation ::= simple_RE
fn simple_re(input: &mut &str) -> PResult<Tree> {
    repeat(1.., basic_re)
        .verify_map(|basics: Vec<Tree>| {
            nest(basics, |basic, rest| {
                let concatenation = rest.map(|r| Tree::node(tag::CONCATENATION, vec![r]));
                Tree::node(tag::SIMPLE_RE, with_rest(basic, concatenation))
            })
        })
        .parse_next(input)
}

fn basic_re(input: &mut &str) -> PResult<Tree> {
    let atom = elementary_re(input)?;

    let quantified = if let Some(kind) = opt(alt((
        '*'.value(tag::STAR),
        '+'.value(tag::PLUS),
        '?'.value(tag::QUESTION),
    )))
    .parse_next(input)?
    {
        Tree::node(kind, vec![atom])
    } else if let Some(bounds) = opt(num_copy_struct).parse_next(input)? {
        Tree::node(tag::NUM_COPY, vec![atom, bounds])
    } else {
        return Ok(Tree::node(tag::BASIC_RE, vec![atom]));
    };

    // lazy quantifiers accept the same language
    opt('?').parse_next(input)?;
    Ok(Tree::node(tag::BASIC_RE, vec![quantified]))
}

fn number(input: &mut &str) -> PResult<u32> {
    digit1
        .try_map(|digits: &str| digits.parse::<u32>())
        .parse_next(input)
}

// num_copy_struct ::= "{" num "}" | "{" num "," num "}"
fn num_copy_struct(input: &mut &str) -> PResult<Tree> {
    delimited(
        '{',
        cut_err(
            (number, opt(preceded(',', number)))
                .verify(|&(min, max): &(u32, Option<u32>)| max.map_or(true, |max| min <= max)),
        )
        .context(StrContext::Label("repetition bounds")),
        cut_err('}').context(StrContext::Expected(StrContextValue::CharLiteral('}'))),
    )
    .map(|(min, max)| {
        let bounds = iter::once(min).chain(max).map(Tree::num).collect();
        Tree::node(tag::NUM_COPY_STRUCT, bounds)
    })
    .parse_next(input)
}

fn elementary_re(input: &mut &str) -> PResult<Tree> {
    alt((
        group,
        '.'.value(Tree::node(tag::ANY, vec![])),
        '^'.value(Tree::node(tag::SOS, vec![])),
        '$'.value(Tree::node(tag::EOS, vec![])),
        atom,
        set,
    ))
    .map(|elementary| Tree::node(tag::ELEMENTARY_RE, vec![elementary]))
    .parse_next(input)
}

fn group(input: &mut &str) -> PResult<Tree> {
    delimited(
        ('(', opt("?:")),
        cut_err(re),
        cut_err(')').context(StrContext::Expected(StrContextValue::CharLiteral(')'))),
    )
    .map(|inner| Tree::node(tag::GROUP, vec![inner]))
    .parse_next(input)
}

enum Escaped {
    Byte(u8),
    Shorthand(Shorthand),
}

fn escaped(input: &mut &str) -> PResult<Escaped> {
    preceded(
        '\\',
        cut_err(any.verify_map(|c: char| match c {
            'n' => Some(Escaped::Byte(b'\n')),
            'r' => Some(Escaped::Byte(b'\r')),
            't' => Some(Escaped::Byte(b'\t')),
            'f' => Some(Escaped::Byte(0x0c)),
            c => Shorthand::from_escape(c)
                .map(Escaped::Shorthand)
                .or_else(|| to_byte(c).map(Escaped::Byte)),
        }))
        .context(StrContext::Label("escape")),
    )
    .parse_next(input)
}

fn escape(input: &mut &str) -> PResult<Tree> {
    escaped
        .map(|e| match e {
            Escaped::Byte(b) => Tree::char(b),
            Escaped::Shorthand(s) => Tree::char_group(s),
        })
        .parse_next(input)
}

/// An unescaped character that is not one of `specials`.
fn plain<'i>(specials: &'static str) -> impl Parser<&'i str, u8, ContextError> {
    one_of(move |c: char| c != '\\' && !specials.contains(c)).verify_map(to_byte)
}

fn atom(input: &mut &str) -> PResult<Tree> {
    alt((escape, plain(SPECIALS).map(Tree::char))).parse_next(input)
}

// set ::= "[" set_items "]" | "[^" set_items "]"
fn set(input: &mut &str) -> PResult<Tree> {
    let kind = alt(("[^".value(tag::NEGATIVE_SET), '['.value(tag::POSITIVE_SET))).parse_next(input)?;
    let items = cut_err(set_items).parse_next(input)?;
    cut_err(']')
        .context(StrContext::Expected(StrContextValue::CharLiteral(']')))
        .parse_next(input)?;
    Ok(Tree::node(tag::SET, vec![Tree::node(kind, vec![items])]))
}

fn set_items(input: &mut &str) -> PResult<Tree> {
    repeat(1.., set_item)
        .verify_map(|items: Vec<Tree>| {
            nest(items, |item, rest| Tree::node(tag::SET_ITEMS, with_rest(item, rest)))
        })
        .parse_next(input)
}

fn set_item(input: &mut &str) -> PResult<Tree> {
    alt((range, escape, plain(SET_SPECIALS).map(Tree::char)))
        .map(|item| Tree::node(tag::SET_ITEM, vec![item]))
        .parse_next(input)
}

fn set_byte(input: &mut &str) -> PResult<u8> {
    alt((
        escaped.verify_map(|e| match e {
            Escaped::Byte(b) => Some(b),
            Escaped::Shorthand(_) => None,
        }),
        plain(SET_SPECIALS),
    ))
    .parse_next(input)
}

fn range(input: &mut &str) -> PResult<Tree> {
    (set_byte, '-', set_byte)
        .verify(|&(lo, _, hi): &(u8, char, u8)| lo <= hi)
        .map(|(lo, _, hi)| Tree::node(tag::RANGE, vec![Tree::char(lo), Tree::char(hi)]))
        .parse_next(input)
}
