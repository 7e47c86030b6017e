use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use regex::Regex;
use rre::{find_match_str, find_redos, find_redos_str, parse_pattern, tag, Analyzer, Error, Tree};

#[ctor::ctor]
fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const VULNERABLE: &[&str] = &[
    "(a+)+h",
    "(a|aa)+h",
    "(a|a?)+h",
    "([a-zA-Z]+)*h",
    "(!+)+h",
    r"(\w+\s?)+h",
    "x(a|a)*y",
    "(a+)+(!|b)",
    "(a+)+(b|!)",
];

const SAFE: &[&str] = &[
    "abc",
    "a*b",
    "(ab)*c",
    "(a|b)*c",
    "(a+)+",
    r"[\-0-9a-zA-Z.+_]+@[\-0-9a-zA-Z.+_]+\.[a-zA-Z]{2,4}",
];

fn full_match(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{pattern})$")).unwrap()
}

#[test]
fn vulnerable_patterns_have_a_proof() {
    for pattern in VULNERABLE {
        let proof = find_redos_str(pattern).unwrap();
        assert!(proof.is_some(), "expected a proof for {pattern}");
    }
}

#[test]
fn safe_patterns_have_no_proof() {
    for pattern in SAFE {
        assert_eq!(find_redos_str(pattern).unwrap(), None, "for {pattern}");
    }
}

#[test]
fn proofs_are_rejected_by_the_pattern() {
    for pattern in VULNERABLE {
        let proof = find_redos_str(pattern).unwrap().unwrap();
        assert!(
            !full_match(pattern).is_match(&proof),
            "{proof} should not match {pattern}"
        );
    }
}

#[test]
fn proof_for_nested_plus() {
    let proof = find_redos_str("(a+)+h").unwrap().unwrap();
    assert!(proof.ends_with(&format!("{}!", "a".repeat(40))), "{proof}");
    assert!(proof.chars().all(|c| c == 'a' || c == '!'));
}

#[test]
fn calibration() {
    // `(([a-z])+.)+` repeats a body in which `.` also accepts a letter: after one `[a-z]`, a
    // letter can either continue the inner `([a-z])+` or be taken by `.`, and both ways lead
    // back to the same `[a-z]`. The trailing `$` becomes `h`, after which the proof fails on a
    // byte outside `[A-Z]`.
    let pattern = "^(([a-z])+.)+[A-Z]([a-z])+$";
    let proof = find_redos_str(pattern).unwrap();

    assert!(proof.is_some());
    let proof = proof.unwrap();
    assert!(proof.ends_with('!'));
    assert!(!full_match(pattern).is_match(&proof));
}

#[test]
fn trailing_anchor_gives_the_proof_a_byte_to_fail_on() {
    assert_eq!(find_redos_str("(a|a)*").unwrap(), None);
    assert!(find_redos_str("(a|a)*$").unwrap().is_some());
    // anchors elsewhere consume nothing
    assert_eq!(find_redos_str("^(a|a)*").unwrap(), None);
}

#[test]
fn literal_pattern() {
    assert_eq!(find_match_str("abc").unwrap().as_deref(), Some("abc"));
    assert_eq!(find_redos_str("abc").unwrap(), None);
}

#[test]
fn matches_are_accepted_by_a_reference_matcher() {
    let patterns = [
        "abc",
        "a*b",
        "(a|b)*c",
        "colou?r",
        "x{3}",
        "(ab|cd){2,3}e",
        "a{2,15}b",
        "[^a-z]+",
        r"\w+@\W",
        ".+x",
        "^ab$",
        "(a+)+h",
        "(?:ab)+c",
        r"[\-0-9a-zA-Z.+_]+@[\-0-9a-zA-Z.+_]+\.[a-zA-Z]{2,4}",
        "^(([a-z])+.)+[A-Z]([a-z])+$",
    ];

    for pattern in patterns {
        let example = find_match_str(pattern).unwrap();
        let Some(example) = example else {
            panic!("expected a match for {pattern}")
        };
        assert!(
            full_match(pattern).is_match(&example),
            "{example:?} does not match {pattern}"
        );
    }
}

#[test]
fn analysis_is_repeatable() {
    for pattern in VULNERABLE.iter().chain(SAFE) {
        let tree = parse_pattern(pattern).unwrap();
        assert_eq!(find_redos(&tree).unwrap(), find_redos(&tree).unwrap());
    }
}

#[test]
fn search_is_bounded() {
    let analyzer = Analyzer::new().with_task_limit(1);
    assert_eq!(analyzer.find_redos_str("(a|aa)+h").unwrap(), None);

    let analyzer = Analyzer::new().with_task_limit(50);
    for pattern in VULNERABLE.iter().chain(SAFE) {
        analyzer.find_redos_str(pattern).unwrap();
    }
}

#[test]
fn many_optional_alternatives_in_a_loop() {
    let pattern = "((a?|b?){12}c)*h";
    let started = Instant::now();
    let proof = find_redos_str(pattern).unwrap().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!full_match(pattern).is_match(&proof));
}

#[test]
fn syntax_errors() {
    assert!(matches!(find_match_str("a**"), Err(Error::Syntax(e)) if e.offset == 2));
    assert!(matches!(find_redos_str("(ab"), Err(Error::Syntax(_))));
    assert!(matches!(find_redos_str("a{3,1}"), Err(Error::Syntax(_))));
}

#[test]
fn builder_errors_reach_the_caller() {
    let bounds = Tree::node(tag::NUM_COPY_STRUCT, vec![Tree::num(3), Tree::num(1)]);
    let repeated = Tree::node(
        tag::NUM_COPY,
        vec![Tree::node(tag::ELEMENTARY_RE, vec![Tree::char(b'a')]), bounds],
    );
    let tree = Tree::node(
        tag::RE,
        vec![Tree::node(
            tag::SIMPLE_RE,
            vec![Tree::node(tag::BASIC_RE, vec![repeated])],
        )],
    );
    assert_eq!(
        find_redos(&tree),
        Err(Error::InvalidRepetitionBounds { min: 3, max: 1 })
    );

    let tree = Tree::node(tag::RE, vec![Tree::node("lookbehind", vec![])]);
    assert!(matches!(
        find_redos(&tree),
        Err(Error::UnsupportedConstruct(_))
    ));
}
