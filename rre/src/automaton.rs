use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::{ByteRangeSet, Error};

/// A node of an [`Automaton`].
#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position(u32);

/// Stands in for a repeated sub-automaton that has not been expanded yet.
#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pin(u32);

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl Display for Pin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "pin{}", u32::MAX - self.0)
    }
}

#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Concrete(Position),
    /// An unexpanded repetition, see [`DeferredTable`].
    Deferred(Pin),
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Concrete(p) => write!(f, "{p}"),
            Target::Deferred(pin) => write!(f, "{pin}"),
        }
    }
}

/// An edge of an [`Automaton`]. Without a label it is an epsilon transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target: Target,
    pub label: Option<ByteRangeSet>,
}

impl Transition {
    pub fn is_epsilon(&self) -> bool {
        self.label.is_none()
    }
}

/// Hands out the positions and pins of a single analysis.
///
/// Positions count up from 1 and pins count down from `u32::MAX`, so the two never collide even
/// when printed side by side.
#[derive(Debug)]
pub struct Allocator {
    next_position: u32,
    next_pin: u32,
}

impl Default for Allocator {
    fn default() -> Self {
        Self {
            next_position: 0,
            next_pin: u32::MAX,
        }
    }
}

impl Allocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&mut self) -> Position {
        self.next_position += 1;
        Position(self.next_position)
    }

    pub fn pin(&mut self) -> Pin {
        let pin = Pin(self.next_pin);
        self.next_pin -= 1;
        pin
    }
}

/// The sub-automaton a [`Pin`] stands for, and the position to continue at after it.
#[derive(Debug, Clone)]
pub struct Repetition {
    pub body: Automaton,
    pub resume: Position,
}

#[derive(Debug, Clone, Default)]
pub struct DeferredTable {
    repetitions: BTreeMap<Pin, Repetition>,
}

impl DeferredTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pin: Pin, repetition: Repetition) {
        self.repetitions.insert(pin, repetition);
    }

    pub fn get(&self, pin: Pin) -> Option<&Repetition> {
        self.repetitions.get(&pin)
    }

    /// Removes the repetition behind `pin`; a pin is expanded at most once.
    pub fn take(&mut self, pin: Pin) -> Result<Repetition, Error> {
        self.repetitions
            .remove(&pin)
            .ok_or_else(|| missing(pin))
    }

    pub fn resume(&self, pin: Pin) -> Result<Position, Error> {
        self.get(pin)
            .map(|repetition| repetition.resume)
            .ok_or_else(|| missing(pin))
    }

    pub fn len(&self) -> usize {
        self.repetitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repetitions.is_empty()
    }
}

fn missing(pin: Pin) -> Error {
    Error::InternalInvariantViolation(format!("{pin} is not in the deferred table"))
}

/// A nondeterministic finite automaton over bytes with one entry and one exit.
///
/// Every position that is the source or the concrete target of a transition is a key of the
/// transition map, so `entry` and `exit` are always present.
#[derive(Debug, Clone)]
pub struct Automaton {
    entry: Position,
    exit: Position,
    transitions: BTreeMap<Position, Vec<Transition>>,
}

impl Automaton {
    /// An automaton with fresh entry and exit positions and no transitions.
    pub fn new(alloc: &mut Allocator) -> Self {
        let entry = alloc.position();
        let exit = alloc.position();
        Self::with_ends(entry, exit)
    }

    fn with_ends(entry: Position, exit: Position) -> Self {
        let mut transitions = BTreeMap::new();
        transitions.insert(entry, Vec::new());
        transitions.insert(exit, Vec::new());
        Self {
            entry,
            exit,
            transitions,
        }
    }

    /// `entry --ε--> exit`
    pub fn epsilon(alloc: &mut Allocator) -> Self {
        let mut automaton = Self::new(alloc);
        automaton.add_epsilon(automaton.entry, automaton.exit);
        automaton
    }

    /// `entry --[set]--> exit`
    pub fn literal(alloc: &mut Allocator, set: ByteRangeSet) -> Self {
        let mut automaton = Self::new(alloc);
        automaton.add_transition(automaton.entry, Target::Concrete(automaton.exit), Some(set));
        automaton
    }

    pub fn entry(&self) -> Position {
        self.entry
    }

    pub fn exit(&self) -> Position {
        self.exit
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.transitions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn transitions(&self, position: Position) -> &[Transition] {
        self.transitions
            .get(&position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Adds a transition unless `from` already has one to `target`.
    /// Returns whether the transition was added.
    pub fn add_transition(
        &mut self,
        from: Position,
        target: Target,
        label: Option<ByteRangeSet>,
    ) -> bool {
        if let Target::Concrete(to) = target {
            self.transitions.entry(to).or_default();
        }

        let transitions = self.transitions.entry(from).or_default();
        if transitions.iter().any(|t| t.target == target) {
            return false;
        }
        transitions.push(Transition { target, label });
        true
    }

    fn add_epsilon(&mut self, from: Position, to: Position) {
        self.add_transition(from, Target::Concrete(to), None);
    }

    /// Copies all transitions of `other` into `self`.
    fn absorb(&mut self, other: Automaton) {
        for (from, transitions) in other.transitions {
            self.transitions.entry(from).or_default();
            for Transition { target, label } in transitions {
                self.add_transition(from, target, label);
            }
        }
    }

    /// `self · next`
    pub fn concat(mut self, next: Automaton) -> Self {
        self.add_epsilon(self.exit, next.entry);
        self.exit = next.exit;
        self.absorb(next);
        self
    }

    /// `self | other`
    pub fn union(self, other: Automaton, alloc: &mut Allocator) -> Self {
        let mut union = Self::new(alloc);
        union.add_epsilon(union.entry, self.entry);
        union.add_epsilon(union.entry, other.entry);
        union.add_epsilon(self.exit, union.exit);
        union.add_epsilon(other.exit, union.exit);
        union.absorb(self);
        union.absorb(other);
        union
    }

    /// `self?`
    pub fn optional(self, alloc: &mut Allocator) -> Self {
        let empty = Self::epsilon(alloc);
        self.union(empty, alloc)
    }

    /// Surrounds `self` with a fresh entry and exit.
    pub fn wrap(self, alloc: &mut Allocator) -> Self {
        let mut wrapped = Self::new(alloc);
        wrapped.add_epsilon(wrapped.entry, self.entry);
        wrapped.add_epsilon(self.exit, wrapped.exit);
        wrapped.absorb(self);
        wrapped
    }

    /// `body*` in star normal form: the body can be skipped, and its exit loops back to its
    /// entry.
    pub fn star(body: Automaton, alloc: &mut Allocator) -> Self {
        let mut star = Self::new(alloc);
        star.add_epsilon(star.entry, body.entry);
        star.add_epsilon(body.exit, star.exit);
        star.add_epsilon(star.entry, star.exit);
        star.add_epsilon(body.exit, body.entry);
        star.absorb(body);
        star
    }

    /// `body*` without expanding it: `entry --ε--> pin`, where the pin resumes at `exit` and
    /// `body` is recorded in `table`.
    pub fn deferred(body: Automaton, alloc: &mut Allocator, table: &mut DeferredTable) -> Self {
        let mut fragment = Self::new(alloc);
        let pin = alloc.pin();
        fragment.add_transition(fragment.entry, Target::Deferred(pin), None);
        table.insert(
            pin,
            Repetition {
                body,
                resume: fragment.exit,
            },
        );
        fragment
    }

    /// A copy of `self` in which every position is replaced by a fresh one.
    ///
    /// Deferred repetitions are copied as well, under fresh pins, so the copy shares nothing with
    /// the source.
    pub fn remap(&self, alloc: &mut Allocator, table: &mut DeferredTable) -> Result<Self, Error> {
        let mut renamed = BTreeMap::new();
        let mut rename = |p: Position, alloc: &mut Allocator| {
            *renamed.entry(p).or_insert_with(|| alloc.position())
        };

        let mut copy = Self::with_ends(rename(self.entry, alloc), rename(self.exit, alloc));
        for (&from, transitions) in &self.transitions {
            let from = rename(from, alloc);
            copy.transitions.entry(from).or_default();

            for transition in transitions {
                let target = match transition.target {
                    Target::Concrete(to) => Target::Concrete(rename(to, alloc)),
                    Target::Deferred(pin) => {
                        let source = table.get(pin).cloned().ok_or_else(|| missing(pin))?;
                        if !self.transitions.contains_key(&source.resume) {
                            return Err(Error::InternalInvariantViolation(format!(
                                "{pin} resumes at {}, outside of the automaton being copied",
                                source.resume
                            )));
                        }

                        let body = source.body.remap(alloc, table)?;
                        let pin = alloc.pin();
                        table.insert(
                            pin,
                            Repetition {
                                body,
                                resume: rename(source.resume, alloc),
                            },
                        );
                        Target::Deferred(pin)
                    }
                };
                copy.add_transition(from, target, transition.label);
            }
        }

        Ok(copy)
    }

    /// All transitions that still point at a deferred repetition.
    pub fn deferred_transitions(&self) -> Vec<(Position, Pin)> {
        self.transitions
            .iter()
            .flat_map(|(&from, transitions)| {
                transitions.iter().filter_map(move |t| match t.target {
                    Target::Deferred(pin) => Some((from, pin)),
                    Target::Concrete(_) => None,
                })
            })
            .collect()
    }

    /// Replaces the transition `from --ε--> pin` by a transition into the star normal form of
    /// `repetition.body`, whose exit continues at `repetition.resume`.
    ///
    /// Returns the entry of the inserted loop.
    pub fn upgrade(
        &mut self,
        from: Position,
        pin: Pin,
        repetition: Repetition,
        alloc: &mut Allocator,
    ) -> Result<Position, Error> {
        let transition = self
            .transitions
            .get_mut(&from)
            .and_then(|transitions| {
                transitions
                    .iter_mut()
                    .find(|t| t.target == Target::Deferred(pin))
            })
            .ok_or_else(|| {
                Error::InternalInvariantViolation(format!("no transition {from} -> {pin}"))
            })?;
        if let Some(label) = transition.label {
            return Err(Error::InternalInvariantViolation(format!(
                "{pin} is reached through the byte label {label}"
            )));
        }

        let star = Self::star(repetition.body, alloc);
        let (entry, exit) = (star.entry, star.exit);
        transition.target = Target::Concrete(entry);

        self.absorb(star);
        self.add_epsilon(exit, repetition.resume);
        Ok(entry)
    }
}
