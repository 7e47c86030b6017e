use std::collections::{HashSet, VecDeque};

use crate::{
    find_overlap, Allocator, Automaton, ByteRangeSet, DeferredTable, Error, Limits, Pin,
    Position, Repetition, Target,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Stop at the first route from entry to exit.
    Match,
    /// Explore everything, checking each repetition for overlapping iterations.
    Redos,
}

/// A walk through an automaton and the byte sets consumed along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub positions: Vec<Position>,
    pub consumed: Vec<ByteRangeSet>,
}

impl Route {
    fn start(position: Position) -> Self {
        Self {
            positions: vec![position],
            consumed: Vec::new(),
        }
    }

    fn last(&self) -> Option<Position> {
        self.positions.last().copied()
    }

    fn visits(&self, position: Position) -> bool {
        self.positions.contains(&position)
    }

    fn step(&self, to: Position, label: Option<ByteRangeSet>) -> Self {
        let mut next = self.clone();
        next.positions.push(to);
        next.consumed.extend(label);
        next
    }

    /// `self`, followed by the input of `inner` (a route through a repeated body), ending at
    /// `resume`.
    fn splice(&self, inner: &Route, resume: Position) -> Self {
        let mut next = self.step(resume, None);
        next.consumed.extend_from_slice(&inner.consumed);
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Complete routes from entry to exit, in the order they were found.
    Routes(Vec<Route>),
    /// A repetition was found whose iterations overlap, with a route that makes a backtracking
    /// matcher try every way of splitting its input.
    Proven(Route),
}

/// Searches an automaton for routes from entry to exit, expanding deferred repetitions on the
/// way.
///
/// Every repetition reached is searched on its own, then replaced in the automaton by its star
/// normal form, so each [`Pin`] is expanded at most once.
pub struct Explorer<'a> {
    alloc: &'a mut Allocator,
    table: &'a mut DeferredTable,
    mode: Mode,
    limits: Limits,
}

impl<'a> Explorer<'a> {
    pub fn new(
        alloc: &'a mut Allocator,
        table: &'a mut DeferredTable,
        mode: Mode,
        limits: Limits,
    ) -> Self {
        Self {
            alloc,
            table,
            mode,
            limits,
        }
    }

    pub fn search(&mut self, automaton: &mut Automaton) -> Result<Outcome, Error> {
        let exit = automaton.exit();
        let mut routes = VecDeque::from([Route::start(automaton.entry())]);
        let mut expanded = HashSet::new();
        let mut complete = Vec::new();

        while let Some(route) = routes.pop_front() {
            let Some(position) = route.last() else {
                continue;
            };
            if !expanded.insert(position) {
                continue;
            }

            let mut epsilons = Vec::new();
            for transition in automaton.transitions(position).to_vec() {
                match transition.target {
                    Target::Concrete(to) => {
                        if route.visits(to) || transition.label.is_some_and(|l| l.is_empty()) {
                            continue;
                        }

                        let next = route.step(to, transition.label);
                        if to == exit {
                            complete.push(next);
                        } else if transition.is_epsilon() {
                            epsilons.push(next);
                        } else {
                            routes.push_back(next);
                        }
                    }
                    Target::Deferred(pin) => {
                        let proof =
                            self.expand(automaton, &route, pin, &mut routes, &mut complete)?;
                        if let Some(proof) = proof {
                            return Ok(Outcome::Proven(proof));
                        }
                    }
                }

                if self.mode == Mode::Match && !complete.is_empty() {
                    return Ok(Outcome::Routes(complete));
                }
            }

            // depth first over epsilon transitions, in transition order
            for next in epsilons.into_iter().rev() {
                routes.push_front(next);
            }
        }

        Ok(Outcome::Routes(complete))
    }

    /// Resolves the repetition `pin`, reached by `route`.
    ///
    /// Routes through one iteration of the body continue at its resume position, and the
    /// placeholder is upgraded to a loop that `route` itself continues into.
    fn expand(
        &mut self,
        automaton: &mut Automaton,
        route: &Route,
        pin: Pin,
        routes: &mut VecDeque<Route>,
        complete: &mut Vec<Route>,
    ) -> Result<Option<Route>, Error> {
        let from = route
            .last()
            .ok_or_else(|| Error::InternalInvariantViolation(format!("empty route to {pin}")))?;
        let Repetition { mut body, resume } = self.table.take(pin)?;

        let iterations = match self.search(&mut body)? {
            Outcome::Proven(inner) => {
                let mut proof = route.clone();
                proof.positions.extend(inner.positions);
                proof.consumed.extend(inner.consumed);
                return Ok(Some(proof));
            }
            Outcome::Routes(iterations) => iterations,
        };

        if self.mode == Mode::Redos {
            self.materialize(&mut body)?;
            if let Some(overlap) = find_overlap(&body, self.limits.task_limit)? {
                log::debug!("{pin} can repeat ambiguously on {:?}", overlap.shared);
                if let Some(proof) = self.prove(automaton, route, resume, &overlap.shared)? {
                    return Ok(Some(proof));
                }
            }
        }

        for iteration in &iterations {
            let next = route.splice(iteration, resume);
            if resume == automaton.exit() {
                complete.push(next);
            } else {
                routes.push_back(next);
            }
        }

        let repeat = automaton.upgrade(from, pin, Repetition { body, resume }, self.alloc)?;
        log::trace!("{pin} resolved into a loop at {repeat}");
        routes.push_front(route.step(repeat, None));
        Ok(None)
    }

    /// Replaces every deferred repetition left in `automaton` by its star normal form.
    pub fn materialize(&mut self, automaton: &mut Automaton) -> Result<(), Error> {
        for (from, pin) in automaton.deferred_transitions() {
            let mut repetition = self.table.take(pin)?;
            self.materialize(&mut repetition.body)?;
            automaton.upgrade(from, pin, repetition, self.alloc)?;
        }
        Ok(())
    }

    /// `route`, the `shared` byte sets stressed, then a byte that fails right after the
    /// repetition.
    fn prove(
        &self,
        automaton: &Automaton,
        route: &Route,
        resume: Position,
        shared: &[ByteRangeSet],
    ) -> Result<Option<Route>, Error> {
        let Some(mismatch) = self.complete_proof(automaton, resume)? else {
            log::debug!("no byte after {resume} forces a mismatch, proof abandoned");
            return Ok(None);
        };

        let mut proof = route.step(resume, None);
        for _ in 0..self.limits.stress_repetitions {
            proof.consumed.extend_from_slice(shared);
        }
        proof.consumed.push(mismatch);
        log::info!("proof completed with {} byte sets", proof.consumed.len());
        Ok(Some(proof))
    }

    /// The bytes that cannot follow `resume`: the complement of every byte label reachable over
    /// epsilon transitions. Unresolved repetitions may run zero times or start an iteration, so
    /// both their resume position and the entry of their body are followed.
    fn complete_proof(
        &self,
        automaton: &Automaton,
        resume: Position,
    ) -> Result<Option<ByteRangeSet>, Error> {
        if resume == automaton.exit() {
            return Ok(None);
        }

        let mut accepted = ByteRangeSet::empty();
        let mut stack = vec![(automaton, resume)];
        let mut seen = HashSet::new();
        while let Some((current, position)) = stack.pop() {
            if !seen.insert(position) {
                continue;
            }

            for transition in current.transitions(position) {
                match (transition.target, transition.label) {
                    (Target::Concrete(_), Some(label)) => accepted = accepted.union(&label),
                    (Target::Concrete(to), None) => stack.push((current, to)),
                    (Target::Deferred(pin), label) => {
                        if label.is_some() {
                            return Err(Error::InternalInvariantViolation(format!(
                                "{pin} is reached through a byte label"
                            )));
                        }
                        stack.push((current, self.table.resume(pin)?));
                        if let Some(Repetition { body, .. }) = self.table.get(pin) {
                            stack.push((body, body.entry()));
                        }
                    }
                }
            }
        }

        let rest = accepted.complement();
        Ok((!rest.is_empty()).then_some(rest))
    }
}
