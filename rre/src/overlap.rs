use std::collections::{HashMap, HashSet, VecDeque};

use itertools::Itertools;

use crate::{Automaton, ByteRangeSet, Error, Position, Target};

/// Two different ways through a repeated body that consume the same input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    /// The positions each way passes through, up to where they meet again.
    pub paths: [Vec<Position>; 2],
    /// For every step, bytes that both ways can consume.
    pub shared: Vec<ByteRangeSet>,
}

/// Positions linked by epsilon transitions, ending at a position that consumes input.
type Chain = Vec<Position>;

/// Chains kept per end position. Two chains with the same end already witness an overlap, and
/// every chain with that end continues the same way.
const CHAINS_PER_END: usize = 2;

struct Task {
    chains: Vec<Chain>,
    shared: Vec<ByteRangeSet>,
}

struct Prover<'a> {
    automaton: &'a Automaton,
    /// Whether `exit --ε--> entry` is missing and has to be followed as if present.
    loopback: bool,
    queue: VecDeque<Task>,
    /// Chain ends of every queued task, and whether anything was shared on the way there.
    seen: HashSet<(Vec<Position>, bool)>,
    frontiers: HashMap<Position, Vec<Chain>>,
}

impl<'a> Prover<'a> {
    fn new(automaton: &'a Automaton) -> Self {
        let (entry, exit) = (automaton.entry(), automaton.exit());
        let loopback = !automaton
            .transitions(exit)
            .iter()
            .any(|t| t.target == Target::Concrete(entry));

        Self {
            automaton,
            loopback,
            queue: VecDeque::new(),
            seen: HashSet::new(),
            frontiers: HashMap::new(),
        }
    }

    fn concrete(target: Target) -> Result<Position, Error> {
        match target {
            Target::Concrete(position) => Ok(position),
            Target::Deferred(pin) => Err(Error::InternalInvariantViolation(format!(
                "{pin} is still deferred in a repetition body"
            ))),
        }
    }

    fn epsilon_targets(&self, position: Position) -> Result<Vec<Position>, Error> {
        let mut targets = Vec::new();
        for transition in self.automaton.transitions(position) {
            let to = Self::concrete(transition.target)?;
            if transition.is_epsilon() {
                targets.push(to);
            }
        }
        if self.loopback && position == self.automaton.exit() {
            targets.push(self.automaton.entry());
        }
        Ok(targets)
    }

    /// Transitions out of `position` that consume at least one byte.
    fn consuming(&self, position: Position) -> Result<Vec<(Position, ByteRangeSet)>, Error> {
        let mut consuming = Vec::new();
        for transition in self.automaton.transitions(position) {
            let to = Self::concrete(transition.target)?;
            match transition.label {
                Some(label) if !label.is_empty() => consuming.push((to, label)),
                _ => {}
            }
        }
        Ok(consuming)
    }

    /// Chains starting at `from`, at most [`CHAINS_PER_END`] for every end. Chains that run into
    /// themselves are left out.
    fn frontiers(&mut self, from: Position) -> Result<Vec<Chain>, Error> {
        if let Some(chains) = self.frontiers.get(&from) {
            return Ok(chains.clone());
        }

        let mut chains = Vec::new();
        self.walk(from, &mut Vec::new(), &mut HashMap::new(), &mut chains)?;
        self.frontiers.insert(from, chains.clone());
        Ok(chains)
    }

    fn walk(
        &self,
        position: Position,
        prefix: &mut Chain,
        arrivals: &mut HashMap<Position, usize>,
        chains: &mut Vec<Chain>,
    ) -> Result<(), Error> {
        let arrived = arrivals.entry(position).or_default();
        if *arrived == CHAINS_PER_END {
            return Ok(());
        }
        *arrived += 1;

        prefix.push(position);
        if !self.consuming(position)?.is_empty() {
            chains.push(prefix.clone());
        }
        for to in self.epsilon_targets(position)? {
            if !prefix.contains(&to) {
                self.walk(to, prefix, arrivals, chains)?;
            }
        }
        prefix.pop();
        Ok(())
    }

    /// `chain` continued over a transition to `to` and every chain from there.
    fn extend(&mut self, chain: &[Position], to: Position) -> Result<Vec<Chain>, Error> {
        Ok(self
            .frontiers(to)?
            .into_iter()
            .map(|frontier| chain.iter().copied().chain(frontier).collect())
            .collect())
    }

    fn push(&mut self, mut chains: Vec<Chain>, shared: Vec<ByteRangeSet>) {
        let mut per_end = HashMap::new();
        chains.retain(|chain| {
            let kept = per_end.entry(chain.last().copied()).or_insert(0);
            *kept += 1;
            *kept <= CHAINS_PER_END
        });

        let mut ends: Vec<Position> = chains.iter().filter_map(|c| c.last().copied()).collect();
        if ends.is_empty() {
            return;
        }
        ends.sort();

        if self.seen.insert((ends, !shared.is_empty())) {
            self.queue.push_back(Task { chains, shared });
        }
    }

    fn advance(&mut self, task: Task) -> Result<Option<Overlap>, Error> {
        for (first, second) in task.chains.iter().tuple_combinations() {
            let (Some(&a), Some(&b)) = (first.last(), second.last()) else {
                continue;
            };

            if a == b && !task.shared.is_empty() {
                return Ok(Some(Overlap {
                    paths: [first.clone(), second.clone()],
                    shared: task.shared.clone(),
                }));
            }

            for (to_a, set_a) in self.consuming(a)? {
                for (to_b, set_b) in self.consuming(b)? {
                    let both = set_a.intersection(&set_b);
                    if both.is_empty() {
                        continue;
                    }

                    let mut chains = self.extend(first, to_a)?;
                    chains.extend(self.extend(second, to_b)?);
                    self.push(chains, with(&task.shared, both));
                }
            }
        }

        for chain in &task.chains {
            let Some(&end) = chain.last() else {
                continue;
            };
            for (to, set) in self.consuming(end)? {
                let chains = self.extend(chain, to)?;
                self.push(chains, with(&task.shared, set));
            }
        }

        Ok(None)
    }
}

fn with(shared: &[ByteRangeSet], next: ByteRangeSet) -> Vec<ByteRangeSet> {
    let mut shared = shared.to_vec();
    shared.push(next);
    shared
}

/// Looks for two ways through `automaton`, read as the body of a loop, that consume the same
/// bytes and end up at the same position. Such a body can split one input over its iterations
/// in exponentially many ways.
///
/// At most `task_limit` tasks are processed, so `None` does not prove the body unambiguous.
/// The body must not contain deferred repetitions.
pub fn find_overlap(automaton: &Automaton, task_limit: usize) -> Result<Option<Overlap>, Error> {
    let mut prover = Prover::new(automaton);
    let start = prover.frontiers(automaton.entry())?;
    prover.push(start, Vec::new());

    let mut processed = 0;
    while let Some(task) = prover.queue.pop_front() {
        if processed == task_limit {
            log::debug!("task limit of {task_limit} reached without an overlap");
            return Ok(None);
        }
        processed += 1;

        if let Some(overlap) = prover.advance(task)? {
            log::debug!("overlap found in task {processed}");
            return Ok(Some(overlap));
        }
    }

    Ok(None)
}
