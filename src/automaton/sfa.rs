use std::collections::BTreeSet;

use itertools::Itertools;
use tracing::trace;

use crate::{Algebra, AlgebraError, Show};

/// A guarded move of a symbolic automaton.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SfaMove<P> {
    /// Source state.
    pub from: usize,
    /// The set of values on which the move is taken.
    pub guard: P,
    /// Target state.
    pub to: usize,
}

impl<P> SfaMove<P> {
    /// Creates a new move.
    pub fn new(from: usize, guard: P, to: usize) -> Self {
        Self { from, guard, to }
    }
}

/// A symbolic finite automaton. States are `0..size()`, the moves leaving a state are expected
/// to carry pairwise disjoint guards. If they do not, the first matching move wins.
#[derive(Clone, Debug)]
pub struct Sfa<A: Algebra> {
    states: usize,
    initial: usize,
    finals: BTreeSet<usize>,
    moves: Vec<SfaMove<A::Predicate>>,
}

impl<A: Algebra> Sfa<A> {
    /// Builds an automaton from its moves, initial state and final states. The number of states
    /// is the smallest one that accommodates every mentioned index.
    pub fn build<M, F>(moves: M, initial: usize, finals: F) -> Self
    where
        M: IntoIterator<Item = SfaMove<A::Predicate>>,
        F: IntoIterator<Item = usize>,
    {
        let moves = moves.into_iter().collect_vec();
        let finals: BTreeSet<usize> = finals.into_iter().collect();
        let states = super::state_count(
            moves
                .iter()
                .flat_map(|m| [m.from, m.to])
                .chain(finals.iter().copied())
                .chain(std::iter::once(initial)),
        );
        Self {
            states,
            initial,
            finals,
            moves,
        }
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.states
    }

    /// The initial state.
    pub fn initial(&self) -> usize {
        self.initial
    }

    /// Whether `state` is final.
    pub fn is_final(&self, state: usize) -> bool {
        self.finals.contains(&state)
    }

    /// Iterates over the final states in increasing order.
    pub fn finals(&self) -> impl Iterator<Item = usize> + '_ {
        self.finals.iter().copied()
    }

    /// All moves, in insertion order.
    pub fn moves(&self) -> &[SfaMove<A::Predicate>] {
        &self.moves
    }

    /// The moves leaving `state`.
    pub fn moves_from(&self, state: usize) -> impl Iterator<Item = &SfaMove<A::Predicate>> + '_ {
        self.moves.iter().filter(move |m| m.from == state)
    }

    /// The state reached from `state` on `symbol`, if any move admits it.
    pub fn successor(
        &self,
        state: usize,
        symbol: A::Value,
        algebra: &A,
    ) -> Result<Option<usize>, AlgebraError> {
        for m in self.moves_from(state) {
            if algebra.has_model(&m.guard, symbol)? {
                return Ok(Some(m.to));
            }
        }
        Ok(None)
    }

    /// Runs `word` from the initial state, returning the reached state if the run never gets
    /// stuck.
    pub fn run(&self, word: &[A::Value], algebra: &A) -> Result<Option<usize>, AlgebraError> {
        let mut state = self.initial;
        for &symbol in word {
            match self.successor(state, symbol, algebra)? {
                Some(next) => state = next,
                None => return Ok(None),
            }
        }
        Ok(Some(state))
    }

    /// Decides whether `word` is accepted.
    pub fn accepts(&self, word: &[A::Value], algebra: &A) -> Result<bool, AlgebraError> {
        Ok(self
            .run(word, algebra)?
            .is_some_and(|state| self.is_final(state)))
    }

    /// Adds a rejecting sink and routes every value that no move of a state admits to it. The
    /// sink is only created if some state actually is incomplete.
    pub fn complete(mut self, algebra: &A) -> Result<Self, AlgebraError> {
        let mut missing = Vec::new();
        for state in 0..self.states {
            let covered = self
                .moves_from(state)
                .try_fold(algebra.bottom(), |acc, m| algebra.or(&acc, &m.guard))?;
            let rest = algebra.not(&covered)?;
            if algebra.is_satisfiable(&rest)? {
                missing.push((state, rest));
            }
        }
        if missing.is_empty() {
            return Ok(self);
        }

        let sink = self.states;
        trace!("completing {} states with sink {sink}", missing.len());
        self.states += 1;
        self.moves.extend(
            missing
                .into_iter()
                .map(|(state, guard)| SfaMove::new(state, guard, sink)),
        );
        self.moves.push(SfaMove::new(sink, algebra.top(), sink));
        Ok(self)
    }
}

impl<A: Algebra> std::fmt::Display for Sfa<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "SFA with {} states, initial {}, final {{{}}}",
            self.states,
            self.initial,
            self.finals.iter().join(", ")
        )?;
        for m in &self.moves {
            writeln!(f, "  {} --{}--> {}", m.from, m.guard.show(), m.to)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CharAlgebra, CharPred};

    fn contains_digit() -> Sfa<CharAlgebra> {
        let digits = CharPred::range('0', '9');
        Sfa::build(
            [
                SfaMove::new(0, digits.clone(), 1),
                SfaMove::new(0, digits.complement(), 0),
                SfaMove::new(1, CharPred::full(), 1),
            ],
            0,
            [1],
        )
    }

    #[test_log::test]
    fn acceptance() {
        let algebra = CharAlgebra::new();
        let sfa = contains_digit();
        assert_eq!(sfa.size(), 2);
        assert!(sfa.accepts(&['a', '4', 'b'], &algebra).unwrap());
        assert!(!sfa.accepts(&['a', 'b'], &algebra).unwrap());
        assert!(!sfa.accepts(&[], &algebra).unwrap());
        assert_eq!(sfa.run(&['x', '7'], &algebra).unwrap(), Some(1));
    }

    #[test_log::test]
    fn completion_adds_sink_only_when_needed() {
        let algebra = CharAlgebra::new();
        let complete = contains_digit().complete(&algebra).unwrap();
        assert_eq!(complete.size(), 2);

        let partial: Sfa<CharAlgebra> =
            Sfa::build([SfaMove::new(0, CharPred::single('a'), 0)], 0, [0]);
        assert_eq!(partial.run(&['b'], &algebra).unwrap(), None);
        let completed = partial.complete(&algebra).unwrap();
        assert_eq!(completed.size(), 2);
        assert_eq!(completed.run(&['b', 'a'], &algebra).unwrap(), Some(1));
        assert!(!completed.accepts(&['a', 'b'], &algebra).unwrap());
        assert!(completed.accepts(&['a', 'a'], &algebra).unwrap());
    }
}
