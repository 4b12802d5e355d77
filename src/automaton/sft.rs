use std::collections::BTreeSet;

use itertools::Itertools;

use crate::{Algebra, AlgebraError, Show};

/// A guarded move of a symbolic transducer. Reading a value `v` admitted by the guard emits
/// `outputs[0](v) .. outputs[k](v)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SftMove<P, F> {
    /// Source state.
    pub from: usize,
    /// The set of values on which the move is taken.
    pub guard: P,
    /// One term function per emitted symbol, possibly none.
    pub outputs: Vec<F>,
    /// Target state.
    pub to: usize,
}

impl<P, F> SftMove<P, F> {
    /// Creates a new move.
    pub fn new(from: usize, guard: P, outputs: Vec<F>, to: usize) -> Self {
        Self {
            from,
            guard,
            outputs,
            to,
        }
    }
}

/// A symbolic finite transducer with term-function outputs on its moves. Like [`crate::Sfa`],
/// the first move whose guard admits a value is taken.
#[derive(Clone, Debug)]
pub struct Sft<A: Algebra> {
    states: usize,
    initial: usize,
    finals: BTreeSet<usize>,
    moves: Vec<SftMove<A::Predicate, A::Transform>>,
}

impl<A: Algebra> Sft<A> {
    /// Builds a transducer from its moves, initial state and final states.
    pub fn build<M, F>(moves: M, initial: usize, finals: F) -> Self
    where
        M: IntoIterator<Item = SftMove<A::Predicate, A::Transform>>,
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

    /// All moves, in insertion order.
    pub fn moves(&self) -> &[SftMove<A::Predicate, A::Transform>] {
        &self.moves
    }

    /// The first move leaving `state` that admits `symbol`.
    pub fn step(
        &self,
        state: usize,
        symbol: A::Value,
        algebra: &A,
    ) -> Result<Option<&SftMove<A::Predicate, A::Transform>>, AlgebraError> {
        for m in self.moves.iter().filter(|m| m.from == state) {
            if algebra.has_model(&m.guard, symbol)? {
                return Ok(Some(m));
            }
        }
        Ok(None)
    }

    /// The state reached from `state` on `symbol`.
    pub fn successor(
        &self,
        state: usize,
        symbol: A::Value,
        algebra: &A,
    ) -> Result<Option<usize>, AlgebraError> {
        Ok(self.step(state, symbol, algebra)?.map(|m| m.to))
    }

    /// Computes the output on `word`, or `None` if the run gets stuck or ends in a state that
    /// is not final.
    pub fn output_on(
        &self,
        word: &[A::Value],
        algebra: &A,
    ) -> Result<Option<Vec<A::Value>>, AlgebraError> {
        let mut state = self.initial;
        let mut out = Vec::with_capacity(word.len());
        for &symbol in word {
            let Some(m) = self.step(state, symbol, algebra)? else {
                return Ok(None);
            };
            out.extend(m.outputs.iter().map(|f| algebra.apply(f, symbol)));
            state = m.to;
        }
        Ok(self.is_final(state).then_some(out))
    }
}

impl<A: Algebra> std::fmt::Display for Sft<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "SFT with {} states, initial {}, final {{{}}}",
            self.states,
            self.initial,
            self.finals.iter().join(", ")
        )?;
        for m in &self.moves {
            writeln!(
                f,
                "  {} --{}/[{}]--> {}",
                m.from,
                m.guard.show(),
                m.outputs.iter().map(|o| o.show()).join(", "),
                m.to
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CharAlgebra, CharFunc, CharPred};

    #[test_log::test]
    fn uppercase_x_and_drop_y() {
        let algebra = CharAlgebra::new();
        let sft: Sft<CharAlgebra> = Sft::build(
            [
                SftMove::new(0, CharPred::single('x'), vec![CharFunc::Constant('X')], 0),
                SftMove::new(0, CharPred::single('y'), vec![], 0),
                SftMove::new(
                    0,
                    CharPred::from_chars(['x', 'y']).complement(),
                    vec![CharFunc::Identity, CharFunc::Identity],
                    0,
                ),
            ],
            0,
            [0],
        );
        assert_eq!(sft.size(), 1);
        assert_eq!(
            sft.output_on(&['a', 'x', 'y', 'b'], &algebra).unwrap(),
            Some(vec!['a', 'a', 'X', 'b', 'b'])
        );
        assert_eq!(sft.output_on(&[], &algebra).unwrap(), Some(vec![]));
    }

    #[test]
    fn stuck_or_non_final_runs_have_no_output() {
        let algebra = CharAlgebra::new();
        let sft: Sft<CharAlgebra> = Sft::build(
            [SftMove::new(0, CharPred::single('a'), vec![CharFunc::Identity], 1)],
            0,
            [1],
        );
        assert_eq!(sft.output_on(&['a'], &algebra).unwrap(), Some(vec!['a']));
        assert_eq!(sft.output_on(&[], &algebra).unwrap(), None);
        assert_eq!(sft.output_on(&['b'], &algebra).unwrap(), None);
        assert_eq!(sft.successor(0, 'a', &algebra).unwrap(), Some(1));
    }
}
