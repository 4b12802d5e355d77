use itertools::Itertools;
use symbolic_automata::prelude::*;
use tracing::trace;

use super::{Acceptance, Transduction};

/// A model that the learner can propose to the oracle. Besides answering queries the same way
/// the target does, the learner needs to know which state a word reaches, as that determines
/// the access word used during counterexample processing.
pub trait Hypothesis<A: Algebra> {
    /// The answer on a word, matching what the oracle answers on membership queries.
    type Answer;

    /// The initial state.
    fn initial(&self) -> usize;

    /// Number of states.
    fn size(&self) -> usize;

    /// The state reached from `state` on `symbol`.
    fn successor(
        &self,
        state: usize,
        symbol: A::Value,
        algebra: &A,
    ) -> Result<Option<usize>, AlgebraError>;

    /// The state reached by `word`, if the run does not get stuck.
    fn reached(&self, word: &[A::Value], algebra: &A) -> Result<Option<usize>, AlgebraError> {
        let mut state = self.initial();
        for &symbol in word {
            match self.successor(state, symbol, algebra)? {
                Some(next) => state = next,
                None => return Ok(None),
            }
        }
        Ok(Some(state))
    }

    /// What the hypothesis answers on `word`, `None` if it has no answer at all.
    fn answer(&self, word: &[A::Value], algebra: &A) -> Result<Option<Self::Answer>, AlgebraError>;
}

impl<A: Algebra> Hypothesis<A> for Sfa<A> {
    type Answer = bool;

    fn initial(&self) -> usize {
        Sfa::initial(self)
    }

    fn size(&self) -> usize {
        Sfa::size(self)
    }

    fn successor(
        &self,
        state: usize,
        symbol: A::Value,
        algebra: &A,
    ) -> Result<Option<usize>, AlgebraError> {
        Sfa::successor(self, state, symbol, algebra)
    }

    fn answer(&self, word: &[A::Value], algebra: &A) -> Result<Option<bool>, AlgebraError> {
        self.accepts(word, algebra).map(Some)
    }
}

impl<A: Algebra> Hypothesis<A> for Sft<A> {
    type Answer = Vec<A::Value>;

    fn initial(&self) -> usize {
        Sft::initial(self)
    }

    fn size(&self) -> usize {
        Sft::size(self)
    }

    fn successor(
        &self,
        state: usize,
        symbol: A::Value,
        algebra: &A,
    ) -> Result<Option<usize>, AlgebraError> {
        Sft::successor(self, state, symbol, algebra)
    }

    fn answer(
        &self,
        word: &[A::Value],
        algebra: &A,
    ) -> Result<Option<Vec<A::Value>>, AlgebraError> {
        self.output_on(word, algebra)
    }
}

/// Everything a closed table knows about the hypothesis it induces. State `i` is the `i`-th
/// short row, state `0` (the empty word) is initial.
#[derive(Debug)]
pub struct Evidence<'a, V, O> {
    /// Access word and its observation under the empty suffix, per state.
    pub states: Vec<(&'a [V], &'a O)>,
    /// For every source state and every target state the symbols observed to lead there,
    /// together with the observation made on the extended word. Every symbol appears at most
    /// once per source state.
    pub moves: Vec<Vec<Vec<(V, &'a O)>>>,
}

impl<'a, V: Symbol, O> Evidence<'a, V, O> {
    pub(crate) fn new(states: Vec<(&'a [V], &'a O)>) -> Self {
        let n = states.len();
        Self {
            states,
            moves: (0..n).map(|_| (0..n).map(|_| Vec::new()).collect()).collect(),
        }
    }

    /// Records that `symbol` leads from `from` to `to`, unless `from` already has a move on it.
    pub(crate) fn record(&mut self, from: usize, symbol: V, to: usize, observation: &'a O) -> bool {
        if self.moves[from]
            .iter()
            .any(|group| group.iter().any(|(s, _)| *s == symbol))
        {
            return false;
        }
        self.moves[from][to].push((symbol, observation));
        true
    }

    pub fn size(&self) -> usize {
        self.states.len()
    }
}

pub(crate) fn build_sfa<A: Algebra>(
    evidence: &Evidence<'_, A::Value, Acceptance>,
    algebra: &A,
) -> Result<Sfa<A>, AlgebraError> {
    let mut moves = Vec::new();
    for (from, targets) in evidence.moves.iter().enumerate() {
        let groups = targets
            .iter()
            .map(|group| group.iter().map(|(symbol, _)| *symbol).collect_vec())
            .collect_vec();
        for (to, guard) in algebra.separating_predicates(&groups)?.into_iter().enumerate() {
            if algebra.is_satisfiable(&guard)? {
                trace!("move {from} --{}--> {to}", guard.show());
                moves.push(SfaMove::new(from, guard, to));
            }
        }
    }

    let finals = evidence
        .states
        .iter()
        .enumerate()
        .filter(|(_, (_, observation))| observation.is_accepted())
        .map(|(state, _)| state)
        .collect_vec();

    Sfa::build(moves, 0, finals).complete(algebra)
}

/// All states of a learned transducer are final. A transducer that is undefined on some input
/// cannot be learned by this procedure anyway, as every query is answered with some output.
pub(crate) fn build_sft<A: Algebra>(
    evidence: &Evidence<'_, A::Value, Transduction<A::Value>>,
    algebra: &A,
) -> Result<Sft<A>, AlgebraError> {
    let mut moves = Vec::new();
    for (from, targets) in evidence.moves.iter().enumerate() {
        let groups = targets
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|(symbol, observation)| Witness {
                        value: *symbol,
                        transforms: observation
                            .produced()
                            .iter()
                            .map(|out| algebra.infer_transform(*symbol, *out))
                            .collect(),
                    })
                    .collect_vec()
            })
            .collect_vec();

        let pieces = algebra.separating_predicates_with_transforms(&groups)?;
        for (to, guarded) in pieces.into_iter().enumerate() {
            for Guarded { guard, transforms } in guarded {
                if algebra.is_satisfiable(&guard)? {
                    trace!(
                        "move {from} --{}/[{}]--> {to}",
                        guard.show(),
                        transforms.iter().map(|t| t.show()).join(", ")
                    );
                    moves.push(SftMove::new(from, guard, transforms, to));
                }
            }
        }
    }

    Ok(Sft::build(moves, 0, 0..evidence.size()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::active::Observation;

    #[test_log::test]
    fn acceptor_from_evidence() {
        let algebra = CharAlgebra::new();
        let (yes, no) = (Acceptance(true), Acceptance(false));
        let even: &[char] = &[];
        let odd: &[char] = &['a'];
        let mut evidence = Evidence::new(vec![(even, &yes), (odd, &no)]);
        assert!(evidence.record(0, 'a', 1, &no));
        assert!(!evidence.record(0, 'a', 0, &yes));
        assert!(evidence.record(1, 'a', 0, &yes));

        let sfa = <Acceptance as Observation<CharAlgebra>>::synthesize(&evidence, &algebra).unwrap();
        assert_eq!(Hypothesis::size(&sfa), 2);
        assert!(sfa.accepts(&['x', 'y'], &algebra).unwrap());
        assert!(!sfa.accepts(&['x', 'y', 'z'], &algebra).unwrap());
        assert_eq!(
            Hypothesis::reached(&sfa, &['q'], &algebra).unwrap(),
            Some(1)
        );
    }

    #[test_log::test]
    fn transducer_from_evidence() {
        let algebra = CharAlgebra::new();
        let start = Transduction::classify(&[], vec![], None);
        let plain = Transduction::classify(&['a'], vec!['a'], Some(&[][..]));
        let escaped = Transduction::classify(&['\\'], vec!['\\', '\\'], Some(&[][..]));
        let root: &[char] = &[];
        let mut evidence = Evidence::new(vec![(root, &start)]);
        evidence.record(0, 'a', 0, &plain);
        evidence.record(0, '\\', 0, &escaped);

        let sft = <Transduction<char> as Observation<CharAlgebra>>::synthesize(&evidence, &algebra)
            .unwrap();
        assert_eq!(Hypothesis::size(&sft), 1);
        assert_eq!(
            sft.output_on(&['x', '\\', 'y'], &algebra).unwrap(),
            Some(vec!['x', '\\', '\\', 'y'])
        );
    }
}
