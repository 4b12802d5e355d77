use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

use symbolic_automata::prelude::*;

use super::{
    hypothesis::{build_sfa, build_sft},
    CounterexampleStrategy, Evidence, Hypothesis,
};

/// What the learner records in a single cell of the observation table. Implemented for
/// acceptors ([`Acceptance`]) and transducers ([`Transduction`]), this is the only place where
/// the two learning modes differ.
pub trait Observation<A: Algebra>: Clone + Debug {
    /// What the oracle answers on a membership query.
    type Answer: Clone + Eq + Debug;
    /// The part of an observation that rows are compared by.
    type Signature: Clone + Eq + Hash + Debug + Show;
    /// The kind of model that is synthesized from a closed and consistent table.
    type Hypothesis: Hypothesis<A, Answer = Self::Answer> + Clone + Debug + Display;

    /// Whether the stabilization loop should run the distribute step.
    const DISTRIBUTES: bool;
    /// How counterexamples are processed unless configured otherwise.
    const DEFAULT_STRATEGY: CounterexampleStrategy;

    /// Observes `word`, asking `query` for the answers it needs.
    fn observe<E, Q>(word: &[A::Value], query: Q) -> Result<Self, E>
    where
        Q: FnMut(&[A::Value]) -> Result<Self::Answer, E>;

    /// The signature rows are built from.
    fn signature(&self) -> Self::Signature;

    /// The answer the oracle gave on the observed word.
    fn answer(&self) -> &Self::Answer;

    /// Turns the evidence collected from a closed table into a hypothesis.
    fn synthesize(
        evidence: &Evidence<'_, A::Value, Self>,
        algebra: &A,
    ) -> Result<Self::Hypothesis, AlgebraError>;
}

/// Whether a word belongs to the target language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Acceptance(pub bool);

impl Acceptance {
    pub fn is_accepted(&self) -> bool {
        self.0
    }
}

impl<A: Algebra> Observation<A> for Acceptance {
    type Answer = bool;
    type Signature = bool;
    type Hypothesis = Sfa<A>;

    const DISTRIBUTES: bool = false;
    const DEFAULT_STRATEGY: CounterexampleStrategy = CounterexampleStrategy::Prefixes;

    fn observe<E, Q>(word: &[A::Value], mut query: Q) -> Result<Self, E>
    where
        Q: FnMut(&[A::Value]) -> Result<bool, E>,
    {
        query(word).map(Acceptance)
    }

    fn signature(&self) -> bool {
        self.0
    }

    fn answer(&self) -> &bool {
        &self.0
    }

    fn synthesize(
        evidence: &Evidence<'_, A::Value, Self>,
        algebra: &A,
    ) -> Result<Sfa<A>, AlgebraError> {
        build_sfa(evidence, algebra)
    }
}

/// How a single produced output symbol relates to the input symbol that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputKind {
    /// The output symbol equals the input symbol.
    Identity,
    /// The output symbol differs from the input symbol, or nothing was produced.
    Constant,
}

impl Show for OutputKind {
    fn show(&self) -> String {
        match self {
            OutputKind::Identity => "I",
            OutputKind::Constant => "C",
        }
        .to_string()
    }

    fn show_collection<'a, I>(iter: I) -> String
    where
        Self: 'a,
        I: IntoIterator<Item = &'a Self>,
    {
        iter.into_iter().map(|k| k.show()).collect()
    }
}

/// The output of a transducer on a word, together with the part that the last input symbol
/// produced and a classification of that part.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Transduction<V> {
    output: Vec<V>,
    produced: Vec<V>,
    kinds: Vec<OutputKind>,
}

impl<V: Symbol> Transduction<V> {
    /// Classifies the output of `word` given the output on `word` without its last symbol.
    ///
    /// The empty word is classified as identity if it produces nothing and as constant
    /// otherwise. A non-empty word that produces nothing on its last symbol is classified as a
    /// single constant. In all other cases each produced symbol is an identity if it equals the
    /// last input symbol and a constant otherwise.
    pub fn classify(word: &[V], output: Vec<V>, previous: Option<&[V]>) -> Self {
        let Some(&last) = word.last() else {
            let kinds = if output.is_empty() {
                vec![OutputKind::Identity]
            } else {
                vec![OutputKind::Constant]
            };
            return Self {
                produced: output.clone(),
                output,
                kinds,
            };
        };

        let produced = previous
            .and_then(|previous| output.strip_prefix(previous))
            .unwrap_or(&output)
            .to_vec();
        let kinds = if produced.is_empty() {
            vec![OutputKind::Constant]
        } else {
            produced
                .iter()
                .map(|&c| {
                    if c == last {
                        OutputKind::Identity
                    } else {
                        OutputKind::Constant
                    }
                })
                .collect()
        };
        Self {
            output,
            produced,
            kinds,
        }
    }

    /// The complete output on the observed word.
    pub fn output(&self) -> &[V] {
        &self.output
    }

    /// The symbols that the last input symbol produced.
    pub fn produced(&self) -> &[V] {
        &self.produced
    }

    /// The classification of [`Self::produced`].
    pub fn kinds(&self) -> &[OutputKind] {
        &self.kinds
    }
}

impl<A, V> Observation<A> for Transduction<V>
where
    A: Algebra<Value = V>,
    V: Symbol,
{
    type Answer = Vec<V>;
    type Signature = Vec<OutputKind>;
    type Hypothesis = Sft<A>;

    const DISTRIBUTES: bool = true;
    const DEFAULT_STRATEGY: CounterexampleStrategy = CounterexampleStrategy::BinarySearch;

    fn observe<E, Q>(word: &[V], mut query: Q) -> Result<Self, E>
    where
        Q: FnMut(&[V]) -> Result<Vec<V>, E>,
    {
        let output = query(word)?;
        match word.split_last() {
            None => Ok(Self::classify(word, output, None)),
            Some((_, prefix)) => {
                let previous = query(prefix)?;
                Ok(Self::classify(word, output, Some(previous.as_slice())))
            }
        }
    }

    fn signature(&self) -> Vec<OutputKind> {
        self.kinds.clone()
    }

    fn answer(&self) -> &Vec<V> {
        &self.output
    }

    fn synthesize(
        evidence: &Evidence<'_, V, Self>,
        algebra: &A,
    ) -> Result<Sft<A>, AlgebraError> {
        build_sft(evidence, algebra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OutputKind::*;

    #[test]
    fn classification() {
        let empty = Transduction::<char>::classify(&[], vec![], None);
        assert_eq!(empty.kinds(), &[Identity]);
        let eager = Transduction::<char>::classify(&[], vec!['!'], None);
        assert_eq!(eager.kinds(), &[Constant]);

        let echoed = Transduction::classify(&['a', 'b'], vec!['a', 'b'], Some(&['a'][..]));
        assert_eq!(echoed.produced(), &['b']);
        assert_eq!(echoed.kinds(), &[Identity]);

        let escaped = Transduction::classify(&['\\'], vec!['\\', '\\'], Some(&[][..]));
        assert_eq!(escaped.kinds(), &[Identity, Identity]);

        let swallowed = Transduction::classify(&['a', 'b'], vec!['a'], Some(&['a'][..]));
        assert!(swallowed.produced().is_empty());
        assert_eq!(swallowed.kinds(), &[Constant]);

        let replaced = Transduction::classify(&['x'], vec!['y', 'x'], Some(&[][..]));
        assert_eq!(replaced.kinds(), &[Constant, Identity]);
        assert_eq!(replaced.output(), &['y', 'x']);
    }

    #[test]
    fn observing_asks_for_the_prefix() {
        let mut asked = vec![];
        let observed: Transduction<char> =
            <Transduction<char> as Observation<CharAlgebra>>::observe(&['a', 'b'], |w| {
                asked.push(w.to_vec());
                Ok::<_, ()>(w.to_vec())
            })
            .unwrap();
        assert_eq!(asked, vec![vec!['a', 'b'], vec!['a']]);
        assert_eq!(
            <Transduction<char> as Observation<CharAlgebra>>::signature(&observed),
            vec![Identity]
        );

        let accepted =
            <Acceptance as Observation<CharAlgebra>>::observe(&['a'], |w| Ok::<_, ()>(w.len() == 1))
                .unwrap();
        assert!(accepted.is_accepted());
    }
}
