use std::{
    marker::PhantomData,
    time::{Duration, Instant},
};

use itertools::Itertools;
use symbolic_automata::prelude::*;
use thiserror::Error;
use tracing::{debug, trace};

use super::Hypothesis;

/// Errors an oracle may raise while answering a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The equivalence check ran out of budget before it could reach a verdict. This is
    /// different from finding no counterexample, which means the hypothesis is accepted.
    #[error("equivalence check exhausted its budget without a verdict")]
    Exhausted,
    /// The oracle itself relies on an algebra which failed.
    #[error(transparent)]
    Algebra(#[from] AlgebraError),
    /// The target could not answer a query.
    #[error("target could not answer: {0}")]
    Target(String),
}

/// A trait that encapsulates a minimally adequate teacher (MAT) for active learning. It answers
/// membership queries on single words and equivalence queries on whole hypotheses.
///
/// For learning an acceptor the answer is a `bool`, for a transducer it is the output word. An
/// equivalence query returns `Ok(None)` if the hypothesis is accepted and a counterexample,
/// i.e. a word on which hypothesis and target disagree, otherwise.
pub trait Oracle {
    type Symbol: Symbol;
    type Answer: Clone + Eq + std::fmt::Debug;
    type Hypothesis;

    fn membership(&mut self, word: &[Self::Symbol]) -> Result<Self::Answer, OracleError>;

    fn equivalence(
        &mut self,
        hypothesis: &Self::Hypothesis,
    ) -> Result<Option<Vec<Self::Symbol>>, OracleError>;
}

/// Number of queries that were posed to an oracle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub membership: usize,
    pub equivalence: usize,
}

/// Wraps an oracle and counts the queries passing through.
#[derive(Debug, Clone)]
pub struct Counted<T> {
    inner: T,
    stats: QueryStats,
}

impl<T> Counted<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            stats: QueryStats::default(),
        }
    }

    pub fn stats(&self) -> QueryStats {
        self.stats
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Oracle> Oracle for Counted<T> {
    type Symbol = T::Symbol;
    type Answer = T::Answer;
    type Hypothesis = T::Hypothesis;

    fn membership(&mut self, word: &[T::Symbol]) -> Result<T::Answer, OracleError> {
        self.stats.membership += 1;
        self.inner.membership(word)
    }

    fn equivalence(
        &mut self,
        hypothesis: &T::Hypothesis,
    ) -> Result<Option<Vec<T::Symbol>>, OracleError> {
        self.stats.equivalence += 1;
        self.inner.equivalence(hypothesis)
    }
}

/// Enumerates all words over `symbols` of length at most `max_length` in length-lexicographic
/// order, starting with the empty word.
fn words_up_to<V: Copy>(symbols: &[V], max_length: usize) -> impl Iterator<Item = Vec<V>> + '_ {
    std::iter::once(Vec::new()).chain((1..=max_length).flat_map(move |length| {
        (0..length)
            .map(|_| symbols.iter().copied())
            .multi_cartesian_product()
    }))
}

/// Returns the first enumerated word on which `differs` holds.
fn first_difference<V, E, F>(
    symbols: &[V],
    max_length: usize,
    mut differs: F,
) -> Result<Option<Vec<V>>, E>
where
    V: Symbol,
    F: FnMut(&[V]) -> Result<bool, E>,
{
    for word in words_up_to(symbols, max_length) {
        if differs(&word)? {
            trace!("found counterexample {}", word.show());
            return Ok(Some(word));
        }
    }
    Ok(None)
}

/// An oracle backed by a plain function. Equivalence is checked by exhaustively testing all
/// words over a finite sample of symbols up to a bounded length, so the shortest
/// counterexample over the sample is found first.
pub struct FunctionOracle<A: Algebra, H, F> {
    algebra: A,
    target: F,
    symbols: Vec<A::Value>,
    max_length: usize,
    _hypothesis: PhantomData<fn(&H)>,
}

impl<A: Algebra, H, F> FunctionOracle<A, H, F> {
    pub fn new(algebra: A, target: F, symbols: Vec<A::Value>, max_length: usize) -> Self {
        Self {
            algebra,
            target,
            symbols,
            max_length,
            _hypothesis: PhantomData,
        }
    }
}

impl<A, H, F, R> Oracle for FunctionOracle<A, H, F>
where
    A: Algebra,
    H: Hypothesis<A, Answer = R>,
    F: FnMut(&[A::Value]) -> R,
    R: Clone + Eq + std::fmt::Debug,
{
    type Symbol = A::Value;
    type Answer = R;
    type Hypothesis = H;

    fn membership(&mut self, word: &[A::Value]) -> Result<R, OracleError> {
        Ok((self.target)(word))
    }

    fn equivalence(&mut self, hypothesis: &H) -> Result<Option<Vec<A::Value>>, OracleError> {
        let algebra = &self.algebra;
        let target = &mut self.target;
        first_difference(&self.symbols, self.max_length, |word| {
            let expected = target(word);
            Ok(hypothesis.answer(word, algebra)?.as_ref() != Some(&expected))
        })
    }
}

/// An oracle that tests hypotheses on randomly drawn words. Drawing is seeded, so runs are
/// reproducible. A failing word is shortened to its shortest failing prefix before it is
/// handed out.
///
/// When a time budget is set and runs out before all tests are done, the equivalence query
/// fails with [`OracleError::Exhausted`] instead of accepting the hypothesis.
pub struct RandomOracle<A: Algebra, H, F> {
    algebra: A,
    target: F,
    symbols: Vec<A::Value>,
    tests: usize,
    max_length: usize,
    budget: Option<Duration>,
    rng: fastrand::Rng,
    _hypothesis: PhantomData<fn(&H)>,
}

impl<A: Algebra, H, F> RandomOracle<A, H, F> {
    pub fn new(
        algebra: A,
        target: F,
        symbols: Vec<A::Value>,
        tests: usize,
        max_length: usize,
        seed: u64,
    ) -> Self {
        Self {
            algebra,
            target,
            symbols,
            tests,
            max_length,
            budget: None,
            rng: fastrand::Rng::with_seed(seed),
            _hypothesis: PhantomData,
        }
    }

    pub fn with_budget(self, budget: Duration) -> Self {
        Self {
            budget: Some(budget),
            ..self
        }
    }

    fn draw(&mut self) -> Vec<A::Value> {
        if self.symbols.is_empty() {
            return Vec::new();
        }
        let length = self.rng.usize(0..=self.max_length);
        (0..length)
            .map(|_| self.symbols[self.rng.usize(..self.symbols.len())])
            .collect()
    }
}

impl<A, H, F, R> Oracle for RandomOracle<A, H, F>
where
    A: Algebra,
    H: Hypothesis<A, Answer = R>,
    F: FnMut(&[A::Value]) -> R,
    R: Clone + Eq + std::fmt::Debug,
{
    type Symbol = A::Value;
    type Answer = R;
    type Hypothesis = H;

    fn membership(&mut self, word: &[A::Value]) -> Result<R, OracleError> {
        Ok((self.target)(word))
    }

    fn equivalence(&mut self, hypothesis: &H) -> Result<Option<Vec<A::Value>>, OracleError> {
        let start = Instant::now();
        for test in 0..self.tests {
            if self.budget.is_some_and(|budget| start.elapsed() >= budget) {
                debug!("random testing ran out of time after {test} tests");
                return Err(OracleError::Exhausted);
            }

            let word = self.draw();
            let differs = |target: &mut F, word: &[A::Value]| -> Result<bool, OracleError> {
                let expected = target(word);
                Ok(hypothesis.answer(word, &self.algebra)?.as_ref() != Some(&expected))
            };
            if !differs(&mut self.target, &word)? {
                continue;
            }
            for length in 0..word.len() {
                if differs(&mut self.target, &word[..length])? {
                    return Ok(Some(word[..length].to_vec()));
                }
            }
            return Ok(Some(word));
        }
        Ok(None)
    }
}

/// An oracle whose target is a known symbolic automaton. Equivalence is checked by testing all
/// words over a sample of symbols up to a bounded length.
#[derive(Debug, Clone)]
pub struct SfaOracle<A: Algebra> {
    target: Sfa<A>,
    algebra: A,
    symbols: Vec<A::Value>,
    max_length: usize,
}

impl<A: Algebra> SfaOracle<A> {
    pub fn new(target: Sfa<A>, algebra: A, symbols: Vec<A::Value>, max_length: usize) -> Self {
        Self {
            target,
            algebra,
            symbols,
            max_length,
        }
    }
}

impl<A: Algebra> Oracle for SfaOracle<A> {
    type Symbol = A::Value;
    type Answer = bool;
    type Hypothesis = Sfa<A>;

    fn membership(&mut self, word: &[A::Value]) -> Result<bool, OracleError> {
        Ok(self.target.accepts(word, &self.algebra)?)
    }

    fn equivalence(&mut self, hypothesis: &Sfa<A>) -> Result<Option<Vec<A::Value>>, OracleError> {
        first_difference(&self.symbols, self.max_length, |word| {
            Ok::<_, OracleError>(
                self.target.accepts(word, &self.algebra)?
                    != hypothesis.accepts(word, &self.algebra)?,
            )
        })
    }
}

/// An oracle whose target is a known symbolic transducer. Membership queries on words the
/// target is undefined on fail with [`OracleError::Target`].
#[derive(Debug, Clone)]
pub struct SftOracle<A: Algebra> {
    target: Sft<A>,
    algebra: A,
    symbols: Vec<A::Value>,
    max_length: usize,
}

impl<A: Algebra> SftOracle<A> {
    pub fn new(target: Sft<A>, algebra: A, symbols: Vec<A::Value>, max_length: usize) -> Self {
        Self {
            target,
            algebra,
            symbols,
            max_length,
        }
    }

    fn output(&self, word: &[A::Value]) -> Result<Vec<A::Value>, OracleError> {
        self.target
            .output_on(word, &self.algebra)?
            .ok_or_else(|| OracleError::Target(format!("no output on {}", word.show())))
    }
}

impl<A: Algebra> Oracle for SftOracle<A> {
    type Symbol = A::Value;
    type Answer = Vec<A::Value>;
    type Hypothesis = Sft<A>;

    fn membership(&mut self, word: &[A::Value]) -> Result<Vec<A::Value>, OracleError> {
        self.output(word)
    }

    fn equivalence(&mut self, hypothesis: &Sft<A>) -> Result<Option<Vec<A::Value>>, OracleError> {
        first_difference(&self.symbols, self.max_length, |word| {
            Ok::<_, OracleError>(
                Some(self.output(word)?) != hypothesis.output_on(word, &self.algebra)?,
            )
        })
    }
}
