use std::time::{Duration, Instant};

use symbolic_automata::prelude::*;
use thiserror::Error;
use tracing::{debug, info, trace, warn, Level};

use super::{
    Acceptance, CounterexampleStrategy, Counted, Hypothesis, Observation, ObservationTable,
    Oracle, OracleError, QueryStats, Transduction,
};

const ITERATION_THRESHOLD: usize = if cfg!(debug_assertions) { 300 } else { 200000 };

/// Reasons for a learning run to stop without a confirmed hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LearningError {
    #[error(transparent)]
    Algebra(#[from] AlgebraError),
    #[error(transparent)]
    Oracle(OracleError),
    /// The oracle could neither confirm the hypothesis nor produce a counterexample in time.
    #[error("equivalence check was inconclusive")]
    Inconclusive,
    #[error("counterexample {counterexample} does not run through the hypothesis")]
    MalformedCounterexample { counterexample: String },
    #[error("counterexample {counterexample} did not change the table")]
    NoProgress { counterexample: String },
    #[error("no hypothesis confirmed after {0} iterations")]
    IterationLimit(usize),
    #[error("learning exceeded its time budget of {0:?}")]
    TimedOut(Duration),
    /// The algebra could not produce a single value to start from.
    #[error("the algebra admits no values")]
    EmptyDomain,
    /// A hypothesis was requested from a table that is not closed.
    #[error("row of {word} has no equal among the states")]
    OpenTable { word: String },
}

impl From<OracleError> for LearningError {
    fn from(value: OracleError) -> Self {
        match value {
            OracleError::Exhausted => LearningError::Inconclusive,
            OracleError::Algebra(err) => LearningError::Algebra(err),
            other => LearningError::Oracle(other),
        }
    }
}

/// Returned when learning stops early, carries the last hypothesis that was built, if any.
#[derive(Debug, Error)]
#[error("learning aborted: {error}")]
pub struct Aborted<H: std::fmt::Debug> {
    pub best: Option<H>,
    #[source]
    pub error: LearningError,
}

/// Knobs of a learning run.
#[derive(Debug, Clone)]
pub struct LearnerConfig {
    /// Maximal number of equivalence queries. Defaults to the `MAX_ITERATIONS` environment
    /// variable if it is set and parses, and to a build-dependent threshold otherwise.
    pub max_iterations: usize,
    /// Wall-clock budget for the whole run, checked before every iteration.
    pub time_budget: Option<Duration>,
    /// Overrides how counterexamples are processed.
    pub strategy: Option<CounterexampleStrategy>,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        let max_iterations = std::env::var("MAX_ITERATIONS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(ITERATION_THRESHOLD);
        Self {
            max_iterations,
            time_budget: None,
            strategy: None,
        }
    }
}

impl LearnerConfig {
    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    pub fn with_time_budget(self, time_budget: Duration) -> Self {
        Self {
            time_budget: Some(time_budget),
            ..self
        }
    }

    pub fn with_strategy(self, strategy: CounterexampleStrategy) -> Self {
        Self {
            strategy: Some(strategy),
            ..self
        }
    }
}

/// An implementation of the symbolic L* algorithm. What is learned depends on the
/// [`Observation`] type: [`Acceptance`] learns symbolic automata, [`Transduction`] learns
/// symbolic transducers.
pub struct Learner<A: Algebra, O: Observation<A>, T> {
    algebra: A,
    oracle: Counted<T>,
    table: ObservationTable<A, O>,
    config: LearnerConfig,
}

/// Learns a [`Sfa`].
pub type SfaLearner<A, T> = Learner<A, Acceptance, T>;
/// Learns a [`Sft`].
pub type SftLearner<A, T> = Learner<A, Transduction<<A as Algebra>::Value>, T>;

impl<A, O, T> Learner<A, O, T>
where
    A: Algebra,
    O: Observation<A>,
    T: Oracle<Symbol = A::Value, Answer = O::Answer, Hypothesis = O::Hypothesis>,
{
    /// Creates a learner whose initial boundary row is a witness of the full predicate.
    pub fn new(algebra: A, oracle: T) -> Result<Self, LearningError> {
        let seed = algebra
            .witness(&algebra.top())?
            .ok_or(LearningError::EmptyDomain)?;
        Ok(Self::with_seed(algebra, oracle, seed))
    }

    /// Creates a learner whose initial boundary row is `seed`.
    pub fn with_seed(algebra: A, oracle: T, seed: A::Value) -> Self {
        Self {
            algebra,
            oracle: Counted::new(oracle),
            table: ObservationTable::new(seed),
            config: LearnerConfig::default(),
        }
    }

    pub fn with_config(self, config: LearnerConfig) -> Self {
        Self { config, ..self }
    }

    pub fn table(&self) -> &ObservationTable<A, O> {
        &self.table
    }

    pub fn algebra(&self) -> &A {
        &self.algebra
    }

    pub fn oracle(&self) -> &T {
        self.oracle.inner()
    }

    pub fn stats(&self) -> QueryStats {
        self.oracle.stats()
    }

    fn strategy(&self) -> CounterexampleStrategy {
        self.config.strategy.unwrap_or(O::DEFAULT_STRATEGY)
    }

    /// Runs the learning loop until the oracle accepts a hypothesis. If the run is cut short,
    /// the last hypothesis that was built is returned along with the reason.
    pub fn infer(&mut self) -> Result<O::Hypothesis, Aborted<O::Hypothesis>> {
        let start = Instant::now();
        let mut best = None;
        match self.run(start, &mut best) {
            Ok(hypothesis) => {
                let stats = self.stats();
                info!(
                    "learned hypothesis with {} states using {} membership and {} equivalence queries in {}",
                    hypothesis.size(),
                    stats.membership,
                    stats.equivalence,
                    show_duration(start.elapsed())
                );
                Ok(hypothesis)
            }
            Err(error) => {
                warn!("aborting after {}: {error}", show_duration(start.elapsed()));
                Err(Aborted { best, error })
            }
        }
    }

    fn run(
        &mut self,
        start: Instant,
        best: &mut Option<O::Hypothesis>,
    ) -> Result<O::Hypothesis, LearningError> {
        for iteration in 0..self.config.max_iterations {
            if let Some(budget) = self.config.time_budget {
                if start.elapsed() >= budget {
                    return Err(LearningError::TimedOut(budget));
                }
            }

            self.stabilize()?;
            let filled = self.table.fill(&mut self.oracle)?;
            let hypothesis = filled.hypothesis(&self.algebra)?;
            debug!(
                "iteration {iteration}: hypothesis with {} states from {} states, {} rows and {} columns",
                hypothesis.size(),
                filled.short().len(),
                filled.boundary().len() + filled.short().len(),
                filled.evidence().len()
            );
            if tracing::enabled!(Level::DEBUG) && !filled.agrees_with(&hypothesis, &self.algebra)? {
                warn!("hypothesis does not reproduce the observation table");
            }
            *best = Some(hypothesis.clone());

            let Some(counterexample) = self.oracle.equivalence(&hypothesis)? else {
                return Ok(hypothesis);
            };
            debug!("received counterexample {}", counterexample.show());

            let changed = match self.strategy() {
                CounterexampleStrategy::Prefixes => self.table.add_prefixes(&counterexample),
                CounterexampleStrategy::BinarySearch => self.table.binary_search(
                    &counterexample,
                    &hypothesis,
                    &self.algebra,
                    &mut self.oracle,
                )?,
            };
            if !changed {
                return Err(LearningError::NoProgress {
                    counterexample: counterexample.show(),
                });
            }
        }
        Err(LearningError::IterationLimit(self.config.max_iterations))
    }

    /// Fills the table and alternates between making it consistent and closing it until
    /// neither changes anything. Evidence is distributed right after a new column was added.
    fn stabilize(&mut self) -> Result<(), LearningError> {
        let (mut inconsistent, mut open) = (true, true);
        while inconsistent || open {
            if inconsistent {
                inconsistent = self.table.fill(&mut self.oracle)?.make_consistent();
            }
            if inconsistent {
                if O::DISTRIBUTES {
                    self.table.fill(&mut self.oracle)?.distribute();
                }
                open = true;
            }
            if open {
                open = self.table.fill(&mut self.oracle)?.close();
            }
            if open {
                inconsistent = true;
            }
        }
        trace!("stable table\n{}", self.table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::active::{FunctionOracle, RandomOracle, SfaOracle, SftOracle};

    fn even(w: &[char]) -> bool {
        w.len() % 2 == 0
    }

    fn escape(w: &[char]) -> Vec<char> {
        w.iter()
            .flat_map(|&c| if c == '\\' { vec![c, c] } else { vec![c] })
            .collect()
    }

    #[test_log::test]
    fn learns_even_length() {
        let algebra = CharAlgebra::new();
        let oracle: FunctionOracle<CharAlgebra, Sfa<CharAlgebra>, _> =
            FunctionOracle::new(algebra.clone(), even, vec!['0', '1'], 6);
        let mut learner = SfaLearner::new(algebra.clone(), oracle).unwrap();
        let sfa = learner.infer().unwrap();

        assert_eq!(sfa.size(), 2);
        let words: [&[char]; 4] = [&[], &['x'], &['x', 'y'], &['x', 'y', 'z']];
        for word in words {
            assert_eq!(sfa.accepts(word, &algebra).unwrap(), even(word));
        }
        let stats = learner.stats();
        assert!(stats.membership <= 10);
        assert_eq!(stats.equivalence, 1);
        assert!(learner.table().evidence().len() <= sfa.size());

        let filled = learner.table.fill(&mut learner.oracle).unwrap();
        assert_eq!(filled.filled(), 0);
        assert!(filled.agrees_with(&sfa, &algebra).unwrap());
    }

    #[test_log::test]
    fn learns_backslash_escaping() {
        let algebra = CharAlgebra::new();
        let oracle: FunctionOracle<CharAlgebra, Sft<CharAlgebra>, _> =
            FunctionOracle::new(algebra.clone(), escape, vec!['a', '\\', 'b'], 4);
        let mut learner = SftLearner::new(algebra.clone(), oracle).unwrap();
        let sft = learner.infer().unwrap();

        assert_eq!(sft.size(), 2);
        let words: [&[char]; 4] = [&[], &['a'], &['\\'], &['a', '\\', 'b', '\\', '\\', 'c']];
        for word in words {
            assert_eq!(sft.output_on(word, &algebra).unwrap(), Some(escape(word)));
        }
        let filled = learner.table.fill(&mut learner.oracle).unwrap();
        assert!(filled.agrees_with(&sft, &algebra).unwrap());
    }

    fn mark_b_after_a(w: &[char]) -> Vec<char> {
        w.iter()
            .enumerate()
            .map(|(i, &c)| if c == 'b' && i > 0 && w[i - 1] == 'a' { 'X' } else { c })
            .collect()
    }

    #[test_log::test]
    fn learns_state_dependent_replacement() {
        let algebra = CharAlgebra::new();
        let oracle: FunctionOracle<CharAlgebra, Sft<CharAlgebra>, _> =
            FunctionOracle::new(algebra.clone(), mark_b_after_a, vec!['a', 'b', 'c'], 4);
        let mut learner = SftLearner::new(algebra.clone(), oracle).unwrap();
        let sft = learner.infer().unwrap();

        assert_eq!(sft.size(), 3);
        assert!(learner.table().evidence().len() > 1);
        let words: [&[char]; 4] = [
            &['a', 'b', 'c', 'a', 'b'],
            &['b', 'a', 'b'],
            &['z', 'a', 'b'],
            &['a', 'a', 'b', 'b'],
        ];
        for word in words {
            assert_eq!(
                sft.output_on(word, &algebra).unwrap(),
                Some(mark_b_after_a(word))
            );
        }
        let filled = learner.table.fill(&mut learner.oracle).unwrap();
        assert!(filled.agrees_with(&sft, &algebra).unwrap());
    }

    #[test_log::test]
    fn learns_escaping_by_random_testing() {
        let algebra = CharAlgebra::new();
        let oracle: RandomOracle<CharAlgebra, Sft<CharAlgebra>, _> = RandomOracle::new(
            algebra.clone(),
            escape,
            vec!['a', '\\', 'b'],
            1000,
            6,
            7,
        );
        let sft = SftLearner::new(algebra.clone(), oracle)
            .unwrap()
            .infer()
            .unwrap();
        assert_eq!(sft.size(), 2);
        let word = ['\\', '\\', 'q', '\\'];
        assert_eq!(sft.output_on(&word, &algebra).unwrap(), Some(escape(&word)));
    }

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
    fn learns_from_a_symbolic_automaton() {
        let algebra = CharAlgebra::new();
        let sample = vec!['a', '5', 'z', '0'];
        for strategy in [
            CounterexampleStrategy::Prefixes,
            CounterexampleStrategy::BinarySearch,
        ] {
            let oracle = SfaOracle::new(contains_digit(), algebra.clone(), sample.clone(), 3);
            let mut learner = SfaLearner::new(algebra.clone(), oracle)
                .unwrap()
                .with_config(LearnerConfig::default().with_strategy(strategy));
            let sfa = learner.infer().unwrap();
            assert_eq!(sfa.size(), 2);
            assert!(sfa.accepts(&['z', '0', 'a'], &algebra).unwrap());
            assert!(!sfa.accepts(&['z', 'a'], &algebra).unwrap());
        }
    }

    #[test_log::test]
    fn learns_from_a_symbolic_transducer() {
        let algebra = CharAlgebra::new();
        let target: Sft<CharAlgebra> = Sft::build(
            [
                SftMove::new(
                    0,
                    CharPred::single('\\'),
                    vec![CharFunc::Identity, CharFunc::Identity],
                    0,
                ),
                SftMove::new(
                    0,
                    CharPred::single('\\').complement(),
                    vec![CharFunc::Identity],
                    0,
                ),
            ],
            0,
            [0],
        );
        let oracle = SftOracle::new(target, algebra.clone(), vec!['a', '\\'], 4);
        let sft = SftLearner::new(algebra.clone(), oracle)
            .unwrap()
            .infer()
            .unwrap();
        assert_eq!(sft.size(), 2);
        assert_eq!(
            sft.output_on(&['x', '\\'], &algebra).unwrap(),
            Some(vec!['x', '\\', '\\'])
        );
    }

    #[test_log::test]
    fn algebra_timeout_aborts_without_hypothesis() {
        let late = || CharAlgebra::new().with_deadline(Instant::now());
        let oracle: FunctionOracle<CharAlgebra, Sfa<CharAlgebra>, _> =
            FunctionOracle::new(CharAlgebra::new(), even, vec!['a'], 2);
        assert!(matches!(
            SfaLearner::new(late(), oracle),
            Err(LearningError::Algebra(AlgebraError::Timeout))
        ));

        let oracle: FunctionOracle<CharAlgebra, Sfa<CharAlgebra>, _> =
            FunctionOracle::new(CharAlgebra::new(), even, vec!['a'], 2);
        let aborted = SfaLearner::with_seed(late(), oracle, 'a')
            .infer()
            .unwrap_err();
        assert!(aborted.best.is_none());
        assert_eq!(aborted.error, LearningError::Algebra(AlgebraError::Timeout));
    }

    #[test_log::test]
    fn exhausted_equivalence_is_inconclusive() {
        let algebra = CharAlgebra::new();
        let oracle: RandomOracle<CharAlgebra, Sft<CharAlgebra>, _> =
            RandomOracle::new(algebra.clone(), escape, vec!['a', '\\'], 100, 4, 1)
                .with_budget(Duration::ZERO);
        let aborted = SftLearner::new(algebra, oracle)
            .unwrap()
            .infer()
            .unwrap_err();
        assert_eq!(aborted.error, LearningError::Inconclusive);
        assert_eq!(aborted.best.map(|h| h.size()), Some(1));
    }

    #[test_log::test]
    fn limits_are_respected() {
        let algebra = CharAlgebra::new();
        let oracle = || -> FunctionOracle<CharAlgebra, Sfa<CharAlgebra>, fn(&[char]) -> bool> {
            FunctionOracle::new(CharAlgebra::new(), even, vec!['a'], 2)
        };

        let aborted = SfaLearner::new(algebra.clone(), oracle())
            .unwrap()
            .with_config(LearnerConfig::default().with_max_iterations(0))
            .infer()
            .unwrap_err();
        assert_eq!(aborted.error, LearningError::IterationLimit(0));
        assert!(aborted.best.is_none());

        let aborted = SfaLearner::new(algebra, oracle())
            .unwrap()
            .with_config(LearnerConfig::default().with_time_budget(Duration::ZERO))
            .infer()
            .unwrap_err();
        assert_eq!(aborted.error, LearningError::TimedOut(Duration::ZERO));
    }

    /// Keeps handing out the empty word, which can never improve a table.
    struct Stubborn;

    impl Oracle for Stubborn {
        type Symbol = char;
        type Answer = bool;
        type Hypothesis = Sfa<CharAlgebra>;

        fn membership(&mut self, word: &[char]) -> Result<bool, OracleError> {
            Ok(word.is_empty())
        }

        fn equivalence(&mut self, _: &Sfa<CharAlgebra>) -> Result<Option<Vec<char>>, OracleError> {
            Ok(Some(vec![]))
        }
    }

    #[test_log::test]
    fn useless_counterexamples_stop_the_run() {
        let mut learner = SfaLearner::new(CharAlgebra::new(), Stubborn).unwrap();
        let aborted = learner.infer().unwrap_err();
        assert!(matches!(aborted.error, LearningError::NoProgress { .. }));
        assert!(aborted.best.is_some());
        assert_eq!(learner.stats().equivalence, 1);
    }

    #[test_log::test]
    fn undefined_target_surfaces_as_oracle_error() {
        let algebra = CharAlgebra::new();
        let partial: Sft<CharAlgebra> = Sft::build(
            [SftMove::new(0, CharPred::single('a'), vec![CharFunc::Identity], 0)],
            0,
            [0],
        );
        let oracle = SftOracle::new(partial, algebra.clone(), vec!['a'], 2);
        let aborted = SftLearner::new(algebra, oracle)
            .unwrap()
            .infer()
            .unwrap_err();
        assert!(matches!(
            aborted.error,
            LearningError::Oracle(OracleError::Target(_))
        ));
    }
}
