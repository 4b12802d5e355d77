use symbolic_automata::prelude::*;
use tracing::{debug, trace};

use super::{Hypothesis, LearningError, Observation, ObservationTable, Oracle};

/// How a counterexample is fed back into the observation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterexampleStrategy {
    /// Every prefix of the counterexample becomes a row.
    Prefixes,
    /// A Rivest–Schapire style binary search locates a single wrong move, which either adds one
    /// row or one evidence suffix.
    BinarySearch,
}

impl<A: Algebra, O: Observation<A>> ObservationTable<A, O> {
    /// Adds every non-empty prefix of `counterexample` to `R`, skipping those already in `SUR`.
    /// Returns whether any row was added.
    pub fn add_prefixes(&mut self, counterexample: &[A::Value]) -> bool {
        let mut changed = false;
        for prefix in word::prefixes(counterexample) {
            changed |= self.add_row(prefix.to_vec());
        }
        changed
    }

    /// Locates the move of `hypothesis` that `counterexample` exposes as wrong.
    ///
    /// The counterexample is first cut down to its shortest prefix on which the hypothesis
    /// answers differently than the oracle. For a split point `i`, the prefix `cx[..i]` is replaced by the access word of the state
    /// it reaches in the hypothesis. At `i = 0` this changes nothing, so the signature of the
    /// result is the one of `cx`; the search finds a point `i + 1` where it stops matching. The
    /// move from the state of `cx[..i]` on `cx[i]` is then wrong: if that move is not backed by
    /// a row yet it is added to `R`, otherwise the suffix `cx[i+1..]` separates two words the
    /// hypothesis merged and is added to `E`.
    pub fn binary_search<T>(
        &mut self,
        counterexample: &[A::Value],
        hypothesis: &O::Hypothesis,
        algebra: &A,
        oracle: &mut T,
    ) -> Result<bool, LearningError>
    where
        T: Oracle<Symbol = A::Value, Answer = O::Answer>,
    {
        if counterexample.is_empty() {
            return Err(LearningError::NoProgress {
                counterexample: counterexample.show(),
            });
        }
        let counterexample =
            self.shortest_failing_prefix(counterexample, hypothesis, algebra, oracle)?;
        let expected = self.observe(counterexample, oracle)?.signature();

        let (mut same, mut diff) = (0, counterexample.len());
        while diff - same > 1 {
            let split = (same + diff) / 2;
            let access = self.access(counterexample, split, hypothesis, algebra)?;
            let probe = word::concat(&access, &counterexample[split..]);
            if self.observe(&probe, oracle)?.signature() != expected {
                diff = split;
            } else {
                same = split;
            }
        }

        let position = diff - 1;
        let wrong = word::extend(
            &self.access(counterexample, position, hypothesis, algebra)?,
            counterexample[position],
        );
        if !self.rows.contains(&wrong) {
            debug!("counterexample exposes missing row {}", wrong.show());
            return Ok(self.add_row(wrong));
        }

        let suffix = counterexample[diff..].to_vec();
        debug!(
            "counterexample exposes wrong move from {}, separating with {}",
            wrong.show(),
            suffix.show()
        );
        Ok(self.add_evidence(suffix))
    }

    /// The shortest non-empty prefix of `counterexample` on which `hypothesis` and the oracle
    /// disagree, or all of it if they agree on every proper prefix.
    fn shortest_failing_prefix<'c, T>(
        &mut self,
        counterexample: &'c [A::Value],
        hypothesis: &O::Hypothesis,
        algebra: &A,
        oracle: &mut T,
    ) -> Result<&'c [A::Value], LearningError>
    where
        T: Oracle<Symbol = A::Value, Answer = O::Answer>,
    {
        for length in 1..counterexample.len() {
            let prefix = &counterexample[..length];
            let observation = self.observe(prefix, oracle)?;
            if hypothesis.answer(prefix, algebra)?.as_ref() != Some(observation.answer()) {
                trace!(
                    "shortened counterexample {} to {}",
                    counterexample.show(),
                    prefix.show()
                );
                return Ok(prefix);
            }
        }
        Ok(counterexample)
    }

    /// The access word of the state that `counterexample[..length]` reaches in `hypothesis`.
    fn access(
        &self,
        counterexample: &[A::Value],
        length: usize,
        hypothesis: &O::Hypothesis,
        algebra: &A,
    ) -> Result<Vec<A::Value>, LearningError> {
        hypothesis
            .reached(&counterexample[..length], algebra)?
            .and_then(|state| self.short.get(state))
            .cloned()
            .ok_or_else(|| LearningError::MalformedCounterexample {
                counterexample: counterexample.show(),
            })
    }
}
