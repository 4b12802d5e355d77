use std::ops::Deref;

use itertools::Itertools;
use owo_colors::OwoColorize;
use symbolic_automata::prelude::*;
use tracing::{debug, trace};

use super::{Evidence, Hypothesis, LearningError, Observation, Oracle, OracleError};

/// The signatures of a word under every evidence suffix, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputRow<X>(pub(super) Vec<X>);

impl<X> OutputRow<X> {
    pub fn entries(&self) -> &[X] {
        &self.0
    }
}

impl<X: Show> Show for OutputRow<X> {
    fn show(&self) -> String {
        format!("[{}]", self.0.iter().map(|x| x.show()).join(", "))
    }
}

/// The observation table of the symbolic L* learner.
///
/// Rows are indexed by words, split into the short rows `S` (access words of hypothesis
/// states) and the boundary `R`. Their union, `SUR`, is kept in insertion order. Columns are
/// evidence suffixes `E`, the empty suffix always comes first. Every cell `w·e` for `w` in
/// `SUR` and `e` in `E` holds an [`Observation`] once the table has been filled. The table only
/// ever grows.
///
/// Reading rows requires a [`Filled`] view, which can only be obtained through
/// [`ObservationTable::fill`].
#[derive(Debug, Clone)]
pub struct ObservationTable<A: Algebra, O: Observation<A>> {
    pub(crate) short: Vec<Vec<A::Value>>,
    pub(crate) boundary: Vec<Vec<A::Value>>,
    pub(crate) evidence: Vec<Vec<A::Value>>,
    pub(crate) rows: math::Set<Vec<A::Value>>,
    pub(crate) cells: math::Map<Vec<A::Value>, O>,
    // every membership query ever answered, shared by all cells
    answers: math::Map<Vec<A::Value>, O::Answer>,
    // used to give newly promoted rows a one-symbol continuation
    seed: A::Value,
}

impl<A: Algebra, O: Observation<A>> ObservationTable<A, O> {
    /// Creates the initial table with `S = {ε}`, `E = {ε}` and `R = {seed}`.
    pub fn new(seed: A::Value) -> Self {
        let rows = [vec![], vec![seed]].into_iter().collect();
        Self {
            short: vec![vec![]],
            boundary: vec![vec![seed]],
            evidence: vec![vec![]],
            rows,
            cells: math::Map::default(),
            answers: math::Map::default(),
            seed,
        }
    }

    pub fn short(&self) -> &[Vec<A::Value>] {
        &self.short
    }

    pub fn boundary(&self) -> &[Vec<A::Value>] {
        &self.boundary
    }

    pub fn evidence(&self) -> &[Vec<A::Value>] {
        &self.evidence
    }

    /// Iterates over `SUR` in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = &[A::Value]> + '_ {
        self.rows.iter().map(|w| w.as_slice())
    }

    pub fn seed(&self) -> A::Value {
        self.seed
    }

    /// The observation made on `word`, if it has been observed already.
    pub fn observation(&self, word: &[A::Value]) -> Option<&O> {
        self.cells.get(word)
    }

    /// Number of words for which an observation has been recorded.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of distinct membership queries that were answered so far.
    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    pub fn is_filled(&self) -> bool {
        self.missing().is_empty()
    }

    fn missing(&self) -> Vec<Vec<A::Value>> {
        let mut missing = math::Set::default();
        for w in &self.rows {
            for e in &self.evidence {
                let we = word::concat(w, e);
                if !self.cells.contains_key(&we) {
                    missing.insert(we);
                }
            }
        }
        missing.into_iter().collect()
    }

    /// Observes every cell of `SUR × E` that is not known yet and hands out a view on the
    /// now total table. Calling this on a filled table asks nothing.
    pub fn fill<T>(&mut self, oracle: &mut T) -> Result<Filled<'_, A, O>, OracleError>
    where
        T: Oracle<Symbol = A::Value, Answer = O::Answer>,
    {
        let missing = self.missing();
        for word in &missing {
            self.observe(word, oracle)?;
        }
        if !missing.is_empty() {
            trace!("filled {} cells, table is now\n{}", missing.len(), self);
        }
        Ok(Filled {
            table: self,
            filled: missing.len(),
        })
    }

    /// Observes `word`, going through the caches before asking `oracle`.
    pub(crate) fn observe<T>(&mut self, word: &[A::Value], oracle: &mut T) -> Result<O, OracleError>
    where
        T: Oracle<Symbol = A::Value, Answer = O::Answer>,
    {
        if let Some(observation) = self.cells.get(word) {
            return Ok(observation.clone());
        }

        let answers = &mut self.answers;
        let observation = O::observe::<OracleError, _>(word, |w| {
            if let Some(answer) = answers.get(w) {
                return Ok(answer.clone());
            }
            let answer = oracle.membership(w)?;
            trace!("membership query {} answered with {:?}", w.show(), answer);
            answers.insert(w.to_vec(), answer.clone());
            Ok(answer)
        })?;
        self.cells.insert(word.to_vec(), observation.clone());
        Ok(observation)
    }

    /// Adds `word` to `R` unless it already is in `SUR`.
    pub(crate) fn add_row(&mut self, word: Vec<A::Value>) -> bool {
        if self.rows.insert(word.clone()) {
            trace!("adding row {}", word.show());
            self.boundary.push(word);
            true
        } else {
            false
        }
    }

    /// Adds `suffix` to `E` unless present and restores evidence closure, i.e. `s·suffix` is
    /// added to `SUR` for every `s` in `S`. Returns whether anything changed.
    pub(crate) fn add_evidence(&mut self, suffix: Vec<A::Value>) -> bool {
        let mut changed = false;
        if !self.evidence.contains(&suffix) {
            debug!("adding evidence {}", suffix.show());
            self.evidence.push(suffix.clone());
            changed = true;
        }
        for s in self.short.clone() {
            changed |= self.add_row(word::concat(&s, &suffix));
        }
        changed
    }

    /// Moves `word` from `R` to `S`, then restores evidence closure for it and makes sure it
    /// has at least one one-symbol continuation in `SUR`.
    fn promote(&mut self, word: Vec<A::Value>) {
        debug!("promoting {} to a state", word.show());
        self.boundary.retain(|r| r != &word);
        self.short.push(word.clone());
        for e in self.evidence.clone() {
            self.add_row(word::concat(&word, &e));
        }
        if !self
            .rows
            .iter()
            .any(|w| word::is_one_step_extension(&word, w))
        {
            self.add_row(word::extend(&word, self.seed));
        }
    }
}

impl<A: Algebra, O: Observation<A>> std::fmt::Display for ObservationTable<A, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut builder = tabled::builder::Builder::default();
        let mut header = vec!["SUR".to_string()];
        header.extend(self.evidence.iter().map(|e| e.show()));
        builder.push_record(header);

        let render = |w: &Vec<A::Value>, short: bool| {
            let mut record = vec![if short {
                w.show().blue().to_string()
            } else {
                w.show()
            }];
            record.extend(self.evidence.iter().map(|e| {
                self.cells
                    .get(&word::concat(w, e))
                    .map(|o| o.signature().show())
                    .unwrap_or_else(|| "?".to_string())
            }));
            record
        };
        for s in &self.short {
            builder.push_record(render(s, true));
        }
        for r in &self.boundary {
            builder.push_record(render(r, false));
        }

        write!(f, "{}", builder.build())
    }
}

/// A view on an [`ObservationTable`] in which every cell of `SUR × E` is known. The operations
/// that may change the table consume the view, so rows can never be read from a table that
/// has grown since it was last filled.
pub struct Filled<'a, A: Algebra, O: Observation<A>> {
    table: &'a mut ObservationTable<A, O>,
    filled: usize,
}

impl<'a, A: Algebra, O: Observation<A>> Deref for Filled<'a, A, O> {
    type Target = ObservationTable<A, O>;

    fn deref(&self) -> &Self::Target {
        &*self.table
    }
}

impl<'a, A: Algebra, O: Observation<A>> Filled<'a, A, O> {
    /// Number of cells that were observed when this view was created.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// The observation on `word`, which must be in `SUR·E`.
    pub(crate) fn cell(&self, word: &[A::Value]) -> &O {
        self.table
            .cells
            .get(word)
            .unwrap_or_else(|| panic!("no observation on {} in a filled table", word.show()))
    }

    /// The row of `word`, which must be in `SUR`.
    pub(crate) fn row(&self, word: &[A::Value]) -> OutputRow<O::Signature> {
        OutputRow(
            self.table
                .evidence
                .iter()
                .map(|e| self.cell(&word::concat(word, e)).signature())
                .collect(),
        )
    }

    fn row_without(&self, word: &[A::Value], column: usize) -> OutputRow<O::Signature> {
        OutputRow(
            self.table
                .evidence
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != column)
                .map(|(_, e)| self.cell(&word::concat(word, e)).signature())
                .collect(),
        )
    }

    /// Rows of all words in `SUR`, in insertion order.
    fn signatures(&self) -> Vec<OutputRow<O::Signature>> {
        self.table.rows.iter().map(|w| self.row(w)).collect()
    }

    /// For every position in `SUR`, the symbols and positions of its one-symbol continuations
    /// that are in `SUR` as well.
    fn extensions(&self) -> Vec<Vec<(A::Value, usize)>> {
        let mut extensions = vec![Vec::new(); self.table.rows.len()];
        for (position, w) in self.table.rows.iter().enumerate() {
            if let Some((prefix, symbol)) = word::split_last(w) {
                if let Some(parent) = self.table.rows.get_index_of(prefix) {
                    extensions[parent].push((symbol, position));
                }
            }
        }
        extensions
    }

    /// The shortest word of `R` among those sharing the row of the first row in `R` that has no
    /// equal in `S`.
    fn open_row(&self) -> Option<Vec<A::Value>> {
        let known: math::Set<_> = self.table.short.iter().map(|s| self.row(s)).collect();
        let signature = self
            .table
            .boundary
            .iter()
            .map(|r| self.row(r))
            .find(|row| !known.contains(row))?;
        self.table
            .boundary
            .iter()
            .filter(|r| self.row(r) == signature)
            .reduce(|best, r| if r.len() < best.len() { r } else { best })
            .cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.open_row().is_none()
    }

    /// Searches for two words with equal rows whose continuations on the same symbol have
    /// different rows, and returns the evidence separating them.
    fn inconsistency(&self) -> Option<Vec<A::Value>> {
        let signatures = self.signatures();
        let extensions = self.extensions();
        for i in 0..signatures.len() {
            for j in (i + 1)..signatures.len() {
                if signatures[i] != signatures[j] {
                    continue;
                }
                for &(a, left) in &extensions[i] {
                    for &(b, right) in &extensions[j] {
                        if a != b || signatures[left] == signatures[right] {
                            continue;
                        }
                        let Some(column) = signatures[left]
                            .0
                            .iter()
                            .zip(&signatures[right].0)
                            .position(|(x, y)| x != y)
                        else {
                            continue;
                        };
                        return Some(word::concat(&[a], &self.table.evidence[column]));
                    }
                }
            }
        }
        None
    }

    pub fn is_consistent(&self) -> bool {
        self.inconsistency().is_none()
    }

    /// Promotes an open row to `S`, returns whether the table was open.
    pub fn close(self) -> bool {
        match self.open_row() {
            Some(word) => {
                self.table.promote(word);
                true
            }
            None => false,
        }
    }

    /// Adds one separating suffix to `E` if the table is inconsistent, returns whether it was.
    pub fn make_consistent(self) -> bool {
        match self.inconsistency() {
            Some(suffix) => {
                debug!("table is inconsistent, separating with {}", suffix.show());
                self.table.add_evidence(suffix)
            }
            None => false,
        }
    }

    /// Looks at the most recently added evidence `e`. Whenever two words of `SUR` agree on all
    /// other columns but differ on `e`, every one-symbol continuation known for one of them is
    /// copied over to the other, unless some word with the same row already has it.
    pub fn distribute(self) -> bool {
        let Some(column) = self.table.evidence.len().checked_sub(1) else {
            return false;
        };
        let suffix = &self.table.evidence[column];
        let rows = self.table.rows.iter().collect_vec();
        let full = self.signatures();
        let partial = rows
            .iter()
            .map(|w| self.row_without(w, column))
            .collect_vec();
        let last = rows
            .iter()
            .map(|w| self.cell(&word::concat(w, suffix)).signature())
            .collect_vec();
        let extensions = self.extensions();

        let mut additions: math::Set<Vec<A::Value>> = math::Set::default();
        for i in 0..rows.len() {
            for j in (i + 1)..rows.len() {
                if partial[i] != partial[j] || last[i] == last[j] {
                    continue;
                }
                for (from, to) in [(i, j), (j, i)] {
                    for &(symbol, _) in &extensions[from] {
                        let covered = (0..rows.len())
                            .filter(|&k| full[k] == full[to])
                            .any(|k| {
                                let extended = word::extend(rows[k], symbol);
                                self.table.rows.contains(&extended)
                                    || additions.contains(&extended)
                            });
                        if !covered {
                            additions.insert(word::extend(rows[to], symbol));
                        }
                    }
                }
            }
        }

        if additions.is_empty() {
            return false;
        }
        debug!("distributing evidence {} over {} rows", suffix.show(), additions.len());
        for word in additions {
            self.table.add_row(word);
        }
        true
    }

    /// Builds the hypothesis induced by the table, which must be closed. State `i` is the
    /// `i`-th word of `S`, a move on `a` leads from the state of `w` to the state of `w·a` for
    /// every such pair in `SUR`. Only the first move per symbol and state is kept.
    pub fn hypothesis(&self, algebra: &A) -> Result<O::Hypothesis, LearningError> {
        let mut states: math::Map<OutputRow<O::Signature>, usize> = math::Map::default();
        for (state, s) in self.table.short.iter().enumerate() {
            states.entry(self.row(s)).or_insert(state);
        }
        let state_of = |w: &[A::Value]| {
            states
                .get(&self.row(w))
                .copied()
                .ok_or_else(|| LearningError::OpenTable { word: w.show() })
        };

        let mut evidence = Evidence::new(
            self.table
                .short
                .iter()
                .map(|s| (s.as_slice(), self.cell(s)))
                .collect(),
        );
        for wa in &self.table.rows {
            let Some((w, a)) = word::split_last(wa) else {
                continue;
            };
            if !self.table.rows.contains(w) {
                continue;
            }
            evidence.record(state_of(w)?, a, state_of(wa)?, self.cell(wa));
        }

        let hypothesis = O::synthesize(&evidence, algebra)?;
        trace!("built hypothesis\n{hypothesis}");
        Ok(hypothesis)
    }

    /// Checks that `hypothesis` answers every word of `SUR·E` the way the oracle did.
    pub fn agrees_with(&self, hypothesis: &O::Hypothesis, algebra: &A) -> Result<bool, AlgebraError> {
        for w in &self.table.rows {
            for e in &self.table.evidence {
                let we = word::concat(w, e);
                let expected = self.cell(&we).answer();
                if hypothesis.answer(&we, algebra)?.as_ref() != Some(expected) {
                    debug!("hypothesis disagrees with the table on {}", we.show());
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
