use std::time::{Duration, Instant};

use tracing::trace;

use super::{Algebra, AlgebraError, CharFunc, CharPred};

/// The algebra of character intervals with identity and constant term functions.
///
/// Optionally carries a deadline. Once it has passed, every decision procedure fails with
/// [`AlgebraError::Timeout`]; the purely structural operations (`top`, `atom`, `apply`, ...)
/// keep working.
#[derive(Debug, Clone, Default)]
pub struct CharAlgebra {
    deadline: Option<Instant>,
}

impl CharAlgebra {
    /// An algebra without deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Sets a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn check(&self) -> Result<(), AlgebraError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                trace!("char algebra ran past its deadline");
                Err(AlgebraError::Timeout)
            }
            _ => Ok(()),
        }
    }
}

impl Algebra for CharAlgebra {
    type Value = char;
    type Predicate = CharPred;
    type Transform = CharFunc;

    fn top(&self) -> CharPred {
        CharPred::full()
    }

    fn bottom(&self) -> CharPred {
        CharPred::empty()
    }

    fn atom(&self, value: char) -> CharPred {
        CharPred::single(value)
    }

    fn and(&self, left: &CharPred, right: &CharPred) -> Result<CharPred, AlgebraError> {
        self.check()?;
        Ok(left.intersection(right))
    }

    fn or(&self, left: &CharPred, right: &CharPred) -> Result<CharPred, AlgebraError> {
        self.check()?;
        Ok(left.union(right))
    }

    fn not(&self, predicate: &CharPred) -> Result<CharPred, AlgebraError> {
        self.check()?;
        Ok(predicate.complement())
    }

    fn is_satisfiable(&self, predicate: &CharPred) -> Result<bool, AlgebraError> {
        self.check()?;
        Ok(!predicate.is_empty())
    }

    fn has_model(&self, predicate: &CharPred, value: char) -> Result<bool, AlgebraError> {
        self.check()?;
        Ok(predicate.contains(value))
    }

    fn witness(&self, predicate: &CharPred) -> Result<Option<char>, AlgebraError> {
        self.check()?;
        Ok(predicate.min())
    }

    fn identity(&self) -> CharFunc {
        CharFunc::Identity
    }

    fn constant(&self, value: char) -> CharFunc {
        CharFunc::Constant(value)
    }

    fn apply(&self, transform: &CharFunc, value: char) -> char {
        transform.apply(value)
    }

    /// The largest group (the first one on ties) receives the complement of all others, every
    /// other group the union of its atoms. Unsampled characters therefore land in the largest
    /// group, and if every group is empty the first one receives everything.
    fn separating_predicates(&self, groups: &[Vec<char>]) -> Result<Vec<CharPred>, AlgebraError> {
        self.check()?;
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let largest = (0..groups.len()).fold(0, |best, i| {
            if groups[i].len() > groups[best].len() {
                i
            } else {
                best
            }
        });
        let atoms: Vec<CharPred> = groups
            .iter()
            .map(|group| CharPred::from_chars(group.iter().copied()))
            .collect();
        let others = atoms
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != largest)
            .fold(CharPred::empty(), |acc, (_, atom)| acc.union(atom));
        let rest = others.complement();

        Ok(atoms
            .into_iter()
            .enumerate()
            .map(|(i, atom)| if i == largest { rest.clone() } else { atom })
            .collect())
    }
}
