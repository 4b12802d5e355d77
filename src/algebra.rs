use std::{fmt::Debug, hash::Hash};

use itertools::Itertools;
use thiserror::Error;

use crate::{Show, Symbol};

mod intervals;
pub use intervals::CharPred;

mod functions;
pub use functions::CharFunc;

mod chars;
pub use chars::CharAlgebra;

/// Errors that an effective Boolean algebra may raise. Every decision procedure is allowed to
/// give up, for example when it runs into its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AlgebraError {
    /// The decision procedure exceeded its time allotment.
    #[error("algebra operation exceeded its deadline")]
    Timeout,
}

/// A sampled input value together with the transforms that explain the output it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness<V, F> {
    /// The input value.
    pub value: V,
    /// One transform per output symbol that reading `value` produced.
    pub transforms: Vec<F>,
}

/// A predicate on which a fixed list of transforms is applied to every value it admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guarded<P, F> {
    /// The guard.
    pub guard: P,
    /// The transforms applied to every value admitted by `guard`.
    pub transforms: Vec<F>,
}

/// An effective Boolean algebra over a (possibly infinite) domain of values, extended with
/// term functions that map input values to output values. All decision procedures are
/// fallible, as an implementation may bound the time it is willing to spend.
///
/// Predicates are values, so combining them never mutates the operands.
pub trait Algebra: Clone + Debug {
    /// The concrete values, i.e. the symbols words are made of.
    type Value: Symbol;
    /// Predicates over [`Self::Value`].
    type Predicate: Clone + Eq + Hash + Debug + Show;
    /// Term functions mapping an input value to an output value.
    type Transform: Clone + Eq + Hash + Debug + Show;

    /// The predicate that admits every value.
    fn top(&self) -> Self::Predicate;
    /// The predicate that admits no value.
    fn bottom(&self) -> Self::Predicate;
    /// The predicate admitting exactly `value`.
    fn atom(&self, value: Self::Value) -> Self::Predicate;
    /// Conjunction of two predicates.
    fn and(
        &self,
        left: &Self::Predicate,
        right: &Self::Predicate,
    ) -> Result<Self::Predicate, AlgebraError>;
    /// Disjunction of two predicates.
    fn or(
        &self,
        left: &Self::Predicate,
        right: &Self::Predicate,
    ) -> Result<Self::Predicate, AlgebraError>;
    /// Complement of a predicate.
    fn not(&self, predicate: &Self::Predicate) -> Result<Self::Predicate, AlgebraError>;
    /// Decides whether `predicate` admits at least one value.
    fn is_satisfiable(&self, predicate: &Self::Predicate) -> Result<bool, AlgebraError>;
    /// Decides whether `value` is admitted by `predicate`.
    fn has_model(&self, predicate: &Self::Predicate, value: Self::Value)
        -> Result<bool, AlgebraError>;
    /// Produces some value admitted by `predicate`, or `None` if it is unsatisfiable.
    fn witness(&self, predicate: &Self::Predicate) -> Result<Option<Self::Value>, AlgebraError>;

    /// The transform that returns its input unchanged.
    fn identity(&self) -> Self::Transform;
    /// The transform that always returns `value`.
    fn constant(&self, value: Self::Value) -> Self::Transform;
    /// Applies a transform to a value.
    fn apply(&self, transform: &Self::Transform, value: Self::Value) -> Self::Value;
    /// Guesses the transform that mapped `input` to `output` from a single example.
    fn infer_transform(&self, input: Self::Value, output: Self::Value) -> Self::Transform {
        if input == output {
            self.identity()
        } else {
            self.constant(output)
        }
    }

    /// Given groups of sampled values, returns one predicate per group such that every group
    /// is admitted by its own predicate, the predicates are pairwise disjoint, and together
    /// they cover the whole domain. Values that were never sampled thus end up in some group.
    fn separating_predicates(
        &self,
        groups: &[Vec<Self::Value>],
    ) -> Result<Vec<Self::Predicate>, AlgebraError>;

    /// Like [`Algebra::separating_predicates`], but each group is further split such that the
    /// values in every resulting piece agree on their transforms.
    fn separating_predicates_with_transforms(
        &self,
        groups: &[Vec<Witness<Self::Value, Self::Transform>>],
    ) -> Result<Vec<Vec<Guarded<Self::Predicate, Self::Transform>>>, AlgebraError> {
        let values = groups
            .iter()
            .map(|group| group.iter().map(|w| w.value).collect_vec())
            .collect_vec();
        let predicates = self.separating_predicates(&values)?;

        let mut out = Vec::with_capacity(groups.len());
        for (group, predicate) in groups.iter().zip(predicates) {
            out.push(self.split_homogeneous(predicate, group)?);
        }
        Ok(out)
    }

    /// Splits `predicate` into pieces on which the witnesses agree on their transforms. A
    /// predicate without witnesses keeps the identity transform.
    fn split_homogeneous(
        &self,
        predicate: Self::Predicate,
        witnesses: &[Witness<Self::Value, Self::Transform>],
    ) -> Result<Vec<Guarded<Self::Predicate, Self::Transform>>, AlgebraError> {
        let mut clusters: Vec<(Vec<Self::Transform>, Vec<Self::Value>)> = Vec::new();
        for witness in witnesses {
            match clusters.iter_mut().find(|(t, _)| t == &witness.transforms) {
                Some((_, values)) => values.push(witness.value),
                None => clusters.push((witness.transforms.clone(), vec![witness.value])),
            }
        }

        match clusters.len() {
            0 => Ok(vec![Guarded {
                guard: predicate,
                transforms: vec![self.identity()],
            }]),
            1 => Ok(clusters
                .into_iter()
                .map(|(transforms, _)| Guarded {
                    guard: predicate.clone(),
                    transforms,
                })
                .collect()),
            _ => {
                let parts = self.separating_predicates(
                    &clusters.iter().map(|(_, values)| values.clone()).collect_vec(),
                )?;
                let mut pieces = Vec::with_capacity(parts.len());
                for ((transforms, _), part) in clusters.into_iter().zip(parts) {
                    let guard = self.and(&predicate, &part)?;
                    if self.is_satisfiable(&guard)? {
                        pieces.push(Guarded { guard, transforms });
                    }
                }
                Ok(pieces)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn witness(value: char, transforms: Vec<CharFunc>) -> Witness<char, CharFunc> {
        Witness { value, transforms }
    }

    #[test_log::test]
    fn homogeneous_split_keeps_transforms_apart() {
        let algebra = CharAlgebra::new();
        let groups = vec![
            vec![
                witness('a', vec![CharFunc::Identity]),
                witness('b', vec![CharFunc::Identity]),
                witness('\\', vec![CharFunc::Identity, CharFunc::Identity]),
            ],
            vec![],
        ];
        let pieces = algebra.separating_predicates_with_transforms(&groups).unwrap();
        assert_eq!(pieces.len(), 2);

        let first = &pieces[0];
        assert_eq!(first.len(), 2);
        let identity = first
            .iter()
            .find(|g| g.transforms == vec![CharFunc::Identity])
            .unwrap();
        let doubled = first
            .iter()
            .find(|g| g.transforms.len() == 2)
            .unwrap();
        assert!(identity.guard.contains('a'));
        assert!(identity.guard.contains('z'));
        assert!(!identity.guard.contains('\\'));
        assert!(doubled.guard.contains('\\'));

        // the empty group received the empty predicate, it keeps the identity
        assert_eq!(pieces[1].len(), 1);
        assert!(pieces[1][0].guard.is_empty());
        assert_eq!(pieces[1][0].transforms, vec![CharFunc::Identity]);
    }

    #[test]
    fn inferred_transforms() {
        let algebra = CharAlgebra::new();
        assert_eq!(algebra.infer_transform('x', 'x'), CharFunc::Identity);
        assert_eq!(algebra.infer_transform('x', '\\'), CharFunc::Constant('\\'));
        assert_eq!(algebra.apply(&CharFunc::Constant('q'), 'x'), 'q');
        assert_eq!(algebra.apply(&CharFunc::Identity, 'x'), 'x');
    }
}
