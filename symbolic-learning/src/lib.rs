//! A library for learning symbolic automata and transducers from a minimally adequate teacher.
//!
//! The learner ([`active::Learner`]) maintains an observation table whose rows are indexed by
//! access words and whose columns are suffixes called evidence. Membership queries fill the
//! table, equivalence queries either confirm a hypothesis or return a counterexample. What is
//! observed in a cell is abstracted by [`active::Observation`], which is implemented once for
//! acceptors and once for transducers.

/// Deals with active learning algorithms, i.e. the symbolic variant of L*.
pub mod active;
