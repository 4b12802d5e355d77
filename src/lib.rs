//! Symbolic finite automata and transducers.
//!
//! Instead of labelling every transition with a single symbol, a symbolic automaton labels its
//! moves with predicates of an effective Boolean algebra (see [`Algebra`]). This makes it
//! possible to work with huge or infinite alphabets such as all unicode scalar values, which is
//! what [`CharAlgebra`] provides. Symbolic transducers ([`Sft`]) additionally carry a list of
//! term functions on every move, which compute the emitted output from the value that was read.
//!
//! The crate is deliberately small: it contains the algebra interface and one instance of it,
//! the two automaton representations and a few helpers on words. The learning algorithms live
//! in the `symbolic-learning` crate.
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::{fmt::Debug, hash::Hash};

/// The prelude is supposed to make using this package easier. Including everything, i.e.
/// `use symbolic_automata::prelude::*;` should be enough to use the package.
pub mod prelude {
    pub use super::{
        algebra::{
            Algebra, AlgebraError, CharAlgebra, CharFunc, CharPred, Guarded, Witness,
        },
        automaton::{Sfa, SfaMove, Sft, SftMove},
        math,
        show::show_duration,
        word::{self, Word},
        Show, Symbol,
    };
}

/// This module contains the collection types used throughout the crate.
pub mod math;

/// Effective Boolean algebras and the character instance.
pub mod algebra;
pub use algebra::{Algebra, AlgebraError, CharAlgebra, CharFunc, CharPred, Guarded, Witness};

/// Symbolic automata and transducers.
pub mod automaton;
pub use automaton::{Sfa, SfaMove, Sft, SftMove};

pub mod word;

mod show;
pub use show::Show;

/// A symbol is a concrete value words are made of. Any type that is cheap to copy, totally
/// ordered, hashable and printable qualifies.
pub trait Symbol: Copy + Eq + Ord + Hash + Debug + Show {}

impl<S: Copy + Eq + Ord + Hash + Debug + Show> Symbol for S {}
