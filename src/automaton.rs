mod sfa;
pub use sfa::{Sfa, SfaMove};

mod sft;
pub use sft::{Sft, SftMove};

/// Computes the number of states needed to hold every index that occurs in the given moves,
/// the initial state and the final states.
pub(crate) fn state_count<I: IntoIterator<Item = usize>>(indices: I) -> usize {
    indices.into_iter().max().map(|max| max + 1).unwrap_or(0)
}
