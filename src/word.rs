//! Finite words are plain vectors of symbols. This module collects the few operations on them
//! that the automata and the learner need, most of them concerned with prefixes.

/// A finite word over symbols of type `S`.
pub type Word<S> = Vec<S>;

/// Concatenates `left` and `right` into a fresh word.
pub fn concat<S: Clone>(left: &[S], right: &[S]) -> Word<S> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    out.extend_from_slice(left);
    out.extend_from_slice(right);
    out
}

/// Appends a single symbol to a copy of `word`.
pub fn extend<S: Clone>(word: &[S], symbol: S) -> Word<S> {
    let mut out = Vec::with_capacity(word.len() + 1);
    out.extend_from_slice(word);
    out.push(symbol);
    out
}

/// Returns true if `word` is `prefix` followed by exactly one symbol.
pub fn is_one_step_extension<S: Eq>(prefix: &[S], word: &[S]) -> bool {
    word.len() == prefix.len() + 1 && word.starts_with(prefix)
}

/// Splits a non-empty word into everything but the last symbol and the last symbol.
pub fn split_last<S: Copy>(word: &[S]) -> Option<(&[S], S)> {
    word.split_last().map(|(last, prefix)| (prefix, *last))
}

/// Iterates over all non-empty prefixes of `word`, shortest first.
pub fn prefixes<S>(word: &[S]) -> impl Iterator<Item = &[S]> + '_ {
    (1..=word.len()).map(move |i| &word[..i])
}
