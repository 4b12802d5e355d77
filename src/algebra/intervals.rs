use itertools::Itertools;

use crate::Show;

/// Successor in the space of unicode scalar values, skipping the surrogate gap.
fn next_char(c: char) -> Option<char> {
    match c {
        '\u{D7FF}' => Some('\u{E000}'),
        char::MAX => None,
        _ => char::from_u32(c as u32 + 1),
    }
}

/// Predecessor in the space of unicode scalar values, skipping the surrogate gap.
fn prev_char(c: char) -> Option<char> {
    match c {
        '\u{E000}' => Some('\u{D7FF}'),
        '\0' => None,
        _ => char::from_u32(c as u32 - 1),
    }
}

/// A predicate over characters, represented as a union of closed intervals. The intervals are
/// kept sorted, pairwise disjoint and non-adjacent, so structural equality coincides with
/// semantic equality.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct CharPred {
    intervals: Vec<(char, char)>,
}

impl CharPred {
    /// The predicate admitting no character.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The predicate admitting every character.
    pub fn full() -> Self {
        Self {
            intervals: vec![('\0', char::MAX)],
        }
    }

    /// Admits exactly `c`.
    pub fn single(c: char) -> Self {
        Self {
            intervals: vec![(c, c)],
        }
    }

    /// Admits every character between `lo` and `hi`, both inclusive. Empty if `lo > hi`.
    pub fn range(lo: char, hi: char) -> Self {
        Self::from_intervals([(lo, hi)])
    }

    /// Builds a predicate from arbitrary, possibly overlapping intervals.
    pub fn from_intervals<I: IntoIterator<Item = (char, char)>>(intervals: I) -> Self {
        let mut raw = intervals
            .into_iter()
            .filter(|(lo, hi)| lo <= hi)
            .collect_vec();
        raw.sort_unstable();

        let mut intervals: Vec<(char, char)> = Vec::with_capacity(raw.len());
        for (lo, hi) in raw {
            if let Some(last) = intervals.last_mut() {
                if lo <= last.1 || next_char(last.1) == Some(lo) {
                    last.1 = last.1.max(hi);
                    continue;
                }
            }
            intervals.push((lo, hi));
        }
        Self { intervals }
    }

    /// Admits exactly the given characters.
    pub fn from_chars<I: IntoIterator<Item = char>>(chars: I) -> Self {
        Self::from_intervals(chars.into_iter().map(|c| (c, c)))
    }

    /// The normalized intervals.
    pub fn intervals(&self) -> &[(char, char)] {
        &self.intervals
    }

    /// True if no character is admitted.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// True if every character is admitted.
    pub fn is_full(&self) -> bool {
        self.intervals == [('\0', char::MAX)]
    }

    /// Membership test.
    pub fn contains(&self, c: char) -> bool {
        self.intervals
            .binary_search_by(|&(lo, hi)| {
                if hi < c {
                    std::cmp::Ordering::Less
                } else if lo > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// The smallest admitted character.
    pub fn min(&self) -> Option<char> {
        self.intervals.first().map(|(lo, _)| *lo)
    }

    /// Set union.
    pub fn union(&self, other: &Self) -> Self {
        Self::from_intervals(self.intervals.iter().chain(other.intervals.iter()).copied())
    }

    /// Set intersection.
    pub fn intersection(&self, other: &Self) -> Self {
        let (left, right) = (&self.intervals, &other.intervals);
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::new();
        while i < left.len() && j < right.len() {
            let lo = left[i].0.max(right[j].0);
            let hi = left[i].1.min(right[j].1);
            if lo <= hi {
                out.push((lo, hi));
            }
            if left[i].1 < right[j].1 {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self::from_intervals(out)
    }

    /// Set complement with respect to all unicode scalar values.
    pub fn complement(&self) -> Self {
        let mut out = Vec::with_capacity(self.intervals.len() + 1);
        let mut start = Some('\0');
        for &(lo, hi) in &self.intervals {
            if let Some(from) = start {
                if from < lo {
                    if let Some(to) = prev_char(lo) {
                        out.push((from, to));
                    }
                }
            }
            start = next_char(hi);
        }
        if let Some(from) = start {
            out.push((from, char::MAX));
        }
        Self { intervals: out }
    }
}

impl Show for CharPred {
    fn show(&self) -> String {
        if self.is_empty() {
            return "⊥".to_string();
        }
        if self.is_full() {
            return "⊤".to_string();
        }
        format!(
            "[{}]",
            self.intervals
                .iter()
                .map(|&(lo, hi)| if lo == hi {
                    lo.show()
                } else {
                    format!("{}-{}", lo.show(), hi.show())
                })
                .join("")
        )
    }
}

impl std::fmt::Display for CharPred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.show())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_merges_adjacent_and_overlapping() {
        let pred = CharPred::from_intervals([('d', 'f'), ('a', 'c'), ('x', 'z'), ('y', 'y')]);
        assert_eq!(pred.intervals(), &[('a', 'f'), ('x', 'z')]);
        assert_eq!(CharPred::range('z', 'a'), CharPred::empty());
        assert_eq!(
            CharPred::from_chars(['b', 'a', 'c']),
            CharPred::range('a', 'c')
        );
    }

    #[test]
    fn boolean_operations() {
        let digits = CharPred::range('0', '9');
        let lower = CharPred::range('a', 'z');
        let both = digits.union(&lower);
        assert!(both.contains('5') && both.contains('q') && !both.contains('A'));
        assert!(digits.intersection(&lower).is_empty());
        assert_eq!(both.intersection(&lower), lower);

        let not_digits = digits.complement();
        assert!(!not_digits.contains('0'));
        assert!(not_digits.contains('\0'));
        assert!(not_digits.contains(char::MAX));
        assert_eq!(not_digits.complement(), digits);
        assert!(not_digits.union(&digits).is_full());
        assert!(CharPred::full().complement().is_empty());
        assert!(CharPred::empty().complement().is_full());
    }

    #[test]
    fn surrogate_gap_is_skipped() {
        let below = CharPred::range('\0', '\u{D7FF}');
        let above = CharPred::range('\u{E000}', char::MAX);
        assert!(below.union(&above).is_full());
        assert_eq!(below.complement(), above);
    }

    #[test]
    fn rendering() {
        assert_eq!(CharPred::from_chars(['a', 'c', 'd']).show(), "[ac-d]");
        assert_eq!(CharPred::full().show(), "⊤");
        assert_eq!(CharPred::empty().show(), "⊥");
    }
}
