use crate::Show;

/// Term functions over characters: either the input is echoed or a fixed character is emitted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum CharFunc {
    /// Returns its input.
    Identity,
    /// Returns the stored character regardless of its input.
    Constant(char),
}

impl CharFunc {
    /// Applies the function.
    pub fn apply(&self, input: char) -> char {
        match self {
            CharFunc::Identity => input,
            CharFunc::Constant(c) => *c,
        }
    }
}

impl Show for CharFunc {
    fn show(&self) -> String {
        match self {
            CharFunc::Identity => "x".to_string(),
            CharFunc::Constant(c) => format!("'{}'", c.show()),
        }
    }
}
