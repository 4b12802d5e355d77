use itertools::Itertools;

/// Renders durations the way they are logged: the two most significant units only.
pub fn show_duration(duration: std::time::Duration) -> String {
    let ms = duration.as_millis();
    let us = duration.as_micros();
    let s = duration.as_secs();
    let m = s / 60;

    if m > 0 {
        format!("{}m {}s", m, s % 60)
    } else if s > 0 {
        format!("{}s {}ms", s, ms % 1000)
    } else if ms > 0 {
        format!("{}ms {}us", ms, us % 1000)
    } else {
        format!("{}us", us)
    }
}

/// Helper trait which can be used to display symbols, words, predicates and such.
pub trait Show {
    /// Returns a human readable representation of `self`. This is mainly used for debugging
    /// purposes, in log messages and when rendering observation tables.
    fn show(&self) -> String;

    /// Show a collection of the thing. For symbols this should produce a word, for anything
    /// else a bracketed list is fine, which is what the default does.
    fn show_collection<'a, I>(iter: I) -> String
    where
        Self: 'a,
        I: IntoIterator<Item = &'a Self>,
    {
        format!("[{}]", iter.into_iter().map(|x| x.show()).join(", "))
    }
}

impl Show for char {
    fn show(&self) -> String {
        self.escape_debug().to_string()
    }

    fn show_collection<'a, I: IntoIterator<Item = &'a Self>>(iter: I) -> String
    where
        Self: 'a,
    {
        let word = iter.into_iter().map(|sym| sym.show()).join("");
        if word.is_empty() {
            "ε".to_string()
        } else {
            format!("\"{word}\"")
        }
    }
}

impl Show for bool {
    fn show(&self) -> String {
        match self {
            true => "+",
            false => "-",
        }
        .to_string()
    }
}

impl Show for usize {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl Show for String {
    fn show(&self) -> String {
        self.clone()
    }
}

impl<S: Show + ?Sized> Show for &S {
    fn show(&self) -> String {
        S::show(*self)
    }
}

impl<S: Show> Show for [S] {
    fn show(&self) -> String {
        S::show_collection(self.iter())
    }
}

impl<S: Show> Show for Vec<S> {
    fn show(&self) -> String {
        S::show_collection(self.iter())
    }
}

impl<S: Show, T: Show> Show for (S, T) {
    fn show(&self) -> String {
        format!("({}, {})", self.0.show(), self.1.show())
    }
}

#[cfg(test)]
mod tests {
    use super::Show;

    #[test]
    fn words_render_quoted_and_empty_as_epsilon() {
        assert_eq!(vec!['a', 'b'].show(), "\"ab\"");
        assert_eq!(Vec::<char>::new().show(), "ε");
        assert_eq!(['\\'].show(), "\"\\\\\"");
        assert_eq!(vec![true, false].show(), "[+, -]");
    }
}
