//! [`FuzzPattern`] definition.

use derive_more::Display;
use itertools::Itertools as _;
use postgres_types::{FromSql, ToSql};

/// `SIMILAR TO` pattern matching any of the words of a search input.
#[derive(Clone, Debug, Display, Eq, FromSql, PartialEq, ToSql)]
#[postgres(transparent)]
pub struct FuzzPattern(String);

impl FuzzPattern {
    /// Characters having a special meaning in a `SIMILAR TO` pattern.
    const SPECIAL: &'static [char] = &[
        '\\', '%', '_', '|', '*', '+', '?', '{', '}', '(', ')', '[', ']',
    ];

    /// Creates a new [`FuzzPattern`] out of the given `input`.
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self(format!(
            "%({})%",
            input.split_ascii_whitespace().format_with("|", |word, f| {
                f(&word.chars().format_with("", |c, f| {
                    if Self::SPECIAL.contains(&c) {
                        f(&format_args!("\\{c}"))
                    } else {
                        f(&c)
                    }
                }))
            }),
        ))
    }
}

#[cfg(test)]
mod spec {
    use super::FuzzPattern;

    #[test]
    fn escapes_special_characters() {
        assert_eq!(
            FuzzPattern::new("land cruiser").to_string(),
            "%(land|cruiser)%",
        );
        assert_eq!(FuzzPattern::new("  a_b ").to_string(), r"%(a\_b)%");
        assert_eq!(FuzzPattern::new("100%").to_string(), r"%(100\%)%");
    }
}
