//! Built-in helpers available to every corpus: possessive forms and list joining

use std::fmt;

use serde::Deserialize;

/// Functions implemented by the engine rather than declared in a corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `genitive(name)`
    Genitive,
    /// `for(list, formatter, separator, conjunction, extra...)`
    For,
    /// `for_entry(entries, formatter, separator, conjunction, extra...)`
    ForEntry,
    /// `more_than(count)`: several candidate counts read as "more than <smallest>"
    MoreThan,
}

impl Builtin {
    pub const ALL: [Builtin; 4] = [
        Builtin::Genitive,
        Builtin::For,
        Builtin::ForEntry,
        Builtin::MoreThan,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "genitive" => Some(Builtin::Genitive),
            "for" => Some(Builtin::For),
            "for_entry" => Some(Builtin::ForEntry),
            "more_than" => Some(Builtin::MoreThan),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Genitive => "genitive",
            Builtin::For => "for",
            Builtin::ForEntry => "for_entry",
            Builtin::MoreThan => "more_than",
        }
    }

    /// Minimum number of arguments
    pub fn min_arity(&self) -> usize {
        match self {
            Builtin::Genitive | Builtin::MoreThan => 1,
            Builtin::For | Builtin::ForEntry => 4,
        }
    }

    /// Maximum number of arguments, `None` when trailing extras are accepted
    pub fn max_arity(&self) -> Option<usize> {
        match self {
            Builtin::Genitive | Builtin::MoreThan => Some(1),
            Builtin::For | Builtin::ForEntry => None,
        }
    }

    /// Number of leading formatter arguments produced per item
    pub fn item_arity(&self) -> usize {
        match self {
            Builtin::Genitive | Builtin::MoreThan => 0,
            Builtin::For => 1,
            Builtin::ForEntry => 2,
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Join formatted fragments into natural "A, B and C" form
///
/// All but the last two fragments are joined with `separator`; the last pair
/// is joined with `conjunction`.
pub fn join_fragments<S: AsRef<str>>(fragments: &[S], separator: &str, conjunction: &str) -> String {
    match fragments {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [init @ .., last] => {
            let mut out = String::new();
            for (i, fragment) in init.iter().enumerate() {
                if i > 0 {
                    out.push_str(separator);
                }
                out.push_str(fragment.as_ref());
            }
            out.push_str(conjunction);
            out.push_str(last.as_ref());
            out
        }
    }
}

/// The numerically smallest of several counts, as written
///
/// `None` when the slice is empty or any value is not a number.
pub fn smallest_number<S: AsRef<str>>(values: &[S]) -> Option<&str> {
    let mut smallest: Option<(f64, &str)> = None;
    for value in values {
        let text = value.as_ref();
        let n: f64 = text.trim().parse().ok()?;
        if smallest.map_or(true, |(best, _)| n < best) {
            smallest = Some((n, text));
        }
    }
    smallest.map(|(_, text)| text)
}

/// Language rule for the possessive form used by `genitive`
pub trait Possessive: fmt::Debug + Send + Sync {
    fn possessive(&self, name: &str) -> String;
}

/// `Mensa` → `Mensa's`, `Starbucks` → `Starbucks'`
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishPossessive;

impl Possessive for EnglishPossessive {
    fn possessive(&self, name: &str) -> String {
        if name.ends_with('s') || name.ends_with('S') {
            format!("{}'", name)
        } else {
            format!("{}'s", name)
        }
    }
}

/// `Mensa` → `Mensas`, `Max` → `Max'`
#[derive(Debug, Clone, Copy, Default)]
pub struct GermanPossessive;

impl Possessive for GermanPossessive {
    fn possessive(&self, name: &str) -> String {
        let sibilant = name
            .chars()
            .last()
            .map(|c| matches!(c.to_ascii_lowercase(), 's' | 'x' | 'z' | 'ß'))
            .unwrap_or(false);
        if sibilant || name.ends_with("ce") {
            format!("{}'", name)
        } else {
            format!("{}s", name)
        }
    }
}

/// Possessive rule selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PossessiveRule {
    #[default]
    English,
    German,
}

impl PossessiveRule {
    pub fn build(self) -> Box<dyn Possessive> {
        match self {
            PossessiveRule::English => Box::new(EnglishPossessive),
            PossessiveRule::German => Box::new(GermanPossessive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_join_zero_items() {
        let empty: [&str; 0] = [];
        assert_eq!(join_fragments(&empty, ", ", " and "), "");
    }

    #[test]
    fn test_join_one_item() {
        assert_eq!(join_fragments(&["a"], ", ", " and "), "a");
    }

    #[test]
    fn test_join_two_items_uses_conjunction_only() {
        assert_eq!(join_fragments(&["a", "b"], "SEP", " and "), "a and b");
    }

    #[test]
    fn test_join_three_items() {
        assert_eq!(join_fragments(&["a", "b", "c"], ", ", " and "), "a, b and c");
    }

    #[test]
    fn test_join_many_items() {
        assert_eq!(
            join_fragments(&["a", "b", "c", "d"], "; ", " or "),
            "a; b; c or d"
        );
    }

    #[test]
    fn test_english_possessive() {
        let rule = EnglishPossessive;
        assert_eq!(rule.possessive("Starbucks"), "Starbucks'");
        assert_eq!(rule.possessive("Mensa"), "Mensa's");
        assert_eq!(rule.possessive("Starbucks"), rule.possessive("Starbucks"));
    }

    #[test]
    fn test_german_possessive() {
        let rule = GermanPossessive;
        assert_eq!(rule.possessive("Mensa"), "Mensas");
        assert_eq!(rule.possessive("Max"), "Max'");
        assert_eq!(rule.possessive("Fritz"), "Fritz'");
        assert_eq!(rule.possessive("Strauß"), "Strauß'");
    }

    #[test]
    fn test_smallest_number() {
        assert_eq!(smallest_number(&["50", "10", "200"]), Some("10"));
        assert_eq!(smallest_number(&["4.5", "3"]), Some("3"));
        assert_eq!(smallest_number(&["many", "10"]), None);
        let empty: [&str; 0] = [];
        assert_eq!(smallest_number(&empty), None);
    }

    #[test]
    fn test_builtin_names_round_trip() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::from_name("info"), None);
    }
}
