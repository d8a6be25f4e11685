//! Alphabet tables and word normalization.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EN_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const RU_ALPHABET: &str = "АБВГДЕЁЖЗИЙКЛМНОПРСТУФХЦЧШЩЪЫЬЭЮЯ";

/// The same letters as the alphabets above, ordered from most to least frequent. Filler synthesis
/// draws from these most of the time so that boards read like natural text.
pub const EN_COMMON: &str = "ETAOINSHRDLCUMWFGYPBVKJXQZ";
pub const RU_COMMON: &str = "ОЕАИНТСРВЛКМДПУЯЫЬГЗБЧЙХЖШЮЦЩЭФЪЁ";

/// Language of a candidate pool. A single run never mixes alphabets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    pub fn alphabet(self) -> &'static str {
        match self {
            Language::En => EN_ALPHABET,
            Language::Ru => RU_ALPHABET,
        }
    }

    pub fn common_letters(self) -> &'static str {
        match self {
            Language::En => EN_COMMON,
            Language::Ru => RU_COMMON,
        }
    }

    /// Position of a letter in this language's alphabet. `Е` and `Ё` are distinct letters with
    /// distinct positions.
    pub fn alphabet_index(self, letter: char) -> Option<usize> {
        self.alphabet().chars().position(|c| c == letter)
    }

    /// Does the (already normalized) word consist only of letters from this alphabet?
    pub fn is_language_word(self, word: &str) -> bool {
        !word.is_empty() && word.chars().all(|c| self.alphabet_index(c).is_some())
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::En => write!(f, "EN"),
            Language::Ru => write!(f, "RU"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown language tag {0:?} (expected EN or RU)")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "EN" => Ok(Language::En),
            "RU" => Ok(Language::Ru),
            _ => Err(UnknownLanguage(tag.to_string())),
        }
    }
}

/// Trim and uppercase a raw word. Letters are compared as individual `char`s everywhere after
/// this, so composed letters like `Ё` never collapse into their base letter.
pub fn normalize_word(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Uppercase a single letter, keeping it unchanged if its uppercase form isn't a single char.
pub fn normalize_letter(letter: char) -> char {
    let mut upper = letter.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => letter,
    }
}

/// Per-letter occurrence counts, in letter order.
pub fn letter_counts<I>(letters: I) -> BTreeMap<char, u32>
    where
        I: IntoIterator<Item=char>
{
    let mut counts = BTreeMap::new();
    for letter in letters {
        *counts.entry(letter).or_insert(0) += 1;
    }
    counts
}

/// The number of "extra" occurrences across all letters, i.e. the sum of `count - 1` over every
/// letter that appears more than once. This is what the letter-repeat budget limits.
pub fn count_repeats<'a, I>(counts: I) -> usize
    where
        I: IntoIterator<Item=&'a u32>
{
    counts.into_iter().map(|&count| count.saturating_sub(1) as usize).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_tables_have_expected_sizes() {
        assert_eq!(EN_ALPHABET.chars().count(), 26);
        assert_eq!(EN_COMMON.chars().count(), 26);
        assert_eq!(RU_ALPHABET.chars().count(), 33);
        assert_eq!(RU_COMMON.chars().count(), 33);
    }

    #[test]
    fn test_common_tables_are_permutations_of_alphabets() {
        for language in [Language::En, Language::Ru] {
            let mut alphabet: Vec<char> = language.alphabet().chars().collect();
            let mut common: Vec<char> = language.common_letters().chars().collect();
            alphabet.sort_unstable();
            common.sort_unstable();
            assert_eq!(alphabet, common, "{language}");
        }
    }

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("  route "), "ROUTE");
        assert_eq!(normalize_word("ёлка"), "ЁЛКА");
        assert_eq!(normalize_word("   "), "");
    }

    #[test]
    fn test_ye_and_yo_are_distinct_letters() {
        let ye = Language::Ru.alphabet_index('Е');
        let yo = Language::Ru.alphabet_index('Ё');
        assert!(ye.is_some());
        assert!(yo.is_some());
        assert_ne!(ye, yo);
    }

    #[test]
    fn test_is_language_word() {
        assert!(Language::En.is_language_word("ROUTE"));
        assert!(!Language::En.is_language_word("ЁЛКА"));
        assert!(Language::Ru.is_language_word("ЁЛКА"));
        assert!(!Language::En.is_language_word("TWO WORDS"));
        assert!(!Language::En.is_language_word(""));
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!("en".parse::<Language>(), Ok(Language::En));
        assert_eq!(" RU ".parse::<Language>(), Ok(Language::Ru));
        assert!("de".parse::<Language>().is_err());
    }

    #[test]
    fn test_count_repeats() {
        let counts = letter_counts("TOOT".chars());
        assert_eq!(counts[&'T'], 2);
        assert_eq!(count_repeats(counts.values()), 2);
        assert_eq!(count_repeats(letter_counts("ROUTE".chars()).values()), 0);
    }
}
