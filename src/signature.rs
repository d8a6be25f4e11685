use smallvec::SmallVec;

use crate::language::{normalize_word, Language};
use crate::MAX_WORD_LENGTH;

/// A precomputed representation of a candidate word, built once per selection call.
#[derive(Debug, Clone)]
pub struct WordSignature {
    pub word: String,
    pub letters: SmallVec<[char; MAX_WORD_LENGTH]>,

    /// Occurrence count for each distinct letter, in order of first appearance.
    pub letter_counts: SmallVec<[(char, u32); MAX_WORD_LENGTH]>,

    /// One bit per alphabet position present in the word. Only letters from the language's
    /// alphabet (and only the first 64 positions) are represented; `fully_indexed` records
    /// whether the mask covers the whole word.
    pub alphabet_bitmask: u64,
    pub fully_indexed: bool,
}

impl WordSignature {
    pub fn from_word(raw_word: &str, language: Language) -> WordSignature {
        let word = normalize_word(raw_word);
        let letters: SmallVec<[char; MAX_WORD_LENGTH]> = word.chars().collect();

        let mut letter_counts: SmallVec<[(char, u32); MAX_WORD_LENGTH]> = SmallVec::new();
        let mut alphabet_bitmask = 0u64;
        let mut fully_indexed = true;

        for &letter in &letters {
            match letter_counts.iter_mut().find(|(existing, _)| *existing == letter) {
                Some((_, count)) => *count += 1,
                None => letter_counts.push((letter, 1)),
            }

            match language.alphabet_index(letter) {
                Some(idx) if idx < 64 => alphabet_bitmask |= 1u64 << idx,
                _ => fully_indexed = false,
            }
        }

        WordSignature { word, letters, letter_counts, alphabet_bitmask, fully_indexed }
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    /// The score a word contributes to a set: its length.
    pub fn length_score(&self) -> u32 {
        self.letters.len() as u32
    }

    pub fn unique_letter_count(&self) -> usize {
        self.letter_counts.len()
    }

    pub fn count_of(&self, letter: char) -> u32 {
        self.letter_counts
            .iter()
            .find(|&&(existing, _)| existing == letter)
            .map(|&(_, count)| count)
            .unwrap_or(0)
    }

    /// How many distinct letters this word shares with another one.
    pub fn count_shared_unique_letters(&self, other: &WordSignature) -> usize {
        if self.fully_indexed && other.fully_indexed {
            return (self.alphabet_bitmask & other.alphabet_bitmask).count_ones() as usize;
        }

        self.letter_counts
            .iter()
            .filter(|&&(letter, _)| other.count_of(letter) > 0)
            .count()
    }

    /// A cheap ranking used to cap oversized candidate pools; it favors words carrying many
    /// distinct letters.
    pub fn quick_score(&self) -> f64 {
        self.unique_letter_count() as f64 * 12.0 + self.len() as f64 * 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_counts_letters() {
        let signature = WordSignature::from_word("tool", Language::En);
        assert_eq!(signature.word, "TOOL");
        assert_eq!(signature.len(), 4);
        assert_eq!(signature.unique_letter_count(), 3);
        assert_eq!(signature.count_of('O'), 2);
        assert_eq!(signature.count_of('X'), 0);
        assert_eq!(signature.letter_counts[0], ('T', 1));
        assert!(signature.fully_indexed);
        assert_eq!(signature.alphabet_bitmask.count_ones(), 3);
    }

    #[test]
    fn test_shared_letters_use_bitmask_and_fallback() {
        let tool = WordSignature::from_word("TOOL", Language::En);
        let loot = WordSignature::from_word("LOOT", Language::En);
        let cat = WordSignature::from_word("CAT", Language::En);
        assert_eq!(tool.count_shared_unique_letters(&loot), 3);
        assert_eq!(tool.count_shared_unique_letters(&cat), 1);

        // Latin letters aren't part of the Russian alphabet, so this goes through the slow path.
        let mixed = WordSignature::from_word("TOOL", Language::Ru);
        assert!(!mixed.fully_indexed);
        assert_eq!(mixed.count_shared_unique_letters(&loot), 3);
    }

    #[test]
    fn test_ye_and_yo_signatures_differ() {
        let ye = WordSignature::from_word("ЕЛКА", Language::Ru);
        let yo = WordSignature::from_word("ЁЛКА", Language::Ru);
        assert_eq!(ye.count_shared_unique_letters(&yo), 3);
        assert_ne!(ye.alphabet_bitmask, yo.alphabet_bitmask);
    }

    #[test]
    fn test_quick_score_prefers_dense_words() {
        let dense = WordSignature::from_word("ROUTE", Language::En);
        let sparse = WordSignature::from_word("TOOT", Language::En);
        assert_eq!(dense.quick_score(), 5.0 * 12.0 + 5.0 * 2.0);
        assert!(dense.quick_score() > sparse.quick_score());
    }
}
