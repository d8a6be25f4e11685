//! An exact, independent check that target words can be traced on a board.

use bit_set::BitSet;
use smallvec::SmallVec;
use thiserror::Error;

use crate::language::{normalize_letter, normalize_word};
use crate::template::{Cell, HexTemplate};
use crate::{CellIdx, MAX_WORD_LENGTH};

/// The words that couldn't be traced, in the order they were checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsolvable words: {}", .0.join(", "))]
pub struct UnsolvedWords(pub Vec<String>);

/// For each letter of the word, the cells carrying that letter.
type CandidateCells = SmallVec<[SmallVec<[CellIdx; 8]>; MAX_WORD_LENGTH]>;

/// Is there a path of adjacent, distinct cells on `cells` spelling `raw_word`?
pub fn can_build_word(cells: &[Cell], raw_word: &str) -> bool {
    let template = HexTemplate::from_cells(cells);
    can_build_word_on(&template, cells, raw_word)
}

/// Check every target word and report all the ones that can't be traced.
pub fn validate_all<S: AsRef<str>>(cells: &[Cell], target_words: &[S]) -> Result<(), UnsolvedWords> {
    let template = HexTemplate::from_cells(cells);
    let failed: Vec<String> = target_words
        .iter()
        .map(|word| word.as_ref())
        .filter(|word| !can_build_word_on(&template, cells, word))
        .map(|word| word.to_string())
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(UnsolvedWords(failed))
    }
}

fn can_build_word_on(template: &HexTemplate, cells: &[Cell], raw_word: &str) -> bool {
    let letters: SmallVec<[char; MAX_WORD_LENGTH]> = normalize_word(raw_word).chars().collect();
    if letters.is_empty() || cells.is_empty() {
        return false;
    }

    let board_letters: Vec<char> = cells.iter().map(|cell| normalize_letter(cell.letter)).collect();

    let mut candidates: CandidateCells = SmallVec::new();
    for &letter in &letters {
        let matching: SmallVec<[CellIdx; 8]> = board_letters
            .iter()
            .enumerate()
            .filter(|&(_, &cell_letter)| cell_letter == letter)
            .map(|(idx, _)| idx)
            .collect();
        if matching.is_empty() {
            return false;
        }
        candidates.push(matching);
    }

    let mut visited = BitSet::with_capacity(cells.len());
    candidates[0].iter().any(|&start| trace_path(template, &candidates, start, 0, &mut visited))
}

fn trace_path(
    template: &HexTemplate,
    candidates: &CandidateCells,
    current: CellIdx,
    position: usize,
    visited: &mut BitSet,
) -> bool {
    if position + 1 == candidates.len() {
        return true;
    }

    visited.insert(current);
    let found = candidates[position + 1].iter().any(|&next| {
        !visited.contains(next)
            && template.neighbors(current).contains(&next)
            && trace_path(template, candidates, next, position + 1, visited)
    });
    visited.remove(current);

    found
}
