//! Board placement: lay a chosen word set onto a hex board so that every word is traceable.
//!
//! Two layouts are supported. [`BoardLayoutMode::Fixed16`] searches for a simultaneous placement
//! of every word as a path over the fixed 16-cell board, backtracking across words, and then
//! synthesizes filler letters for the leftover cells. [`BoardLayoutMode::CompactPath`] merges the
//! words into a single overlapping string and lays it along a compact self-avoiding hex walk.
//!
//! Both layouts share the board arena, filler synthesis and the final solvability check.

use std::collections::BTreeMap;

use bit_set::BitSet;
use instant::Duration;
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::language::{normalize_word, Language};
use crate::template::{hex_distance, Cell, HexTemplate, HEX_DIRECTIONS};
use crate::validator::validate_all;
use crate::{derive_seed, seeded_rng, AxialCoord, Budget, CellIdx, SearchRng, MAX_WORD_LENGTH, MIN_SOLVER_MILLISECONDS};

/// Seed stride between placement attempts.
pub const PLACEMENT_ATTEMPT_SEED_STRIDE: u64 = 911;

/// Seed stride between attempts for the compact layout's coordinate walk.
pub const COMPACT_LAYOUT_SEED_STRIDE: u64 = 1;

/// The number of candidate paths kept for each word during fixed-board placement.
pub const MAX_PATH_CANDIDATES: usize = 96;

/// How often filler synthesis draws from the common-letter table rather than the full alphabet.
pub const COMMON_LETTER_PROBABILITY: f64 = 0.9;

/// How often the compact merge accepts an alternative that ties the current best.
pub const MERGE_TIE_ACCEPT_PROBABILITY: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoardLayoutMode {
    /// The fixed 16-cell board with canonical coordinates.
    #[default]
    Fixed16,
    /// A dynamically sized board grown as a compact hex walk.
    CompactPath,
}

/// Configuration for [`try_place`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardPlacementOptions {
    pub language: Language,
    pub layout: BoardLayoutMode,

    /// Bounds on the board size for the compact layout. The fixed board is always 16 cells.
    pub min_cells: usize,
    pub max_cells: usize,

    /// How many filler cells the compact layout may add beyond the required letters.
    pub filler_letters_max: usize,

    pub avoid_duplicate_letters: bool,

    /// Upper bound on the sum over letters of `count - 1` across the whole board.
    pub max_letter_repeats: usize,

    pub hex_budget_min: usize,
    pub hex_budget_max: usize,

    pub attempts: usize,
    pub seed: u64,

    /// Reject any board on which a target word can't be traced.
    pub require_all_targets_solvable: bool,

    /// Soft wall-clock budget for one `try_place` call.
    pub max_placement_milliseconds: u64,
}

impl Default for BoardPlacementOptions {
    fn default() -> Self {
        Self {
            language: Language::En,
            layout: BoardLayoutMode::Fixed16,
            min_cells: 3,
            max_cells: 18,
            filler_letters_max: 0,
            avoid_duplicate_letters: true,
            max_letter_repeats: 0,
            hex_budget_min: 0,
            hex_budget_max: 0,
            attempts: 12,
            seed: 1,
            require_all_targets_solvable: true,
            max_placement_milliseconds: 2000,
        }
    }
}

impl BoardPlacementOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_layout(mut self, layout: BoardLayoutMode) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_cell_range(mut self, min_cells: usize, max_cells: usize) -> Self {
        self.min_cells = min_cells;
        self.max_cells = max_cells;
        self
    }

    pub fn with_filler_letters_max(mut self, filler_letters_max: usize) -> Self {
        self.filler_letters_max = filler_letters_max;
        self
    }

    pub fn with_letter_rules(mut self, avoid_duplicate_letters: bool, max_letter_repeats: usize) -> Self {
        self.avoid_duplicate_letters = avoid_duplicate_letters;
        self.max_letter_repeats = max_letter_repeats;
        self
    }

    pub fn with_hex_budget(mut self, min: usize, max: usize) -> Self {
        self.hex_budget_min = min;
        self.hex_budget_max = max;
        self
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_require_all_targets_solvable(mut self, require: bool) -> Self {
        self.require_all_targets_solvable = require;
        self
    }

    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.max_placement_milliseconds = ms;
        self
    }
}

/// A struct tracking statistics about one placement call.
#[derive(Debug, Clone, Default)]
pub struct PlacementStatistics {
    pub attempts: usize,
    pub states: u64,
    pub backtracks: u64,
    pub duration: Duration,
}

/// A successfully placed board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardPlacement {
    pub cells: Vec<Cell>,

    /// The placed words joined with `|` for the fixed board, or the merged letter string for the
    /// compact layout. Only meant for diagnostics.
    pub merged_path: String,

    #[serde(skip)]
    pub statistics: PlacementStatistics,
}

impl BoardPlacement {
    pub fn letters(&self) -> Vec<char> {
        self.cells.iter().map(|cell| cell.letter).collect()
    }
}

#[derive(Debug, Clone, Error)]
pub enum PlacementFailure {
    #[error("no words to place")]
    NoWords,
    #[error("no valid board found in {attempts} attempts")]
    ExhaustedAttempts { attempts: usize, statistics: PlacementStatistics },
}

type WordLetters = SmallVec<[char; MAX_WORD_LENGTH]>;
type CellPath = SmallVec<[CellIdx; MAX_WORD_LENGTH]>;

/// The mutable board arena shared by placement and filler synthesis, with per-letter tallies
/// maintained alongside so repeat checks are cheap.
#[derive(Debug, Clone)]
struct Board {
    letters: Vec<Option<char>>,
    counts: BTreeMap<char, u32>,
    repeats: usize,
}

impl Board {
    fn new(size: usize) -> Board {
        Board { letters: vec![None; size], counts: BTreeMap::new(), repeats: 0 }
    }

    fn len(&self) -> usize {
        self.letters.len()
    }

    fn get(&self, idx: CellIdx) -> Option<char> {
        self.letters[idx]
    }

    fn contains_letter(&self, letter: char) -> bool {
        self.counts.contains_key(&letter)
    }

    fn repeats(&self) -> usize {
        self.repeats
    }

    fn set(&mut self, idx: CellIdx, letter: char) {
        debug_assert!(self.letters[idx].is_none());
        self.letters[idx] = Some(letter);
        let count = self.counts.entry(letter).or_insert(0);
        if *count >= 1 {
            self.repeats += 1;
        }
        *count += 1;
    }

    fn clear(&mut self, idx: CellIdx) {
        let Some(letter) = self.letters[idx].take() else {
            return;
        };
        if let Some(count) = self.counts.get_mut(&letter) {
            *count -= 1;
            if *count >= 1 {
                self.repeats -= 1;
            } else {
                self.counts.remove(&letter);
            }
        }
    }

    /// Can `letter` occupy the cell at `idx`, either because it's already there or because the
    /// cell is empty and the letter rules allow it?
    fn can_use_cell(&self, idx: CellIdx, letter: char, avoid_duplicate_letters: bool) -> bool {
        match self.letters[idx] {
            Some(existing) => existing == letter,
            None => !avoid_duplicate_letters || !self.contains_letter(letter),
        }
    }

    /// Would adding one more `letter` anywhere keep the board within its letter rules?
    fn accepts_filler(&self, letter: char, options: &BoardPlacementOptions) -> bool {
        if self.contains_letter(letter) {
            !options.avoid_duplicate_letters && self.repeats < options.max_letter_repeats
        } else {
            true
        }
    }

    /// Every cell's letter, if the board is completely filled.
    fn filled_letters(&self) -> Option<Vec<char>> {
        self.letters.iter().copied().collect()
    }
}

/// The cells written while applying one word's path. Dropping it without calling `commit` clears
/// those cells again, so every failed branch leaves the board exactly as it found it.
struct PathWrite<'b> {
    board: &'b mut Board,
    written: CellPath,
    committed: bool,
}

impl<'b> PathWrite<'b> {
    /// Write `word` along `path`, or return `None` (with the board untouched) if a cell holds a
    /// different letter, a new letter is already used under duplicate avoidance, or the result
    /// exceeds the repeat budget.
    fn apply(
        board: &'b mut Board,
        word: &[char],
        path: &[CellIdx],
        options: &BoardPlacementOptions,
    ) -> Option<PathWrite<'b>> {
        let mut write = PathWrite { board, written: SmallVec::new(), committed: false };

        for (&idx, &letter) in path.iter().zip(word) {
            match write.board.get(idx) {
                Some(existing) if existing == letter => continue,
                Some(_) => return None,
                None => {
                    if options.avoid_duplicate_letters && write.board.contains_letter(letter) {
                        return None;
                    }
                    write.board.set(idx, letter);
                    write.written.push(idx);
                }
            }
        }

        if write.board.repeats() > options.max_letter_repeats {
            return None;
        }

        Some(write)
    }

    fn board(&mut self) -> &mut Board {
        &mut *self.board
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PathWrite<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for &idx in self.written.iter().rev() {
            self.board.clear(idx);
        }
    }
}

#[derive(Debug, Clone)]
struct PathCandidate {
    path: CellPath,
    score: f64,
}

/// The live state of one fixed-board placement attempt.
struct PlacementSearch<'a> {
    template: &'a HexTemplate,
    options: &'a BoardPlacementOptions,
    rng: SearchRng,
    budget: Budget,
    statistics: &'a mut PlacementStatistics,
}

impl<'a> PlacementSearch<'a> {
    /// Place `words` in order, backtracking into earlier words when a later one has no path.
    fn place_words(&mut self, words: &[WordLetters], board: &mut Board) -> bool {
        let Some((word, rest)) = words.split_first() else {
            return true;
        };

        if word.is_empty() || word.len() > board.len() || self.budget.is_exhausted() {
            return false;
        }

        self.statistics.states += 1;

        let candidates = self.collect_path_candidates(word, board);
        trace!("{} candidate paths for word of length {}", candidates.len(), word.len());

        for candidate in candidates {
            let Some(mut write) = PathWrite::apply(board, word, &candidate.path, self.options) else {
                continue;
            };

            if self.place_words(rest, write.board()) {
                write.commit();
                return true;
            }

            self.statistics.backtracks += 1;
            if self.budget.is_exhausted() {
                return false;
            }
        }

        false
    }

    /// Enumerate up to `MAX_PATH_CANDIDATES` paths for `word` from shuffled start cells, best
    /// scoring first.
    fn collect_path_candidates(&mut self, word: &[char], board: &Board) -> Vec<PathCandidate> {
        let mut starts: Vec<CellIdx> = (0..self.template.len()).collect();
        starts.shuffle(&mut self.rng);

        let mut collector = Vec::new();
        let mut path = CellPath::new();
        let mut visited = BitSet::with_capacity(self.template.len());

        for start in starts {
            if collector.len() >= MAX_PATH_CANDIDATES {
                break;
            }
            if !board.can_use_cell(start, word[0], self.options.avoid_duplicate_letters) {
                continue;
            }

            visited.insert(start);
            path.push(start);
            self.extend_paths(word, board, &mut path, &mut visited, &mut collector);
            path.pop();
            visited.remove(start);
        }

        collector.sort_by(|a, b| b.score.total_cmp(&a.score));
        collector
    }

    fn extend_paths(
        &mut self,
        word: &[char],
        board: &Board,
        path: &mut CellPath,
        visited: &mut BitSet,
        collector: &mut Vec<PathCandidate>,
    ) {
        if collector.len() >= MAX_PATH_CANDIDATES || self.budget.is_exhausted() {
            return;
        }

        if path.len() == word.len() {
            let score = self.score_path(word, path, board);
            collector.push(PathCandidate { path: path.clone(), score });
            return;
        }

        let template = self.template;
        let letter = word[path.len()];
        let Some(&prev) = path.last() else {
            return;
        };

        // Cells already holding the needed letter first, then closest to the center.
        let mut neighbors: SmallVec<[(bool, f64, CellIdx); 6]> = template
            .neighbors(prev)
            .iter()
            .map(|&next| {
                let jitter: f64 = self.rng.gen();
                (board.get(next) == Some(letter), template.distance_from_center(next) as f64 + jitter, next)
            })
            .collect();
        neighbors.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.total_cmp(&b.1)));

        for (_, _, next) in neighbors {
            if visited.contains(next) || !board.can_use_cell(next, letter, self.options.avoid_duplicate_letters) {
                continue;
            }

            visited.insert(next);
            path.push(next);
            self.extend_paths(word, board, path, visited, collector);
            path.pop();
            visited.remove(next);

            if collector.len() >= MAX_PATH_CANDIDATES {
                return;
            }
        }
    }

    /// Reward reusing letters already on the board and staying near the center.
    fn score_path(&mut self, word: &[char], path: &[CellIdx], board: &Board) -> f64 {
        let mut overlap = 0u32;
        let mut new_cells = 0u32;
        let mut center_bonus = 0.0;

        for (&idx, &letter) in path.iter().zip(word) {
            match board.get(idx) {
                Some(existing) if existing == letter => overlap += 1,
                Some(_) => {}
                None => new_cells += 1,
            }
            let (q, r) = self.template.coord(idx);
            center_bonus += 3.0 - q.abs() as f64 - r.abs() as f64;
        }

        overlap as f64 * 12.0 - new_cells as f64 * 2.0 + center_bonus + self.rng.gen::<f64>()
    }
}

/// Fill every empty cell with a filler letter that keeps the board within its letter rules.
/// Returns false if some cell has no acceptable letter.
fn fill_empty_cells(board: &mut Board, options: &BoardPlacementOptions, rng: &mut SearchRng) -> bool {
    let alphabet: Vec<char> = options.language.alphabet().chars().collect();
    let common: Vec<char> = options.language.common_letters().chars().collect();

    for idx in 0..board.len() {
        if board.get(idx).is_some() {
            continue;
        }

        let primary = if rng.gen::<f64>() < COMMON_LETTER_PROBABILITY { &common } else { &alphabet };
        let filler = [primary, &alphabet].into_iter().find_map(|source| {
            let offset = rng.gen_range(0..source.len());
            (0..source.len())
                .map(|k| source[(k + offset) % source.len()])
                .find(|&letter| board.accepts_filler(letter, options))
        });

        match filler {
            Some(letter) => board.set(idx, letter),
            None => return false,
        }
    }

    true
}

fn normalize_words<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        let word = normalize_word(word.as_ref());
        if !word.is_empty() && !normalized.contains(&word) {
            normalized.push(word);
        }
    }
    normalized
}

/// Lay `words` onto a board according to `options`. Every word is traceable on the result when
/// `require_all_targets_solvable` is set.
pub fn try_place<S: AsRef<str>>(
    words: &[S],
    options: &BoardPlacementOptions,
) -> Result<BoardPlacement, PlacementFailure> {
    let words = normalize_words(words);
    if words.is_empty() {
        return Err(PlacementFailure::NoWords);
    }

    let budget = Budget::from_millis(options.max_placement_milliseconds.max(MIN_SOLVER_MILLISECONDS));
    let mut statistics = PlacementStatistics::default();

    let placement = match options.layout {
        BoardLayoutMode::Fixed16 => place_fixed(&words, options, budget, &mut statistics),
        BoardLayoutMode::CompactPath => place_compact(&words, options, budget, &mut statistics),
    };

    statistics.duration = budget.elapsed();
    debug!(
        "placement of {} words: {} after {} attempts ({} states, {} backtracks)",
        words.len(),
        if placement.is_some() { "succeeded" } else { "failed" },
        statistics.attempts,
        statistics.states,
        statistics.backtracks,
    );

    match placement {
        Some((cells, merged_path)) => Ok(BoardPlacement { cells, merged_path, statistics }),
        None => Err(PlacementFailure::ExhaustedAttempts { attempts: statistics.attempts, statistics }),
    }
}

/// Does this board pass the final checks shared by both layouts?
fn accept_board(cells: &[Cell], words: &[String], options: &BoardPlacementOptions) -> bool {
    if !options.require_all_targets_solvable {
        return true;
    }

    match validate_all(cells, words) {
        Ok(()) => true,
        Err(unsolved) => {
            debug!("rejecting board: {}", unsolved);
            false
        }
    }
}

fn place_fixed(
    words: &[String],
    options: &BoardPlacementOptions,
    budget: Budget,
    statistics: &mut PlacementStatistics,
) -> Option<(Vec<Cell>, String)> {
    let mut sorted_words = words.to_vec();
    sorted_words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
    let letters: Vec<WordLetters> = sorted_words.iter().map(|word| word.chars().collect()).collect();

    let template = HexTemplate::fixed16();

    for attempt in 0..options.attempts.max(1) {
        if budget.is_exhausted() {
            break;
        }
        statistics.attempts += 1;

        let mut board = Board::new(template.len());
        let mut search = PlacementSearch {
            template: &template,
            options,
            rng: seeded_rng(derive_seed(options.seed, attempt, PLACEMENT_ATTEMPT_SEED_STRIDE)),
            budget,
            statistics: &mut *statistics,
        };

        if !search.place_words(&letters, &mut board) {
            trace!("attempt {}: words could not all be placed", attempt);
            continue;
        }

        if !fill_empty_cells(&mut board, options, &mut search.rng) {
            trace!("attempt {}: filler synthesis failed", attempt);
            continue;
        }

        if board.repeats() > options.max_letter_repeats {
            continue;
        }

        let Some(board_letters) = board.filled_letters() else {
            continue;
        };

        let cells = template.build_cells(&board_letters);
        if accept_board(&cells, words, options) {
            return Some((cells, sorted_words.join("|")));
        }
    }

    None
}

fn place_compact(
    words: &[String],
    options: &BoardPlacementOptions,
    budget: Budget,
    statistics: &mut PlacementStatistics,
) -> Option<(Vec<Cell>, String)> {
    let letters: Vec<Vec<char>> = words.iter().map(|word| word.chars().collect()).collect();

    for attempt in 0..options.attempts.max(1) {
        if budget.is_exhausted() {
            break;
        }
        statistics.attempts += 1;

        let mut rng = seeded_rng(derive_seed(options.seed, attempt, PLACEMENT_ATTEMPT_SEED_STRIDE));
        let merged = build_merged_path(&letters, &mut rng);
        let base = base_letters(&merged, options.avoid_duplicate_letters);

        let Some(cell_count) = resolve_cell_count(base.len(), options) else {
            trace!("attempt {}: {} required letters don't fit the cell bounds", attempt, base.len());
            continue;
        };

        let mut board = Board::new(cell_count);
        for (idx, &letter) in base.iter().enumerate() {
            board.set(idx, letter);
        }
        if board.repeats() > options.max_letter_repeats {
            continue;
        }

        if !fill_empty_cells(&mut board, options, &mut rng) {
            continue;
        }

        let Some(board_letters) = board.filled_letters() else {
            continue;
        };

        let layout_seed = derive_seed(options.seed, attempt, COMPACT_LAYOUT_SEED_STRIDE);
        let Some(coords) = compact_path_coords(cell_count, layout_seed) else {
            continue;
        };

        let cells = HexTemplate::from_coords(coords).build_cells(&board_letters);
        statistics.states += 1;
        if accept_board(&cells, words, options) {
            return Some((cells, merged.iter().collect()));
        }
    }

    None
}

/// Merge `b` into `a` using the longest suffix/prefix overlap in either direction, returning the
/// merged letters and the overlap length.
fn merge_pair(a: &[char], b: &[char]) -> (Vec<char>, usize) {
    let max_overlap = a.len().min(b.len());

    let mut merged: Vec<char> = a.iter().chain(b).copied().collect();
    let mut overlap = 0;

    if let Some(k) = (1..=max_overlap).rev().find(|&k| a.ends_with(&b[..k])) {
        merged = a.iter().chain(&b[k..]).copied().collect();
        overlap = k;
    }

    if let Some(k) = (1..=max_overlap).rev().find(|&k| a.starts_with(&b[b.len() - k..])) {
        if k > overlap {
            merged = b.iter().chain(&a[k..]).copied().collect();
            overlap = k;
        }
    }

    (merged, overlap)
}

/// Merge all words into one string, starting from a random word and repeatedly absorbing the
/// word whose merge adds the fewest letters.
fn build_merged_path(words: &[Vec<char>], rng: &mut SearchRng) -> Vec<char> {
    if words.is_empty() {
        return Vec::new();
    }

    let mut pool: Vec<&Vec<char>> = words.iter().collect();
    let mut merged = pool.remove(rng.gen_range(0..pool.len())).clone();

    while !pool.is_empty() {
        let mut best: Option<(usize, Vec<char>, usize)> = None;

        for (idx, word) in pool.iter().enumerate() {
            let (candidate, overlap) = merge_pair(&merged, word);
            let replace = match &best {
                None => true,
                Some((_, best_merged, best_overlap)) => {
                    candidate.len() < best_merged.len()
                        || (candidate.len() == best_merged.len() && overlap > *best_overlap)
                        || (candidate.len() == best_merged.len()
                            && overlap == *best_overlap
                            && rng.gen::<f64>() < MERGE_TIE_ACCEPT_PROBABILITY)
                }
            };
            if replace {
                best = Some((idx, candidate, overlap));
            }
        }

        let Some((idx, candidate, _)) = best else {
            break;
        };
        merged = candidate;
        pool.remove(idx);
    }

    merged
}

/// The letters the compact board must carry: the merged string, with later occurrences of a
/// letter dropped under duplicate avoidance.
fn base_letters(merged: &[char], avoid_duplicate_letters: bool) -> Vec<char> {
    if !avoid_duplicate_letters {
        return merged.to_vec();
    }

    let mut letters = Vec::with_capacity(merged.len());
    for &letter in merged {
        if !letters.contains(&letter) {
            letters.push(letter);
        }
    }
    letters
}

/// Pick the compact board size: the smallest size that carries every required letter and meets
/// the cell and hex minimums, as long as it fits under the maximums and the filler allowance.
fn resolve_cell_count(required: usize, options: &BoardPlacementOptions) -> Option<usize> {
    let mut max_cells = options.max_cells.max(1);
    if options.hex_budget_max > 0 {
        max_cells = max_cells.min(options.hex_budget_max);
    }
    if required > max_cells {
        return None;
    }

    let mut min_cells = options.min_cells.max(required);
    if options.hex_budget_min > 0 {
        min_cells = min_cells.max(options.hex_budget_min);
    }

    let upper_bound = max_cells.min(required + options.filler_letters_max);
    (min_cells <= upper_bound).then_some(min_cells)
}

/// A self-avoiding walk of `count` cells from the origin, preferring cells near the center.
fn compact_path_coords(count: usize, seed: u64) -> Option<Vec<AxialCoord>> {
    if count == 0 {
        return Some(Vec::new());
    }

    let mut rng = seeded_rng(seed);
    let mut path = vec![(0, 0)];
    extend_walk(&mut path, count, &mut rng).then_some(path)
}

fn extend_walk(path: &mut Vec<AxialCoord>, count: usize, rng: &mut SearchRng) -> bool {
    if path.len() >= count {
        return true;
    }

    let Some(&(q, r)) = path.last() else {
        return false;
    };

    let mut nexts: SmallVec<[(i32, f64, AxialCoord); 6]> = HEX_DIRECTIONS
        .iter()
        .map(|&(dq, dr)| (q + dq, r + dr))
        .filter(|next| !path.contains(next))
        .map(|next| (hex_distance(next, (0, 0)), rng.gen::<f64>(), next))
        .collect();
    nexts.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.total_cmp(&b.1)));

    for (_, _, next) in nexts {
        path.push(next);
        if extend_walk(path, count, rng) {
            return true;
        }
        path.pop();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{count_repeats, letter_counts};
    use crate::template::{are_adjacent, has_canonical_shape};
    use crate::validator::can_build_word;

    fn repeats_of(cells: &[Cell]) -> usize {
        let counts = letter_counts(cells.iter().map(|cell| cell.letter));
        count_repeats(counts.values())
    }

    #[test]
    fn test_board_tallies_repeats() {
        let mut board = Board::new(4);
        board.set(0, 'T');
        board.set(1, 'O');
        board.set(2, 'T');
        assert_eq!(board.repeats(), 1);
        board.clear(2);
        assert_eq!(board.repeats(), 0);
        assert!(board.contains_letter('T'));
        board.clear(0);
        assert!(!board.contains_letter('T'));
        assert_eq!(board.filled_letters(), None);
    }

    #[test]
    fn test_path_write_rolls_back_unless_committed() {
        let options = BoardPlacementOptions::new().with_letter_rules(false, 4);
        let mut board = Board::new(4);
        board.set(1, 'A');
        let word: Vec<char> = "CAT".chars().collect();

        {
            let write = PathWrite::apply(&mut board, &word, &[0, 1, 2], &options).expect("path should apply");
            assert_eq!(write.written.as_slice(), &[0, 2]);
        }
        assert_eq!(board.letters, vec![None, Some('A'), None, None]);

        let write = PathWrite::apply(&mut board, &word, &[0, 1, 2], &options).expect("path should apply");
        write.commit();
        assert_eq!(board.letters, vec![Some('C'), Some('A'), Some('T'), None]);
    }

    #[test]
    fn test_path_write_rejects_conflicts_and_repeats() {
        let strict = BoardPlacementOptions::new().with_letter_rules(true, 0);
        let mut board = Board::new(4);
        board.set(3, 'O');

        let toot: Vec<char> = "TOOT".chars().collect();
        assert!(PathWrite::apply(&mut board, &toot, &[0, 1, 2, 3], &strict).is_none());
        assert_eq!(board.letters, vec![None, None, None, Some('O')]);

        // Duplicates allowed, but the repeat budget still applies.
        let no_repeats = BoardPlacementOptions::new().with_letter_rules(false, 0);
        assert!(PathWrite::apply(&mut board, &toot, &[0, 3, 1, 2], &no_repeats).is_none());
        assert_eq!(board.repeats(), 0);
    }

    #[test]
    fn test_merge_pair() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(merge_pair(&chars("ROUTE"), &chars("TEA")), (chars("ROUTEA"), 2));
        assert_eq!(merge_pair(&chars("ROUTE"), &chars("CARO")), (chars("CAROUTE"), 2));
        assert_eq!(merge_pair(&chars("CAT"), &chars("DOG")), (chars("CATDOG"), 0));
        assert_eq!(merge_pair(&chars("ROUTE"), &chars("UTE")), (chars("ROUTE"), 3));
    }

    #[test]
    fn test_base_letters_dedupes_only_when_avoiding() {
        let merged: Vec<char> = "TOOT".chars().collect();
        assert_eq!(base_letters(&merged, true), vec!['T', 'O']);
        assert_eq!(base_letters(&merged, false), merged);
    }

    #[test]
    fn test_resolve_cell_count() {
        let options = BoardPlacementOptions::new().with_cell_range(6, 10).with_filler_letters_max(4);
        assert_eq!(resolve_cell_count(4, &options), Some(6));
        assert_eq!(resolve_cell_count(8, &options), Some(8));
        assert_eq!(resolve_cell_count(11, &options), None);

        // Not enough filler allowance to reach the minimum.
        assert_eq!(resolve_cell_count(1, &options), None);

        let budgeted = options.clone().with_hex_budget(7, 7);
        assert_eq!(resolve_cell_count(4, &budgeted), Some(7));
        assert_eq!(resolve_cell_count(8, &budgeted), None);
    }

    #[test]
    fn test_compact_path_coords_are_a_walk() {
        let coords = compact_path_coords(12, 5).expect("walk should exist");
        assert_eq!(coords.len(), 12);
        assert_eq!(coords[0], (0, 0));
        for pair in coords.windows(2) {
            assert!(are_adjacent(pair[0], pair[1]));
        }
        let mut unique = coords.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), coords.len());
    }

    #[test]
    fn test_fill_respects_duplicate_avoidance() {
        let options = BoardPlacementOptions::new();
        let mut board = Board::new(16);
        let mut rng = seeded_rng(3);
        assert!(fill_empty_cells(&mut board, &options, &mut rng));
        let letters = board.filled_letters().expect("board should be full");
        let mut unique = letters.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 16);
    }

    #[test]
    fn test_fill_fails_when_alphabet_is_exhausted() {
        let options = BoardPlacementOptions::new();
        let mut board = Board::new(27);
        assert!(!fill_empty_cells(&mut board, &options, &mut seeded_rng(3)));
    }

    #[test]
    fn test_place_cat_and_ate() {
        let options = BoardPlacementOptions::new();
        let placement = try_place(&["cat", "ate"], &options).expect("placement should succeed");

        assert_eq!(placement.cells.len(), 16);
        assert!(has_canonical_shape(&placement.cells));
        assert!(can_build_word(&placement.cells, "CAT"));
        assert!(can_build_word(&placement.cells, "ATE"));
        assert_eq!(repeats_of(&placement.cells), 0);
        assert_eq!(placement.merged_path, "ATE|CAT");
        println!("{:?}", placement.statistics);
    }

    #[test]
    fn test_place_is_deterministic() {
        let options = BoardPlacementOptions::new().with_seed(17);
        let first = try_place(&["ROUTE", "SORE"], &options).expect("placement should succeed");
        let second = try_place(&["ROUTE", "SORE"], &options).expect("placement should succeed");
        assert_eq!(first.letters(), second.letters());
    }

    #[test]
    fn test_place_rejects_repeated_letters_without_budget() {
        let options = BoardPlacementOptions::new().with_letter_rules(true, 0);
        assert!(matches!(try_place(&["TOOT"], &options), Err(PlacementFailure::ExhaustedAttempts { .. })));
    }

    #[test]
    fn test_place_allows_repeats_within_budget() {
        let options = BoardPlacementOptions::new().with_letter_rules(false, 2);
        let placement = try_place(&["TOOT"], &options).expect("placement should succeed");
        assert!(can_build_word(&placement.cells, "TOOT"));
        assert!(repeats_of(&placement.cells) <= 2);
    }

    #[test]
    fn test_path_enumeration_stops_when_budget_is_spent() {
        let template = HexTemplate::fixed16();
        let options = BoardPlacementOptions::new();
        let board = Board::new(template.len());
        let word: Vec<char> = "CAT".chars().collect();
        let mut statistics = PlacementStatistics::default();

        let mut search = PlacementSearch {
            template: &template,
            options: &options,
            rng: seeded_rng(1),
            budget: Budget::from_millis(60_000),
            statistics: &mut statistics,
        };
        assert!(!search.collect_path_candidates(&word, &board).is_empty());

        search.budget = Budget::from_millis(0);
        assert!(search.collect_path_candidates(&word, &board).is_empty());
    }

    #[test]
    fn test_place_empty_word_list() {
        let empty: [&str; 0] = [];
        assert!(matches!(try_place(&empty, &BoardPlacementOptions::new()), Err(PlacementFailure::NoWords)));
        assert!(matches!(try_place(&[" "], &BoardPlacementOptions::new()), Err(PlacementFailure::NoWords)));
    }

    #[test]
    fn test_compact_layout() {
        let options = BoardPlacementOptions::new()
            .with_layout(BoardLayoutMode::CompactPath)
            .with_letter_rules(false, 6)
            .with_cell_range(3, 18)
            .with_filler_letters_max(2);
        let placement = try_place(&["ROUTE", "TEAR"], &options).expect("placement should succeed");

        // ROUTE and TEAR merge into ROUTEAR.
        assert_eq!(placement.merged_path.chars().count(), 7);
        assert_eq!(placement.cells.len(), 7);
        assert!(can_build_word(&placement.cells, "ROUTE"));
        assert!(can_build_word(&placement.cells, "TEAR"));
    }
}
