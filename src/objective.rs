//! Search state for word-set selection and the objective model that ranks it.
//!
//! A [`WordSetState`] is an immutable node in the selection search space. The only way to grow
//! one is [`WordSetState::try_add`], which returns a fresh state along with the marginal hex cost
//! and letter overlap of the added word. The ranking functions below are pure functions of a
//! state and the selection options:
//!
//! * [`is_feasible`] decides whether a state is an acceptable answer.
//! * [`rank_feasible_state`] orders acceptable answers (infeasible states rank `-inf`).
//! * [`rank_partial_state`] orders states that are still being extended, so the search can pass
//!   through infeasible intermediate states on the way to a feasible one.

use std::collections::{BTreeMap, BTreeSet};

use bit_set::BitSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::language::{letter_counts, normalize_word, Language};
use crate::signature::WordSignature;
use crate::{SignatureId, MAX_SELECTED_WORDS};

/// How heavily each newly required hex slot counts against a word in the accumulated heuristic.
pub const HEX_COST_WEIGHT: f64 = 14.0;

/// How heavily the running hex count counts against a state in the partial ranking.
pub const PARTIAL_HEX_WEIGHT: f64 = 4.0;

/// What the selection search is trying to achieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Objective {
    /// Use as few hexes as possible for the requested number of words.
    #[default]
    MinHexForKWords,
    /// Fit as many words as possible under the hex budget.
    MaxWordsUnderHexBudget,
    /// Reach `target_score` total letters with as few hexes as possible.
    MeetTargetScore,
}

/// Configuration for [`crate::selector::try_select`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WordSetSelectionOptions {
    pub language: Language,
    pub objective: Objective,

    /// When set, every distinct letter occupies exactly one hex no matter how many times words
    /// use it.
    pub avoid_duplicate_letters: bool,

    pub min_words: usize,
    pub max_words: usize,

    /// Bounds on the number of hexes the chosen words require (0 = unbounded).
    pub hex_budget_min: u32,
    pub hex_budget_max: u32,

    /// Minimum total word length for `Objective::MeetTargetScore`.
    pub target_score: u32,

    pub greedy_restarts: usize,
    pub beam_width: usize,

    /// Reward per letter a new word shares with the set so far.
    pub overlap_weight: f64,

    /// Penalty for a new word whose letters are mostly already present.
    pub diversity_weight: f64,

    pub seed: u64,

    /// Oversized pools are cut down to this many words before solving (0 = unlimited).
    pub candidate_pool_limit: usize,

    /// Soft wall-clock budget for each solver.
    pub max_solver_milliseconds: u64,

    /// The beam solver only runs on pools of at most this many words.
    pub beam_input_limit: usize,

    /// Maximum number of distinct states the beam solver creates per depth.
    pub beam_expansion_limit: usize,
}

impl Default for WordSetSelectionOptions {
    fn default() -> Self {
        Self {
            language: Language::En,
            objective: Objective::MinHexForKWords,
            avoid_duplicate_letters: true,
            min_words: 4,
            max_words: 7,
            hex_budget_min: 0,
            hex_budget_max: 0,
            target_score: 0,
            greedy_restarts: 12,
            beam_width: 24,
            overlap_weight: 90.0,
            diversity_weight: 22.0,
            seed: 1,
            candidate_pool_limit: 800,
            max_solver_milliseconds: 250,
            beam_input_limit: 600,
            beam_expansion_limit: 120_000,
        }
    }
}

impl WordSetSelectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_word_range(mut self, min_words: usize, max_words: usize) -> Self {
        self.min_words = min_words;
        self.max_words = max_words;
        self
    }

    pub fn with_hex_budget(mut self, min: u32, max: u32) -> Self {
        self.hex_budget_min = min;
        self.hex_budget_max = max;
        self
    }

    pub fn with_avoid_duplicate_letters(mut self, avoid: bool) -> Self {
        self.avoid_duplicate_letters = avoid;
        self
    }

    pub fn with_target_score(mut self, target_score: u32) -> Self {
        self.target_score = target_score;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.max_solver_milliseconds = ms;
        self
    }
}

/// A node in the selection search space.
#[derive(Debug, Clone)]
pub struct WordSetState {
    /// Chosen signatures in the order they were added.
    selected: SmallVec<[SignatureId; MAX_SELECTED_WORDS]>,
    selected_set: BitSet,

    /// For each letter, the largest number of times any selected word uses it. Under duplicate
    /// avoidance every present letter maps to 1, so this doubles as the presence set.
    merged_counts: BTreeMap<char, u32>,

    /// Union of the selected signatures' alphabet bitmasks, valid while `fully_indexed` holds.
    letter_mask: u64,
    fully_indexed: bool,

    total_score: u32,
    hex_count: u32,
    heuristic_score: f64,
}

/// The result of adding one word to a state.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: WordSetState,

    /// How many hexes the word added to the set's requirement.
    pub hex_delta: u32,

    /// How many of the word's distinct letters were already present.
    pub overlap: u32,
}

impl Default for WordSetState {
    fn default() -> Self {
        Self::empty()
    }
}

impl WordSetState {
    pub fn empty() -> WordSetState {
        WordSetState {
            selected: SmallVec::new(),
            selected_set: BitSet::new(),
            merged_counts: BTreeMap::new(),
            letter_mask: 0,
            fully_indexed: true,
            total_score: 0,
            hex_count: 0,
            heuristic_score: 0.0,
        }
    }

    pub fn contains(&self, signature_id: SignatureId) -> bool {
        self.selected_set.contains(signature_id)
    }

    pub fn word_count(&self) -> usize {
        self.selected.len()
    }

    pub fn selected(&self) -> &[SignatureId] {
        &self.selected
    }

    /// The selected ids in ascending order, which identifies the set regardless of the order the
    /// words were added in.
    pub fn sorted_key(&self) -> Vec<SignatureId> {
        self.selected_set.iter().collect()
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn hex_count(&self) -> u32 {
        self.hex_count
    }

    pub fn heuristic_score(&self) -> f64 {
        self.heuristic_score
    }

    /// Produce the state reached by adding `signature`, or `None` if it's already selected.
    pub fn try_add(
        &self,
        signature: &WordSignature,
        signature_id: SignatureId,
        options: &WordSetSelectionOptions,
    ) -> Option<Transition> {
        if self.contains(signature_id) {
            return None;
        }

        let mut merged_counts = self.merged_counts.clone();
        let mut hex_delta = 0u32;
        let mut overlap = 0u32;

        let use_mask = self.fully_indexed && signature.fully_indexed;
        if use_mask {
            overlap = (self.letter_mask & signature.alphabet_bitmask).count_ones();
        }

        for &(letter, count) in &signature.letter_counts {
            let current = merged_counts.get(&letter).copied().unwrap_or(0);
            if !use_mask && current > 0 {
                overlap += 1;
            }

            if options.avoid_duplicate_letters {
                if current == 0 {
                    merged_counts.insert(letter, 1);
                    hex_delta += 1;
                }
            } else if count > current {
                hex_delta += count - current;
                merged_counts.insert(letter, count);
            }
        }

        let redundancy_penalty = if signature.unique_letter_count() > 0 {
            overlap as f64 / signature.unique_letter_count() as f64
        } else {
            0.0
        };

        let heuristic_delta = signature.length_score() as f64
            - HEX_COST_WEIGHT * hex_delta as f64
            + options.overlap_weight * overlap as f64
            - options.diversity_weight * redundancy_penalty;

        let mut selected = self.selected.clone();
        selected.push(signature_id);
        let mut selected_set = self.selected_set.clone();
        selected_set.insert(signature_id);

        Some(Transition {
            state: WordSetState {
                selected,
                selected_set,
                merged_counts,
                letter_mask: self.letter_mask | signature.alphabet_bitmask,
                fully_indexed: use_mask,
                total_score: self.total_score + signature.length_score(),
                hex_count: self.hex_count + hex_delta,
                heuristic_score: self.heuristic_score + heuristic_delta,
            },
            hex_delta,
            overlap,
        })
    }
}

/// Does this state satisfy the size, budget and score constraints?
pub fn is_feasible(state: &WordSetState, options: &WordSetSelectionOptions) -> bool {
    if state.word_count() < options.min_words || state.word_count() > options.max_words {
        return false;
    }

    if options.hex_budget_min > 0 && state.hex_count < options.hex_budget_min {
        return false;
    }

    if options.hex_budget_max > 0 && state.hex_count > options.hex_budget_max {
        return false;
    }

    match options.objective {
        Objective::MeetTargetScore => state.total_score >= options.target_score,
        Objective::MinHexForKWords | Objective::MaxWordsUnderHexBudget => true,
    }
}

/// Rank a candidate answer (higher is better). Infeasible states rank `-inf`.
pub fn rank_feasible_state(state: &WordSetState, options: &WordSetSelectionOptions) -> f64 {
    if !is_feasible(state, options) {
        return f64::NEG_INFINITY;
    }

    let words = state.word_count() as f64;
    let hexes = state.hex_count as f64;
    let score = state.total_score as f64;

    match options.objective {
        Objective::MinHexForKWords => 1_000_000.0 - hexes * 100.0 + words * 10.0 + score,
        Objective::MaxWordsUnderHexBudget => words * 100_000.0 - hexes * 100.0 + score,
        Objective::MeetTargetScore => 1_000_000.0 - hexes * 100.0 + score * 10.0 + words,
    }
}

/// Rank an in-progress state for ordering the search frontier.
pub fn rank_partial_state(state: &WordSetState, options: &WordSetSelectionOptions) -> f64 {
    let objective_bonus = match options.objective {
        Objective::MaxWordsUnderHexBudget => state.word_count() as f64 * 80.0,
        Objective::MeetTargetScore => state.total_score as f64,
        Objective::MinHexForKWords => 0.0,
    };

    state.heuristic_score + objective_bonus - state.hex_count as f64 * PARTIAL_HEX_WEIGHT
}

/// The number of hexes needed to host a set of words: the number of distinct letters under
/// duplicate avoidance, otherwise the sum over letters of the largest per-word count.
pub fn compute_hex_count<S: AsRef<str>>(words: &[S], avoid_duplicate_letters: bool) -> u32 {
    if avoid_duplicate_letters {
        let unique: BTreeSet<char> =
            words.iter().flat_map(|word| normalize_word(word.as_ref()).chars().collect::<Vec<_>>()).collect();
        return unique.len() as u32;
    }

    let mut max_counts: BTreeMap<char, u32> = BTreeMap::new();
    for word in words {
        for (letter, count) in letter_counts(normalize_word(word.as_ref()).chars()) {
            let entry = max_counts.entry(letter).or_insert(0);
            *entry = (*entry).max(count);
        }
    }

    max_counts.values().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signatures(words: &[&str]) -> Vec<WordSignature> {
        words.iter().map(|word| WordSignature::from_word(word, Language::En)).collect()
    }

    fn build_state(sigs: &[WordSignature], options: &WordSetSelectionOptions) -> WordSetState {
        sigs.iter().enumerate().fold(WordSetState::empty(), |state, (id, sig)| {
            state.try_add(sig, id, options).expect("word should be addable").state
        })
    }

    #[test]
    fn test_compute_hex_count_unique_mode() {
        assert_eq!(compute_hex_count(&["TOOL", "LOOT"], true), 3);
    }

    #[test]
    fn test_compute_hex_count_max_count_mode() {
        assert_eq!(compute_hex_count(&["TOOL", "LOOT"], false), 4);
    }

    #[test]
    fn test_compute_hex_count_treats_ye_and_yo_as_different() {
        assert_eq!(compute_hex_count(&["ЕЛКА", "ЁЛКА"], true), 5);
    }

    #[test]
    fn test_try_add_matches_compute_hex_count() {
        let sigs = signatures(&["TOOL", "LOOT"]);

        let unique = WordSetSelectionOptions::new().with_avoid_duplicate_letters(true);
        assert_eq!(build_state(&sigs, &unique).hex_count(), 3);

        let repeats = WordSetSelectionOptions::new().with_avoid_duplicate_letters(false);
        assert_eq!(build_state(&sigs, &repeats).hex_count(), 4);
    }

    #[test]
    fn test_try_add_reports_delta_and_overlap() {
        let sigs = signatures(&["TOOL", "LOOT", "CAT"]);
        let options = WordSetSelectionOptions::new().with_avoid_duplicate_letters(false);

        let first = WordSetState::empty().try_add(&sigs[0], 0, &options).unwrap();
        assert_eq!(first.hex_delta, 4);
        assert_eq!(first.overlap, 0);

        let second = first.state.try_add(&sigs[1], 1, &options).unwrap();
        assert_eq!(second.hex_delta, 0);
        assert_eq!(second.overlap, 3);

        let third = second.state.try_add(&sigs[2], 2, &options).unwrap();
        assert_eq!(third.hex_delta, 2);
        assert_eq!(third.overlap, 1);
        assert_eq!(third.state.total_score(), 11);
        assert_eq!(third.state.selected(), &[0, 1, 2]);
    }

    #[test]
    fn test_try_add_rejects_already_selected_word() {
        let sigs = signatures(&["CAT"]);
        let options = WordSetSelectionOptions::new();
        let state = build_state(&sigs, &options);
        assert!(state.try_add(&sigs[0], 0, &options).is_none());
    }

    #[test]
    fn test_heuristic_rewards_overlap_and_penalizes_new_hexes() {
        let sigs = signatures(&["CAT", "ACT", "DOG"]);
        let options = WordSetSelectionOptions::new();
        let base = WordSetState::empty().try_add(&sigs[0], 0, &options).unwrap().state;

        let overlapping = base.try_add(&sigs[1], 1, &options).unwrap().state;
        let disjoint = base.try_add(&sigs[2], 2, &options).unwrap().state;
        assert!(overlapping.heuristic_score() > disjoint.heuristic_score());

        // 3 letters, 3 new hexes, nothing shared.
        assert_eq!(base.heuristic_score(), 3.0 - 14.0 * 3.0);
    }

    #[test]
    fn test_hex_count_is_non_decreasing() {
        let sigs = signatures(&["ROUTE", "ROSE", "SOUR", "RULE", "GOES"]);
        let options = WordSetSelectionOptions::new().with_avoid_duplicate_letters(false);
        let mut state = WordSetState::empty();
        for (id, sig) in sigs.iter().enumerate() {
            let next = state.try_add(sig, id, &options).unwrap().state;
            assert!(next.hex_count() >= state.hex_count());
            state = next;
        }
    }

    #[test]
    fn test_feasibility_checks_size_budget_and_score() {
        let sigs = signatures(&["CAT", "CAR", "CAN"]);
        let options = WordSetSelectionOptions::new()
            .with_word_range(2, 3)
            .with_hex_budget(0, 5);

        let one = build_state(&sigs[..1], &options);
        assert!(!is_feasible(&one, &options));
        assert_eq!(rank_feasible_state(&one, &options), f64::NEG_INFINITY);

        let three = build_state(&sigs, &options);
        assert_eq!(three.hex_count(), 5);
        assert!(is_feasible(&three, &options));

        let tight = options.clone().with_hex_budget(0, 4);
        assert!(!is_feasible(&three, &tight));

        let scored = options.clone().with_objective(Objective::MeetTargetScore).with_target_score(10);
        assert!(!is_feasible(&three, &scored));
        assert!(is_feasible(&three, &scored.with_target_score(9)));
    }

    #[test]
    fn test_rank_formulas() {
        let sigs = signatures(&["CAT", "CAR"]);
        let options = WordSetSelectionOptions::new().with_word_range(1, 4);
        let state = build_state(&sigs, &options);
        assert_eq!(state.hex_count(), 4);

        let min_hex = rank_feasible_state(&state, &options);
        assert_eq!(min_hex, 1_000_000.0 - 400.0 + 20.0 + 6.0);

        let max_words = options.clone().with_objective(Objective::MaxWordsUnderHexBudget);
        assert_eq!(rank_feasible_state(&state, &max_words), 200_000.0 - 400.0 + 6.0);

        let target = options.clone().with_objective(Objective::MeetTargetScore);
        assert_eq!(rank_feasible_state(&state, &target), 1_000_000.0 - 400.0 + 60.0 + 2.0);

        let partial = rank_partial_state(&state, &max_words);
        assert_eq!(partial, state.heuristic_score() + 160.0 - 16.0);
    }

    #[test]
    fn test_infeasible_states_still_have_partial_rank() {
        let sigs = signatures(&["CAT"]);
        let options = WordSetSelectionOptions::new().with_word_range(3, 4);
        let state = build_state(&sigs, &options);
        assert!(!is_feasible(&state, &options));
        assert!(rank_partial_state(&state, &options).is_finite());
    }
}
