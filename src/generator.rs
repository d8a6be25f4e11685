//! The level generation loop: select, place and verify, resampling with fresh seeds and stepping
//! through explicit fallback tiers until a level comes out or the budgets run dry.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use instant::{Duration, Instant};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::language::{count_repeats, letter_counts, normalize_word, Language};
use crate::objective::{Objective, WordSetSelectionOptions};
use crate::placer::{try_place, BoardLayoutMode, BoardPlacementOptions};
use crate::selector::try_select;
use crate::template::{Cell, FIXED16_CELL_COUNT};
use crate::validator::validate_all;
use crate::{derive_seed, Budget};

/// No level asks for more target words than this.
pub const MAX_TARGET_WORDS: usize = 40;

/// Seed strides for the selection and placement calls of each resample attempt.
pub const SELECTION_ATTEMPT_SEED_STRIDE: u64 = 97;
pub const SELECTION_COUNT_SEED_STRIDE: u64 = 17;
pub const PLACEMENT_ATTEMPT_SEED_STRIDE: u64 = 193;
pub const PLACEMENT_COUNT_SEED_STRIDE: u64 = 31;

/// Settings for building levels from a word pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationProfile {
    pub language: Language,
    pub layout: BoardLayoutMode,

    /// Candidate word length range.
    pub min_length: usize,
    pub max_length: usize,

    /// Board size for the compact layout. The fixed layout always has 16 cells.
    pub cell_count: usize,
    pub min_cells: usize,

    pub target_words_min: usize,
    pub target_words_max: usize,

    /// Require exactly one of the counts in the target range, trying the largest first.
    pub strict_target_word_count: bool,

    pub max_letter_repeats: usize,
    pub allow_single_repeat_fallback: bool,
    pub allow_relaxed_duplicates_fallback: bool,
    pub allow_wider_hex_budget_fallback: bool,

    pub filler_letters_max: usize,
    pub avoid_duplicate_letters: bool,

    pub objective: Objective,
    pub hex_budget_min: usize,
    pub hex_budget_max: usize,

    pub beam_width: usize,
    pub greedy_restarts: usize,
    pub max_resample_attempts: usize,
    pub overlap_weight: f64,
    pub diversity_weight: f64,
    pub require_all_targets_solvable: bool,
    pub candidate_pool_limit: usize,
    pub placement_attempts: usize,
    pub max_solver_milliseconds: u64,

    /// Wall-clock budget for one level under one fallback tier.
    pub level_budget_ms: u64,
}

impl Default for GenerationProfile {
    fn default() -> Self {
        Self {
            language: Language::En,
            layout: BoardLayoutMode::Fixed16,
            min_length: 3,
            max_length: 6,
            cell_count: 16,
            min_cells: 3,
            target_words_min: 4,
            target_words_max: 7,
            strict_target_word_count: false,
            max_letter_repeats: 0,
            allow_single_repeat_fallback: true,
            allow_relaxed_duplicates_fallback: true,
            allow_wider_hex_budget_fallback: true,
            filler_letters_max: 0,
            avoid_duplicate_letters: true,
            objective: Objective::MinHexForKWords,
            hex_budget_min: 0,
            hex_budget_max: 0,
            beam_width: 24,
            greedy_restarts: 12,
            max_resample_attempts: 40,
            overlap_weight: 90.0,
            diversity_weight: 22.0,
            require_all_targets_solvable: true,
            candidate_pool_limit: 800,
            placement_attempts: 12,
            max_solver_milliseconds: 220,
            level_budget_ms: 2500,
        }
    }
}

impl GenerationProfile {
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

    pub fn with_word_lengths(mut self, min_length: usize, max_length: usize) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    pub fn with_target_words(mut self, min: usize, max: usize) -> Self {
        self.target_words_min = min;
        self.target_words_max = max;
        self
    }

    pub fn with_strict_target_word_count(mut self, strict: bool) -> Self {
        self.strict_target_word_count = strict;
        self
    }

    pub fn with_letter_rules(mut self, avoid_duplicate_letters: bool, max_letter_repeats: usize) -> Self {
        self.avoid_duplicate_letters = avoid_duplicate_letters;
        self.max_letter_repeats = max_letter_repeats;
        self
    }

    pub fn with_fallbacks(mut self, single_repeat: bool, relaxed_duplicates: bool, wider_hex_budget: bool) -> Self {
        self.allow_single_repeat_fallback = single_repeat;
        self.allow_relaxed_duplicates_fallback = relaxed_duplicates;
        self.allow_wider_hex_budget_fallback = wider_hex_budget;
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_hex_budget(mut self, min: usize, max: usize) -> Self {
        self.hex_budget_min = min;
        self.hex_budget_max = max;
        self
    }

    pub fn with_level_budget(mut self, ms: u64) -> Self {
        self.level_budget_ms = ms;
        self
    }

    /// The number of cells on the produced board.
    pub fn board_cell_count(&self) -> usize {
        match self.layout {
            BoardLayoutMode::Fixed16 => FIXED16_CELL_COUNT,
            BoardLayoutMode::CompactPath => self.cell_count,
        }
    }

    fn target_word_range(&self) -> (usize, usize) {
        let min = self.target_words_min.clamp(1, MAX_TARGET_WORDS);
        let max = self.target_words_max.clamp(min, MAX_TARGET_WORDS);
        (min, max)
    }
}

/// The successive relaxations tried when a level can't be built under the profile as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FallbackTier {
    /// The profile as configured.
    Strict,
    /// At least one repeated letter allowed on the board.
    RepeatBudget,
    /// Duplicate-letter avoidance switched off.
    RelaxedDuplicates,
    /// Hex budget widened to the whole board.
    WiderHexBudget,
}

impl Display for FallbackTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FallbackTier::Strict => "strict",
            FallbackTier::RepeatBudget => "repeat-budget",
            FallbackTier::RelaxedDuplicates => "relaxed-duplicates",
            FallbackTier::WiderHexBudget => "wider-hex-budget",
        };
        write!(f, "{}", name)
    }
}

/// A struct tracking why resample attempts failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationStatistics {
    pub available_words: usize,
    pub selection_failures: usize,
    pub placement_failures: usize,
    pub solvability_failures: usize,
    #[serde(skip)]
    pub duration: Duration,
}

impl GenerationStatistics {
    fn absorb(&mut self, other: &GenerationStatistics) {
        self.available_words = self.available_words.max(other.available_words);
        self.selection_failures += other.selection_failures;
        self.placement_failures += other.placement_failures;
        self.solvability_failures += other.solvability_failures;
    }
}

impl Display for GenerationStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "available_words={}, selection_failures={}, placement_failures={}, solvability_failures={}, elapsed={:?}",
            self.available_words,
            self.selection_failures,
            self.placement_failures,
            self.solvability_failures,
            self.duration,
        )
    }
}

/// A finished level.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedLevel {
    pub seed: u64,
    pub target_words: Vec<String>,
    pub cells: Vec<Cell>,
    pub tier: FallbackTier,
    pub statistics: GenerationStatistics,
}

#[derive(Debug, Clone, Error)]
#[error("{reason} ({statistics})")]
pub struct GenerationFailure {
    pub reason: String,
    pub statistics: GenerationStatistics,
}

/// The word counts to aim for, in the order they're tried. A strict run tries every count from
/// the top of the range down; otherwise a single pass selects freely within the range.
pub fn build_desired_word_counts(min_targets: usize, max_targets: usize, strict: bool) -> Vec<usize> {
    let min = min_targets.max(1);
    let max = max_targets.max(min);

    if !strict {
        return vec![min];
    }

    (min..=max).rev().collect()
}

/// The letter rules in effect under one fallback tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TierRules {
    avoid_duplicate_letters: bool,
    max_letter_repeats: usize,
    hex_budget_min: usize,
    hex_budget_max: usize,
}

impl TierRules {
    /// Could a word ever be placed under these rules? A word that needs a letter twice can't sit
    /// on a duplicate-free board, and its own repeats count against the board's budget.
    fn admits(&self, word: &str) -> bool {
        let repeats = count_repeats(letter_counts(word.chars()).values());
        if self.avoid_duplicate_letters {
            repeats == 0
        } else {
            repeats <= self.max_letter_repeats
        }
    }
}

/// Each enabled tier with its cumulative relaxations. Tiers that wouldn't change anything are
/// skipped.
fn fallback_tiers(profile: &GenerationProfile) -> Vec<(FallbackTier, TierRules)> {
    let cell_count = profile.board_cell_count();
    let mut rules = TierRules {
        avoid_duplicate_letters: profile.avoid_duplicate_letters,
        max_letter_repeats: profile.max_letter_repeats,
        hex_budget_min: profile.hex_budget_min,
        hex_budget_max: if profile.hex_budget_max > 0 { profile.hex_budget_max } else { cell_count },
    };
    let mut tiers = vec![(FallbackTier::Strict, rules)];

    // A repeat budget only matters once duplicates may appear at all, so under duplicate avoidance
    // this tier is folded into the next one.
    if profile.allow_single_repeat_fallback && rules.max_letter_repeats == 0 {
        rules.max_letter_repeats = 1;
        if !rules.avoid_duplicate_letters {
            tiers.push((FallbackTier::RepeatBudget, rules));
        }
    }

    if profile.allow_relaxed_duplicates_fallback && rules.avoid_duplicate_letters {
        rules.avoid_duplicate_letters = false;
        tiers.push((FallbackTier::RelaxedDuplicates, rules));
    }

    if profile.allow_wider_hex_budget_fallback && (rules.hex_budget_min > 0 || rules.hex_budget_max < cell_count) {
        rules.hex_budget_min = 0;
        rules.hex_budget_max = cell_count;
        tiers.push((FallbackTier::WiderHexBudget, rules));
    }

    tiers
}

/// Normalize the pool and drop everything that can't appear on a board under `rules`.
fn prepare_candidates<S: AsRef<str>>(candidates: &[S], profile: &GenerationProfile, rules: &TierRules) -> Vec<String> {
    let mut seen = BTreeSet::new();
    candidates
        .iter()
        .map(|raw| normalize_word(raw.as_ref()))
        .filter(|word| {
            let length = word.chars().count();
            length >= profile.min_length && length <= profile.max_length
        })
        .filter(|word| profile.language.is_language_word(word))
        .filter(|word| rules.admits(word))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

/// Build one level from `candidates`, trying each fallback tier in turn.
pub fn generate_level<S: AsRef<str>>(
    candidates: &[S],
    profile: &GenerationProfile,
    seed: u64,
) -> Result<GeneratedLevel, GenerationFailure> {
    let start = Instant::now();
    let mut statistics = GenerationStatistics::default();
    let mut last_reason = String::from("no fallback tier was attempted");

    for (tier, rules) in fallback_tiers(profile) {
        if tier != FallbackTier::Strict {
            info!("level {}: falling back to the {} tier", seed, tier);
        }

        let available = prepare_candidates(candidates, profile, &rules);
        match generate_with_rules(&available, profile, &rules, seed) {
            Ok((target_words, cells, tier_statistics)) => {
                statistics.absorb(&tier_statistics);
                statistics.duration = start.elapsed();
                info!(
                    "level {}: {} words on {} cells ({} tier)",
                    seed,
                    target_words.len(),
                    cells.len(),
                    tier,
                );
                return Ok(GeneratedLevel { seed, target_words, cells, tier, statistics });
            }
            Err(failure) => {
                statistics.absorb(&failure.statistics);
                debug!("level {}: {} tier failed: {}", seed, tier, failure);
                last_reason = failure.reason;
            }
        }
    }

    statistics.duration = start.elapsed();
    warn!("level {}: cannot satisfy constraints ({})", seed, statistics);
    Err(GenerationFailure { reason: last_reason, statistics })
}

type TierSuccess = (Vec<String>, Vec<Cell>, GenerationStatistics);

/// The resample loop for one tier.
fn generate_with_rules(
    available: &[String],
    profile: &GenerationProfile,
    rules: &TierRules,
    seed: u64,
) -> Result<TierSuccess, GenerationFailure> {
    let budget = Budget::from_millis(profile.level_budget_ms);
    let (min_targets, max_targets) = profile.target_word_range();
    let mut statistics = GenerationStatistics { available_words: available.len(), ..Default::default() };

    if available.len() < min_targets {
        return Err(GenerationFailure {
            reason: format!("only {} usable words, at least {} required", available.len(), min_targets),
            statistics,
        });
    }

    let target_score = (min_targets * profile.min_length).max(min_targets * 3);
    let cell_count = profile.board_cell_count();
    let strict = profile.strict_target_word_count;

    'desired: for desired in build_desired_word_counts(min_targets, max_targets, strict) {
        for attempt in 0..profile.max_resample_attempts.max(1) {
            if budget.is_exhausted() {
                break 'desired;
            }

            let selection_seed = derive_seed(
                derive_seed(seed, attempt, SELECTION_ATTEMPT_SEED_STRIDE),
                desired,
                SELECTION_COUNT_SEED_STRIDE,
            );
            let (min_words, max_words) = if strict { (desired, desired) } else { (min_targets, max_targets) };

            let selection_options = WordSetSelectionOptions {
                language: profile.language,
                objective: profile.objective,
                avoid_duplicate_letters: rules.avoid_duplicate_letters,
                min_words,
                max_words,
                hex_budget_min: rules.hex_budget_min as u32,
                hex_budget_max: rules.hex_budget_max as u32,
                target_score: target_score as u32,
                greedy_restarts: profile.greedy_restarts.max(1),
                beam_width: profile.beam_width.max(2),
                overlap_weight: profile.overlap_weight,
                diversity_weight: profile.diversity_weight,
                seed: selection_seed,
                candidate_pool_limit: profile.candidate_pool_limit,
                max_solver_milliseconds: profile.max_solver_milliseconds,
                beam_input_limit: 700,
                beam_expansion_limit: 120_000,
            };

            let selection = match try_select(available, &selection_options) {
                Ok(selection) => selection,
                Err(failure) => {
                    debug!("level {}: selection failed: {}", seed, failure);
                    statistics.selection_failures += 1;
                    continue;
                }
            };

            if strict && selection.words.len() != desired {
                statistics.selection_failures += 1;
                continue;
            }

            let placement_seed = derive_seed(
                derive_seed(seed, attempt, PLACEMENT_ATTEMPT_SEED_STRIDE),
                desired,
                PLACEMENT_COUNT_SEED_STRIDE,
            );
            let placement_options = BoardPlacementOptions {
                language: profile.language,
                layout: profile.layout,
                min_cells: profile.min_cells,
                max_cells: cell_count,
                filler_letters_max: profile
                    .filler_letters_max
                    .max(cell_count.saturating_sub(selection.hex_count as usize)),
                avoid_duplicate_letters: rules.avoid_duplicate_letters,
                max_letter_repeats: rules.max_letter_repeats,
                hex_budget_min: rules.hex_budget_min,
                hex_budget_max: rules.hex_budget_max,
                attempts: profile.placement_attempts.max(1),
                seed: placement_seed,
                require_all_targets_solvable: profile.require_all_targets_solvable,
                max_placement_milliseconds: budget.remaining().as_millis() as u64,
            };

            let placement = match try_place(&selection.words, &placement_options) {
                Ok(placement) => placement,
                Err(failure) => {
                    debug!("level {}: placement failed: {}", seed, failure);
                    statistics.placement_failures += 1;
                    continue;
                }
            };

            if profile.require_all_targets_solvable {
                if let Err(unsolved) = validate_all(&placement.cells, &selection.words) {
                    info!("level {}: resample due to {}", seed, unsolved);
                    statistics.solvability_failures += 1;
                    continue;
                }
            }

            statistics.duration = budget.elapsed();
            return Ok((selection.words, placement.cells, statistics));
        }
    }

    statistics.duration = budget.elapsed();
    Err(GenerationFailure {
        reason: format!(
            "no level within {} resample attempts for {}-{} words",
            profile.max_resample_attempts.max(1),
            min_targets,
            max_targets,
        ),
        statistics,
    })
}

/// Build `count` levels with seeds `seed, seed + 1, ...`. A word is withheld from later levels once
/// it has been used `max_word_reuse` times (0 = unlimited reuse). Levels that fail don't stop the
/// batch.
pub fn generate_levels<S: AsRef<str>>(
    candidates: &[S],
    profile: &GenerationProfile,
    seed: u64,
    count: usize,
    max_word_reuse: usize,
) -> Vec<Result<GeneratedLevel, GenerationFailure>> {
    let pool: Vec<String> = candidates.iter().map(|word| normalize_word(word.as_ref())).collect();
    let mut word_use: BTreeMap<String, usize> = BTreeMap::new();
    let mut levels = Vec::with_capacity(count);

    for index in 0..count {
        let level_seed = derive_seed(seed, index, 1);
        let available: Vec<&String> = pool
            .iter()
            .filter(|word| max_word_reuse == 0 || word_use.get(*word).copied().unwrap_or(0) < max_word_reuse)
            .collect();

        let result = generate_level(&available, profile, level_seed);
        match &result {
            Ok(level) => {
                for word in &level.target_words {
                    *word_use.entry(word.clone()).or_insert(0) += 1;
                }
            }
            Err(failure) => warn!("skipped level {}: {}", level_seed, failure),
        }
        levels.push(result);
    }

    levels
}
