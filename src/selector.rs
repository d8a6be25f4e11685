//! Word-set selection: turn a raw candidate pool into a chosen set of target words.

use std::collections::BTreeSet;

use instant::Duration;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::beam::solve_beam;
use crate::greedy::solve_greedy;
use crate::language::normalize_word;
use crate::objective::{is_feasible, rank_feasible_state, WordSetSelectionOptions, WordSetState};
use crate::signature::WordSignature;
use crate::{Budget, MIN_SOLVER_MILLISECONDS};

/// Pools smaller than this always get a beam pass, whatever `beam_input_limit` says.
pub const MIN_BEAM_INPUT_LIMIT: usize = 50;

/// A struct tracking statistics about one selection call.
#[derive(Debug, Clone, Default)]
pub struct SelectionStatistics {
    pub pool_size: usize,
    pub greedy_restarts: usize,
    pub beam_depths: usize,
    pub beam_expansions: usize,
    pub used_beam: bool,
    pub duration: Duration,
}

/// A successful selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSetSelection {
    /// The chosen words, normalized, in the order the winning solver added them.
    pub words: Vec<String>,
    pub total_score: u32,
    pub hex_count: u32,
    pub ranking_score: f64,

    #[serde(skip)]
    pub statistics: SelectionStatistics,
}

#[derive(Debug, Clone, Error)]
pub enum SelectionFailure {
    #[error("candidate pool has no usable words")]
    EmptyPool,
    #[error("no feasible word set among {pool_size} candidates")]
    Infeasible { pool_size: usize, statistics: SelectionStatistics },
}

/// Normalize and dedupe the pool, preserving first-seen order.
fn build_signatures<S: AsRef<str>>(candidates: &[S], options: &WordSetSelectionOptions) -> Vec<WordSignature> {
    let mut seen = BTreeSet::new();
    candidates
        .iter()
        .map(|raw| normalize_word(raw.as_ref()))
        .filter(|word| !word.is_empty() && seen.insert(word.clone()))
        .map(|word| WordSignature::from_word(&word, options.language))
        .collect()
}

/// Keep only the `limit` most information-dense words.
fn cap_pool(mut signatures: Vec<WordSignature>, limit: usize) -> Vec<WordSignature> {
    if limit == 0 || signatures.len() <= limit {
        return signatures;
    }

    signatures.sort_by(|a, b| {
        b.quick_score().total_cmp(&a.quick_score()).then_with(|| a.word.cmp(&b.word))
    });
    signatures.truncate(limit);
    signatures
}

/// Select a set of words from `candidates` that satisfies `options`, racing the greedy solver
/// against the beam solver and keeping whichever finds the better-ranked feasible set.
pub fn try_select<S: AsRef<str>>(
    candidates: &[S],
    options: &WordSetSelectionOptions,
) -> Result<WordSetSelection, SelectionFailure> {
    let signatures = build_signatures(candidates, options);
    if signatures.is_empty() {
        return Err(SelectionFailure::EmptyPool);
    }

    let signatures = cap_pool(signatures, options.candidate_pool_limit);

    let mut options = options.clone();
    options.max_words = options.min_words.max(options.max_words).min(signatures.len());

    let budget = Budget::from_millis(options.max_solver_milliseconds.max(MIN_SOLVER_MILLISECONDS));
    let mut statistics = SelectionStatistics { pool_size: signatures.len(), ..Default::default() };

    let greedy = solve_greedy(&signatures, &options, &mut statistics);

    let allow_beam = options.beam_width > 1
        && signatures.len() <= options.beam_input_limit.max(MIN_BEAM_INPUT_LIMIT);
    let beam = if allow_beam && !budget.is_exhausted() {
        statistics.used_beam = true;
        solve_beam(&signatures, &options, &mut statistics)
    } else {
        None
    };

    let rank_of = |state: &Option<WordSetState>| {
        state.as_ref().map_or(f64::NEG_INFINITY, |state| rank_feasible_state(state, &options))
    };
    let greedy_rank = rank_of(&greedy);
    let beam_rank = rank_of(&beam);
    debug!(
        "selection over {} candidates: greedy rank {}, beam rank {}",
        signatures.len(),
        greedy_rank,
        beam_rank,
    );

    let best = if beam_rank > greedy_rank { beam } else { greedy };
    statistics.duration = budget.elapsed();

    let state = match best {
        Some(state) if is_feasible(&state, &options) && state.word_count() >= options.min_words => state,
        _ => {
            return Err(SelectionFailure::Infeasible { pool_size: signatures.len(), statistics });
        }
    };

    Ok(WordSetSelection {
        words: state.selected().iter().map(|&id| signatures[id].word.clone()).collect(),
        total_score: state.total_score(),
        hex_count: state.hex_count(),
        ranking_score: rank_feasible_state(&state, &options),
        statistics,
    })
}
