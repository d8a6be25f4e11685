use log::{debug, trace};
use rand::Rng;

use crate::objective::{rank_feasible_state, rank_partial_state, WordSetSelectionOptions, WordSetState};
use crate::selector::SelectionStatistics;
use crate::signature::WordSignature;
use crate::{derive_seed, seeded_rng, Budget, SearchRng, MIN_SOLVER_MILLISECONDS};

/// Seed stride between greedy restarts.
pub const GREEDY_RESTART_SEED_STRIDE: u64 = 9973;

/// Randomized multi-restart hill climbing. Each restart grows a set from empty by repeatedly
/// committing to the best-ranked extension (with a little noise to break ties differently per
/// restart), and the best feasible final state across restarts wins.
pub fn solve_greedy(
    signatures: &[WordSignature],
    options: &WordSetSelectionOptions,
    statistics: &mut SelectionStatistics,
) -> Option<WordSetState> {
    let budget = Budget::from_millis(options.max_solver_milliseconds.max(MIN_SOLVER_MILLISECONDS));
    solve_greedy_within(signatures, options, &budget, statistics)
}

pub(crate) fn solve_greedy_within(
    signatures: &[WordSignature],
    options: &WordSetSelectionOptions,
    budget: &Budget,
    statistics: &mut SelectionStatistics,
) -> Option<WordSetState> {
    if signatures.is_empty() {
        return None;
    }

    let restarts = options.greedy_restarts.max(1);

    let mut best: Option<WordSetState> = None;
    let mut best_rank = f64::NEG_INFINITY;

    for restart in 0..restarts {
        if budget.is_exhausted() {
            debug!("greedy: budget exhausted after {} of {} restarts", restart, restarts);
            break;
        }

        let mut rng = seeded_rng(derive_seed(options.seed, restart, GREEDY_RESTART_SEED_STRIDE));
        let mut state = WordSetState::empty();

        while state.word_count() < options.max_words && !budget.is_exhausted() {
            match find_best_extension(&state, signatures, options, &mut rng) {
                Some(next) => state = next,
                None => break,
            }
        }

        statistics.greedy_restarts += 1;

        let rank = rank_feasible_state(&state, options);
        trace!(
            "greedy restart {}: {} words, {} hexes, rank {}",
            restart,
            state.word_count(),
            state.hex_count(),
            rank,
        );

        if rank > best_rank {
            best_rank = rank;
            best = Some(state);
        }
    }

    best
}

fn find_best_extension(
    state: &WordSetState,
    signatures: &[WordSignature],
    options: &WordSetSelectionOptions,
    rng: &mut SearchRng,
) -> Option<WordSetState> {
    let mut best: Option<(f64, WordSetState)> = None;

    for (signature_id, signature) in signatures.iter().enumerate() {
        if state.contains(signature_id) {
            continue;
        }

        let Some(transition) = state.try_add(signature, signature_id, options) else {
            continue;
        };

        if options.hex_budget_max > 0 && transition.state.hex_count() > options.hex_budget_max {
            continue;
        }

        let rank = rank_partial_state(&transition.state, options) + rng.gen::<f64>();
        if best.as_ref().map_or(true, |(best_rank, _)| rank > *best_rank) {
            best = Some((rank, transition.state));
        }
    }

    best.map(|(_, state)| state)
}
