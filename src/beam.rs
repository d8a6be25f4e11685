use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use log::{debug, trace};

use crate::objective::{rank_feasible_state, rank_partial_state, WordSetSelectionOptions, WordSetState};
use crate::selector::SelectionStatistics;
use crate::signature::WordSignature;
use crate::{Budget, SignatureId, MIN_SOLVER_MILLISECONDS};

pub const MIN_BEAM_WIDTH: usize = 2;
pub const MIN_BEAM_EXPANSION_LIMIT: usize = 1000;

/// A frontier entry, carrying its partial rank so we only compute it once.
struct RankedState {
    rank: f64,
    state: WordSetState,
}

/// Width-bounded level-order search over word sets. Expansions at each depth are deduplicated by
/// their set of selected words, and the best feasible state seen at any depth is the answer.
pub fn solve_beam(
    signatures: &[WordSignature],
    options: &WordSetSelectionOptions,
    statistics: &mut SelectionStatistics,
) -> Option<WordSetState> {
    let budget = Budget::from_millis(options.max_solver_milliseconds.max(MIN_SOLVER_MILLISECONDS));
    solve_beam_within(signatures, options, &budget, statistics)
}

pub(crate) fn solve_beam_within(
    signatures: &[WordSignature],
    options: &WordSetSelectionOptions,
    budget: &Budget,
    statistics: &mut SelectionStatistics,
) -> Option<WordSetState> {
    if signatures.is_empty() {
        return None;
    }

    let beam_width = options.beam_width.max(MIN_BEAM_WIDTH);
    let expansion_limit = options.beam_expansion_limit.max(MIN_BEAM_EXPANSION_LIMIT);

    let mut frontier = vec![WordSetState::empty()];
    let mut best: Option<WordSetState> = None;
    let mut best_rank = f64::NEG_INFINITY;

    'depth: for depth in 0..options.max_words {
        if budget.is_exhausted() {
            debug!("beam: budget exhausted at depth {}", depth);
            break;
        }

        // Keyed by the sorted selected ids, so that the same set reached in a different order is
        // only kept once and the iteration order below doesn't depend on hashing.
        let mut expanded: BTreeMap<Vec<SignatureId>, RankedState> = BTreeMap::new();
        let mut expansions = 0usize;

        'frontier: for current in &frontier {
            for (signature_id, signature) in signatures.iter().enumerate() {
                if budget.is_exhausted() || expansions >= expansion_limit {
                    break 'frontier;
                }

                if current.contains(signature_id) {
                    continue;
                }

                let Some(transition) = current.try_add(signature, signature_id, options) else {
                    continue;
                };

                if options.hex_budget_max > 0 && transition.state.hex_count() > options.hex_budget_max {
                    continue;
                }

                let next = transition.state;
                let rank = rank_partial_state(&next, options);
                match expanded.entry(next.sorted_key()) {
                    Entry::Occupied(mut existing) => {
                        if rank > existing.get().rank {
                            existing.insert(RankedState { rank, state: next });
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(RankedState { rank, state: next });
                        expansions += 1;
                    }
                }
            }
        }

        statistics.beam_depths += 1;
        statistics.beam_expansions += expansions;

        if expanded.is_empty() {
            break 'depth;
        }

        let mut next_frontier: Vec<RankedState> = expanded.into_values().collect();

        for entry in &next_frontier {
            let rank = rank_feasible_state(&entry.state, options);
            if rank > best_rank {
                best_rank = rank;
                best = Some(entry.state.clone());
            }
        }

        frontier = keep_top(next_frontier, beam_width);

        trace!(
            "beam depth {}: {} expansions, kept {}, best rank {}",
            depth,
            expansions,
            frontier.len(),
            best_rank,
        );
    }

    best
}

/// The `width` best states by partial rank, fewer hexes first among equals.
fn keep_top(mut entries: Vec<RankedState>, width: usize) -> Vec<WordSetState> {
    entries.sort_by(|a, b| {
        b.rank.total_cmp(&a.rank).then_with(|| a.state.hex_count().cmp(&b.state.hex_count()))
    });
    entries.truncate(width);
    entries.into_iter().map(|entry| entry.state).collect()
}
