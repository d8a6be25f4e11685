//! Procedural generation of hexagonal word-search levels.
//!
//! Generation happens in three stages:
//!
//! * [`selector::try_select`] picks a subset of a candidate word pool that satisfies a size, score
//!   and letter-budget objective, racing a randomized greedy solver against a beam search.
//! * [`placer::try_place`] lays every chosen word onto a hex board as a path of adjacent,
//!   never-reused cells, then fills the leftover cells with frequency-weighted filler letters.
//! * [`validator::validate_all`] independently checks that every target word can actually be
//!   traced on the produced board.
//!
//! [`generator::generate_level`] ties the three together into the retry loop used to build level
//! catalogs, stepping through explicit fallback tiers when the strict configuration can't be
//! satisfied.
//!
//! All search is single-threaded and deterministic given its inputs and seed; the only source of
//! nondeterminism is the soft wall-clock budget each search observes.

use instant::{Duration, Instant};
use rand::SeedableRng;

pub mod beam;
pub mod generator;
pub mod greedy;
pub mod language;
pub mod objective;
pub mod placer;
pub mod selector;
pub mod signature;
pub mod template;
pub mod validator;

pub use generator::{
    build_desired_word_counts, generate_level, generate_levels, FallbackTier, GeneratedLevel,
    GenerationFailure, GenerationProfile, GenerationStatistics,
};
pub use language::{normalize_word, Language, UnknownLanguage};
pub use objective::{
    compute_hex_count, is_feasible, rank_feasible_state, rank_partial_state, Objective,
    Transition, WordSetSelectionOptions, WordSetState,
};
pub use placer::{
    try_place, BoardLayoutMode, BoardPlacement, BoardPlacementOptions, PlacementFailure,
    PlacementStatistics,
};
pub use selector::{try_select, SelectionFailure, SelectionStatistics, WordSetSelection};
pub use signature::WordSignature;
pub use template::{has_canonical_shape, Cell, HexTemplate, FIXED16_CELL_COUNT};
pub use validator::{can_build_word, validate_all, UnsolvedWords};

/// The expected maximum length for a single target word.
pub const MAX_WORD_LENGTH: usize = 16;

/// The expected maximum number of words chosen for one level.
pub const MAX_SELECTED_WORDS: usize = 12;

/// The number of neighbors a cell can have on a hex grid.
pub const HEX_NEIGHBOR_COUNT: usize = 6;

/// Solver budgets shorter than this are rounded up, since a single greedy pass over a realistic
/// pool takes about this long.
pub const MIN_SOLVER_MILLISECONDS: u64 = 20;

/// An identifier for a cell, based on its index in a board's cell list.
pub type CellIdx = usize;

/// An identifier for a candidate word, based on its index in the signature list built for one
/// selection call.
pub type SignatureId = usize;

/// Axial `(q, r)` coordinates of a hex cell.
pub type AxialCoord = (i32, i32);

/// The pseudo-random generator used by every search in the crate. It's always constructed from an
/// explicit seed so that identical inputs reproduce identical levels.
pub type SearchRng = rand_chacha::ChaCha8Rng;

/// Build a generator for the given seed.
pub fn seeded_rng(seed: u64) -> SearchRng {
    SearchRng::seed_from_u64(seed)
}

/// Combine a base seed with a loop index (`base + index * stride`), wrapping on overflow. This
/// is the reproducibility contract for restarts and attempts.
pub fn derive_seed(base: u64, index: usize, stride: u64) -> u64 {
    base.wrapping_add((index as u64).wrapping_mul(stride))
}

/// A soft wall-clock budget, checked cooperatively at loop boundaries.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    start: Instant,
    limit: Duration,
}

impl Budget {
    pub fn from_millis(limit_ms: u64) -> Budget {
        Budget {
            start: Instant::now(),
            limit: Duration::from_millis(limit_ms),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.start.elapsed() >= self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.start.elapsed())
    }
}
