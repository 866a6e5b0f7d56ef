//! Greedy first-come-first-served space allocator.
//!
//! Responsibilities (pure, no IO, no DB):
//! - Accept the show's space types with their remaining capacities.
//! - Accept artist requests, each stamped with its reservation time.
//! - Produce an [`AllocationDecision`]: grants per (artist, space) and a
//!   rejection log.
//!
//! Requests are served strictly in reservation order; there is no
//! backtracking. When remaining capacity covers only part of a request the
//! artist receives a partial grant, quantized down to the space type's legal
//! increment. The allocator never writes to the database; callers persist
//! the decision.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::amount::SpaceAmount;

// ─── Error ───────────────────────────────────────────────────────────────────

/// Errors produced during allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// Two space definitions share an ID.
    DuplicateSpace { space_id: i32 },
    /// A request names a space not in the definitions.
    UnknownSpace { space_id: i32, artist_id: i32 },
    /// A request's amount breaks the space's increment rule.
    InvalidIncrement { space_id: i32, artist_id: i32 },
}

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateSpace { space_id } => {
                write!(f, "duplicate space definition {space_id}")
            }
            Self::UnknownSpace { space_id, artist_id } => {
                write!(f, "artist {artist_id} requested unknown space {space_id}")
            }
            Self::InvalidIncrement { space_id, artist_id } => {
                write!(
                    f,
                    "artist {artist_id} requested a half unit of space {space_id}, \
                     which rents whole units only"
                )
            }
        }
    }
}

impl std::error::Error for AllocationError {}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A space type and its capacity available for this allocation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceDefinition {
    pub space_id: i32,
    pub capacity: SpaceAmount,
    /// Whether this space type may be granted in half units.
    pub allow_half: bool,
}

/// One artist's request for one space type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceRequest {
    pub artist_id: i32,
    pub space_id: i32,
    pub requested: SpaceAmount,
    /// When the artist reserved; earlier reservations are served first.
    pub reserved_at: DateTime<Utc>,
}

// ─── Decision ────────────────────────────────────────────────────────────────

/// Why a request received nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// The space type ran out before this request's turn.
    SpaceExhausted,
    /// The request asked for zero.
    EmptyRequest,
}

/// A request that received no space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRequest {
    pub artist_id: i32,
    pub space_id: i32,
    pub requested: SpaceAmount,
    pub reason: RejectionReason,
}

/// A granted (possibly partial) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub artist_id: i32,
    pub space_id: i32,
    pub requested: SpaceAmount,
    pub allocated: SpaceAmount,
}

impl Grant {
    pub fn is_partial(&self) -> bool {
        self.allocated < self.requested
    }
}

/// The output of one allocation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationDecision {
    /// Grants in the order they were served.
    pub grants: Vec<Grant>,
    pub rejected: Vec<RejectedRequest>,
    /// Capacity left per space type after all grants.
    pub remaining: BTreeMap<i32, SpaceAmount>,
}

impl AllocationDecision {
    /// Total allocated for one space type.
    pub fn allocated_for(&self, space_id: i32) -> SpaceAmount {
        self.grants
            .iter()
            .filter(|g| g.space_id == space_id)
            .map(|g| g.allocated)
            .sum()
    }
}

// ─── Allocator ───────────────────────────────────────────────────────────────

/// First-come-first-served allocator over a fixed set of space types.
///
/// # Algorithm
/// 1. Validate: unique space IDs; every request names a known space and a
///    legal increment for it.
/// 2. Sort requests by reservation time (ties broken by artist ID, so the
///    order is deterministic).
/// 3. Serve each request: grant `min(requested, remaining)`, rounded down to
///    a whole unit where the space type forbids halves; deduct from the
///    space's remaining capacity.
/// 4. A request served zero is logged as rejected.
pub struct Allocator {
    spaces: BTreeMap<i32, SpaceDefinition>,
}

impl Allocator {
    pub fn new(spaces: Vec<SpaceDefinition>) -> Result<Self, AllocationError> {
        let mut map = BTreeMap::new();
        for s in spaces {
            let space_id = s.space_id;
            if map.insert(space_id, s).is_some() {
                return Err(AllocationError::DuplicateSpace { space_id });
            }
        }
        Ok(Allocator { spaces: map })
    }

    /// Run allocation over the given requests.
    pub fn allocate(&self, requests: &[SpaceRequest]) -> Result<AllocationDecision, AllocationError> {
        // ── 0. Guard inputs ──────────────────────────────────────────────────
        for r in requests {
            let space = self
                .spaces
                .get(&r.space_id)
                .ok_or(AllocationError::UnknownSpace {
                    space_id: r.space_id,
                    artist_id: r.artist_id,
                })?;
            r.requested
                .validate_increment(space.allow_half)
                .map_err(|_| AllocationError::InvalidIncrement {
                    space_id: r.space_id,
                    artist_id: r.artist_id,
                })?;
        }

        // ── 1. Reservation order ─────────────────────────────────────────────
        let mut ordered: Vec<&SpaceRequest> = requests.iter().collect();
        ordered.sort_by_key(|r| (r.reserved_at, r.artist_id, r.space_id));

        // ── 2. Serve greedily ────────────────────────────────────────────────
        let mut remaining: BTreeMap<i32, SpaceAmount> = self
            .spaces
            .values()
            .map(|s| (s.space_id, s.capacity))
            .collect();

        let mut grants = Vec::new();
        let mut rejected = Vec::new();

        for r in ordered {
            if r.requested.is_zero() {
                rejected.push(RejectedRequest {
                    artist_id: r.artist_id,
                    space_id: r.space_id,
                    requested: r.requested,
                    reason: RejectionReason::EmptyRequest,
                });
                continue;
            }

            let space = &self.spaces[&r.space_id];
            let left = remaining[&r.space_id];
            let mut granted = r.requested.min(left);
            if !space.allow_half {
                granted = granted.floor_whole();
            }

            if granted.is_zero() {
                rejected.push(RejectedRequest {
                    artist_id: r.artist_id,
                    space_id: r.space_id,
                    requested: r.requested,
                    reason: RejectionReason::SpaceExhausted,
                });
                continue;
            }

            remaining.insert(r.space_id, left.saturating_sub(granted));
            grants.push(Grant {
                artist_id: r.artist_id,
                space_id: r.space_id,
                requested: r.requested,
                allocated: granted,
            });
        }

        Ok(AllocationDecision {
            grants,
            rejected,
            remaining,
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
