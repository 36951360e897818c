//! Area-of-interest computation and broadcast targeting (spec.md §4.3).
//!
//! These are plain functions over `ChunkCoord` sets, independent of the
//! socket machinery in `session`/`server` so the AoI-safety property
//! (spec.md §8, "a client never receives an ENTITY_UPDATE for an entity
//! whose chunk is not in its current subscription set") is testable
//! without standing up a TCP listener.

use std::collections::HashSet;

use lodestone_world::ChunkCoord;

/// Every chunk within `view_dist` (Chebyshev distance) of `center`,
/// inclusive — the set spec.md §4.3 calls a player's area of interest.
#[must_use]
pub fn area_of_interest(center: ChunkCoord, view_dist: i64) -> HashSet<ChunkCoord> {
    let mut set = HashSet::new();
    #[allow(clippy::cast_possible_truncation)]
    let view_dist = view_dist as i32;
    for dy in -view_dist..=view_dist {
        for dx in -view_dist..=view_dist {
            set.insert(ChunkCoord::new(center.cx + dx, center.cy + dy));
        }
    }
    set
}

/// Whether `chunk` falls inside the area of interest centered on `center`.
#[must_use]
pub fn in_aoi(center: ChunkCoord, chunk: ChunkCoord, view_dist: i64) -> bool {
    #[allow(clippy::cast_possible_truncation)]
    let view_dist = view_dist as i32;
    center.chebyshev_distance(chunk) <= view_dist
}

/// Chunks present in `new` but not `old` — the set a mover's client needs
/// `CHUNK_DATA` for after a `PLAYER_MOVE` recomputes its AoI. Exited chunks
/// get no explicit desubscribe message (spec.md §4.3): the server just
/// stops sending updates for them.
#[must_use]
pub fn newly_entered_chunks(old: &HashSet<ChunkCoord>, new: &HashSet<ChunkCoord>) -> Vec<ChunkCoord> {
    new.difference(old).copied().collect()
}

/// Whether two players' AoI chunk sets overlap — the condition for
/// `PLAYER_JOIN`/`PLAYER_MOVE` visibility between them (spec.md §4.3,
/// boundary scenario 5).
#[must_use]
pub fn shares_a_chunk(a: ChunkCoord, b: ChunkCoord, view_dist: i64) -> bool {
    in_aoi(a, b, view_dist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_of_interest_is_a_square_of_the_right_size() {
        let aoi = area_of_interest(ChunkCoord::new(0, 0), 3);
        assert_eq!(aoi.len(), 7 * 7);
        assert!(aoi.contains(&ChunkCoord::new(3, 3)));
        assert!(aoi.contains(&ChunkCoord::new(-3, -3)));
        assert!(!aoi.contains(&ChunkCoord::new(4, 0)));
    }

    #[test]
    fn in_aoi_matches_chebyshev_cutoff() {
        let center = ChunkCoord::new(10, 10);
        assert!(in_aoi(center, ChunkCoord::new(13, 10), 3));
        assert!(in_aoi(center, ChunkCoord::new(13, 13), 3));
        assert!(!in_aoi(center, ChunkCoord::new(14, 10), 3));
    }

    #[test]
    fn newly_entered_chunks_is_a_pure_set_difference() {
        let old = area_of_interest(ChunkCoord::new(0, 0), 1);
        let new = area_of_interest(ChunkCoord::new(1, 0), 1);
        let entered = newly_entered_chunks(&old, &new);
        assert!(entered.iter().all(|c| !old.contains(c)));
        assert!(entered.iter().all(|c| new.contains(c)));
        assert!(!entered.is_empty());
    }

    #[test]
    fn far_apart_players_share_no_chunk() {
        let a = ChunkCoord::from_tile_pos(0, 0);
        let b = ChunkCoord::from_tile_pos(100, 0);
        assert!(!shares_a_chunk(a, b, 3));
    }

    #[test]
    fn players_converge_into_range() {
        let a = ChunkCoord::from_tile_pos(0, 0);
        let b = ChunkCoord::from_tile_pos(90, 0);
        assert!(shares_a_chunk(a, b, 3));
    }
}
