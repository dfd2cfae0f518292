//! Deterministic salted sampling.
//!
//! Every value is a pure function of a salt. Call sites build their salt from
//! the world seed, a call-site tag and whatever coordinates identify the
//! decision, so a decision re-evaluated with the same inputs always yields
//! the same value no matter what else ran before it.
//!
//! ```
//! use strata_logic::random::{salt, sample, sample_int};
//!
//! let s = salt(&[42, 3000, 13, -2, 5]);
//! assert_eq!(sample(s), sample(s));
//! let v = sample_int(s, 1, 4);
//! assert!((1..4).contains(&v));
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::constants::{CriticalPathType, Zone};
use crate::model::{Position, Sector, World};
use crate::pathfinding::distance_map;

/// Combine salt components into a single well-mixed salt.
pub fn salt(parts: &[i64]) -> i64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for &part in parts {
        h ^= mix(part as u64);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h as i64
}

/// Uniform value in `[0, 1)`.
pub fn sample(salt: i64) -> f64 {
    let z = mix(salt as u64);
    (z >> 11) as f64 / (1u64 << 53) as f64
}

/// Uniform integer in `[min, max_exclusive)`. Returns `min` for an empty range.
pub fn sample_int(salt: i64, min: i64, max_exclusive: i64) -> i64 {
    if max_exclusive <= min {
        return min;
    }
    let span = (max_exclusive - min) as f64;
    let offset = (sample(salt) * span).floor() as i64;
    min + offset.min(max_exclusive - min - 1)
}

/// Fair coin.
pub fn sample_bool(salt: i64) -> bool {
    sample_chance(salt, 0.5)
}

/// `true` with the given probability.
pub fn sample_chance(salt: i64, probability: f64) -> bool {
    sample(salt) < probability
}

/// Keep candidates from a list sorted by rarity.
///
/// The first eligible candidate is always kept. Any later eligible candidate
/// is kept when its own sample clears `(rarity + 5) / 110`. `salt_for` gives
/// the salt of the candidate at each index.
pub fn pick_by_rarity<'a, T>(
    candidates: &'a [T],
    rarity: impl Fn(&T) -> u32,
    eligible: impl Fn(&T) -> bool,
    salt_for: impl Fn(usize) -> i64,
) -> Vec<&'a T> {
    let mut picked = Vec::new();
    for (i, candidate) in candidates.iter().enumerate() {
        if !eligible(candidate) {
            continue;
        }
        let threshold = (rarity(candidate) as f64 + 5.0) / 110.0;
        if picked.is_empty() || sample(salt_for(i)) > threshold {
            picked.push(candidate);
        }
    }
    picked
}

/// Sector property a filter can exclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExcludedFeature {
    Camp,
    Passage,
}

/// Requirement that a candidate lie within `max_length` steps of `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathConstraint {
    pub start: Position,
    pub max_length: usize,
    pub path_type: CriticalPathType,
}

/// Filter for [`random_sectors`].
#[derive(Debug, Clone, Default)]
pub struct SectorFilter {
    /// Skip sectors carrying this feature. Default: none.
    pub excluded_feature: Option<ExcludedFeature>,
    /// Skip sectors in these zones. Default: none.
    pub excluded_zones: Vec<Zone>,
    /// Every constraint must be met, measured without diagonals and
    /// respecting blockers. Default: none.
    pub path_constraints: Vec<PathConstraint>,
    /// Restrict to the more central half of the candidates. Default: false.
    pub prefer_central: bool,
    /// Skip sectors already holding this many locales. Default: unlimited.
    pub max_locales: Option<usize>,
    /// Skip these positions, so repeated calls within a pass stay
    /// duplicate-free. Default: none.
    pub avoid: HashSet<Position>,
}

impl SectorFilter {
    pub fn excluding_camp() -> Self {
        Self {
            excluded_feature: Some(ExcludedFeature::Camp),
            ..Self::default()
        }
    }

    fn accepts(&self, sector: &Sector, distances: &[HashMap<Position, usize>]) -> bool {
        match self.excluded_feature {
            Some(ExcludedFeature::Camp) if sector.is_camp => return false,
            Some(ExcludedFeature::Passage) if sector.is_passage() => return false,
            _ => {}
        }
        if let Some(zone) = sector.zone {
            if self.excluded_zones.contains(&zone) {
                return false;
            }
        }
        if let Some(max) = self.max_locales {
            if sector.locales.len() >= max {
                return false;
            }
        }
        if self.avoid.contains(&sector.position) {
            return false;
        }
        self.path_constraints
            .iter()
            .zip(distances)
            .all(|(constraint, map)| {
                map.get(&sector.position)
                    .is_some_and(|d| *d <= constraint.max_length)
            })
    }
}

/// A deterministic, duplicate-free subset of a level's sectors.
///
/// The number of sectors is drawn from `[min_count, max_count_exclusive)` and
/// capped at the number of eligible candidates; an empty result means no
/// sector qualifies.
pub fn random_sectors(
    salt_value: i64,
    world: &World,
    level: i32,
    min_count: usize,
    max_count_exclusive: usize,
    filter: &SectorFilter,
) -> Vec<Position> {
    let Some(level_vo) = world.level(level) else {
        return Vec::new();
    };
    let distances: Vec<HashMap<Position, usize>> = filter
        .path_constraints
        .iter()
        .map(|c| distance_map(world, c.start, false, true, None))
        .collect();

    let mut candidates: Vec<Position> = level_vo
        .sectors()
        .iter()
        .filter(|s| filter.accepts(s, &distances))
        .map(|s| s.position)
        .collect();

    if filter.prefer_central && candidates.len() > 1 {
        let (cx, cy) = level_vo.center();
        candidates.sort_by(|a, b| {
            let da = (a.x as f64 - cx).hypot(a.y as f64 - cy);
            let db = (b.x as f64 - cx).hypot(b.y as f64 - cy);
            da.total_cmp(&db)
        });
        candidates.truncate(candidates.len().div_ceil(2));
    }

    let count = sample_int(salt_value, min_count as i64, max_count_exclusive as i64) as usize;
    let count = count.min(candidates.len());
    for i in 0..count {
        let j = sample_int(salt(&[salt_value, i as i64 + 1]), i as i64, candidates.len() as i64);
        candidates.swap(i, j as usize);
    }
    candidates.truncate(count);
    candidates
}

/// A single random sector, optionally central.
pub fn random_sector(salt_value: i64, world: &World, level: i32, prefer_central: bool) -> Option<Position> {
    let filter = SectorFilter {
        prefer_central,
        ..SectorFilter::default()
    };
    random_sectors(salt_value, world, level, 1, 2, &filter).into_iter().next()
}

/// A random existing neighbour of `position`.
pub fn random_neighbour(
    salt_value: i64,
    world: &World,
    position: Position,
    allow_diagonal: bool,
) -> Option<Position> {
    let level = world.level(position.level)?;
    let neighbours = level.neighbour_positions(position, allow_diagonal);
    if neighbours.is_empty() {
        return None;
    }
    let index = sample_int(salt_value, 0, neighbours.len() as i64) as usize;
    Some(neighbours[index])
}

fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
