//! Geometry helpers shared by the passes.
//!
//! Planar distances are Euclidean and only ever break ties or grow clusters.
//! Reachability questions go through [`crate::pathfinding`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::{CriticalPathType, Direction, Stage, Zone};
use crate::model::{CriticalPath, Level, Position, World};
use crate::pathfinding::{distance_map, find_path, path_distance, PathQuery};
use crate::random::{random_sectors, salt, SectorFilter};

/// Steps around the camp inside which the passage-to-camp zone is kept
/// clear of hazards, stashes and blockers.
pub const CAMP_PROTECTION_RADIUS: usize = 2;

const SALT_VORONOI: i64 = 0x766f_726f;

pub fn distance(a: Position, b: Position) -> f64 {
    f64::from(a.x - b.x).hypot(f64::from(a.y - b.y))
}

/// Closest of `candidates` to `pos`; the first wins a tie.
pub fn nearest(pos: Position, candidates: &[Position]) -> Option<Position> {
    candidates
        .iter()
        .copied()
        .min_by(|a, b| distance(pos, *a).total_cmp(&distance(pos, *b)))
}

/// Sort positions by distance to `pos`, stable for ties.
pub fn sort_by_distance_to(positions: &mut [Position], pos: Position) {
    positions.sort_by(|a, b| distance(pos, *a).total_cmp(&distance(pos, *b)));
}

/// Adjacent sector pair straddling a zone border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderPair {
    pub sector: Position,
    pub neighbour: Position,
}

/// Cardinal neighbour pairs where one side is in `zone` and the other is not.
///
/// With `sector_inside`, `sector` is the side in the zone; otherwise it is the
/// side outside.
pub fn border_sectors(level: &Level, zone: Zone, sector_inside: bool) -> Vec<BorderPair> {
    let mut pairs = Vec::new();
    for inside in level.sectors().iter().filter(|s| s.zone == Some(zone)) {
        for direction in Direction::CARDINAL {
            let Some(outside) = level.sector_at(inside.position.step(direction)) else {
                continue;
            };
            if outside.zone == Some(zone) {
                continue;
            }
            pairs.push(if sector_inside {
                BorderPair {
                    sector: inside.position,
                    neighbour: outside.position,
                }
            } else {
                BorderPair {
                    sector: outside.position,
                    neighbour: inside.position,
                }
            });
        }
    }
    pairs
}

/// Walking distance to the level's first camp, `None` when there is no camp
/// or it cannot be reached.
pub fn distance_to_camp(world: &World, pos: Position) -> Option<usize> {
    let camp = world.level(pos.level)?.camp_position()?;
    path_distance(world, pos, camp, PathQuery::WALK)
}

/// Planar distance to the camp. A level without a camp measures to its
/// nearest passage instead.
pub fn quick_distance_to_camp(level: &Level, pos: Position) -> f64 {
    let anchors = if level.camp_positions.is_empty() {
        level.passage_positions()
    } else {
        level.camp_positions.clone()
    };
    nearest(pos, &anchors).map_or(f64::INFINITY, |a| distance(pos, a))
}

/// Camp sectors plus the passage-to-camp sectors close to them.
pub fn protected_sectors(world: &World, level: i32) -> HashSet<Position> {
    let Some(level_vo) = world.level(level) else {
        return HashSet::new();
    };
    let mut protected: HashSet<Position> = level_vo.camp_positions.iter().copied().collect();
    if !level_vo.is_campable {
        return protected;
    }
    for camp in &level_vo.camp_positions {
        let distances = distance_map(world, *camp, false, false, None);
        protected.extend(level_vo.sectors().iter().filter_map(|s| {
            let near = distances
                .get(&s.position)
                .is_some_and(|d| *d <= CAMP_PROTECTION_RADIUS);
            (near && s.zone == Some(Zone::PassageToCamp)).then_some(s.position)
        }));
    }
    protected
}

/// Register a critical path from `start` to `end` and mark every sector on it.
///
/// Returns `false` without registering anything when `end` is unreachable.
pub fn add_critical_path(world: &mut World, start: Position, end: Position, path_type: CriticalPathType) -> bool {
    let path = find_path(world, start, end, false, true, None);
    if path.is_empty() && start != end {
        log::debug!("no {:?} critical path from {} to {}", path_type, start, end);
        return false;
    }
    let camp_ordinal = world.level(start.level).map_or(1, |l| l.camp_ordinal);
    for pos in std::iter::once(start).chain(path) {
        if let Some(sector) = world.sector_mut(pos) {
            sector.add_critical_path(path_type);
        }
    }
    world.critical_paths.push(CriticalPath {
        path_type,
        start,
        end,
        max_length: path_type.max_length(camp_ordinal),
    });
    true
}

/// Label carried by a Voronoi anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorLabel {
    PointOfInterest,
    ExtraCampable,
}

impl AnchorLabel {
    /// Zone a sector of `stage` takes from an anchor with this label.
    pub fn zone_for(self, stage: Stage) -> Zone {
        match (self, stage) {
            (AnchorLabel::PointOfInterest, Stage::Early) => Zone::Poi1,
            (AnchorLabel::PointOfInterest, Stage::Late) => Zone::Poi2,
            (AnchorLabel::ExtraCampable, _) => Zone::ExtraCampable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoronoiPoint {
    pub position: Position,
    pub label: AnchorLabel,
}

/// Anchors partitioning a campable level into influence regions.
///
/// Between 3 and 8 random anchors, two thirds of them points of interest and
/// the rest extra-campable, plus an extra-campable anchor at the sector
/// farthest from the camp.
pub fn voronoi_points(seed: i64, world: &World, level: i32) -> Vec<VoronoiPoint> {
    let Some(level_vo) = world.level(level) else {
        return Vec::new();
    };
    let count = (level_vo.sectors().len() / 25).clamp(3, 8);
    let picked = random_sectors(
        salt(&[seed, SALT_VORONOI, i64::from(level)]),
        world,
        level,
        count,
        count + 1,
        &SectorFilter::excluding_camp(),
    );
    let num_poi = (picked.len() * 2).div_ceil(3);
    let mut points: Vec<VoronoiPoint> = picked
        .iter()
        .enumerate()
        .map(|(i, p)| VoronoiPoint {
            position: *p,
            label: if i < num_poi {
                AnchorLabel::PointOfInterest
            } else {
                AnchorLabel::ExtraCampable
            },
        })
        .collect();

    if let Some(camp) = level_vo.camp_position() {
        let farthest = level_vo
            .sectors()
            .iter()
            .map(|s| s.position)
            .max_by(|a, b| distance(camp, *a).total_cmp(&distance(camp, *b)));
        if let Some(far) = farthest {
            if !points.iter().any(|p| p.position == far) {
                points.push(VoronoiPoint {
                    position: far,
                    label: AnchorLabel::ExtraCampable,
                });
            }
        }
    }
    points
}

/// Nearest anchor to `pos`; the first anchor wins a tie.
pub fn closest_point(pos: Position, points: &[VoronoiPoint]) -> Option<&VoronoiPoint> {
    points
        .iter()
        .min_by(|a, b| distance(pos, a.position).total_cmp(&distance(pos, b.position)))
}
