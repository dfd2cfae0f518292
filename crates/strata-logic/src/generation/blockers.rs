//! Movement blockers.
//!
//! [`add_movement_blocker`] is the single entry point for putting an obstacle
//! on an edge; both this pass and the gang placement in the enemy pass go
//! through it. It either places the blocker and reports every edge it
//! touched, or refuses and says why. Refusals are never errors.
//!
//! Placement rules:
//!   1. the two sectors must exist, be distinct neighbours on one level and
//!      have no blocker on that edge yet
//!   2. neither may be a camp or a protected passage-to-camp sector
//!   3. an edge shared by a critical path is off limits unless that path type
//!      is allowed for the call (gangs always allow the camp-outbound paths),
//!      and an allowed path may not grow beyond its maximum length
//!   4. every sector reachable from the excursion start among camp, locale
//!      and passage sectors stays reachable
//!
//! With `add_diagonals` the side edges of both sectors get blocked too, each
//! under rules 1 to 3. When rule 4 fails the side edges are dropped first;
//! the main edge is kept if it passes on its own.

use std::collections::HashSet;

use crate::constants::{BlockerType, CriticalPathType, Direction, Zone, GANG_ALLOWED_CRITICAL_PATHS};
use crate::model::{Position, World};
use crate::pathfinding::{distance_map, path_distance, PathCache, PathQuery};
use crate::random::{random_neighbour, random_sectors, salt, sample_chance, sample_int, SectorFilter};
use crate::spatial::{border_sectors, distance_to_camp, protected_sectors};

use super::PassContext;

const SALT_BLOCKER_TYPE: i64 = 0x6274_7970;
const SALT_BETWEEN: i64 = 0x6274_776e;
const SALT_BORDER: i64 = 0x6264_7262;
const SALT_POI: i64 = 0x706f_6962;
const SALT_RANDOM: i64 = 0x726e_6462;

/// Blocked passage-to-camp borders keep at least this distance from camp.
const BORDER_MIN_CAMP_DISTANCE: usize = 3;

/// Paths the border and point-of-interest blockers may cut across.
const OUTBOUND_PATHS: [CriticalPathType; 3] = [
    CriticalPathType::CampToPoi1,
    CriticalPathType::CampToPoi2,
    CriticalPathType::CampToPassage,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockerOptions {
    /// Also block the two side edges of each sector. Default: false.
    pub add_diagonals: bool,
    /// Critical path types this blocker may cut. Default: none.
    pub allowed_critical_paths: Vec<CriticalPathType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalReason {
    MissingSector,
    NotNeighbours,
    AlreadyBlocked,
    NearCamp,
    CriticalPath(CriticalPathType),
    PathTooLong(CriticalPathType),
    Disconnects,
}

/// Result of one placement attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockerOutcome {
    /// Every sector side that got the blocker, main edge first (both sides).
    Placed { edges: Vec<(Position, Direction)> },
    Refused(RefusalReason),
}

impl BlockerOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, BlockerOutcome::Placed { .. })
    }
}

/// Try to block the edge between `from` and `to`.
pub fn add_movement_blocker(
    world: &mut World,
    from: Position,
    to: Position,
    blocker: BlockerType,
    options: &BlockerOptions,
) -> BlockerOutcome {
    let l = from.level;
    let Some(direction) = (from.level == to.level)
        .then(|| Direction::between((from.x, from.y), (to.x, to.y)))
        .flatten()
    else {
        return BlockerOutcome::Refused(RefusalReason::NotNeighbours);
    };

    let protected = protected_sectors(world, l);
    let mut allowed = options.allowed_critical_paths.clone();
    if blocker == BlockerType::Gang {
        allowed.extend(GANG_ALLOWED_CRITICAL_PATHS);
    }
    let guarded = guarded_targets(world, l);

    if let Err(reason) = try_edge(world, &protected, &allowed, from, direction, blocker) {
        log::debug!("blocker {:?} {} -> {} refused: {:?}", blocker, from, to, reason);
        return BlockerOutcome::Refused(reason);
    }
    let mut sides = Vec::new();
    if options.add_diagonals {
        for (base, d) in [(from, direction), (to, direction.opposite())] {
            for side in d.next_directions() {
                if try_edge(world, &protected, &allowed, base, side, blocker).is_ok() {
                    sides.push((base, side));
                }
            }
        }
    }

    if !still_reachable(world, &guarded) {
        for (base, side) in sides.drain(..).rev() {
            clear_edge(world, base, side);
        }
        if !still_reachable(world, &guarded) {
            clear_edge(world, from, direction);
            log::debug!("blocker {:?} {} -> {} would disconnect the level", blocker, from, to);
            return BlockerOutcome::Refused(RefusalReason::Disconnects);
        }
    }

    let mut edges = vec![(from, direction), (to, direction.opposite())];
    for (base, side) in sides {
        edges.push((base, side));
        edges.push((base.step(side), side.opposite()));
    }
    BlockerOutcome::Placed { edges }
}

/// Check the local rules for one edge and place it if they pass.
fn try_edge(
    world: &mut World,
    protected: &HashSet<Position>,
    allowed: &[CriticalPathType],
    from: Position,
    direction: Direction,
    blocker: BlockerType,
) -> Result<(), RefusalReason> {
    let to = from.step(direction);
    let (Some(a), Some(b)) = (world.sector(from), world.sector(to)) else {
        return Err(RefusalReason::MissingSector);
    };
    if a.blocker(direction).is_some() || b.blocker(direction.opposite()).is_some() {
        return Err(RefusalReason::AlreadyBlocked);
    }
    if a.is_camp || b.is_camp || protected.contains(&from) || protected.contains(&to) {
        return Err(RefusalReason::NearCamp);
    }
    let shared: Vec<CriticalPathType> = a
        .critical_paths
        .iter()
        .filter(|t| b.critical_paths.contains(t))
        .copied()
        .collect();
    if let Some(cut) = shared.iter().find(|t| !allowed.contains(t)) {
        return Err(RefusalReason::CriticalPath(*cut));
    }

    let before = critical_path_lengths(world, from.level, &shared);
    set_edge(world, from, direction, blocker);
    let after = critical_path_lengths(world, from.level, &shared);
    for ((path_type, max_length, old), (_, _, new)) in before.into_iter().zip(after) {
        let grew = match (old, new) {
            (_, None) => true,
            (Some(old), Some(new)) => new > max_length && new > old,
            (None, Some(_)) => false,
        };
        if grew {
            clear_edge(world, from, direction);
            return Err(RefusalReason::PathTooLong(path_type));
        }
    }
    Ok(())
}

fn critical_path_lengths(
    world: &World,
    l: i32,
    types: &[CriticalPathType],
) -> Vec<(CriticalPathType, usize, Option<usize>)> {
    world
        .critical_paths_on(l)
        .filter(|p| types.contains(&p.path_type))
        .map(|p| {
            (
                p.path_type,
                p.max_length,
                path_distance(world, p.start, p.end, PathQuery::WALK),
            )
        })
        .collect()
}

fn set_edge(world: &mut World, from: Position, direction: Direction, blocker: BlockerType) {
    if let Some(s) = world.sector_mut(from) {
        s.movement_blockers.insert(direction, blocker);
    }
    if let Some(s) = world.sector_mut(from.step(direction)) {
        s.movement_blockers.insert(direction.opposite(), blocker);
    }
}

fn clear_edge(world: &mut World, from: Position, direction: Direction) {
    if let Some(s) = world.sector_mut(from) {
        s.movement_blockers.remove(&direction);
    }
    if let Some(s) = world.sector_mut(from.step(direction)) {
        s.movement_blockers.remove(&direction.opposite());
    }
}

/// Start position and the key sectors currently reachable from it.
fn guarded_targets(world: &World, l: i32) -> Option<(Position, Vec<Position>)> {
    let level = world.level(l)?;
    let start = level.excursion_start?;
    let reachable = distance_map(world, start, false, true, None);
    let targets = level
        .camp_positions
        .iter()
        .chain(&level.locale_sectors)
        .copied()
        .chain(level.passage_positions())
        .filter(|p| reachable.contains_key(p))
        .collect();
    Some((start, targets))
}

fn still_reachable(world: &World, guarded: &Option<(Position, Vec<Position>)>) -> bool {
    let Some((start, targets)) = guarded else {
        return true;
    };
    let reachable = distance_map(world, *start, false, true, None);
    targets.iter().all(|t| reachable.contains_key(t))
}

// ── Pass ──

/// Blocker types that may appear on level `l`. Debris is listed twice to
/// make it the most common pick.
fn level_blocker_types(world: &World, l: i32) -> Vec<BlockerType> {
    let Some(level) = world.level(l) else {
        return Vec::new();
    };
    let mut types = Vec::new();
    if level.level_ordinal > 1 {
        types.extend([BlockerType::Debris, BlockerType::Debris]);
    }
    if level.camp_ordinal >= 5 {
        types.push(BlockerType::Gap);
    }
    if level.camp_ordinal >= 7 {
        types.push(BlockerType::WasteToxic);
    }
    let radiated = level.uncampable_reason == Some(crate::constants::UncampableReason::Radiation);
    if l > world.start_level && radiated {
        types.push(BlockerType::WasteRadioactive);
    }
    types
}

struct BlockerPass<'a> {
    ctx: &'a PassContext<'a>,
    level: i32,
    types: Vec<BlockerType>,
    paths: PathCache,
    placed: usize,
}

impl BlockerPass<'_> {
    fn blocker_type(&self, s: i64) -> BlockerType {
        let index = sample_int(salt(&[s, SALT_BLOCKER_TYPE]), 0, self.types.len() as i64) as usize;
        self.types[index]
    }

    fn add(&mut self, world: &mut World, s: i64, from: Position, to: Position, options: BlockerOptions) {
        let blocker = self.blocker_type(s);
        if add_movement_blocker(world, from, to, blocker, &options).is_placed() {
            self.placed += 1;
            self.paths.invalidate();
        }
    }

    /// Block up to `max_paths` successive shortest routes between `a` and `b`,
    /// each at an edge in the second half of the route.
    fn add_between(
        &mut self,
        world: &mut World,
        s: i64,
        a: Position,
        b: Position,
        max_paths: usize,
        allowed: &[CriticalPathType],
    ) {
        let query = PathQuery {
            allow_diagonal: true,
            ..PathQuery::WALK
        };
        for i in 0..max_paths {
            let path = self.paths.find_path(world, a, b, query);
            if path.len() < 3 {
                break;
            }
            let min = (path.len() as f64 / 2.0).round() as usize;
            let max = min.max(path.len() - 2);
            let attempt_salt = salt(&[s, i as i64]);
            let index = (sample_int(attempt_salt, min as i64, max as i64) as usize).min(path.len() - 2);
            let options = BlockerOptions {
                add_diagonals: true,
                allowed_critical_paths: allowed.to_vec(),
            };
            self.add(world, attempt_salt, path[index], path[index + 1], options);
        }
    }
}

pub(super) fn generate_movement_blockers(ctx: &PassContext<'_>, world: &mut World, l: i32) {
    let types = level_blocker_types(world, l);
    if types.is_empty() {
        return;
    }
    let Some(level) = world.level(l) else { return };
    let is_campable = level.is_campable;
    let camp = level.camp_position();
    let passages = level.passage_positions();
    let locale_sectors = level.locale_sectors.clone();
    let border = border_sectors(level, Zone::PassageToCamp, true);
    let co = level.camp_ordinal;

    let mut pass = BlockerPass {
        ctx,
        level: l,
        types,
        paths: PathCache::default(),
        placed: 0,
    };
    let level_salt = |tag: i64, i: i64| salt(&[ctx.seed, tag, i64::from(l), i]);

    // between passages
    let between_passages = l == world.start_level + 1 || (!is_campable && co == 7);
    if between_passages {
        for (i, a) in passages.iter().enumerate() {
            for (j, b) in passages.iter().enumerate().skip(i + 1) {
                let s = salt(&[level_salt(SALT_BETWEEN, i as i64), j as i64]);
                pass.add_between(world, s, *a, *b, 5, &[CriticalPathType::PassageToPassage]);
            }
        }
    }

    // passage-to-camp border, away from camp
    if is_campable {
        for (i, pair) in border.iter().enumerate() {
            let d = match (distance_to_camp(world, pair.sector), distance_to_camp(world, pair.neighbour)) {
                (Some(a), Some(b)) => a.min(b),
                _ => continue,
            };
            if d <= BORDER_MIN_CAMP_DISTANCE {
                continue;
            }
            let s = level_salt(SALT_BORDER, i as i64);
            if sample_chance(s, pass.ctx.config.border_blocker_frequency) {
                let options = BlockerOptions {
                    add_diagonals: true,
                    allowed_critical_paths: OUTBOUND_PATHS.to_vec(),
                };
                pass.add(world, s, pair.sector, pair.neighbour, options);
            }
        }
    }

    // close most routes to one point of interest
    if let (true, Some(camp)) = (is_campable, camp) {
        let s = level_salt(SALT_POI, 0);
        if sample_chance(s, pass.ctx.config.poi_blocker_probability) && !locale_sectors.is_empty() {
            let poi = locale_sectors[sample_int(salt(&[s, 1]), 0, locale_sectors.len() as i64) as usize];
            pass.add_between(world, s, camp, poi, 3, &OUTBOUND_PATHS);
        }
    }

    // random
    let count = if l == world.top_level {
        8
    } else if l == world.top_level - 1 {
        4
    } else if l == world.start_level + 1 {
        2
    } else {
        1
    };
    let s = level_salt(SALT_RANDOM, 0);
    let picked = random_sectors(s, world, l, count, count + 1, &SectorFilter::excluding_camp());
    for (i, pos) in picked.into_iter().enumerate() {
        let neighbour_salt = salt(&[s, i as i64 + 1]);
        let Some(neighbour) = random_neighbour(neighbour_salt, world, pos, true) else {
            continue;
        };
        let options = BlockerOptions {
            add_diagonals: (l + i as i32 + 9).rem_euclid(3) != 0,
            allowed_critical_paths: Vec::new(),
        };
        pass.add(world, neighbour_salt, pos, neighbour, options);
    }

    log::info!("level {}: {} movement blockers placed", pass.level, pass.placed);
}
