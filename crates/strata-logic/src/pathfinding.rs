//! Shortest paths over a level's sector grid.
//!
//! Edges join grid neighbours on the same level. A diagonal edge exists only
//! when diagonals are allowed. With `respect_blockers`, an edge is dropped when
//! the sector it leaves has a movement blocker in that direction. A stage
//! filter drops every sector of another stage except the start.
//!
//! Paths are returned without the start and with the end. The same position,
//! an unknown position, or an unreachable target all give an empty path.

use std::collections::{HashMap, VecDeque};

use crate::constants::{Direction, Stage};
use crate::model::{Level, Position, World};

/// Parameters of one path query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathQuery {
    pub allow_diagonal: bool,
    pub respect_blockers: bool,
    pub stage: Option<Stage>,
}

impl PathQuery {
    /// Walking query used by placement checks: cardinal, blocker-aware.
    pub const WALK: PathQuery = PathQuery {
        allow_diagonal: false,
        respect_blockers: true,
        stage: None,
    };
}

/// Find the shortest path from `from` to `to`.
pub fn find_path(
    world: &World,
    from: Position,
    to: Position,
    allow_diagonal: bool,
    respect_blockers: bool,
    stage: Option<Stage>,
) -> Vec<Position> {
    let query = PathQuery {
        allow_diagonal,
        respect_blockers,
        stage,
    };
    bfs(world, from, Some(to), query)
        .map(|search| search.path_to(to))
        .unwrap_or_default()
}

/// Number of steps between two positions, `Some(0)` for the same position.
pub fn path_distance(world: &World, from: Position, to: Position, query: PathQuery) -> Option<usize> {
    if from == to {
        return world.sector(from).map(|_| 0);
    }
    let search = bfs(world, from, Some(to), query)?;
    search.distance.get(&to).copied()
}

/// Steps from `from` to every sector reachable from it.
pub fn distance_map(
    world: &World,
    from: Position,
    allow_diagonal: bool,
    respect_blockers: bool,
    stage: Option<Stage>,
) -> HashMap<Position, usize> {
    let query = PathQuery {
        allow_diagonal,
        respect_blockers,
        stage,
    };
    bfs(world, from, None, query)
        .map(|search| search.distance)
        .unwrap_or_default()
}

/// Whether every target is reachable from `from` under `query`.
pub fn all_reachable(world: &World, from: Position, targets: &[Position], query: PathQuery) -> bool {
    if targets.is_empty() {
        return true;
    }
    let Some(search) = bfs(world, from, None, query) else {
        return false;
    };
    targets.iter().all(|t| search.distance.contains_key(t))
}

/// Path cache for passes that ask the same questions many times.
///
/// The cache holds no reference to the world: callers pass it in with every
/// query and must call [`PathCache::invalidate`] after any change to
/// movement blockers.
pub struct PathCache {
    cache: HashMap<(Position, Position, PathQuery), Vec<Position>>,
    capacity: usize,
}

impl Default for PathCache {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

impl PathCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: HashMap::new(),
            capacity,
        }
    }

    pub fn find_path(&mut self, world: &World, from: Position, to: Position, query: PathQuery) -> Vec<Position> {
        let key = (from, to, query);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let path = find_path(
            world,
            from,
            to,
            query.allow_diagonal,
            query.respect_blockers,
            query.stage,
        );
        if self.cache.len() >= self.capacity {
            self.cache.clear();
        }
        self.cache.insert(key, path.clone());
        path
    }

    /// Drop every cached path.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

struct Search {
    distance: HashMap<Position, usize>,
    parent: HashMap<Position, Position>,
}

impl Search {
    fn path_to(&self, to: Position) -> Vec<Position> {
        if !self.parent.contains_key(&to) {
            return Vec::new();
        }
        let mut path = vec![to];
        let mut current = to;
        while let Some(&prev) = self.parent.get(&current) {
            if !self.parent.contains_key(&prev) {
                break;
            }
            path.push(prev);
            current = prev;
        }
        path.reverse();
        path
    }
}

fn bfs(world: &World, from: Position, to: Option<Position>, query: PathQuery) -> Option<Search> {
    if to.is_some_and(|t| t.level != from.level) {
        return None;
    }
    let level = world.level(from.level)?;
    level.sector_at(from)?;

    let mut search = Search {
        distance: HashMap::from([(from, 0)]),
        parent: HashMap::new(),
    };
    let mut queue = VecDeque::from([from]);

    while let Some(current) = queue.pop_front() {
        let d = search.distance[&current];
        for next in passable_neighbours(level, current, from, query) {
            if search.distance.contains_key(&next) {
                continue;
            }
            search.distance.insert(next, d + 1);
            search.parent.insert(next, current);
            if Some(next) == to {
                return Some(search);
            }
            queue.push_back(next);
        }
    }

    Some(search)
}

fn passable_neighbours(level: &Level, pos: Position, start: Position, query: PathQuery) -> Vec<Position> {
    let Some(sector) = level.sector_at(pos) else {
        return Vec::new();
    };
    Direction::ALL
        .into_iter()
        .filter(|d| query.allow_diagonal || !d.is_diagonal())
        .filter(|d| !query.respect_blockers || sector.blocker(*d).is_none())
        .filter_map(|d| level.sector_at(pos.step(d)))
        .filter(|s| match query.stage {
            Some(stage) => s.stage == stage || s.position == start,
            None => true,
        })
        .map(|s| s.position)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BlockerType;

    fn strip_world(len: i32) -> World {
        let mut world = World::new(1, 1, 1);
        let mut level = Level::new(1);
        for x in 0..len {
            level.add_sector(x, 0, Stage::Early);
            level.add_sector(x, 1, if x == 2 { Stage::Late } else { Stage::Early });
        }
        world.insert_level(level);
        world
    }

    fn block(world: &mut World, a: Position, b: Position) {
        let d = Direction::between((a.x, a.y), (b.x, b.y)).unwrap();
        world.sector_mut(a).unwrap().movement_blockers.insert(d, BlockerType::Debris);
        world
            .sector_mut(b)
            .unwrap()
            .movement_blockers
            .insert(d.opposite(), BlockerType::Debris);
    }

    #[test]
    fn test_same_position_is_empty() {
        let world = strip_world(3);
        let p = Position::new(1, 0, 0);
        assert!(find_path(&world, p, p, false, true, None).is_empty());
        assert_eq!(path_distance(&world, p, p, PathQuery::WALK), Some(0));
    }

    #[test]
    fn test_straight_path_excludes_start() {
        let world = strip_world(5);
        let path = find_path(&world, Position::new(1, 0, 0), Position::new(1, 4, 0), false, true, None);
        assert_eq!(path.len(), 4);
        assert_eq!(path[0], Position::new(1, 1, 0));
        assert_eq!(path[3], Position::new(1, 4, 0));
    }

    #[test]
    fn test_diagonal_shortens_path() {
        let world = strip_world(5);
        let from = Position::new(1, 0, 0);
        let to = Position::new(1, 1, 1);
        assert_eq!(find_path(&world, from, to, false, true, None).len(), 2);
        assert_eq!(find_path(&world, from, to, true, true, None).len(), 1);
    }

    #[test]
    fn test_blocker_forces_detour() {
        let mut world = strip_world(5);
        let a = Position::new(1, 1, 0);
        let b = Position::new(1, 2, 0);
        block(&mut world, a, b);
        let from = Position::new(1, 0, 0);
        let to = Position::new(1, 4, 0);
        assert_eq!(find_path(&world, from, to, false, false, None).len(), 4);
        assert_eq!(find_path(&world, from, to, false, true, None).len(), 6);
    }

    #[test]
    fn test_fully_blocked_is_unreachable() {
        let mut world = strip_world(4);
        block(&mut world, Position::new(1, 1, 0), Position::new(1, 2, 0));
        block(&mut world, Position::new(1, 1, 1), Position::new(1, 2, 1));
        let from = Position::new(1, 0, 0);
        let to = Position::new(1, 3, 0);
        assert!(find_path(&world, from, to, false, true, None).is_empty());
        assert_eq!(path_distance(&world, from, to, PathQuery::WALK), None);
        assert!(!all_reachable(&world, from, &[to], PathQuery::WALK));
    }

    #[test]
    fn test_stage_filter_excludes_other_stage() {
        let mut world = strip_world(5);
        block(&mut world, Position::new(1, 1, 0), Position::new(1, 2, 0));
        let from = Position::new(1, 0, 0);
        let to = Position::new(1, 4, 0);
        // the only detour runs through (2, 1), which is late
        assert!(find_path(&world, from, to, false, true, Some(Stage::Early)).is_empty());
        assert_eq!(find_path(&world, from, to, false, true, Some(Stage::Late)).len(), 0);
        assert_eq!(find_path(&world, from, to, false, true, None).len(), 6);
    }

    #[test]
    fn test_distance_map_covers_level() {
        let world = strip_world(4);
        let map = distance_map(&world, Position::new(1, 0, 0), false, true, None);
        assert_eq!(map.len(), 8);
        assert_eq!(map[&Position::new(1, 3, 1)], 4);
    }

    #[test]
    fn test_cross_level_is_empty() {
        let world = strip_world(3);
        assert!(find_path(&world, Position::new(1, 0, 0), Position::new(2, 0, 0), true, false, None).is_empty());
    }

    #[test]
    fn test_cache_hits_and_invalidates() {
        let mut world = strip_world(5);
        let mut cache = PathCache::default();
        let from = Position::new(1, 0, 0);
        let to = Position::new(1, 4, 0);
        assert_eq!(cache.find_path(&world, from, to, PathQuery::WALK).len(), 4);
        assert_eq!(cache.len(), 1);

        block(&mut world, Position::new(1, 1, 0), Position::new(1, 2, 0));
        // stale until invalidated
        assert_eq!(cache.find_path(&world, from, to, PathQuery::WALK).len(), 4);
        cache.invalidate();
        assert!(cache.is_empty());
        assert_eq!(cache.find_path(&world, from, to, PathQuery::WALK).len(), 6);
    }
}
