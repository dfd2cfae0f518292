//! Traversal paths and the water/food pacing along them.
//!
//! A level gets up to two traversal orders from its excursion start: one over
//! the early sectors (walking only through early sectors) and one over the
//! late sectors. Each order repeatedly walks to the nearest unvisited sector.

use crate::constants::Stage;
use crate::model::{Position, RequiredResources, World};
use crate::pathfinding::find_path;
use crate::random::{salt, sample};
use crate::spatial::nearest;

use super::PassContext;

const SALT_WATER: i64 = 0x7761_7472;
const SALT_FOOD: i64 = 0x666f_6f64;

/// Probability factor applied under poison or radiation.
const HAZARD_FACTOR: f64 = 0.25;

/// Compute the traversal paths of level `l` and tag every visited sector
/// with its path id. Path ids are indices into the returned list.
pub(super) fn generate_paths(world: &mut World, l: i32) -> Vec<Vec<Position>> {
    let Some(level) = world.level(l) else {
        return Vec::new();
    };
    let Some(start) = level.excursion_start else {
        log::warn!("level {}: no excursion start, no paths", l);
        return Vec::new();
    };
    let early = level.sectors_by_stage(Stage::Early);
    let late = level.sectors_by_stage(Stage::Late);

    let mut paths = Vec::new();
    for (sectors, stage_filter) in [(early, Some(Stage::Early)), (late, None)] {
        if sectors.is_empty() {
            continue;
        }
        let path_id = paths.len();
        let traverse = traverse_sectors(world, start, sectors, stage_filter, path_id);
        paths.push(traverse);
    }
    log::debug!(
        "level {}: paths of length {:?}",
        l,
        paths.iter().map(Vec::len).collect::<Vec<_>>()
    );
    paths
}

fn traverse_sectors(
    world: &mut World,
    start: Position,
    mut unvisited: Vec<Position>,
    stage_filter: Option<Stage>,
    path_id: usize,
) -> Vec<Position> {
    let mut traverse = Vec::new();
    let mut current = start;
    visit(world, &mut unvisited, current, path_id);
    while let Some(next) = nearest(current, &unvisited) {
        let path = find_path(world, current, next, false, true, stage_filter);
        if path.is_empty() {
            log::debug!("no path from {} to {}, skipping ahead", current, next);
        }
        for pos in path {
            visit(world, &mut unvisited, pos, path_id);
            traverse.push(pos);
        }
        current = next;
        visit(world, &mut unvisited, current, path_id);
    }
    traverse
}

fn visit(world: &mut World, unvisited: &mut Vec<Position>, pos: Position, path_id: usize) {
    let Some(index) = unvisited.iter().position(|p| *p == pos) else {
        return;
    };
    unvisited.remove(index);
    if let Some(sector) = world.sector_mut(pos) {
        sector.path_id.get_or_insert(path_id);
    }
}

/// Flag the sectors of `path` where water or food must be carried.
pub(super) fn generate_required_resources(
    ctx: &PassContext<'_>,
    world: &mut World,
    l: i32,
    path_index: usize,
    path: &[Position],
) {
    let plan = plan_required_resources(ctx, world, l, path_index, path);
    for (pos, required) in path.iter().zip(plan) {
        if let Some(sector) = world.sector_mut(*pos) {
            sector.required_resources.water |= required.water;
            sector.required_resources.food |= required.food;
        }
    }
}

/// Requirement decisions for each step of `path`, without touching the world.
fn plan_required_resources(
    ctx: &PassContext<'_>,
    world: &World,
    l: i32,
    path_index: usize,
    path: &[Position],
) -> Vec<RequiredResources> {
    let Some(level) = world.level(l) else {
        return Vec::new();
    };
    let bag = ctx.tables.balancing.bag_capacity(level.level_ordinal);
    let max_water = (bag / 2) as usize;
    let max_food = (f64::from(bag) / 2.0 * 0.75).floor() as usize;
    let tail = ctx.config.required_resource_tail_steps;

    let pacing = Pacing {
        seed: ctx.seed,
        level: l,
        path_index,
        last: path.len().saturating_sub(1),
        tail,
    };
    let mut steps_water = 0;
    let mut steps_food = 0;
    let mut plan = Vec::with_capacity(path.len());
    for (i, pos) in path.iter().enumerate() {
        let hazardous = level.sector_at(*pos).is_some_and(|s| s.hazards.has_toxic());
        let water = pacing.require(SALT_WATER, i, steps_water, max_water, hazardous);
        let food = pacing.require(SALT_FOOD, i, steps_food, max_food, hazardous);
        steps_water = if water { 0 } else { steps_water + 1 };
        steps_food = if food { 0 } else { steps_food + 1 };
        plan.push(RequiredResources { water, food });
    }
    plan
}

struct Pacing {
    seed: i64,
    level: i32,
    path_index: usize,
    last: usize,
    tail: usize,
}

impl Pacing {
    fn require(&self, tag: i64, i: usize, steps: usize, max_steps: usize, hazardous: bool) -> bool {
        // the end of a path is usually a dead end and the player has to walk back
        if i == self.last && steps >= self.tail {
            return true;
        }
        let min_steps = (max_steps as f64 * 0.75).floor() as usize;
        if steps < min_steps {
            return false;
        }
        if steps >= max_steps {
            return true;
        }
        let factor = if hazardous { HAZARD_FACTOR } else { 1.0 };
        let probability = (steps - min_steps) as f64 / (max_steps - min_steps) as f64 * factor;
        let s = salt(&[self.seed, tag, i64::from(self.level), self.path_index as i64, i as i64]);
        sample(s) < probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::test_support::*;
    use crate::model::Level;

    fn corridor_world(length: i32) -> World {
        let mut world = World::new(1, 1, 1);
        let mut level = Level::new(1);
        for x in 0..length {
            level.add_sector(x, 0, Stage::Early);
        }
        level.set_camp(Position::new(1, 0, 0));
        world.insert_level(level);
        world
    }

    #[test]
    fn test_paths_cover_every_sector() {
        let mut world = small_world(41);
        let paths = generate_paths(&mut world, 13);
        assert!(!paths.is_empty() && paths.len() <= 2);
        let level = world.level(13).unwrap();
        let start = level.excursion_start.unwrap();
        for s in level.sectors() {
            if s.position != start {
                assert!(s.path_id.is_some(), "{} not visited", s.position);
            }
        }
    }

    #[test]
    fn test_early_path_stays_in_early_sectors() {
        let mut world = small_world(42);
        let paths = generate_paths(&mut world, 13);
        let level = world.level(13).unwrap();
        let early = &paths[0];
        assert!(early.iter().all(|p| level.sector_at(*p).unwrap().stage == Stage::Early));
    }

    #[test]
    fn test_corridor_path_is_ordered() {
        let mut world = corridor_world(6);
        let paths = generate_paths(&mut world, 1);
        assert_eq!(paths.len(), 1);
        let xs: Vec<i32> = paths[0].iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_requirement_at_long_tail() {
        let tables = tables();
        let config = config();
        for seed in 0..40 {
            let ctx = PassContext {
                seed,
                tables: tables.collaborators(),
                config: &config,
            };
            let mut world = small_world(seed);
            for (i, path) in generate_paths(&mut world, 13).iter().enumerate() {
                let plan = plan_required_resources(&ctx, &world, 13, i, path);
                let tail = config.required_resource_tail_steps;
                if path.len() <= tail {
                    continue;
                }
                let last = path.len() - 1;
                let recent = &plan[last - tail..last];
                if !recent.iter().any(|r| r.water) {
                    assert!(plan[last].water, "seed {} path {}", seed, i);
                }
                if !recent.iter().any(|r| r.food) {
                    assert!(plan[last].food, "seed {} path {}", seed, i);
                }
            }
        }
    }

    #[test]
    fn test_requirements_are_paced() {
        let tables = tables();
        let config = config();
        let ctx = PassContext {
            seed: 7,
            tables: tables.collaborators(),
            config: &config,
        };
        let mut world = corridor_world(60);
        let paths = generate_paths(&mut world, 1);
        let plan = plan_required_resources(&ctx, &world, 1, 0, &paths[0]);
        let bag = tables.collaborators().balancing.bag_capacity(1) as usize;
        let max_water = bag / 2;
        let mut gap = 0;
        for r in &plan {
            if r.water {
                gap = 0;
            } else {
                gap += 1;
                assert!(gap <= max_water, "water gap {} exceeds {}", gap, max_water);
            }
        }
        assert!(plan.iter().filter(|r| r.water).count() >= 60 / (max_water + 1));
    }
}
