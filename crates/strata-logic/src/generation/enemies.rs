//! Enemies: per-sector candidates, regular encounters, locale enemy counts
//! and gangs.
//!
//! Gangs are movement blockers of type [`BlockerType::Gang`] with a recorded
//! enemy. Every edge a gang blocks gets a passage locale with
//! [`LOCALE_ENEMY_COUNT`] enemies on both of its sectors.

use std::cmp::Reverse;
use std::collections::HashSet;

use crate::constants::{BlockerType, CampStep, Direction, UncampableReason, Zone};
use crate::model::{EnemyCandidate, Gang, Level, LocaleSlot, Position, Sector, World};
use crate::pathfinding::{PathCache, PathQuery};
use crate::random::{pick_by_rarity, random_neighbour, salt, sample, sample_int};
use crate::spatial::{border_sectors, distance_to_camp, protected_sectors};
use crate::tables::{EnemyCategory, EnemyTable};

use super::blockers::{add_movement_blocker, BlockerOptions, BlockerOutcome};
use super::{sector_salt, travel_passages, PassContext};

const SALT_ENEMY_PICK: i64 = 0x656e_6d79;
const SALT_REGULAR: i64 = 0x7265_6775;
const SALT_GANG_NEIGHBOUR: i64 = 0x676e_6272;
const SALT_GANG_PATH: i64 = 0x6770_7468;

/// Enemies in a workshop or behind a gang.
pub const LOCALE_ENEMY_COUNT: u32 = 3;

/// Chance cutoff below which a sector has no random encounters.
const NO_REGULAR_ENEMIES: f64 = 0.2;

/// Gangs on camp-to-workshop routes, at most.
const MAX_WORKSHOP_GANGS: usize = 100;

pub(super) fn generate_enemies(ctx: &PassContext<'_>, world: &mut World, l: i32) {
    let Some(level) = world.level(l) else { return };

    // per sector, computed against the finished level before any write
    let updates: Vec<(Position, u32, Vec<EnemyCandidate>, bool)> = level
        .sectors()
        .iter()
        .map(|sector| {
            let (difficulty, enemies) = possible_enemies(ctx, level, sector);
            let regular = !sector.is_camp
                && sample(sector_salt(ctx.seed, SALT_REGULAR, sector.position)) > NO_REGULAR_ENEMIES;
            (sector.position, difficulty, enemies, regular)
        })
        .collect();
    for (pos, difficulty, enemies, regular) in updates {
        let Some(sector) = world.sector_mut(pos) else { continue };
        sector.enemy_difficulty = difficulty;
        sector.possible_enemies = enemies;
        sector.has_regular_enemies = regular;
        if sector.has_workshop {
            sector.locale_enemies.insert(LocaleSlot::Workshop, LOCALE_ENEMY_COUNT);
        }
    }

    let mut gangs = GangPlacer {
        ctx,
        level: l,
        protected: protected_sectors(world, l),
        paths: PathCache::default(),
        placed: 0,
    };
    gangs.on_zone_borders(world);
    gangs.on_critical_paths(world);
    gangs.random_sweep(world);
    log::info!("level {}: {} gangs", l, gangs.placed);
}

/// Effective difficulty of `sector` and the enemies that may appear there.
fn possible_enemies(ctx: &PassContext<'_>, level: &Level, sector: &Sector) -> (u32, Vec<EnemyCandidate>) {
    let enemies = ctx.tables.enemies;
    let step = sector.zone.map_or(CampStep::Start, Zone::camp_step);
    let mut difficulty = enemies.difficulty(level.camp_ordinal, step);
    if sector.is_on_early_critical_path() {
        difficulty = difficulty.saturating_sub(2);
    }
    let difficulty = difficulty.max(1);

    let mut candidates = Vec::new();
    for category in sector_categories(level, sector) {
        candidates.extend(enemies.enemies_of_category(category, difficulty, false));
    }
    if candidates.is_empty() {
        log::warn!("no enemies for sector {} at difficulty {}", sector.position, difficulty);
        return (difficulty, candidates);
    }
    let picked = select_enemies(candidates, enemies, level.is_hard, |i| {
        salt(&[sector_salt(ctx.seed, SALT_ENEMY_PICK, sector.position), i as i64])
    });
    (difficulty, picked)
}

fn sector_categories(level: &Level, sector: &Sector) -> Vec<EnemyCategory> {
    let polluted = level.uncampable_reason == Some(UncampableReason::Pollution);
    let radiated = level.uncampable_reason == Some(UncampableReason::Radiation);
    let hazards = &sector.hazards;
    let ordinary = !polluted && !radiated;

    let mut categories = vec![EnemyCategory::Global];
    if ordinary && !hazards.has_hazards() {
        categories.push(EnemyCategory::NoHazard);
    }
    if hazards.cold > 0 {
        categories.push(EnemyCategory::Cold);
    }
    if polluted || hazards.poison > 0 {
        categories.push(EnemyCategory::Toxic);
    }
    if radiated || hazards.radiation > 0 {
        categories.push(EnemyCategory::Radiation);
    }
    categories.push(if sector.sunlit {
        EnemyCategory::Sunlit
    } else {
        EnemyCategory::Dark
    });
    if ordinary {
        categories.push(if sector.building_density > 5 {
            EnemyCategory::Dense
        } else {
            EnemyCategory::Sparse
        });
        let water_nearby = sector.has_water()
            || level
                .neighbour_positions(sector.position, true)
                .into_iter()
                .filter_map(|p| level.sector_at(p))
                .any(Sector::has_water);
        if water_nearby {
            categories.push(EnemyCategory::Water);
        }
    }
    categories
}

/// Keep common enemies over rare ones, never below the difficulty floor:
/// the median candidate difficulty on hard levels, the lowest otherwise.
fn select_enemies(
    mut candidates: Vec<EnemyCandidate>,
    enemies: &dyn EnemyTable,
    is_hard: bool,
    salt_for: impl Fn(usize) -> i64,
) -> Vec<EnemyCandidate> {
    candidates.sort_by_key(|c| c.rarity);
    let mut difficulties: Vec<u32> = candidates.iter().map(|c| enemies.difficulty_level_of(c)).collect();
    difficulties.sort_unstable();
    let floor = if is_hard {
        difficulties[difficulties.len() / 2]
    } else {
        difficulties[0]
    };
    pick_by_rarity(
        &candidates,
        |c| c.rarity,
        |c| enemies.difficulty_level_of(c) >= floor,
        salt_for,
    )
    .into_iter()
    .cloned()
    .collect()
}

struct GangPlacer<'a> {
    ctx: &'a PassContext<'a>,
    level: i32,
    protected: HashSet<Position>,
    paths: PathCache,
    placed: usize,
}

impl GangPlacer<'_> {
    fn can_have_gang(&self, world: &World, pos: Position) -> bool {
        world
            .sector(pos)
            .is_some_and(|s| !s.is_camp && !s.is_passage() && !self.protected.contains(&pos))
    }

    /// Place a gang between `a` and `b`. Unless `force`d, both sectors must
    /// be able to hold a gang.
    fn add_gang(&mut self, world: &mut World, a: Position, b: Position, add_diagonals: bool, force: bool) -> bool {
        if !force && !(self.can_have_gang(world, a) && self.can_have_gang(world, b)) {
            log::debug!("no gang between {} and {}", a, b);
            return false;
        }
        let options = BlockerOptions {
            add_diagonals,
            ..Default::default()
        };
        let BlockerOutcome::Placed { edges } = add_movement_blocker(world, a, b, BlockerType::Gang, &options) else {
            return false;
        };
        self.paths.invalidate();
        for (pos, direction) in edges {
            if let Some(sector) = world.sector_mut(pos) {
                sector
                    .locale_enemies
                    .insert(LocaleSlot::Passage(direction), LOCALE_ENEMY_COUNT);
            }
        }

        let enemies = self.ctx.tables.enemies;
        let enemy_id = [a, b]
            .iter()
            .filter_map(|p| world.sector(*p))
            .flat_map(|s| &s.possible_enemies)
            .min_by_key(|e| Reverse(enemies.difficulty_level_of(e)))
            .map(|e| e.id.clone());
        if let Some(level) = world.level_mut(self.level) {
            level.gangs.push(Gang {
                pos1: a,
                pos2: b,
                enemy_id,
            });
        }
        self.placed += 1;
        true
    }

    /// Gangs across up to `max_paths` successive routes from `a` to `b`.
    fn add_gangs_between(&mut self, world: &mut World, s: i64, a: Position, b: Position, max_paths: usize) -> usize {
        let query = PathQuery {
            allow_diagonal: true,
            ..PathQuery::WALK
        };
        let mut count = 0;
        for i in 0..max_paths {
            let path = self.paths.find_path(world, a, b, query);
            if path.len() < 3 {
                break;
            }
            let min = (path.len() as f64 / 4.0).round() as i64 + 1;
            let max = path.len() as i64 - 2;
            let index = sample_int(salt(&[s, i as i64]), min, max) as usize;
            if index + 1 >= path.len() {
                continue;
            }
            let (p, q) = (path[index], path[index + 1]);
            if !self.can_have_gang(world, p) || !self.can_have_gang(world, q) {
                continue;
            }
            if self.add_gang(world, p, q, false, false) {
                count += 1;
            }
        }
        count
    }

    fn on_zone_borders(&mut self, world: &mut World) {
        let l = self.level;
        let Some(level) = world.level(l) else { return };

        // passage-to-camp border, except close to camp
        let threshold = if l == world.start_level { 4 } else { 2 };
        let pairs = border_sectors(level, Zone::PassageToCamp, true);
        for pair in pairs {
            let d = distance_to_camp(world, pair.sector)
                .into_iter()
                .chain(distance_to_camp(world, pair.neighbour))
                .min();
            if d.is_some_and(|d| d > threshold) {
                self.add_gang(world, pair.sector, pair.neighbour, true, true);
            }
        }

        // passage-to-passage border, where stepping in leads towards the exit
        let (_, Some(exit)) = travel_passages(world, l) else { return };
        let Some(level) = world.level(l) else { return };
        let pairs = border_sectors(level, Zone::PassageToPassage, false);
        for pair in pairs {
            let outside = self.paths.find_path(world, pair.sector, exit, PathQuery::WALK).len();
            let inside = self.paths.find_path(world, pair.neighbour, exit, PathQuery::WALK).len();
            if outside > inside {
                self.add_gang(world, pair.sector, pair.neighbour, true, true);
            }
        }
    }

    fn on_critical_paths(&mut self, world: &mut World) {
        let l = self.level;
        let Some(level) = world.level(l) else { return };
        let camps = level.camp_positions.clone();
        let targets: Vec<(Position, bool, bool)> = level
            .sectors()
            .iter()
            .map(|s| (s.position, s.has_workshop, !s.locales.is_empty()))
            .collect();

        let mut locale_count = 0;
        for (c, camp) in camps.iter().enumerate() {
            for (i, (pos, has_workshop, has_locales)) in targets.iter().enumerate() {
                let s = salt(&[self.ctx.seed, SALT_GANG_PATH, i64::from(l), c as i64, i as i64]);
                if *has_workshop {
                    self.add_gangs_between(world, s, *camp, *pos, MAX_WORKSHOP_GANGS);
                } else if *has_locales {
                    if locale_count % 2 == 0 {
                        self.add_gangs_between(world, s, *camp, *pos, 1);
                    }
                    locale_count += 1;
                }
            }
        }
    }

    /// One gang every `random_gang_interval` eligible sectors.
    fn random_sweep(&mut self, world: &mut World) {
        let interval = self.ctx.config.random_gang_interval;
        let Some(level) = world.level(self.level) else { return };
        let positions: Vec<Position> = level.sectors().iter().map(|s| s.position).collect();
        let mut since_last = 0;
        for (i, pos) in positions.into_iter().enumerate() {
            if !self.can_have_gang(world, pos) {
                continue;
            }
            if since_last >= interval {
                let s = sector_salt(self.ctx.seed, SALT_GANG_NEIGHBOUR, pos);
                let Some(neighbour) = random_neighbour(s, world, pos, true) else {
                    continue;
                };
                if !self.can_have_gang(world, neighbour) {
                    continue;
                }
                let open = Direction::between((pos.x, pos.y), (neighbour.x, neighbour.y))
                    .is_some_and(|d| world.sector(pos).is_some_and(|s| s.blocker(d).is_none()));
                if open {
                    let add_diagonals = i % (interval * 2) == 0;
                    self.add_gang(world, pos, neighbour, add_diagonals, false);
                    since_last = 0;
                }
            }
            since_last += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::test_support::*;
    use crate::generation::{blockers, hazards, locales, paths, sectors, stashes, workshops, zones};
    use crate::tables::StaticTables;

    fn run(world: &mut World, seed: i64) {
        let tables = tables();
        let config = config();
        let ctx = PassContext {
            seed,
            tables: tables.collaborators(),
            config: &config,
        };
        for l in world.level_numbers() {
            zones::generate_zones(&ctx, world, l);
            hazards::generate_hazards(&ctx, world, l);
            stashes::generate_stashes(&ctx, world, l);
            workshops::generate_workshops(&ctx, world, l);
            paths::generate_paths(world, l);
            sectors::generate_sector_features(&ctx, world, l);
            locales::generate_locales(&ctx, world, l);
            blockers::generate_movement_blockers(&ctx, world, l);
            generate_enemies(&ctx, world, l);
        }
    }

    #[test]
    fn test_every_sector_has_enemies() {
        let mut world = small_world(81);
        run(&mut world, 81);
        for level in world.levels() {
            for s in level.sectors() {
                assert!(s.enemy_difficulty >= 1);
                assert!(!s.possible_enemies.is_empty(), "no enemies at {}", s.position);
                if s.is_camp {
                    assert!(!s.has_regular_enemies);
                }
                if s.has_workshop {
                    assert_eq!(s.locale_enemies.get(&LocaleSlot::Workshop), Some(&LOCALE_ENEMY_COUNT));
                }
            }
        }
    }

    #[test]
    fn test_gangs_block_their_edge() {
        for seed in [82, 83] {
            let mut world = small_world(seed);
            run(&mut world, seed);
            let total: usize = world.levels().map(|lv| lv.gangs.len()).sum();
            assert!(total > 0, "seed {} placed no gangs", seed);
            for level in world.levels() {
                for gang in &level.gangs {
                    let d = Direction::between((gang.pos1.x, gang.pos1.y), (gang.pos2.x, gang.pos2.y)).unwrap();
                    let s1 = world.sector(gang.pos1).unwrap();
                    let s2 = world.sector(gang.pos2).unwrap();
                    assert_eq!(s1.blocker(d), Some(BlockerType::Gang));
                    assert_eq!(s2.blocker(d.opposite()), Some(BlockerType::Gang));
                    assert!(!s1.is_camp && !s2.is_camp);
                    assert_eq!(s1.locale_enemies.get(&LocaleSlot::Passage(d)), Some(&LOCALE_ENEMY_COUNT));
                    assert!(gang.enemy_id.is_some());
                }
            }
        }
    }

    #[test]
    fn test_hard_levels_skip_weak_enemies() {
        let tables = StaticTables::load().unwrap();
        let enemies = tables.collaborators().enemies;
        let candidates = enemies.enemies_of_category(EnemyCategory::Global, 13, false);
        assert!(candidates.len() >= 3);
        let mut difficulties: Vec<u32> = candidates.iter().map(|c| c.difficulty).collect();
        difficulties.sort_unstable();
        let median = difficulties[difficulties.len() / 2];
        for seed in 0..20 {
            let picked = select_enemies(candidates.clone(), enemies, true, |i| salt(&[seed, i as i64]));
            assert!(picked.iter().all(|e| e.difficulty >= median));
        }
        let easy = select_enemies(candidates.clone(), enemies, false, |i| salt(&[7, i as i64]));
        let most_common = candidates.iter().min_by_key(|c| c.rarity).unwrap();
        assert_eq!(easy[0].id, most_common.id);
    }

    #[test]
    fn test_hard_level_always_has_enemies() {
        let tables = StaticTables::load().unwrap();
        let enemies = tables.collaborators().enemies;
        let candidates = enemies.enemies_of_category(EnemyCategory::Global, 13, false);
        for seed in 0..200 {
            let picked = select_enemies(candidates.clone(), enemies, true, |i| salt(&[seed, i as i64]));
            assert!(!picked.is_empty(), "seed {} picked no hard enemies", seed);
        }

        for seed in [85, 86, 87] {
            let mut world = small_world(seed);
            let mut level = world.level(14).unwrap().clone();
            level.is_hard = true;
            world.insert_level(level);
            run(&mut world, seed);
            let level = world.level(14).unwrap();
            for s in level.sectors() {
                assert!(!s.possible_enemies.is_empty(), "seed {} no enemies at {}", seed, s.position);
            }
            for gang in &level.gangs {
                assert!(gang.enemy_id.is_some());
            }
        }
    }

    #[test]
    fn test_polluted_level_draws_toxic_enemies() {
        let mut world = small_world(84);
        let mut level = world.level(12).unwrap().clone();
        level.uncampable_reason = Some(UncampableReason::Pollution);
        world.insert_level(level);
        let level = world.level(12).unwrap();
        let categories = sector_categories(level, &level.sectors()[0]);
        assert!(categories.contains(&EnemyCategory::Toxic));
        assert!(!categories.contains(&EnemyCategory::NoHazard));
        assert!(!categories.contains(&EnemyCategory::Water));
    }
}
