//! Sector generation pipeline.
//!
//! Runs once per world, level by level from the top level down. Within a
//! level the passes run in this order, each free to rely on what the earlier
//! ones established:
//!   1. generate_zones             -- zone label on every sector
//!   2. generate_hazards           -- cold, poison and radiation values
//!   3. generate_stashes           -- one-time item caches
//!   4. generate_workshops         -- fuel/rubber refineries near camp
//!   5. generate_paths             -- early and late traversal orders
//!   6. generate_required_resources -- water/food pacing along each path
//!   7. generate_sector_features   -- type, texture, light, passages, resources
//!   8. generate_locales           -- narrative and blueprint locales
//!   9. generate_movement_blockers -- debris, gaps and waste between sectors
//!  10. generate_enemies           -- enemy candidates, gangs, locale enemies

use serde::Serialize;

use crate::config::{GenerationConfig, GenerationError};
use crate::model::{Position, World};
use crate::tables::Collaborators;

mod blockers;
mod enemies;
mod hazards;
mod locales;
mod paths;
mod sectors;
mod stashes;
mod workshops;
mod zones;

pub use blockers::{add_movement_blocker, BlockerOptions, BlockerOutcome, RefusalReason};

/// Inputs shared by every pass of one run.
#[derive(Clone, Copy)]
pub struct PassContext<'a> {
    pub seed: i64,
    pub tables: Collaborators<'a>,
    pub config: &'a GenerationConfig,
}

/// Per-level counts collected after the passes ran.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LevelSummary {
    pub level: i32,
    pub level_ordinal: u32,
    pub camp_ordinal: u32,
    pub is_campable: bool,
    pub sectors: usize,
    pub hazardous_sectors: usize,
    pub stashes: usize,
    pub workshops: usize,
    pub locales: usize,
    pub blocked_edges: usize,
    pub gangs: usize,
    pub required_water: usize,
    pub required_food: usize,
}

/// Result of a full run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub seed: i64,
    pub levels: Vec<LevelSummary>,
}

/// Check that a bare world can go through the pipeline.
pub fn validate_world(world: &World) -> Result<(), GenerationError> {
    if world.top_level < world.bottom_level {
        return Err(GenerationError::EmptyLevelRange {
            top: world.top_level,
            bottom: world.bottom_level,
        });
    }
    if !(world.bottom_level..=world.top_level).contains(&world.start_level) {
        return Err(GenerationError::StartLevelOutOfRange {
            start: world.start_level,
            top: world.top_level,
            bottom: world.bottom_level,
        });
    }
    for l in world.bottom_level..=world.top_level {
        let level = world.level(l).ok_or(GenerationError::MissingLevel(l))?;
        if level.sectors().is_empty() {
            return Err(GenerationError::EmptyLevel(l));
        }
        let anchors = level
            .camp_positions
            .iter()
            .map(|p| ("camp", *p))
            .chain(level.passage_up.map(|p| ("passage up", p)))
            .chain(level.passage_down.map(|p| ("passage down", p)))
            .chain(level.excursion_start.map(|p| ("excursion start", p)));
        for (what, position) in anchors {
            if level.sector_at(position).is_none() {
                return Err(GenerationError::MissingSector { what, position });
            }
        }
    }
    Ok(())
}

/// Decorate a bare world in place.
///
/// Returns an error only when the world or config is unusable; the world is
/// left untouched in that case.
pub fn generate_world(
    world: &mut World,
    seed: i64,
    tables: Collaborators<'_>,
    config: &GenerationConfig,
) -> Result<GenerationReport, GenerationError> {
    if seed < 0 {
        return Err(GenerationError::InvalidSeed(seed));
    }
    config.validate()?;
    validate_world(world)?;

    world.seed = seed;
    let ctx = PassContext {
        seed,
        tables,
        config,
    };
    let mut report = GenerationReport {
        seed,
        levels: Vec::new(),
    };
    for l in world.level_numbers() {
        generate_level(&ctx, world, l);
        report.levels.push(summarize_level(world, l));
    }
    Ok(report)
}

fn generate_level(ctx: &PassContext<'_>, world: &mut World, l: i32) {
    zones::generate_zones(ctx, world, l);
    hazards::generate_hazards(ctx, world, l);
    stashes::generate_stashes(ctx, world, l);
    workshops::generate_workshops(ctx, world, l);
    let level_paths = paths::generate_paths(world, l);
    for (i, path) in level_paths.iter().enumerate() {
        paths::generate_required_resources(ctx, world, l, i, path);
    }
    if let Some(level) = world.level_mut(l) {
        level.paths = level_paths;
    }
    sectors::generate_sector_features(ctx, world, l);
    locales::generate_locales(ctx, world, l);
    blockers::generate_movement_blockers(ctx, world, l);
    enemies::generate_enemies(ctx, world, l);

    let summary = summarize_level(world, l);
    log::info!(
        "level {} done: {} sectors, {} hazardous, {} locales, {} blocked edges, {} gangs",
        l,
        summary.sectors,
        summary.hazardous_sectors,
        summary.locales,
        summary.blocked_edges,
        summary.gangs
    );
}

pub fn summarize_level(world: &World, l: i32) -> LevelSummary {
    let Some(level) = world.level(l) else {
        return LevelSummary {
            level: l,
            ..Default::default()
        };
    };
    let sectors = level.sectors();
    LevelSummary {
        level: l,
        level_ordinal: level.level_ordinal,
        camp_ordinal: level.camp_ordinal,
        is_campable: level.is_campable,
        sectors: sectors.len(),
        hazardous_sectors: sectors.iter().filter(|s| s.hazards.has_hazards()).count(),
        stashes: sectors.iter().filter(|s| s.stash.is_some()).count(),
        workshops: sectors.iter().filter(|s| s.has_workshop).count(),
        locales: sectors.iter().map(|s| s.locales.len()).sum(),
        // each blocked edge is stored on both of its sectors
        blocked_edges: sectors.iter().map(|s| s.movement_blockers.len()).sum::<usize>() / 2,
        gangs: level.gangs.len(),
        required_water: sectors.iter().filter(|s| s.required_resources.water).count(),
        required_food: sectors.iter().filter(|s| s.required_resources.food).count(),
    }
}

/// Entry and exit passages of a level in travel order.
///
/// Levels at or below the start are travelled downwards, so the entrance is
/// the passage up; above the start it is the passage down.
pub(crate) fn travel_passages(world: &World, l: i32) -> (Option<Position>, Option<Position>) {
    let Some(level) = world.level(l) else {
        return (None, None);
    };
    if world.is_going_down(l) {
        (level.passage_up, level.passage_down)
    } else {
        (level.passage_down, level.passage_up)
    }
}

/// Salt for one sector decision: seed, call-site tag and coordinates.
pub(crate) fn sector_salt(seed: i64, tag: i64, pos: Position) -> i64 {
    crate::random::salt(&[seed, tag, i64::from(pos.level), i64::from(pos.x), i64::from(pos.y)])
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::GenerationConfig;
    use crate::tables::StaticTables;
    use crate::template::{build_world, WorldTemplateConfig};
    use crate::model::World;

    pub fn tables() -> StaticTables {
        StaticTables::load().unwrap()
    }

    pub fn small_world(seed: i64) -> World {
        let config = WorldTemplateConfig {
            seed,
            top_level: 15,
            bottom_level: 11,
            start_level: 13,
            half_width: 6,
            half_height: 8,
            uncampable_levels: vec![crate::template::UncampableLevel {
                level: 12,
                reason: crate::constants::UncampableReason::Pollution,
            }],
            hard_levels: Vec::new(),
            ..Default::default()
        };
        build_world(&config).unwrap()
    }

    pub fn config() -> GenerationConfig {
        GenerationConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::model::Level;

    #[test]
    fn test_generate_small_world() {
        let tables = tables();
        let mut world = small_world(5);
        let report = generate_world(&mut world, 5, tables.collaborators(), &config()).unwrap();
        assert_eq!(report.levels.len(), 5);
        assert!(report.levels.iter().all(|l| l.sectors > 0));
        for level in world.levels() {
            assert!(level.sectors().iter().all(|s| s.zone.is_some()));
            assert!(level.sectors().iter().all(|s| s.sector_type.is_some()));
        }
    }

    #[test]
    fn test_rejects_missing_level() {
        let tables = tables();
        let mut world = World::new(2, 1, 1);
        let mut level = Level::new(1);
        level.add_sector(0, 0, crate::constants::Stage::Early);
        world.insert_level(level);
        let err = generate_world(&mut world, 1, tables.collaborators(), &config()).unwrap_err();
        assert!(matches!(err, GenerationError::MissingLevel(2)));
    }

    #[test]
    fn test_rejects_dangling_camp() {
        let tables = tables();
        let mut world = World::new(1, 1, 1);
        let mut level = Level::new(1);
        level.add_sector(0, 0, crate::constants::Stage::Early);
        level.camp_positions.push(Position::new(1, 5, 5));
        world.insert_level(level);
        let err = generate_world(&mut world, 1, tables.collaborators(), &config()).unwrap_err();
        assert!(matches!(err, GenerationError::MissingSector { what: "camp", .. }));
    }

    #[test]
    fn test_rejects_negative_seed() {
        let tables = tables();
        let mut world = small_world(1);
        assert!(matches!(
            generate_world(&mut world, -4, tables.collaborators(), &config()),
            Err(GenerationError::InvalidSeed(-4))
        ));
    }
}
