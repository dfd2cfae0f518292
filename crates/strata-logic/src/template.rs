//! Bare world template: the level/sector grid the passes start from.
//!
//! Builds every level with its sectors, stages, passages, camp and the
//! cross-level features, assigns the progression ordinals, and registers the
//! passage and camp critical paths. Nothing here decorates sectors; that is
//! the pipeline's job.
//!
//! ```
//! use strata_logic::template::{build_world, WorldTemplateConfig};
//!
//! let world = build_world(&WorldTemplateConfig::default()).unwrap();
//! assert_eq!(world.level_numbers().len(), 11);
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::GenerationError;
use crate::constants::{CriticalPathType, FeatureKind, Stage, UncampableReason};
use crate::model::{Level, Position, World, WorldFeature};
use crate::random::{salt, sample, sample_int};
use crate::spatial::{add_critical_path, distance};

const SALT_GAP: i64 = 0x6761_70;
const SALT_CAMP: i64 = 0x6361_6d70;
const SALT_FEATURE: i64 = 0x6665_6174;

/// A level that cannot host a camp, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncampableLevel {
    pub level: i32,
    pub reason: UncampableReason,
}

/// Shape of the world to build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTemplateConfig {
    pub seed: i64,
    pub top_level: i32,
    pub bottom_level: i32,
    /// Level the player starts on.
    pub start_level: i32,
    /// Sectors span `-half_width..=half_width` on x.
    pub half_width: i32,
    /// Sectors span `-half_height..=half_height` on y.
    pub half_height: i32,
    /// Chance that an off-axis sector is left out of the grid.
    pub gap_chance: f64,
    /// Planar radius around the camp whose sectors are early stage.
    pub early_radius: f64,
    pub uncampable_levels: Vec<UncampableLevel>,
    pub hard_levels: Vec<i32>,
}

impl Default for WorldTemplateConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            top_level: 18,
            bottom_level: 8,
            start_level: 13,
            half_width: 8,
            half_height: 10,
            gap_chance: 0.1,
            early_radius: 5.0,
            uncampable_levels: vec![
                UncampableLevel {
                    level: 10,
                    reason: UncampableReason::Pollution,
                },
                UncampableLevel {
                    level: 16,
                    reason: UncampableReason::Radiation,
                },
            ],
            hard_levels: vec![17],
        }
    }
}

impl WorldTemplateConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.top_level < self.bottom_level {
            return Err(GenerationError::EmptyLevelRange {
                top: self.top_level,
                bottom: self.bottom_level,
            });
        }
        if !(self.bottom_level..=self.top_level).contains(&self.start_level) {
            return Err(GenerationError::StartLevelOutOfRange {
                start: self.start_level,
                top: self.top_level,
                bottom: self.bottom_level,
            });
        }
        if self.seed < 0 {
            return Err(GenerationError::InvalidSeed(self.seed));
        }
        if self.half_width < 2 || self.half_height < 3 {
            return Err(GenerationError::InvalidConfig(format!(
                "level grid {}x{} is too small",
                self.half_width * 2 + 1,
                self.half_height * 2 + 1
            )));
        }
        Ok(())
    }

    fn uncampable_reason(&self, level: i32) -> Option<UncampableReason> {
        self.uncampable_levels
            .iter()
            .find(|u| u.level == level)
            .map(|u| u.reason)
    }
}

/// Progression order of a level: 1 on the start level, counting down to the
/// bottom and then up from the level above the start.
pub fn level_ordinal(level: i32, start: i32, bottom: i32) -> u32 {
    if level <= start {
        (start - level + 1) as u32
    } else {
        (start - bottom + 1 + level - start) as u32
    }
}

/// Build the bare world described by `config`.
pub fn build_world(config: &WorldTemplateConfig) -> Result<World, GenerationError> {
    config.validate()?;
    let seed = config.seed;
    let mut world = World::new(config.top_level, config.bottom_level, config.start_level);
    world.seed = seed;

    // passage between level l and l - 1 sits at the same x/y on both
    let passage_y = |upper: i32| {
        if upper.rem_euclid(2) == 0 {
            config.half_height - 1
        } else {
            -(config.half_height - 1)
        }
    };

    for l in (config.bottom_level..=config.top_level).rev() {
        let passage_up = (l < config.top_level).then(|| Position::new(l, 0, passage_y(l + 1)));
        let passage_down = (l > config.bottom_level).then(|| Position::new(l, 0, passage_y(l)));
        let going_down = l <= config.start_level;
        let passage1 = (if going_down { passage_up } else { passage_down })
            .or(passage_up)
            .or(passage_down);

        let reason = config.uncampable_reason(l);
        let camp = reason.is_none().then(|| {
            let cx = sample_int(salt(&[seed, SALT_CAMP, i64::from(l)]), -2, 3) as i32;
            Position::new(l, cx, 0)
        });

        let mut level = Level::new(l);
        level.is_campable = reason.is_none();
        level.uncampable_reason = reason;
        level.is_hard = config.hard_levels.contains(&l);
        level.level_ordinal = level_ordinal(l, config.start_level, config.bottom_level);
        level.sea_padding = (config.start_level - l).clamp(0, 3);

        let mut cells = Vec::new();
        for x in -config.half_width..=config.half_width {
            for y in -config.half_height..=config.half_height {
                let on_axis = x == 0 || y == 0;
                let gap = sample(salt(&[seed, SALT_GAP, i64::from(l), i64::from(x), i64::from(y)]));
                if on_axis || gap >= config.gap_chance {
                    cells.push((x, y));
                }
            }
        }
        for (x, y) in connected_cells(&cells) {
            let stage = sector_stage(Position::new(l, x, y), camp, passage1, config.early_radius);
            level.add_sector(x, y, stage);
        }

        if let Some(p) = passage_up {
            level.set_passage_up(p);
        }
        if let Some(p) = passage_down {
            level.set_passage_down(p);
        }
        match camp {
            Some(c) => level.set_camp(c),
            None => level.excursion_start = passage1,
        }
        world.insert_level(level);
    }

    assign_camp_ordinals(&mut world);
    add_features(&mut world, config);
    register_critical_paths(&mut world);

    log::info!(
        "built world template: levels {}..={}, start {}",
        config.bottom_level,
        config.top_level,
        config.start_level
    );
    Ok(world)
}

fn sector_stage(pos: Position, camp: Option<Position>, passage1: Option<Position>, early_radius: f64) -> Stage {
    let near_camp = camp.is_some_and(|c| distance(pos, c) <= early_radius);
    let near_entrance = passage1.is_some_and(|p| distance(pos, p) <= 3.0);
    let on_corridor = passage1.is_some_and(|p| {
        let anchor_y = camp.map_or(-p.y, |c| c.y);
        let (lo, hi) = (p.y.min(anchor_y), p.y.max(anchor_y));
        pos.x.abs() <= 1 && (lo..=hi).contains(&pos.y)
    });
    if near_camp || near_entrance || on_corridor {
        Stage::Early
    } else {
        Stage::Late
    }
}

/// Cells connected to the origin, in their original order. Gaps can wall
/// off pockets of the grid; those are dropped.
fn connected_cells(cells: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let all: HashSet<(i32, i32)> = cells.iter().copied().collect();
    let mut keep = HashSet::from([(0, 0)]);
    let mut stack = vec![(0, 0)];
    while let Some((x, y)) = stack.pop() {
        for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
            let next = (x + dx, y + dy);
            if all.contains(&next) && keep.insert(next) {
                stack.push(next);
            }
        }
    }
    if keep.len() < cells.len() {
        log::debug!("dropped {} walled-off sectors", cells.len() - keep.len());
    }
    cells.iter().copied().filter(|c| keep.contains(c)).collect()
}

/// Camp ordinals count campable levels in progression order. An uncampable
/// level shares the ordinal of the campable level before it.
fn assign_camp_ordinals(world: &mut World) {
    let mut levels = world.level_numbers();
    levels.sort_by_key(|l| world.level(*l).map_or(0, |lv| lv.level_ordinal));
    let mut camp_ordinal = 0;
    for l in levels {
        if let Some(level) = world.level_mut(l) {
            if level.is_campable {
                camp_ordinal += 1;
            }
            level.camp_ordinal = camp_ordinal.max(1);
        }
    }
}

fn add_features(world: &mut World, config: &WorldTemplateConfig) {
    let seed = config.seed;
    let (hw, hh) = (config.half_width, config.half_height);

    // sea along the east edge of the lower levels
    world.features.push(WorldFeature {
        kind: FeatureKind::HoleSea,
        min_level: config.bottom_level,
        max_level: (config.start_level - 1).max(config.bottom_level),
        x: hw + 1,
        y: -hh,
        width: 4,
        height: hh * 2 + 1,
    });

    let feature_salt = |i: i64| salt(&[seed, SALT_FEATURE, i]);
    let random_x = |i: i64| sample_int(feature_salt(i), i64::from(-hw + 2), i64::from(hw - 2)) as i32;
    let random_y = |i: i64| sample_int(feature_salt(i + 100), i64::from(-hh + 2), i64::from(hh - 2)) as i32;

    // light well from the top level down to just above the start level
    world.features.push(WorldFeature {
        kind: FeatureKind::HoleWell,
        min_level: (config.start_level + 1).min(config.top_level),
        max_level: config.top_level,
        x: random_x(1),
        y: random_y(1),
        width: 1,
        height: 1,
    });

    // collapses on a couple of mid levels
    for i in 0..2 {
        let span = i64::from(config.top_level - config.bottom_level).max(1);
        let level = config.bottom_level + sample_int(feature_salt(10 + i), 0, span) as i32;
        world.features.push(WorldFeature {
            kind: FeatureKind::HoleCollapse,
            min_level: level,
            max_level: (level + 1).min(config.top_level),
            x: random_x(20 + i),
            y: random_y(20 + i),
            width: 2,
            height: 2,
        });
    }

    // mountain rising from the bottom level at the west edge
    world.features.push(WorldFeature {
        kind: FeatureKind::HoleMountain,
        min_level: config.bottom_level,
        max_level: config.bottom_level,
        x: -hw,
        y: random_y(30),
        width: 2,
        height: 3,
    });
}

fn register_critical_paths(world: &mut World) {
    for l in world.level_numbers() {
        let Some(level) = world.level(l) else { continue };
        let going_down = world.is_going_down(l);
        let (p1, p2) = if going_down {
            (level.passage_up, level.passage_down)
        } else {
            (level.passage_down, level.passage_up)
        };
        let camp = level.camp_position();
        match (camp, p1, p2) {
            (Some(c), p1, p2) => {
                if let Some(p1) = p1 {
                    add_critical_path(world, p1, c, CriticalPathType::PassageToCamp);
                }
                if let Some(p2) = p2 {
                    add_critical_path(world, c, p2, CriticalPathType::CampToPassage);
                }
            }
            (None, Some(p1), Some(p2)) => {
                add_critical_path(world, p1, p2, CriticalPathType::PassageToPassage);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordinals() {
        assert_eq!(level_ordinal(13, 13, 8), 1);
        assert_eq!(level_ordinal(8, 13, 8), 6);
        assert_eq!(level_ordinal(14, 13, 8), 7);
        assert_eq!(level_ordinal(18, 13, 8), 11);
    }

    #[test]
    fn test_default_world_shape() {
        let config = WorldTemplateConfig::default();
        let world = build_world(&config).unwrap();
        for level in world.levels() {
            assert!(!level.sectors().is_empty());
            assert_eq!(level.passage_up.is_some(), level.level < config.top_level);
            assert_eq!(level.passage_down.is_some(), level.level > config.bottom_level);
            assert_eq!(level.camp_positions.is_empty(), !level.is_campable);
            assert!(level.excursion_start.is_some());
        }
        assert_eq!(world.level(13).unwrap().camp_ordinal, 1);
        assert!(!world.level(10).unwrap().is_campable);
        assert_eq!(
            world.level(10).unwrap().camp_ordinal,
            world.level(11).unwrap().camp_ordinal
        );
    }

    #[test]
    fn test_passages_align_between_levels() {
        let world = build_world(&WorldTemplateConfig::default()).unwrap();
        for l in 9..=18 {
            let up = world.level(l - 1).unwrap().passage_up.unwrap();
            let down = world.level(l).unwrap().passage_down.unwrap();
            assert_eq!((up.x, up.y), (down.x, down.y));
        }
    }

    #[test]
    fn test_template_is_deterministic() {
        let config = WorldTemplateConfig {
            seed: 7,
            ..Default::default()
        };
        let a = build_world(&config).unwrap();
        let b = build_world(&config).unwrap();
        for (la, lb) in a.levels().zip(b.levels()) {
            let pa: Vec<_> = la.sectors().iter().map(|s| (s.position, s.stage)).collect();
            let pb: Vec<_> = lb.sectors().iter().map(|s| (s.position, s.stage)).collect();
            assert_eq!(pa, pb);
        }
    }

    #[test]
    fn test_critical_paths_registered() {
        let world = build_world(&WorldTemplateConfig::default()).unwrap();
        assert!(world
            .critical_paths_on(13)
            .any(|p| p.path_type == CriticalPathType::PassageToCamp));
        assert!(world
            .critical_paths_on(10)
            .any(|p| p.path_type == CriticalPathType::PassageToPassage));
    }

    #[test]
    fn test_invalid_configs() {
        let empty = WorldTemplateConfig {
            top_level: 3,
            bottom_level: 5,
            ..Default::default()
        };
        assert!(matches!(build_world(&empty), Err(GenerationError::EmptyLevelRange { .. })));
        let start = WorldTemplateConfig {
            start_level: 30,
            ..Default::default()
        };
        assert!(matches!(
            build_world(&start),
            Err(GenerationError::StartLevelOutOfRange { .. })
        ));
        let seed = WorldTemplateConfig {
            seed: -1,
            ..Default::default()
        };
        assert!(matches!(build_world(&seed), Err(GenerationError::InvalidSeed(-1))));
    }
}
