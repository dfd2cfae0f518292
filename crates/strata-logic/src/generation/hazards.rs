//! Hazard placement.
//!
//! Cold covers the outskirts of most levels. Poison and radiation come in
//! circular clusters on deeper levels, or as near-uniform coverage on levels
//! that are uncampable because of pollution or radiation. A sector never
//! carries cold together with poison or radiation; cold wins.

use std::collections::HashSet;

use crate::constants::{
    CriticalPathType, UncampableReason, Zone, MIN_LEVEL_ORDINAL_HAZARD_POISON,
    MIN_LEVEL_ORDINAL_HAZARD_RADIATION, TOWER_RADIUS,
};
use crate::model::{Position, Sector, World};
use crate::random::{random_sectors, salt, sample, sample_bool, sample_chance, sample_int, SectorFilter};
use crate::spatial::{border_sectors, distance, distance_to_camp, protected_sectors, quick_distance_to_camp};
use crate::tables::HazardKind;

use super::{sector_salt, PassContext};

const SALT_COLD: i64 = 0x636f_6c64;
const SALT_CLUSTERS: i64 = 0x636c_7573;
const SALT_CLUSTER_RADIUS: i64 = 0x6372_6164;
const SALT_DUSTING: i64 = 0x6475_7374;
const SALT_BORDER: i64 = 0x6264_7279;
const SALT_COVERAGE: i64 = 0x636f_7672;

/// Border clusters stay this many steps away from the camp.
const BORDER_CLUSTER_MIN_CAMP_DISTANCE: usize = 2;

/// Level facts every hazard decision needs.
struct HazardLevel {
    level: i32,
    level_ordinal: u32,
    camp_ordinal: u32,
    is_hard: bool,
    protected: HashSet<Position>,
}

impl HazardLevel {
    fn max_value(&self, ctx: &PassContext<'_>, kind: HazardKind, zone: Zone) -> u32 {
        ctx.tables
            .balancing
            .max_hazard(kind, self.camp_ordinal, zone.camp_step(), self.is_hard)
            .min(100)
    }

    fn min_value(&self, ctx: &PassContext<'_>, kind: HazardKind, zone: Zone) -> u32 {
        ctx.tables
            .balancing
            .min_hazard(kind, self.camp_ordinal, zone.camp_step(), self.is_hard)
    }
}

pub(super) fn generate_hazards(ctx: &PassContext<'_>, world: &mut World, l: i32) {
    let Some(level) = world.level(l) else { return };
    let info = HazardLevel {
        level: l,
        level_ordinal: level.level_ordinal,
        camp_ordinal: level.camp_ordinal,
        is_hard: level.is_hard,
        protected: protected_sectors(world, l),
    };
    let reason = level.uncampable_reason;
    let is_campable = level.is_campable;

    if l != world.start_level + 1 {
        place_cold(ctx, world, &info);
    }

    match reason {
        Some(UncampableReason::Pollution) => cover_level(ctx, world, &info, false),
        Some(UncampableReason::Radiation) => cover_level(ctx, world, &info, true),
        _ => place_clusters(ctx, world, &info, is_campable),
    }

    let hazardous = world
        .level(l)
        .map_or(0, |lv| lv.sectors().iter().filter(|s| s.hazards.has_hazards()).count());
    log::info!("level {}: {} hazardous sectors", l, hazardous);
}

// ── Cold ──

fn place_cold(ctx: &PassContext<'_>, world: &mut World, info: &HazardLevel) {
    let Some(level) = world.level(info.level) else { return };
    let (min_x, max_x, min_y, max_y) = level.bounds();
    let is_top = info.level == world.top_level;
    let camp_clearance = if info.level == world.start_level { 6.0 } else { 3.0 };

    let mut values = Vec::new();
    for sector in level.sectors() {
        let pos = sector.position;
        if sector.is_camp || info.protected.contains(&pos) {
            continue;
        }
        if sector.is_on_critical_path(CriticalPathType::PassageToCamp) {
            continue;
        }
        if pos.x.abs() <= 2 && pos.y.abs() <= 2 {
            continue;
        }
        if quick_distance_to_camp(level, pos) < camp_clearance {
            continue;
        }
        let Some(zone) = sector.zone else { continue };
        let max = info.max_value(ctx, HazardKind::Cold, zone);
        if max < 5 {
            continue;
        }

        let early = zone.is_early() || sector.is_on_early_critical_path();
        let (edge_threshold, center_threshold) = if early {
            (7, TOWER_RADIUS + 2)
        } else {
            (5, TOWER_RADIUS)
        };
        let to_edge = (pos.x - min_x)
            .min(max_x - pos.x)
            .min(pos.y - min_y)
            .min(max_y - pos.y);
        let exposed = is_top
            || to_edge < edge_threshold
            || pos.x.abs() > center_threshold
            || pos.y.abs() > center_threshold;
        if !exposed {
            continue;
        }

        let min = info.min_value(ctx, HazardKind::Cold, zone).min(max - 1).max(1);
        let raw = (sample(sector_salt(ctx.seed, SALT_COLD, pos)) * 100.0) as u32;
        let value = raw.clamp(min, max) / 5 * 5;
        if value > 0 {
            values.push((pos, value));
        }
    }

    for (pos, value) in values {
        if let Some(sector) = world.sector_mut(pos) {
            sector.hazards.cold = value;
            sector.hazards.poison = 0;
            sector.hazards.radiation = 0;
        }
    }
}

// ── Poison and radiation ──

fn place_clusters(ctx: &PassContext<'_>, world: &mut World, info: &HazardLevel, is_campable: bool) {
    let min_ordinal = MIN_LEVEL_ORDINAL_HAZARD_POISON.min(MIN_LEVEL_ORDINAL_HAZARD_RADIATION);
    if info.level_ordinal < min_ordinal {
        return;
    }
    let l = i64::from(info.level);
    let can_radiate = info.level_ordinal >= MIN_LEVEL_ORDINAL_HAZARD_RADIATION;

    // random clusters
    let sector_count = world.level(info.level).map_or(0, |lv| lv.sectors().len());
    let max_clusters = (ctx.config.max_hazard_clusters as f64)
        .min(sector_count as f64 / 100.0)
        .round() as usize;
    let filter = SectorFilter {
        excluded_zones: vec![Zone::PassageToCamp],
        ..SectorFilter::excluding_camp()
    };
    let centers = random_sectors(
        salt(&[ctx.seed, SALT_CLUSTERS, l]),
        world,
        info.level,
        0,
        max_clusters,
        &filter,
    );
    for (i, center) in centers.into_iter().enumerate() {
        let cluster_salt = salt(&[ctx.seed, SALT_CLUSTERS, l, i as i64]);
        let radius = (sample(salt(&[cluster_salt, SALT_CLUSTER_RADIUS])) * 7.0).round() as i32 + 2;
        make_cluster(ctx, world, info, center, radius, cluster_salt);
    }

    if !is_campable {
        return;
    }

    // light dusting over the extra zone
    let dust_radiation = can_radiate && sample_bool(salt(&[ctx.seed, SALT_DUSTING, l]));
    let kind = if dust_radiation {
        HazardKind::Radiation
    } else {
        HazardKind::Poison
    };
    let dusted: Vec<Position> = world.level(info.level).map_or_else(Vec::new, |lv| {
        lv.sectors()
            .iter()
            .filter(|s| s.zone == Some(Zone::ExtraCampable))
            .filter(|s| !s.is_camp && !info.protected.contains(&s.position))
            .map(|s| s.position)
            .collect()
    });
    for pos in dusted {
        if let Some(sector) = world.sector_mut(pos) {
            set_toxic_hazard(ctx, info, sector, kind, 0.0);
        }
    }

    // frontier clusters just outside the passage-to-camp zone
    let pairs = world
        .level(info.level)
        .map_or_else(Vec::new, |lv| border_sectors(lv, Zone::PassageToCamp, true));
    for (i, pair) in pairs.into_iter().enumerate() {
        let far_enough = distance_to_camp(world, pair.neighbour)
            .is_some_and(|d| d > BORDER_CLUSTER_MIN_CAMP_DISTANCE);
        if !far_enough {
            continue;
        }
        let border_salt = salt(&[ctx.seed, SALT_BORDER, l, i as i64]);
        if !sample_chance(border_salt, ctx.config.border_hazard_frequency) {
            continue;
        }
        let radius = sample_int(salt(&[border_salt, SALT_CLUSTER_RADIUS]), 1, 3) as i32;
        make_cluster(ctx, world, info, pair.neighbour, radius, border_salt);
    }
}

/// Spread one hazard over the sectors within `radius` of `center`. The
/// cluster does not reach into zones earlier than the center's own.
fn make_cluster(
    ctx: &PassContext<'_>,
    world: &mut World,
    info: &HazardLevel,
    center: Position,
    radius: i32,
    cluster_salt: i64,
) {
    let can_radiate = info.level_ordinal >= MIN_LEVEL_ORDINAL_HAZARD_RADIATION;
    let kind = if can_radiate && sample(cluster_salt) > 0.5 {
        HazardKind::Radiation
    } else {
        HazardKind::Poison
    };
    let strength = sample(salt(&[cluster_salt, 1]));

    let Some(level) = world.level(info.level) else { return };
    let Some(center_zone) = level.sector_at(center).and_then(|s| s.zone) else {
        return;
    };
    let mut targets = Vec::new();
    for x in center.x - radius..=center.x + radius {
        for y in center.y - radius..=center.y + radius {
            let pos = Position::new(info.level, x, y);
            if distance(center, pos) > f64::from(radius) {
                continue;
            }
            let Some(sector) = level.sector_at(pos) else { continue };
            if sector.is_camp || info.protected.contains(&pos) {
                continue;
            }
            if sector.zone.is_some_and(|z| z.is_earlier_than(center_zone)) {
                continue;
            }
            targets.push(pos);
        }
    }
    log::debug!("{:?} cluster at {} radius {}: {} sectors", kind, center, radius, targets.len());

    for pos in targets {
        if let Some(sector) = world.sector_mut(pos) {
            set_toxic_hazard(ctx, info, sector, kind, strength);
        }
    }
}

/// Write a poison or radiation value scaled by `strength` in `[0, 1]`.
fn set_toxic_hazard(ctx: &PassContext<'_>, info: &HazardLevel, sector: &mut Sector, kind: HazardKind, strength: f64) {
    if sector.hazards.cold > 0 {
        return;
    }
    let Some(zone) = sector.zone else { return };
    let max = info.max_value(ctx, kind, zone);
    if max < 5 {
        return;
    }
    let min = (max * 2 / 3).min(20);
    let raw = f64::from(min) + strength * f64::from(max - min);
    let value = ((raw / 5.0).ceil() as u32 * 5).min(max / 5 * 5);
    apply_toxic(sector, kind, value);
}

/// Near-uniform coverage of a polluted or radiated level.
fn cover_level(ctx: &PassContext<'_>, world: &mut World, info: &HazardLevel, is_radiation: bool) {
    let kind = if is_radiation {
        HazardKind::Radiation
    } else {
        HazardKind::Poison
    };
    let Some(level) = world.level_mut(info.level) else { return };
    for sector in level.sectors_mut() {
        if sector.zone == Some(Zone::Entrance) || sector.is_camp || sector.hazards.cold > 0 {
            continue;
        }
        if info.protected.contains(&sector.position) {
            continue;
        }
        let Some(zone) = sector.zone else { continue };
        let max = info.max_value(ctx, kind, zone);
        let min = if info.is_hard { max } else { max / 2 };
        let r = sample(sector_salt(ctx.seed, SALT_COVERAGE, sector.position));
        let value = (f64::from(min) + r * f64::from(max - min)).round() as u32 / 5 * 5;
        apply_toxic(sector, kind, value);
    }
}

fn apply_toxic(sector: &mut Sector, kind: HazardKind, value: u32) {
    if value == 0 {
        return;
    }
    match kind {
        HazardKind::Poison => sector.hazards.poison = value,
        HazardKind::Radiation => sector.hazards.radiation = value,
        HazardKind::Cold => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::test_support::*;
    use crate::generation::zones::generate_zones;

    fn run(world: &mut World, seed: i64) {
        let tables = tables();
        let config = config();
        let ctx = PassContext {
            seed,
            tables: tables.collaborators(),
            config: &config,
        };
        for l in world.level_numbers() {
            generate_zones(&ctx, world, l);
            generate_hazards(&ctx, world, l);
        }
    }

    #[test]
    fn test_preset_cold_blocks_toxic_hazards() {
        let mut world = small_world(8);
        let target = world
            .level(12)
            .unwrap()
            .sectors()
            .iter()
            .find(|s| s.position.x.abs() > 2 && !s.is_passage())
            .unwrap()
            .position;
        world.sector_mut(target).unwrap().hazards.cold = 20;
        run(&mut world, 8);
        let sector = world.sector(target).unwrap();
        assert!(sector.hazards.cold > 0);
        assert_eq!(sector.hazards.poison, 0);
        assert_eq!(sector.hazards.radiation, 0);
    }

    #[test]
    fn test_polluted_level_is_covered() {
        let mut world = small_world(8);
        run(&mut world, 8);
        let level = world.level(12).unwrap();
        let poisoned = level.sectors().iter().filter(|s| s.hazards.poison > 0).count();
        assert!(poisoned > level.sectors().len() / 4, "only {} poisoned", poisoned);
        assert!(level
            .sectors()
            .iter()
            .filter(|s| s.zone == Some(Zone::Entrance))
            .all(|s| !s.hazards.has_toxic()));
    }

    #[test]
    fn test_hazards_are_exclusive_and_stepped() {
        for seed in [1, 2, 3] {
            let mut world = small_world(seed);
            run(&mut world, seed);
            for level in world.levels() {
                for s in level.sectors() {
                    let h = s.hazards;
                    assert!(!(h.cold > 0 && h.has_toxic()), "cold and toxic at {}", s.position);
                    for v in [h.cold, h.poison, h.radiation] {
                        assert!(v <= 100);
                        assert_eq!(v % 5, 0, "{} at {}", v, s.position);
                    }
                }
            }
        }
    }

    #[test]
    fn test_camp_surroundings_stay_clear() {
        for seed in [4, 5, 6] {
            let mut world = small_world(seed);
            run(&mut world, seed);
            for l in world.level_numbers() {
                for pos in protected_sectors(&world, l) {
                    let sector = world.sector(pos).unwrap();
                    assert!(!sector.hazards.has_hazards(), "hazard at {}", pos);
                }
            }
        }
    }
}
