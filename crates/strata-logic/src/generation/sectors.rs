//! Per-sector features: type, texture, sunlight, passage types and resources.
//!
//! Features of one sector are generated in this order:
//!   1. sector type          -- by level band
//!   2. texture              -- wear, damage, building density
//!   3. sunlight             -- needs wear and damage, and the level above
//!   4. passage types        -- the passage up copies the level above
//!   5. resources            -- needs type, wear, sunlight, hazards and workshops

use crate::constants::{FeatureKind, PassageType, SectorType, CAMP_ORDINAL_LIMIT, UPGRADE_UNLOCK_ELEVATOR};
use crate::model::{Position, Resources, Sector, World};
use crate::random::{salt, sample, sample_int};

use super::{sector_salt, PassContext};

const SALT_TYPE: i64 = 0x7479_7065;
const SALT_WEAR: i64 = 0x7765_6172;
const SALT_LEVEL_DENSITY: i64 = 0x6c64_656e;
const SALT_DENSITY: i64 = 0x6465_6e73;
const SALT_PASSAGE: i64 = 0x7061_7373;
const SALT_ABUNDANCE: i64 = 0x6162_756e;
const SALT_SCA_WATER: i64 = 0x7377_6174;
const SALT_SCA_FOOD: i64 = 0x7366_6f6f;
const SALT_ROPE: i64 = 0x726f_7065;
const SALT_MEDICINE: i64 = 0x6d65_6469;
const SALT_TOOLS: i64 = 0x746f_6f6c;
const SALT_FUEL: i64 = 0x6675_656c;
const SALT_RUBBER: i64 = 0x7275_6262;
const SALT_NATURE: i64 = 0x6e61_7475;
const SALT_COL_WATER: i64 = 0x6377_6174;
const SALT_SPRING: i64 = 0x7370_7269;
const SALT_HERBS: i64 = 0x6865_7262;

/// Wear at or above which an open ceiling lets light through.
const SUNLIT_WEAR: u8 = 8;
/// Damage at or above which an open ceiling lets light through.
const SUNLIT_DAMAGE: u8 = 5;

/// Level facts shared by every sector of the level.
struct LevelFacts {
    level: i32,
    top: i32,
    bottom: i32,
    start: i32,
    camp_ordinal: u32,
    is_campable: bool,
    sea_padding: i32,
    level_density: f64,
    elevator_ordinal: Option<u32>,
}

pub(super) fn generate_sector_features(ctx: &PassContext<'_>, world: &mut World, l: i32) {
    let Some(level) = world.level(l) else { return };
    let facts = LevelFacts {
        level: l,
        top: world.top_level,
        bottom: world.bottom_level,
        start: world.start_level,
        camp_ordinal: level.camp_ordinal,
        is_campable: level.is_campable,
        sea_padding: level.sea_padding,
        level_density: level_density(ctx.seed, world, l),
        elevator_ordinal: ctx
            .tables
            .progression
            .minimum_camp_ordinal_for_upgrade(UPGRADE_UNLOCK_ELEVATOR),
    };
    let positions: Vec<Position> = level.sectors().iter().map(|s| s.position).collect();

    for pos in positions {
        // type and texture only read the sector itself and the features
        let damage = feature_damage(world, pos);
        let Some(sector) = world.sector_mut(pos) else { continue };
        sector.set_sector_type(sector_type(ctx.seed, &facts, pos));
        generate_texture(ctx.seed, &facts, sector, damage);

        let sunlit = is_sunlit(world, &facts, pos);
        let passage_up_type = passage_up_type(world, pos);
        let Some(sector) = world.sector_mut(pos) else { continue };
        sector.sunlit = sunlit;
        if sector.is_passage_down {
            sector.passage_down_type = Some(passage_down_type(ctx.seed, &facts, pos));
        }
        if sector.is_passage_up {
            sector.passage_up_type = passage_up_type;
            if passage_up_type.is_none() {
                log::warn!("passage up at {} has nothing to connect to", pos);
            }
        }
        generate_resources(ctx.seed, &facts, sector);
    }

    let lit = world
        .level(l)
        .map_or(0, |lv| lv.sectors().iter().filter(|s| s.sunlit).count());
    log::info!("level {}: sector features generated, {} sunlit", l, lit);
}

// ── Type ──

fn sector_type(seed: i64, facts: &LevelFacts, pos: Position) -> SectorType {
    use SectorType::*;
    let r = sample(sector_salt(seed, SALT_TYPE, pos));
    let l = facts.level;
    // each ladder lists (threshold, type); the last threshold the sample is
    // below decides, falling back to the first entry
    let ladder: &[(f64, SectorType)] = if l == facts.top {
        &[(1.0, Commercial), (0.6, Public), (0.4, Residential), (0.05, Maintenance)]
    } else if l > facts.top - 4 {
        &[(1.0, Commercial), (0.7, Public), (0.5, Residential), (0.05, Maintenance)]
    } else if l > facts.top - 8 {
        &[
            (1.0, Industrial),
            (0.7, Commercial),
            (0.65, Public),
            (0.5, Maintenance),
            (0.4, Residential),
            (0.2, Slum),
        ]
    } else if l > facts.start + 1 {
        &[
            (1.0, Maintenance),
            (0.75, Public),
            (0.7, Industrial),
            (0.5, Residential),
            (0.4, Slum),
        ]
    } else if l == facts.start + 1 {
        &[(1.0, Industrial), (0.35, Slum), (0.25, Maintenance)]
    } else if l > facts.bottom + 3 {
        &[
            (1.0, Slum),
            (0.5, Industrial),
            (0.4, Maintenance),
            (0.3, Residential),
            (0.2, Commercial),
            (0.1, Public),
        ]
    } else if l > facts.bottom {
        &[
            (1.0, Slum),
            (0.9, Industrial),
            (0.8, Maintenance),
            (0.6, Residential),
            (0.4, Commercial),
            (0.2, Public),
        ]
    } else {
        &[
            (1.0, Maintenance),
            (0.8, Industrial),
            (0.6, Residential),
            (0.4, Commercial),
            (0.2, Public),
        ]
    };
    ladder
        .iter()
        .filter(|(threshold, _)| r < *threshold)
        .last()
        .map_or(Maintenance, |(_, t)| *t)
}

// ── Texture ──

fn level_density(seed: i64, world: &World, l: i32) -> f64 {
    let top = world.top_level;
    let bottom = world.bottom_level;
    if l == top || l == top - 1 {
        5.0
    } else if l == top - 2 {
        7.0
    } else if l == top - 3 || l == world.start_level + 1 {
        8.0
    } else if l == bottom + 1 {
        6.0
    } else if l == bottom {
        3.0
    } else {
        (sample(salt(&[seed, SALT_LEVEL_DENSITY, i64::from(l)])) * 10.0).clamp(2.0, 9.0)
    }
}

/// Strongest structural damage any feature inflicts on `pos`, fading by two
/// per sector of distance.
fn feature_damage(world: &World, pos: Position) -> i32 {
    world
        .features
        .iter()
        .filter(|f| f.spans_level(pos.level))
        .map(|f| f.kind.damage() - (f.distance_to(pos) * 2.0).round() as i32)
        .max()
        .unwrap_or(0)
        .max(0)
}

fn generate_texture(seed: i64, facts: &LevelFacts, sector: &mut Sector, feature_damage: i32) {
    let pos = sector.position;
    let depth = f64::from(facts.top - facts.level) / f64::from((facts.top - facts.bottom).max(1));
    let level_wear = (depth * 8.0).clamp(0.0, 10.0);
    let jitter = sample_int(sector_salt(seed, SALT_WEAR, pos), -3, 3) as f64;
    let mut wear = level_wear + jitter;
    if sector.is_camp {
        wear = wear.min(3.0);
    }
    sector.wear = wear.round().clamp(0.0, 10.0) as u8;

    let mut damage = feature_damage;
    if sector.is_camp {
        damage = damage.min(3);
    }
    if facts.level == facts.start + 1 {
        damage = damage.max(3);
    }
    sector.damage = damage.clamp(0, 10) as u8;

    let (min, max) = sector.sector_type.map_or((0, 10), SectorType::density_range);
    let random = if sector.is_camp {
        5
    } else {
        sample_int(sector_salt(seed, SALT_DENSITY, pos), i64::from(min), i64::from(max) + 1) as u8
    };
    let density = (facts.level_density + f64::from(random)) / 2.0;
    sector.building_density = (density.round() as u8).clamp(min, max);
}

// ── Sunlight ──

/// Whether daylight reaches `pos`.
///
/// The top level is open sky and the start level is sealed. Elsewhere a
/// sector is lit when it lies in a hole, when a worn or damaged ceiling
/// opens onto a hole or a lit sector on some level above it (scanning one
/// level at a time), or when it borders the sea.
fn is_sunlit(world: &World, facts: &LevelFacts, pos: Position) -> bool {
    if facts.level == facts.top {
        return true;
    }
    if facts.level == facts.start {
        return false;
    }
    if world.is_hole(pos) {
        return true;
    }
    let Some(sector) = world.sector(pos) else {
        return false;
    };
    let open_ceiling = sector.wear >= SUNLIT_WEAR || sector.damage >= SUNLIT_DAMAGE;
    for above in facts.level + 1..=facts.top {
        let pos_above = Position::new(above, pos.x, pos.y);
        if world.is_hole(pos_above) {
            return true;
        }
        let Some(sector_above) = world.sector(pos_above) else {
            break;
        };
        if !open_ceiling {
            break;
        }
        if sector_above.sunlit {
            return true;
        }
    }
    let sea = world
        .features_of_kind(FeatureKind::HoleSea)
        .find(|f| f.spans_level(facts.level));
    sea.is_some_and(|sea| sea.distance_to(pos) <= f64::from(1 + facts.sea_padding))
}

// ── Passages ──

fn passage_down_type(seed: i64, facts: &LevelFacts, pos: Position) -> PassageType {
    let co = facts.camp_ordinal;
    if facts.level == facts.start {
        return PassageType::Stairwell;
    }
    if co > CAMP_ORDINAL_LIMIT {
        return PassageType::Blocked;
    }
    if facts.level == facts.start + 1 {
        return PassageType::Hole;
    }
    if facts.is_campable && Some(co) == facts.elevator_ordinal {
        return PassageType::Elevator;
    }
    let mut available = vec![PassageType::Stairwell];
    if facts.elevator_ordinal.is_some_and(|unlock| co >= unlock) {
        available.push(PassageType::Elevator);
    }
    if facts.level > facts.start + 1 {
        available.push(PassageType::Hole);
    }
    let index = sample_int(sector_salt(seed, SALT_PASSAGE, pos), 0, available.len() as i64) as usize;
    available[index]
}

/// The passage up leads to the passage down of the level above, so it has
/// the same type.
fn passage_up_type(world: &World, pos: Position) -> Option<PassageType> {
    world
        .sector(Position::new(pos.level + 1, pos.x, pos.y))
        .and_then(|above| above.passage_down_type)
}

// ── Resources ──

fn generate_resources(seed: i64, facts: &LevelFacts, sector: &mut Sector) {
    let pos = sector.position;
    let r = |tag: i64| sample(sector_salt(seed, tag, pos));
    let wear = f64::from(sector.wear);
    let co = facts.camp_ordinal;
    let l = facts.level;

    // scavengeable
    let abundance = r(SALT_ABUNDANCE);
    let water_part = r(SALT_SCA_WATER) * (5.0 - wear).abs() / 5.0;
    let found_food = (abundance * 5.0 + wear / 2.0).round() as u32;
    let mut sca = Resources::default();
    match sector.sector_type {
        Some(SectorType::Residential) => {
            sca.metal = 3;
            sca.food = if r(SALT_SCA_FOOD) < 0.6 { found_food } else { 0 };
            sca.water = if water_part > 0.82 { 2 } else { 0 };
            sca.rope = u32::from(r(SALT_ROPE) > 0.95);
            sca.medicine = u32::from(co > 2 && r(SALT_MEDICINE) > 0.99);
        }
        Some(SectorType::Industrial) => {
            sca.water = u32::from(water_part > 0.9);
            sca.metal = 8;
            sca.tools = u32::from(l > facts.start && r(SALT_TOOLS) > 0.95);
            sca.rope = u32::from(r(SALT_ROPE) > 0.9);
            sca.fuel = u32::from(r(SALT_FUEL) > 0.9);
            sca.rubber = u32::from(r(SALT_RUBBER) > 0.9);
        }
        Some(SectorType::Maintenance) => {
            sca.metal = 10;
            sca.rope = u32::from(r(SALT_ROPE) > 0.9);
            sca.fuel = u32::from(r(SALT_FUEL) > 0.9);
            sca.tools = u32::from(l > facts.start && r(SALT_TOOLS) > 0.9);
        }
        Some(SectorType::Commercial) => {
            sca.water = if water_part > 0.85 { 2 } else { 0 };
            sca.metal = 2;
            sca.food = (abundance * 10.0).round() as u32;
            sca.medicine = u32::from(co > 2 && r(SALT_MEDICINE) > 0.99);
        }
        Some(SectorType::Slum) => {
            sca.metal = 7;
            sca.food = if r(SALT_SCA_FOOD) < 0.2 { found_food } else { 0 };
            sca.water = u32::from(water_part > 0.75);
            sca.rope = u32::from(r(SALT_ROPE) > 0.85);
            sca.fuel = u32::from(r(SALT_FUEL) > 0.95);
        }
        Some(SectorType::Public) | None => {}
    }

    // collectable
    let centralness = (20.0 - f64::from(pos.x.abs()) / 10.0 - f64::from(pos.y.abs()) / 10.0) / 2.0;
    let nature = r(SALT_NATURE) * wear / 10.0;
    let water_factor = r(SALT_COL_WATER) * (centralness + 10.0) / 25.0;
    let collect = |threshold: f64, factor: f64| -> u32 {
        if nature > threshold {
            (nature * factor).round() as u32
        } else {
            0
        }
    };
    let collect_water = |threshold: f64, factor: f64| -> u32 {
        if water_factor > threshold {
            (water_factor * factor).min(10.0).round() as u32
        } else {
            0
        }
    };
    let mut col = Resources::default();
    match sector.sector_type {
        Some(SectorType::Residential | SectorType::Commercial) => {
            col.food = collect(0.2, 10.0);
            col.water = collect_water(0.75, 10.0);
        }
        Some(SectorType::Industrial | SectorType::Maintenance) => {
            col.food = collect(0.4, 8.0);
            col.water = collect_water(0.95, 11.0);
        }
        Some(SectorType::Slum) => {
            col.food = collect(0.1, 10.0);
            col.water = collect_water(0.9, 8.0);
        }
        Some(SectorType::Public) | None => {}
    }

    sector.has_spring = (col.water > 0 || sca.water > 0) && r(SALT_SPRING) < 0.25;

    if let Some(resource) = sector.workshop_resource {
        sca.set(resource, sca.get(resource).max(3));
    }

    // ground levels grow things
    let herb_roll = r(SALT_HERBS);
    if l == facts.bottom {
        col.food = if col.food > 0 { col.food + 2 } else { 0 };
        col.water = if col.water > 0 { col.water + 3 } else { 0 };
        sca.herbs = (herb_roll * (10.0 - wear)) as u32;
    } else if l == facts.bottom + 1 {
        col.food = if col.food > 0 { col.food + 1 } else { 0 };
        col.water = if col.water > 0 { col.water + 1 } else { 0 };
        sca.herbs = (herb_roll * (10.0 - wear) / 2.0) as u32;
    }
    if sector.sunlit && herb_roll > 0.75 {
        sca.herbs = sca.herbs.max(3);
    }

    if sector.hazards.has_toxic() {
        col.food = 0;
        col.water = 0;
    }

    if sector.required_resources.water {
        col.water = col.water.max(3);
    }
    if sector.required_resources.food {
        sca.food = sca.food.max(3);
    }

    if sca.food <= 2 {
        sca.food = 0;
    }
    sca.herbs = if sca.herbs > 2 { sca.herbs.min(10) } else { 0 };

    sector.resources_scavengeable = sca;
    sector.resources_collectable = col;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::test_support::*;
    use crate::generation::{hazards, paths, stashes, workshops, zones};

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
            let level_paths = paths::generate_paths(world, l);
            for (i, path) in level_paths.iter().enumerate() {
                paths::generate_required_resources(&ctx, world, l, i, path);
            }
            generate_sector_features(&ctx, world, l);
        }
    }

    #[test]
    fn test_every_sector_typed_and_in_range() {
        let mut world = small_world(51);
        run(&mut world, 51);
        for level in world.levels() {
            for s in level.sectors() {
                assert!(s.sector_type.is_some());
                assert!(s.wear <= 10 && s.damage <= 10 && s.building_density <= 10);
                let (min, max) = s.sector_type.unwrap().density_range();
                assert!((min..=max).contains(&s.building_density));
            }
        }
    }

    #[test]
    fn test_top_level_lit_and_start_level_dark() {
        let mut world = small_world(52);
        run(&mut world, 52);
        assert!(world.level(15).unwrap().sectors().iter().all(|s| s.sunlit));
        assert!(world.level(13).unwrap().sectors().iter().all(|s| !s.sunlit));
    }

    #[test]
    fn test_passage_types_match_across_levels() {
        let mut world = small_world(53);
        run(&mut world, 53);
        for level in world.levels() {
            if let Some(up) = level.passage_up {
                let sector = world.sector(up).unwrap();
                let above = world.level(level.level + 1).unwrap();
                let down = world.sector(above.passage_down.unwrap()).unwrap();
                assert_eq!(sector.passage_up_type, down.passage_down_type);
                assert!(sector.passage_up_type.is_some());
            }
        }
        let start_down = world.level(13).unwrap().passage_down.unwrap();
        assert_eq!(world.sector(start_down).unwrap().passage_down_type, Some(PassageType::Stairwell));
        let below_top = world.level(14).unwrap().passage_down.unwrap();
        assert_eq!(world.sector(below_top).unwrap().passage_down_type, Some(PassageType::Hole));
    }

    #[test]
    fn test_resource_floors_and_hazard_rules() {
        let mut world = small_world(54);
        run(&mut world, 54);
        for level in world.levels() {
            for s in level.sectors() {
                if s.required_resources.water {
                    assert!(s.resources_collectable.water >= 3);
                }
                if s.required_resources.food {
                    assert!(s.resources_scavengeable.food >= 3);
                }
                if s.hazards.has_toxic() && !s.required_resources.any() {
                    assert_eq!(s.resources_collectable.food, 0);
                    assert_eq!(s.resources_collectable.water, 0);
                }
                let food = s.resources_scavengeable.food;
                assert!(food == 0 || food > 2);
                if let Some(resource) = s.workshop_resource {
                    assert!(s.resources_scavengeable.get(resource) >= 3);
                }
            }
        }
    }

    #[test]
    fn test_camp_texture_is_mild() {
        let mut world = small_world(55);
        run(&mut world, 55);
        for level in world.levels() {
            for camp in &level.camp_positions {
                let s = world.sector(*camp).unwrap();
                assert!(s.wear <= 3);
                assert_eq!(s.building_density, {
                    let (min, max) = s.sector_type.unwrap().density_range();
                    let density = (level_density(55, &world, level.level) + 5.0) / 2.0;
                    (density.round() as u8).clamp(min, max)
                });
            }
        }
    }
}
