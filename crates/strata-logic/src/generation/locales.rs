//! Locale placement.
//!
//! Fixed locales first (trading partners, the grove), then the blueprint
//! locales of campable levels. Every blueprint locale registers a critical
//! path back to the camp.

use crate::constants::{CriticalPathType, LocaleType, SectorType, Zone};
use crate::model::{Locale, Position, World};
use crate::random::{random_sector, random_sectors, salt, sample, sample_int, PathConstraint, SectorFilter};
use crate::spatial::add_critical_path;
use crate::tables::BlueprintKind;

use super::{sector_salt, PassContext};

const SALT_PARTNER: i64 = 0x7472_6164;
const SALT_GROVE: i64 = 0x6772_6f76;
const SALT_LOCALE_COUNT: i64 = 0x6c63_6e74;
const SALT_LOCALE_SECTOR: i64 = 0x6c73_6563;
const SALT_LOCALE_TYPE: i64 = 0x6c74_7970;

/// A sector holds at most this many blueprint locales.
const MAX_LOCALES_PER_SECTOR: usize = 2;

pub(super) fn generate_locales(ctx: &PassContext<'_>, world: &mut World, l: i32) {
    // trading partners
    for (i, partner) in ctx.tables.trade.trading_partners().iter().enumerate() {
        if world.level_for_camp_ordinal(partner.camp_ordinal) != Some(l) {
            continue;
        }
        let s = salt(&[ctx.seed, SALT_PARTNER, i as i64]);
        let Some(pos) = random_sector(s, world, l, false) else { continue };
        add_locale(world, pos, Locale {
            locale_type: LocaleType::TradingPartner,
            is_easy: true,
            is_early: false,
        });
        log::debug!("trading partner {} at {}", partner.name, pos);
    }

    // grove
    if l == world.bottom_level {
        let s = salt(&[ctx.seed, SALT_GROVE, i64::from(l)]);
        if let Some(pos) = random_sector(s, world, l, true) {
            if let Some(sector) = world.sector_mut(pos) {
                sector.sunlit = true;
            }
            add_locale(world, pos, Locale {
                locale_type: LocaleType::Grove,
                is_easy: true,
                is_early: false,
            });
        }
    }

    let Some(level) = world.level(l) else { return };
    if !level.is_campable {
        return;
    }
    let camp_ordinal = level.camp_ordinal;
    for kind in [BlueprintKind::Early, BlueprintKind::Late] {
        let pieces = ctx.tables.progression.blueprint_piece_count(camp_ordinal, kind);
        if pieces == 0 {
            log::warn!("level {}: no {:?} blueprints for camp ordinal {}", l, kind, camp_ordinal);
            continue;
        }
        let min = pieces as usize;
        let max = min + 2;
        let count_salt = salt(&[ctx.seed, SALT_LOCALE_COUNT, i64::from(l), kind as i64]);
        let count = sample_int(count_salt, min as i64, max as i64 + 1) as usize;
        create_locales(ctx, world, l, kind == BlueprintKind::Early, count, min);
    }

    let total = world.level(l).map_or(0, |lv| lv.locale_sectors.len());
    log::info!("level {}: {} locales", l, total);
}

fn create_locales(ctx: &PassContext<'_>, world: &mut World, l: i32, is_early: bool, count: usize, count_easy: usize) {
    let Some(level) = world.level(l) else { return };
    let path_type = if is_early {
        CriticalPathType::CampToPoi1
    } else {
        CriticalPathType::CampToPoi2
    };
    let max_length = path_type.max_length(level.camp_ordinal);
    let constraints: Vec<PathConstraint> = level
        .camp_positions
        .iter()
        .map(|camp| PathConstraint {
            start: *camp,
            max_length,
            path_type,
        })
        .collect();
    let excluded_zones = if is_early {
        vec![Zone::Poi2, Zone::ExtraCampable, Zone::CampToPassage]
    } else {
        vec![Zone::PassageToCamp, Zone::Poi1, Zone::ExtraCampable]
    };
    let filter = SectorFilter {
        excluded_zones,
        path_constraints: constraints.clone(),
        max_locales: Some(MAX_LOCALES_PER_SECTOR),
        ..SectorFilter::excluding_camp()
    };

    for i in 0..count {
        let s = salt(&[ctx.seed, SALT_LOCALE_SECTOR, i64::from(l), i64::from(is_early), i as i64]);
        let Some(pos) = random_sectors(s, world, l, 1, 2, &filter).into_iter().next() else {
            log::debug!("level {}: no sector for locale {} (early: {})", l, i, is_early);
            continue;
        };
        let Some(sector_type) = world.sector(pos).and_then(|s| s.sector_type) else {
            log::warn!("locale sector {} has no sector type, skipped", pos);
            continue;
        };
        let r = sample(sector_salt(ctx.seed, SALT_LOCALE_TYPE, pos) ^ i as i64);
        let locale_type = locale_type(r, sector_type, l >= world.top_level - 1, is_early);
        add_locale(world, pos, Locale {
            locale_type,
            is_easy: i <= count_easy,
            is_early,
        });
        for constraint in &constraints {
            add_critical_path(world, pos, constraint.start, path_type);
        }
    }
}

fn add_locale(world: &mut World, pos: Position, locale: Locale) {
    let Some(level) = world.level_mut(pos.level) else { return };
    let Some(sector) = level.sector_at_mut(pos) else { return };
    sector.locales.push(locale);
    if !level.locale_sectors.contains(&pos) {
        level.locale_sectors.push(pos);
    }
}

/// Locale type for a sample `r` in a sector of `sector_type`. Hermits are
/// never early, and neither are commercial caravans: their rungs fall
/// through to the next one.
fn locale_type(r: f64, sector_type: SectorType, near_top: bool, is_early: bool) -> LocaleType {
    use LocaleType::*;
    if near_top && r < 0.25 {
        return Lab;
    }
    let late_only: &[LocaleType] = match sector_type {
        SectorType::Commercial => &[Hermit, Caravan],
        _ => &[Hermit],
    };
    let allowed = |t: LocaleType| !is_early || !late_only.contains(&t);
    let ladder: &[(f64, LocaleType)] = match sector_type {
        SectorType::Residential => &[
            (0.7, House),
            (0.6, Transport),
            (0.55, Sewer),
            (0.45, Warehouse),
            (0.4, Camp),
            (0.3, Hut),
            (0.2, Hermit),
            (0.1, Caravan),
            (0.0, Market),
        ],
        SectorType::Industrial => &[
            (0.5, Factory),
            (0.3, Warehouse),
            (0.2, Transport),
            (0.1, Sewer),
            (0.0, Market),
        ],
        SectorType::Maintenance => &[
            (0.6, Maintenance),
            (0.4, Transport),
            (0.3, Hermit),
            (0.2, Caravan),
            (0.0, Sewer),
        ],
        SectorType::Commercial => &[
            (0.6, Market),
            (0.4, Warehouse),
            (0.3, Transport),
            (0.25, Hut),
            (0.2, Hermit),
            (0.15, Caravan),
            (0.0, House),
        ],
        SectorType::Slum => &[
            (0.4, House),
            (0.35, Camp),
            (0.3, Hut),
            (0.25, Hermit),
            (0.0, Sewer),
        ],
        SectorType::Public => &[(0.6, Library), (0.3, Transport), (0.0, Lab)],
    };
    ladder
        .iter()
        .find(|(threshold, t)| r >= *threshold && allowed(*t))
        .or_else(|| ladder.last())
        .map_or(House, |(_, t)| *t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::test_support::*;
    use crate::generation::{hazards, paths, sectors, stashes, workshops, zones};
    use crate::pathfinding::{path_distance, PathQuery};

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
            generate_locales(&ctx, world, l);
        }
    }

    #[test]
    fn test_campable_levels_get_blueprint_locales() {
        let mut world = small_world(61);
        run(&mut world, 61);
        let tables = tables();
        for level in world.levels().filter(|lv| lv.is_campable) {
            let early = tables
                .collaborators()
                .progression
                .blueprint_piece_count(level.camp_ordinal, BlueprintKind::Early);
            let count = level
                .sectors()
                .iter()
                .flat_map(|s| &s.locales)
                .filter(|loc| loc.is_early)
                .count();
            if early > 0 {
                assert!(count >= 1, "level {} has no early locales", level.level);
            }
        }
    }

    #[test]
    fn test_locales_within_reach_of_camp() {
        let mut world = small_world(62);
        run(&mut world, 62);
        for level in world.levels().filter(|lv| lv.is_campable) {
            let camp = level.camp_position().unwrap();
            for s in level.sectors() {
                for locale in &s.locales {
                    if matches!(locale.locale_type, LocaleType::TradingPartner | LocaleType::Grove) {
                        continue;
                    }
                    let path_type = if locale.is_early {
                        CriticalPathType::CampToPoi1
                    } else {
                        CriticalPathType::CampToPoi2
                    };
                    let d = path_distance(&world, camp, s.position, PathQuery::WALK).unwrap();
                    assert!(d <= path_type.max_length(level.camp_ordinal));
                    assert!(s.is_on_critical_path(path_type));
                    assert!(!s.is_camp);
                    assert!(s.locales.len() <= MAX_LOCALES_PER_SECTOR + 1);
                }
            }
        }
    }

    #[test]
    fn test_grove_is_sunlit_on_bottom_level() {
        let mut world = small_world(63);
        run(&mut world, 63);
        let bottom = world.level(world.bottom_level).unwrap();
        let groves: Vec<_> = bottom
            .sectors()
            .iter()
            .filter(|s| s.locales.iter().any(|l| l.locale_type == LocaleType::Grove))
            .collect();
        assert_eq!(groves.len(), 1);
        assert!(groves[0].sunlit);
    }

    #[test]
    fn test_early_locales_skip_late_only_types() {
        for sector_type in [
            SectorType::Residential,
            SectorType::Industrial,
            SectorType::Maintenance,
            SectorType::Commercial,
            SectorType::Slum,
            SectorType::Public,
        ] {
            for i in 0..100 {
                let t = locale_type(f64::from(i) / 100.0, sector_type, false, true);
                assert_ne!(t, LocaleType::Hermit, "{:?}", sector_type);
                if sector_type == SectorType::Commercial {
                    assert_ne!(t, LocaleType::Caravan);
                }
            }
        }
        assert_eq!(locale_type(0.1, SectorType::Slum, true, false), LocaleType::Lab);
    }

    #[test]
    fn test_early_caravans_outside_commercial() {
        assert_eq!(locale_type(0.25, SectorType::Residential, false, true), LocaleType::Caravan);
        assert_eq!(locale_type(0.15, SectorType::Residential, false, true), LocaleType::Caravan);
        assert_eq!(locale_type(0.35, SectorType::Maintenance, false, true), LocaleType::Caravan);
        assert_eq!(locale_type(0.25, SectorType::Maintenance, false, false), LocaleType::Caravan);
        assert_eq!(locale_type(0.35, SectorType::Maintenance, false, false), LocaleType::Hermit);
        assert_eq!(locale_type(0.17, SectorType::Commercial, false, true), LocaleType::House);
        assert_eq!(locale_type(0.17, SectorType::Commercial, false, false), LocaleType::Caravan);
    }
}
