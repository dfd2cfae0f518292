//! Workshop placement: one refinery on the fuel camp's level and one on the
//! bottom level, close enough to the camp to count as a first point of
//! interest.

use crate::constants::{CriticalPathType, CAMP_ORDINAL_FUEL};
use crate::model::{ResourceKind, World};
use crate::random::{random_sectors, salt, PathConstraint, SectorFilter};
use crate::spatial::add_critical_path;

use super::PassContext;

const SALT_WORKSHOP: i64 = 0x776f_726b;

pub(super) fn generate_workshops(ctx: &PassContext<'_>, world: &mut World, l: i32) {
    let Some(level) = world.level(l) else { return };
    let mut resource = None;
    if level.is_campable && level.camp_ordinal == CAMP_ORDINAL_FUEL {
        resource = Some(ResourceKind::Fuel);
    }
    if l == world.bottom_level {
        resource = Some(ResourceKind::Rubber);
    }
    let Some(resource) = resource else { return };

    let path_type = CriticalPathType::CampToPoi1;
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
    let filter = SectorFilter {
        path_constraints: constraints.clone(),
        ..SectorFilter::excluding_camp()
    };
    let picked = random_sectors(salt(&[ctx.seed, SALT_WORKSHOP, i64::from(l)]), world, l, 1, 2, &filter);
    if picked.is_empty() {
        log::warn!("level {}: no sector for the {:?} workshop", l, resource);
        return;
    }

    for pos in picked {
        if let Some(sector) = world.sector_mut(pos) {
            sector.has_workshop = true;
            sector.workshop_resource = Some(resource);
        }
        for constraint in &constraints {
            add_critical_path(world, pos, constraint.start, path_type);
        }
        log::info!("level {}: {:?} workshop at {}", l, resource, pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::test_support::*;
    use crate::generation::zones::generate_zones;
    use crate::pathfinding::{path_distance, PathQuery};

    #[test]
    fn test_bottom_level_gets_rubber_workshop_near_camp() {
        let tables = tables();
        let config = config();
        let ctx = PassContext {
            seed: 31,
            tables: tables.collaborators(),
            config: &config,
        };
        let mut world = small_world(31);
        let bottom = world.bottom_level;
        generate_zones(&ctx, &mut world, bottom);
        generate_workshops(&ctx, &mut world, bottom);

        let level = world.level(bottom).unwrap();
        let workshops: Vec<_> = level.sectors().iter().filter(|s| s.has_workshop).collect();
        assert_eq!(workshops.len(), 1);
        let workshop = workshops[0];
        assert_eq!(workshop.workshop_resource, Some(ResourceKind::Rubber));
        assert!(!workshop.is_camp);
        assert!(workshop.is_on_critical_path(CriticalPathType::CampToPoi1));

        let camp = level.camp_position().unwrap();
        let d = path_distance(&world, camp, workshop.position, PathQuery::WALK).unwrap();
        assert!(d <= CriticalPathType::CampToPoi1.max_length(level.camp_ordinal));
    }

    #[test]
    fn test_ordinary_level_has_no_workshop() {
        let tables = tables();
        let config = config();
        let ctx = PassContext {
            seed: 32,
            tables: tables.collaborators(),
            config: &config,
        };
        let mut world = small_world(32);
        generate_workshops(&ctx, &mut world, 13);
        assert!(world.level(13).unwrap().sectors().iter().all(|s| !s.has_workshop));
    }
}
