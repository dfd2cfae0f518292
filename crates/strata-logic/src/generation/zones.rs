//! Zone assignment.

use crate::constants::{Stage, Zone};
use crate::model::{Position, World};
use crate::pathfinding::{distance_map, find_path};
use crate::spatial::{closest_point, voronoi_points};

use super::{travel_passages, PassContext};

/// Label every sector of level `l` with a zone.
pub(super) fn generate_zones(ctx: &PassContext<'_>, world: &mut World, l: i32) {
    let Some(level) = world.level(l) else { return };
    let is_campable = level.is_campable;
    let camp = level.camp_position();
    let (passage1, passage2) = travel_passages(world, l);
    let entrance_area = if l == world.start_level + 1 { 4 } else { 2 };

    if let Some(p1) = passage1 {
        set_area_zone(world, p1, Zone::Entrance, entrance_area, 2);
    }

    match (is_campable, camp) {
        (true, Some(camp)) => {
            if l != world.start_level {
                if let Some(p1) = passage1 {
                    set_area_zone(world, p1, Zone::PassageToCamp, 3, 1);
                    set_area_zone(world, camp, Zone::PassageToCamp, 3, 1);
                    let path = find_path(world, p1, camp, false, true, Some(Stage::Early));
                    set_path_zone(world, &path, Zone::PassageToCamp, 2, 1);
                }
            }
            if let Some(p2) = passage2 {
                let path = find_path(world, camp, p2, false, true, None);
                set_path_zone(world, &path, Zone::CampToPassage, 1, 1);
            }
            let points = voronoi_points(ctx.seed, world, l);
            if let Some(level) = world.level_mut(l) {
                for sector in level.sectors_mut() {
                    if let Some(point) = closest_point(sector.position, &points) {
                        let zone = point.label.zone_for(sector.stage);
                        sector.set_zone(zone, false);
                    }
                }
            }
        }
        _ => {
            if let Some(p1) = passage1 {
                set_area_zone(world, p1, Zone::PassageToPassage, 6, 2);
                if let Some(p2) = passage2 {
                    let path = find_path(world, p1, p2, false, true, None);
                    set_path_zone(world, &path, Zone::PassageToPassage, 2, 1);
                }
            }
            if let Some(level) = world.level_mut(l) {
                for sector in level.sectors_mut() {
                    sector.set_zone(Zone::ExtraUncampable, true);
                }
            }
        }
    }

    let fallback = if is_campable {
        Zone::ExtraCampable
    } else {
        Zone::ExtraUncampable
    };
    let mut unlabeled = 0;
    if let Some(level) = world.level_mut(l) {
        for sector in level.sectors_mut().iter_mut().filter(|s| s.zone.is_none()) {
            sector.set_zone(fallback, true);
            unlabeled += 1;
        }
    }
    if unlabeled > 0 {
        log::warn!("level {}: {} sectors had no zone, set to {:?}", l, unlabeled, fallback);
    }
    log::info!("level {}: zones assigned", l);
}

/// Set `zone` on `center` and every sector within `area - 1` walking steps
/// of it. Sectors closer than `force_area` steps are forced.
fn set_area_zone(world: &mut World, center: Position, zone: Zone, area: usize, force_area: usize) {
    let d = area.saturating_sub(1);
    let distances = distance_map(world, center, false, true, None);
    let Some(level) = world.level_mut(center.level) else {
        return;
    };
    if let Some(sector) = level.sector_at_mut(center) {
        sector.set_zone(zone, force_area > 0);
    }
    let d_i32 = d as i32;
    for x in center.x - d_i32..=center.x + d_i32 {
        for y in center.y - d_i32..=center.y + d_i32 {
            let pos = Position::new(center.level, x, y);
            let Some(&steps) = distances.get(&pos) else {
                continue;
            };
            if steps > d || steps == 0 {
                continue;
            }
            if let Some(sector) = level.sector_at_mut(pos) {
                sector.set_zone(zone, force_area > steps);
            }
        }
    }
}

fn set_path_zone(world: &mut World, path: &[Position], zone: Zone, area: usize, force_area: usize) {
    for pos in path {
        set_area_zone(world, *pos, zone, area, force_area);
    }
}
