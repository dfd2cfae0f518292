//! Stash placement.
//!
//! Each item category draws its own small set of sectors. A sector picked
//! twice keeps the stash written last.

use crate::constants::{CampStep, Zone};
use crate::model::{Stash, StashKind, World};
use crate::random::{random_sectors, salt, SectorFilter};
use crate::spatial::protected_sectors;

use super::PassContext;

const SALT_LOCKPICK: i64 = 0x6c6f_636b;
const SALT_HAIRPIN: i64 = 0x6861_6972;
const SALT_CRAFTABLE: i64 = 0x6372_6166;
const SALT_EQUIPMENT: i64 = 0x6571_7570;
const SALT_FILLER: i64 = 0x6669_6c6c;
const SALT_METAL_1: i64 = 0x6d65_7431;
const SALT_METAL_2: i64 = 0x6d65_7432;

const LATE_ZONES: [Zone; 2] = [Zone::Poi2, Zone::ExtraCampable];

const ITEM_LOCKPICK: &str = "exploration_1";
const ITEM_HAIRPIN: &str = "res_hairpin";
const ITEM_METAL_CACHE_1: &str = "cache_metal_1";
const ITEM_METAL_CACHE_2: &str = "cache_metal_2";

/// One category of stashes to place.
struct StashRequest {
    salt: i64,
    kind: StashKind,
    item_id: String,
    count: usize,
    amount: u32,
    excluded_zones: &'static [Zone],
}

impl StashRequest {
    fn new(salt: i64, kind: StashKind, item_id: impl Into<String>, count: usize, amount: u32) -> Self {
        Self {
            salt,
            kind,
            item_id: item_id.into(),
            count,
            amount,
            excluded_zones: &[],
        }
    }

    fn excluding(mut self, zones: &'static [Zone]) -> Self {
        self.excluded_zones = zones;
        self
    }
}

pub(super) fn generate_stashes(ctx: &PassContext<'_>, world: &mut World, l: i32) {
    let Some(level) = world.level(l) else { return };
    let is_campable = level.is_campable;
    let camp_ordinal = level.camp_ordinal;
    let is_hard = level.is_hard;
    let is_start = l == world.start_level;
    let balancing = ctx.tables.balancing;
    let level_salt = |tag: i64, i: usize| salt(&[ctx.seed, tag, i64::from(l), i as i64]);
    let mut requests = Vec::new();

    // lockpick and hairpins
    if is_start {
        requests.push(
            StashRequest::new(level_salt(SALT_LOCKPICK, 0), StashKind::Item, ITEM_LOCKPICK, 1, 1)
                .excluding(&LATE_ZONES),
        );
    }
    let hairpin_stashes = if is_start || !is_campable { 5 } else { 2 };
    requests.push(StashRequest::new(
        level_salt(SALT_HAIRPIN, 0),
        StashKind::Item,
        ITEM_HAIRPIN,
        hairpin_stashes,
        3,
    ));

    // ingredients for the equipment this camp needs
    if is_campable {
        let equipment = balancing.required_equipment(camp_ordinal, CampStep::End, is_hard);
        let ingredients = balancing.ingredients_to_craft(&equipment);
        let n = (ingredients.len() / 2).clamp(1, 3);
        for (i, ingredient) in ingredients.iter().take(n).enumerate() {
            requests.push(StashRequest::new(
                level_salt(SALT_CRAFTABLE, i),
                StashKind::Item,
                ingredient.id.as_str(),
                2,
                (ingredient.amount / 3).clamp(3, 10),
            ));
        }
    }

    // equipment that cannot be crafted
    for (i, item) in balancing.new_equipment(camp_ordinal).iter().enumerate() {
        if item.craftable || item.scavenge_rarity > 5 {
            continue;
        }
        requests.push(
            StashRequest::new(level_salt(SALT_EQUIPMENT, i), StashKind::Item, item.id.as_str(), 1, 1)
                .excluding(&LATE_ZONES),
        );
    }

    // filler ingredient on uncampable levels
    if !is_campable {
        let all = balancing.ingredients();
        if !all.is_empty() {
            let index = (ctx.seed.rem_euclid(i64::from(l).abs() + 5) + 3) as usize % all.len();
            requests.push(StashRequest::new(
                level_salt(SALT_FILLER, 0),
                StashKind::Item,
                all[index].as_str(),
                2,
                3,
            ));
        }
    }

    // metal caches
    if is_start {
        for (tag, item) in [(SALT_METAL_1, ITEM_METAL_CACHE_1), (SALT_METAL_2, ITEM_METAL_CACHE_2)] {
            requests.push(StashRequest::new(level_salt(tag, 0), StashKind::Cache, item, 2, 1).excluding(&LATE_ZONES));
        }
    } else {
        let (tag, item) = if l.rem_euclid(2) == 0 {
            (SALT_METAL_1, ITEM_METAL_CACHE_1)
        } else {
            (SALT_METAL_2, ITEM_METAL_CACHE_2)
        };
        requests.push(StashRequest::new(level_salt(tag, 0), StashKind::Cache, item, 1, 1));
    }

    let protected = protected_sectors(world, l);
    let mut placed = 0;
    for request in &requests {
        let item_id = &request.item_id;
        let filter = SectorFilter {
            excluded_zones: request.excluded_zones.to_vec(),
            avoid: protected.clone(),
            ..SectorFilter::excluding_camp()
        };
        let sectors = random_sectors(request.salt, world, l, request.count, request.count + 1, &filter);
        if sectors.len() < request.count {
            log::debug!(
                "level {}: only {} of {} sectors for {} stashes",
                l,
                sectors.len(),
                request.count,
                item_id
            );
        }
        for pos in sectors {
            if let Some(sector) = world.sector_mut(pos) {
                if let Some(previous) = &sector.stash {
                    log::debug!("stash {} at {} replaced by {}", previous.item_id, pos, item_id);
                }
                sector.stash = Some(Stash {
                    kind: request.kind,
                    item_id: item_id.clone(),
                    amount: request.amount,
                });
                placed += 1;
            }
        }
    }
    log::info!("level {}: {} stashes placed", l, placed);
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
            generate_stashes(&ctx, world, l);
        }
    }

    #[test]
    fn test_start_level_gets_lockpick_and_caches() {
        let mut world = small_world(21);
        run(&mut world, 21);
        let level = world.level(13).unwrap();
        let items: Vec<&str> = level
            .sectors()
            .iter()
            .filter_map(|s| s.stash.as_ref())
            .map(|s| s.item_id.as_str())
            .collect();
        assert!(items.contains(&ITEM_METAL_CACHE_2) || items.contains(&ITEM_METAL_CACHE_1));
        assert!(items.contains(&ITEM_HAIRPIN));
    }

    #[test]
    fn test_late_items_avoid_late_zones() {
        let mut world = small_world(22);
        run(&mut world, 22);
        for level in world.levels() {
            for s in level.sectors() {
                if let Some(stash) = &s.stash {
                    if stash.item_id == ITEM_LOCKPICK {
                        assert!(!LATE_ZONES.contains(&s.zone.unwrap()));
                    }
                }
            }
        }
    }

    #[test]
    fn test_no_stash_on_protected_sectors() {
        for seed in [23, 24] {
            let mut world = small_world(seed);
            run(&mut world, seed);
            for l in world.level_numbers() {
                for pos in protected_sectors(&world, l) {
                    assert!(world.sector(pos).unwrap().stash.is_none(), "stash at {}", pos);
                }
            }
        }
    }
}
