//! World / level / sector model threaded through every generation pass.
//!
//! The model is built once per run, mutated in place by the passes in order,
//! and handed off complete. Sectors are never removed.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BlockerType, CriticalPathType, Direction, FeatureKind, LocaleType, PassageType, SectorType,
    Stage, UncampableReason, Zone,
};

/// Grid position of a sector: level number plus x/y within the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub level: i32,
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(level: i32, x: i32, y: i32) -> Self {
        Self { level, x, y }
    }

    pub fn step(self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        Position::new(self.level, self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.level, self.x, self.y)
    }
}

/// Hazard severities, each 0–100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hazards {
    pub cold: u32,
    pub poison: u32,
    pub radiation: u32,
}

impl Hazards {
    pub fn has_hazards(&self) -> bool {
        self.cold > 0 || self.poison > 0 || self.radiation > 0
    }

    pub fn has_toxic(&self) -> bool {
        self.poison > 0 || self.radiation > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Food,
    Water,
    Metal,
    Rope,
    Fuel,
    Rubber,
    Medicine,
    Tools,
    Herbs,
}

/// Resource quantities of one sector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub food: u32,
    pub water: u32,
    pub metal: u32,
    pub rope: u32,
    pub fuel: u32,
    pub rubber: u32,
    pub medicine: u32,
    pub tools: u32,
    pub herbs: u32,
}

impl Resources {
    pub fn get(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Water => self.water,
            ResourceKind::Metal => self.metal,
            ResourceKind::Rope => self.rope,
            ResourceKind::Fuel => self.fuel,
            ResourceKind::Rubber => self.rubber,
            ResourceKind::Medicine => self.medicine,
            ResourceKind::Tools => self.tools,
            ResourceKind::Herbs => self.herbs,
        }
    }

    pub fn set(&mut self, kind: ResourceKind, amount: u32) {
        let slot = match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Water => &mut self.water,
            ResourceKind::Metal => &mut self.metal,
            ResourceKind::Rope => &mut self.rope,
            ResourceKind::Fuel => &mut self.fuel,
            ResourceKind::Rubber => &mut self.rubber,
            ResourceKind::Medicine => &mut self.medicine,
            ResourceKind::Tools => &mut self.tools,
            ResourceKind::Herbs => &mut self.herbs,
        };
        *slot = amount;
    }

    pub fn total(&self) -> u32 {
        self.food
            + self.water
            + self.metal
            + self.rope
            + self.fuel
            + self.rubber
            + self.medicine
            + self.tools
            + self.herbs
    }
}

/// Supplies the player must be carrying past a sector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredResources {
    pub water: bool,
    pub food: bool,
}

impl RequiredResources {
    pub fn any(&self) -> bool {
        self.water || self.food
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StashKind {
    Item,
    Cache,
}

/// One-time item cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stash {
    pub kind: StashKind,
    pub item_id: String,
    pub amount: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    pub locale_type: LocaleType,
    pub is_easy: bool,
    pub is_early: bool,
}

/// Two-sector encounter obstacle with its representative enemy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gang {
    pub pos1: Position,
    pub pos2: Position,
    pub enemy_id: Option<String>,
}

/// Enemy candidate as returned by the enemy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyCandidate {
    pub id: String,
    /// 0 (common) to 100 (very rare).
    pub rarity: u32,
    pub difficulty: u32,
}

/// Locale slot that carries a fixed enemy count.
///
/// Serialized as a plain string (`"Workshop"`, `"Passage:North"`) so it can
/// key a JSON map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum LocaleSlot {
    Workshop,
    Passage(Direction),
}

impl From<LocaleSlot> for String {
    fn from(slot: LocaleSlot) -> String {
        match slot {
            LocaleSlot::Workshop => "Workshop".to_string(),
            LocaleSlot::Passage(d) => format!("Passage:{:?}", d),
        }
    }
}

impl TryFrom<String> for LocaleSlot {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "Workshop" {
            return Ok(LocaleSlot::Workshop);
        }
        value
            .strip_prefix("Passage:")
            .and_then(|d| Direction::ALL.into_iter().find(|c| format!("{:?}", c) == d))
            .map(LocaleSlot::Passage)
            .ok_or_else(|| format!("unknown locale slot {}", value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sector {
    pub position: Position,
    pub stage: Stage,
    pub zone: Option<Zone>,
    pub sector_type: Option<SectorType>,
    pub sunlit: bool,
    pub is_camp: bool,
    pub is_passage_up: bool,
    pub is_passage_down: bool,
    pub passage_up_type: Option<PassageType>,
    pub passage_down_type: Option<PassageType>,
    pub wear: u8,
    pub damage: u8,
    pub building_density: u8,
    pub hazards: Hazards,
    pub resources_scavengeable: Resources,
    pub resources_collectable: Resources,
    pub has_spring: bool,
    pub stash: Option<Stash>,
    pub has_workshop: bool,
    pub workshop_resource: Option<ResourceKind>,
    pub required_resources: RequiredResources,
    pub critical_paths: Vec<CriticalPathType>,
    pub movement_blockers: BTreeMap<Direction, BlockerType>,
    pub locales: Vec<Locale>,
    pub possible_enemies: Vec<EnemyCandidate>,
    pub enemy_difficulty: u32,
    pub has_regular_enemies: bool,
    pub locale_enemies: BTreeMap<LocaleSlot, u32>,
    pub path_id: Option<usize>,
}

impl Sector {
    pub fn new(position: Position, stage: Stage) -> Self {
        Self {
            position,
            stage,
            zone: None,
            sector_type: None,
            sunlit: false,
            is_camp: false,
            is_passage_up: false,
            is_passage_down: false,
            passage_up_type: None,
            passage_down_type: None,
            wear: 0,
            damage: 0,
            building_density: 0,
            hazards: Hazards::default(),
            resources_scavengeable: Resources::default(),
            resources_collectable: Resources::default(),
            has_spring: false,
            stash: None,
            has_workshop: false,
            workshop_resource: None,
            required_resources: RequiredResources::default(),
            critical_paths: Vec::new(),
            movement_blockers: BTreeMap::new(),
            locales: Vec::new(),
            possible_enemies: Vec::new(),
            enemy_difficulty: 0,
            has_regular_enemies: false,
            locale_enemies: BTreeMap::new(),
            path_id: None,
        }
    }

    /// Assign a zone. A sector keeps the strongest zone it has seen: a zone
    /// of equal or lower priority than the current one never replaces it.
    /// A zone the sector's stage disallows is rejected unless `force` is set,
    /// in which case it is written and logged.
    pub fn set_zone(&mut self, zone: Zone, force: bool) -> bool {
        if let Some(existing) = self.zone {
            if existing.ordinal() <= zone.ordinal() {
                return false;
            }
        }
        if !self.stage.allows_zone(zone) {
            if !force {
                return false;
            }
            log::warn!(
                "incompatible zone forced at {}: stage {:?} zone {:?}",
                self.position,
                self.stage,
                zone
            );
        }
        self.zone = Some(zone);
        true
    }

    /// Assign the sector type once; later writes are ignored.
    pub fn set_sector_type(&mut self, sector_type: SectorType) -> bool {
        if self.sector_type.is_some() {
            return false;
        }
        self.sector_type = Some(sector_type);
        true
    }

    pub fn is_passage(&self) -> bool {
        self.is_passage_up || self.is_passage_down
    }

    pub fn has_water(&self) -> bool {
        self.resources_scavengeable.water > 0 || self.resources_collectable.water > 0 || self.has_spring
    }

    pub fn resources_all(&self) -> Resources {
        let s = &self.resources_scavengeable;
        let c = &self.resources_collectable;
        Resources {
            food: s.food + c.food,
            water: s.water + c.water,
            metal: s.metal + c.metal,
            rope: s.rope + c.rope,
            fuel: s.fuel + c.fuel,
            rubber: s.rubber + c.rubber,
            medicine: s.medicine + c.medicine,
            tools: s.tools + c.tools,
            herbs: s.herbs + c.herbs,
        }
    }

    pub fn is_on_critical_path(&self, path_type: CriticalPathType) -> bool {
        self.critical_paths.contains(&path_type)
    }

    pub fn is_on_early_critical_path(&self) -> bool {
        self.critical_paths.iter().any(|p| p.is_early())
    }

    pub fn add_critical_path(&mut self, path_type: CriticalPathType) {
        if !self.critical_paths.contains(&path_type) {
            self.critical_paths.push(path_type);
        }
    }

    pub fn blocker(&self, direction: Direction) -> Option<BlockerType> {
        self.movement_blockers.get(&direction).copied()
    }
}

/// Rectangular cross-level feature (holes, sea, mountain).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldFeature {
    pub kind: FeatureKind,
    pub min_level: i32,
    pub max_level: i32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WorldFeature {
    pub fn spans_level(&self, level: i32) -> bool {
        (self.min_level..=self.max_level).contains(&level)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.spans_level(pos.level)
            && pos.x >= self.x
            && pos.x < self.x + self.width
            && pos.y >= self.y
            && pos.y < self.y + self.height
    }

    /// Planar distance from the feature's rectangle to `pos`.
    pub fn distance_to(&self, pos: Position) -> f64 {
        let dx = (self.x - pos.x).max(pos.x - (self.x + self.width - 1)).max(0);
        let dy = (self.y - pos.y).max(pos.y - (self.y + self.height - 1)).max(0);
        f64::from(dx).hypot(f64::from(dy))
    }
}

/// A registered connectivity guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalPath {
    pub path_type: CriticalPathType,
    pub start: Position,
    pub end: Position,
    pub max_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "LevelRecord")]
pub struct Level {
    pub level: i32,
    /// Progression order of the level, 1 for the starting level.
    pub level_ordinal: u32,
    /// Progression order counted over campable levels.
    pub camp_ordinal: u32,
    pub is_campable: bool,
    pub uncampable_reason: Option<UncampableReason>,
    pub is_hard: bool,
    pub camp_positions: Vec<Position>,
    pub passage_up: Option<Position>,
    pub passage_down: Option<Position>,
    pub excursion_start: Option<Position>,
    pub sea_padding: i32,
    /// Traversal orders computed by the path pass.
    pub paths: Vec<Vec<Position>>,
    pub locale_sectors: Vec<Position>,
    pub gangs: Vec<Gang>,
    sectors: Vec<Sector>,
    #[serde(skip)]
    index: HashMap<(i32, i32), usize>,
}

/// Serialized form of a [`Level`]; the position index is rebuilt on load.
#[derive(Deserialize)]
struct LevelRecord {
    level: i32,
    level_ordinal: u32,
    camp_ordinal: u32,
    is_campable: bool,
    uncampable_reason: Option<UncampableReason>,
    is_hard: bool,
    camp_positions: Vec<Position>,
    passage_up: Option<Position>,
    passage_down: Option<Position>,
    excursion_start: Option<Position>,
    sea_padding: i32,
    paths: Vec<Vec<Position>>,
    locale_sectors: Vec<Position>,
    gangs: Vec<Gang>,
    sectors: Vec<Sector>,
}

impl From<LevelRecord> for Level {
    fn from(record: LevelRecord) -> Self {
        let mut level = Self {
            level: record.level,
            level_ordinal: record.level_ordinal,
            camp_ordinal: record.camp_ordinal,
            is_campable: record.is_campable,
            uncampable_reason: record.uncampable_reason,
            is_hard: record.is_hard,
            camp_positions: record.camp_positions,
            passage_up: record.passage_up,
            passage_down: record.passage_down,
            excursion_start: record.excursion_start,
            sea_padding: record.sea_padding,
            paths: record.paths,
            locale_sectors: record.locale_sectors,
            gangs: record.gangs,
            sectors: record.sectors,
            index: HashMap::new(),
        };
        level.reindex();
        level
    }
}

impl Level {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            level_ordinal: 1,
            camp_ordinal: 1,
            is_campable: true,
            uncampable_reason: None,
            is_hard: false,
            camp_positions: Vec::new(),
            passage_up: None,
            passage_down: None,
            excursion_start: None,
            sea_padding: 0,
            paths: Vec::new(),
            locale_sectors: Vec::new(),
            gangs: Vec::new(),
            sectors: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a sector. Positions are unique per level; adding an existing
    /// position returns the existing sector.
    pub fn add_sector(&mut self, x: i32, y: i32, stage: Stage) -> &mut Sector {
        let i = match self.index.get(&(x, y)) {
            Some(&i) => i,
            None => {
                self.sectors
                    .push(Sector::new(Position::new(self.level, x, y), stage));
                self.index.insert((x, y), self.sectors.len() - 1);
                self.sectors.len() - 1
            }
        };
        &mut self.sectors[i]
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn sectors_mut(&mut self) -> &mut [Sector] {
        &mut self.sectors
    }

    pub fn sector(&self, x: i32, y: i32) -> Option<&Sector> {
        self.index.get(&(x, y)).map(|&i| &self.sectors[i])
    }

    pub fn sector_mut(&mut self, x: i32, y: i32) -> Option<&mut Sector> {
        self.index.get(&(x, y)).map(|&i| &mut self.sectors[i])
    }

    pub fn sector_at(&self, pos: Position) -> Option<&Sector> {
        if pos.level != self.level {
            return None;
        }
        self.sector(pos.x, pos.y)
    }

    pub fn sector_at_mut(&mut self, pos: Position) -> Option<&mut Sector> {
        if pos.level != self.level {
            return None;
        }
        self.sector_mut(pos.x, pos.y)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.sector_at(pos).is_some()
    }

    /// Rebuild the position index, e.g. after deserializing.
    pub fn reindex(&mut self) {
        self.index = self
            .sectors
            .iter()
            .enumerate()
            .map(|(i, s)| ((s.position.x, s.position.y), i))
            .collect();
    }

    pub fn set_camp(&mut self, pos: Position) {
        if let Some(sector) = self.sector_at_mut(pos) {
            sector.is_camp = true;
            self.camp_positions.push(pos);
            if self.excursion_start.is_none() {
                self.excursion_start = Some(pos);
            }
        }
    }

    pub fn set_passage_up(&mut self, pos: Position) {
        if let Some(sector) = self.sector_at_mut(pos) {
            sector.is_passage_up = true;
            self.passage_up = Some(pos);
        }
    }

    pub fn set_passage_down(&mut self, pos: Position) {
        if let Some(sector) = self.sector_at_mut(pos) {
            sector.is_passage_down = true;
            self.passage_down = Some(pos);
        }
    }

    pub fn passage_positions(&self) -> Vec<Position> {
        self.passage_up.into_iter().chain(self.passage_down).collect()
    }

    pub fn camp_position(&self) -> Option<Position> {
        self.camp_positions.first().copied()
    }

    /// (min_x, max_x, min_y, max_y); all zero for an empty level.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        let mut iter = self.sectors.iter().map(|s| s.position);
        let Some(first) = iter.next() else {
            return (0, 0, 0, 0);
        };
        iter.fold((first.x, first.x, first.y, first.y), |(a, b, c, d), p| {
            (a.min(p.x), b.max(p.x), c.min(p.y), d.max(p.y))
        })
    }

    pub fn center(&self) -> (f64, f64) {
        let (min_x, max_x, min_y, max_y) = self.bounds();
        (
            f64::from(min_x + max_x) / 2.0,
            f64::from(min_y + max_y) / 2.0,
        )
    }

    /// Existing neighbours of `pos` in direction order.
    pub fn neighbour_positions(&self, pos: Position, allow_diagonal: bool) -> Vec<Position> {
        Direction::ALL
            .into_iter()
            .filter(|d| allow_diagonal || !d.is_diagonal())
            .map(|d| pos.step(d))
            .filter(|p| self.contains(*p))
            .collect()
    }

    pub fn sectors_by_stage(&self, stage: Stage) -> Vec<Position> {
        self.sectors
            .iter()
            .filter(|s| s.stage == stage)
            .map(|s| s.position)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub seed: i64,
    pub top_level: i32,
    pub bottom_level: i32,
    /// Level the player starts on; levels at or below it are explored going
    /// down, levels above it going up.
    pub start_level: i32,
    pub features: Vec<WorldFeature>,
    pub critical_paths: Vec<CriticalPath>,
    levels: BTreeMap<i32, Level>,
}

impl World {
    pub fn new(top_level: i32, bottom_level: i32, start_level: i32) -> Self {
        Self {
            seed: 0,
            top_level,
            bottom_level,
            start_level,
            features: Vec::new(),
            critical_paths: Vec::new(),
            levels: BTreeMap::new(),
        }
    }

    pub fn insert_level(&mut self, level: Level) {
        self.levels.insert(level.level, level);
    }

    pub fn level(&self, level: i32) -> Option<&Level> {
        self.levels.get(&level)
    }

    pub fn level_mut(&mut self, level: i32) -> Option<&mut Level> {
        self.levels.get_mut(&level)
    }

    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.levels.values().rev()
    }

    /// Level numbers from top to bottom.
    pub fn level_numbers(&self) -> Vec<i32> {
        self.levels.keys().rev().copied().collect()
    }

    pub fn sector(&self, pos: Position) -> Option<&Sector> {
        self.levels.get(&pos.level)?.sector_at(pos)
    }

    pub fn sector_mut(&mut self, pos: Position) -> Option<&mut Sector> {
        self.levels.get_mut(&pos.level)?.sector_at_mut(pos)
    }

    pub fn is_going_down(&self, level: i32) -> bool {
        level <= self.start_level && level >= self.bottom_level
    }

    pub fn features_at(&self, pos: Position) -> impl Iterator<Item = &WorldFeature> {
        self.features.iter().filter(move |f| f.contains(pos))
    }

    pub fn features_of_kind(&self, kind: FeatureKind) -> impl Iterator<Item = &WorldFeature> {
        self.features.iter().filter(move |f| f.kind == kind)
    }

    pub fn is_hole(&self, pos: Position) -> bool {
        self.features_at(pos).next().is_some()
    }

    pub fn critical_paths_on(&self, level: i32) -> impl Iterator<Item = &CriticalPath> {
        self.critical_paths
            .iter()
            .filter(move |p| p.start.level == level)
    }

    /// Level whose camp ordinal matches, preferring campable levels.
    pub fn level_for_camp_ordinal(&self, camp_ordinal: u32) -> Option<i32> {
        self.levels
            .values()
            .filter(|l| l.camp_ordinal == camp_ordinal)
            .max_by_key(|l| (l.is_campable, std::cmp::Reverse(l.level_ordinal)))
            .map(|l| l.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_keeps_strongest() {
        let mut s = Sector::new(Position::new(1, 0, 0), Stage::Early);
        assert!(s.set_zone(Zone::Poi1, false));
        assert!(!s.set_zone(Zone::Poi1, false));
        assert!(!s.set_zone(Zone::ExtraUncampable, true));
        assert!(s.set_zone(Zone::Entrance, false));
        assert_eq!(s.zone, Some(Zone::Entrance));
    }

    #[test]
    fn test_zone_stage_check_and_force() {
        let mut s = Sector::new(Position::new(1, 0, 0), Stage::Early);
        assert!(!s.set_zone(Zone::Poi2, false));
        assert_eq!(s.zone, None);
        assert!(s.set_zone(Zone::Poi2, true));
        assert_eq!(s.zone, Some(Zone::Poi2));
    }

    #[test]
    fn test_sector_type_write_once() {
        let mut s = Sector::new(Position::new(1, 0, 0), Stage::Late);
        assert!(s.set_sector_type(SectorType::Slum));
        assert!(!s.set_sector_type(SectorType::Public));
        assert_eq!(s.sector_type, Some(SectorType::Slum));
    }

    #[test]
    fn test_level_add_and_lookup() {
        let mut level = Level::new(3);
        level.add_sector(0, 0, Stage::Early);
        level.add_sector(1, 0, Stage::Late);
        level.add_sector(0, 0, Stage::Late);
        assert_eq!(level.sectors().len(), 2);
        assert_eq!(level.sector(0, 0).unwrap().stage, Stage::Early);
        assert!(level.sector_at(Position::new(4, 0, 0)).is_none());
        assert_eq!(level.bounds(), (0, 1, 0, 0));
        assert_eq!(level.neighbour_positions(Position::new(3, 0, 0), true).len(), 1);
    }

    #[test]
    fn test_feature_distance() {
        let f = WorldFeature {
            kind: FeatureKind::HoleSea,
            min_level: 1,
            max_level: 5,
            x: 0,
            y: 0,
            width: 2,
            height: 2,
        };
        assert!(f.contains(Position::new(2, 1, 1)));
        assert!(!f.contains(Position::new(6, 1, 1)));
        assert_eq!(f.distance_to(Position::new(2, 1, 1)), 0.0);
        assert_eq!(f.distance_to(Position::new(2, 4, 1)), 3.0);
    }

    #[test]
    fn test_locale_slots_key_json_maps() {
        let mut s = Sector::new(Position::new(1, 0, 0), Stage::Early);
        s.locale_enemies.insert(LocaleSlot::Workshop, 3);
        s.locale_enemies.insert(LocaleSlot::Passage(Direction::SouthWest), 3);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"Passage:SouthWest\":3"));
        let back: Sector = serde_json::from_str(&json).unwrap();
        assert_eq!(back.locale_enemies, s.locale_enemies);
        assert!(LocaleSlot::try_from("Passage:Up".to_string()).is_err());
    }

    #[test]
    fn test_loaded_world_finds_sectors() {
        let mut world = World::new(2, 1, 2);
        let mut level = Level::new(2);
        level.add_sector(0, 0, Stage::Early);
        level.add_sector(-1, 0, Stage::Late);
        level.set_camp(Position::new(2, 0, 0));
        world.insert_level(level);
        let json = serde_json::to_string(&world).unwrap();
        let back: World = serde_json::from_str(&json).unwrap();
        assert!(back.sector(Position::new(2, 0, 0)).unwrap().is_camp);
        assert_eq!(back.sector(Position::new(2, -1, 0)).unwrap().stage, Stage::Late);
        assert!(back.sector(Position::new(2, 1, 0)).is_none());

        let mut level = back.level(2).unwrap().clone();
        level.add_sector(0, 0, Stage::Late);
        assert_eq!(level.sectors().len(), 2);
    }

    #[test]
    fn test_world_levels_top_down() {
        let mut world = World::new(3, 1, 2);
        for l in 1..=3 {
            world.insert_level(Level::new(l));
        }
        assert_eq!(world.level_numbers(), vec![3, 2, 1]);
        assert!(world.is_going_down(2));
        assert!(!world.is_going_down(3));
    }
}
