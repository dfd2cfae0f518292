//! World taxonomy: zones, stages, critical path types and sector kinds.
//!
//! Plain enums with no model dependency. Every pass and the simtest harness
//! share these, so their orderings and helper tables live in one place.

use serde::{Deserialize, Serialize};

/// Radius (in sectors) of the central "tower" area that stays free of cold
/// hazard on most levels.
pub const TOWER_RADIUS: i32 = 5;

/// First level ordinal on which poison clusters may appear.
pub const MIN_LEVEL_ORDINAL_HAZARD_POISON: u32 = 6;

/// First level ordinal on which radiation clusters may appear.
pub const MIN_LEVEL_ORDINAL_HAZARD_RADIATION: u32 = 9;

/// Camp ordinal whose level gets the fuel refinery.
pub const CAMP_ORDINAL_FUEL: u32 = 4;

/// Passages down from levels beyond this camp ordinal are blocked.
pub const CAMP_ORDINAL_LIMIT: u32 = 15;

/// Upgrade that unlocks elevator passages.
pub const UPGRADE_UNLOCK_ELEVATOR: &str = "unlock_building_passage_elevator";

/// Coarse progression/role label applied to every sector.
///
/// Declaration order is priority order: a zone earlier in the list wins over
/// any zone after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    Entrance,
    PassageToCamp,
    PassageToPassage,
    Poi1,
    Poi2,
    CampToPassage,
    ExtraCampable,
    ExtraUncampable,
}

impl Zone {
    pub const ALL: [Zone; 8] = [
        Zone::Entrance,
        Zone::PassageToCamp,
        Zone::PassageToPassage,
        Zone::Poi1,
        Zone::Poi2,
        Zone::CampToPassage,
        Zone::ExtraCampable,
        Zone::ExtraUncampable,
    ];

    /// Priority index; lower is stronger.
    pub fn ordinal(self) -> u8 {
        match self {
            Zone::Entrance => 1,
            Zone::PassageToCamp => 2,
            Zone::PassageToPassage => 3,
            Zone::Poi1 => 4,
            Zone::Poi2 => 5,
            Zone::CampToPassage => 6,
            Zone::ExtraCampable => 7,
            Zone::ExtraUncampable => 8,
        }
    }

    /// Whether `self` comes earlier in progression than `other`.
    pub fn is_earlier_than(self, other: Zone) -> bool {
        self.ordinal() < other.ordinal()
    }

    /// Progression step used to query the balancing tables.
    pub fn camp_step(self) -> CampStep {
        match self {
            Zone::Entrance | Zone::PassageToCamp | Zone::PassageToPassage => CampStep::Start,
            Zone::Poi1 => CampStep::Poi1,
            Zone::Poi2 | Zone::CampToPassage => CampStep::Poi2,
            Zone::ExtraCampable | Zone::ExtraUncampable => CampStep::End,
        }
    }

    /// Zones reached early in a level's progression.
    pub fn is_early(self) -> bool {
        matches!(self, Zone::PassageToCamp | Zone::PassageToPassage)
    }
}

/// Progression stage of a sector, fixed before generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Early,
    Late,
}

impl Stage {
    /// Structural compatibility between a sector's stage and a zone.
    pub fn allows_zone(self, zone: Zone) -> bool {
        match self {
            Stage::Early => zone != Zone::Poi2,
            Stage::Late => !matches!(zone, Zone::PassageToCamp | Zone::Poi1),
        }
    }
}

/// Step along a level's progression curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CampStep {
    Start = 1,
    Poi1 = 2,
    Poi2 = 3,
    End = 4,
}

/// Named connectivity guarantee between two anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CriticalPathType {
    PassageToCamp,
    PassageToPassage,
    CampToPoi1,
    CampToPoi2,
    CampToPassage,
}

impl CriticalPathType {
    /// Paths the player walks before the level's first upgrades.
    pub fn is_early(self) -> bool {
        matches!(
            self,
            CriticalPathType::PassageToCamp
                | CriticalPathType::PassageToPassage
                | CriticalPathType::CampToPoi1
        )
    }

    /// Maximum allowed length of this path type at a camp ordinal.
    pub fn max_length(self, camp_ordinal: u32) -> usize {
        let base = match self {
            CriticalPathType::PassageToCamp => 12,
            CriticalPathType::CampToPoi1 => 10,
            CriticalPathType::CampToPoi2 => 16,
            CriticalPathType::CampToPassage => 18,
            CriticalPathType::PassageToPassage => 24,
        };
        base + (camp_ordinal / 3) as usize
    }
}

/// Critical paths gangs may be placed across.
pub const GANG_ALLOWED_CRITICAL_PATHS: [CriticalPathType; 3] = [
    CriticalPathType::CampToPoi1,
    CriticalPathType::CampToPoi2,
    CriticalPathType::CampToPassage,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectorType {
    Residential,
    Industrial,
    Maintenance,
    Commercial,
    Public,
    Slum,
}

impl SectorType {
    /// Inclusive building density range.
    pub fn density_range(self) -> (u8, u8) {
        match self {
            SectorType::Residential => (2, 8),
            SectorType::Industrial => (1, 10),
            SectorType::Maintenance => (2, 10),
            SectorType::Commercial => (1, 10),
            SectorType::Public => (0, 7),
            SectorType::Slum => (3, 10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockerType {
    Debris,
    Gap,
    WasteToxic,
    WasteRadioactive,
    Gang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassageType {
    Hole,
    Stairwell,
    Elevator,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocaleType {
    House,
    Lab,
    Transport,
    Sewer,
    Warehouse,
    Camp,
    Hut,
    Hermit,
    Caravan,
    Market,
    Factory,
    Maintenance,
    Library,
    TradingPartner,
    Grove,
}

/// Why a level cannot host a camp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UncampableReason {
    Pollution,
    Radiation,
    Scarcity,
}

/// Cross-level feature shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    HoleWell,
    HoleCollapse,
    HoleSea,
    HoleMountain,
}

impl FeatureKind {
    /// Structural damage at the feature itself.
    pub fn damage(self) -> i32 {
        match self {
            FeatureKind::HoleWell => 1,
            FeatureKind::HoleCollapse => 8,
            FeatureKind::HoleSea => 3,
            FeatureKind::HoleMountain => 0,
        }
    }
}

/// Movement direction between grid neighbours, clockwise from north-west.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::NorthWest,
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
    ];

    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Grid offset; north is negative y.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::NorthWest => (-1, -1),
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn is_diagonal(self) -> bool {
        let (dx, dy) = self.offset();
        dx != 0 && dy != 0
    }

    pub fn opposite(self) -> Direction {
        self.rotate(4)
    }

    /// The two directions adjacent to this one on the compass.
    pub fn next_directions(self) -> [Direction; 2] {
        [self.rotate(7), self.rotate(1)]
    }

    /// Direction of a single step from `from` to `to`, if they are neighbours.
    pub fn between(from: (i32, i32), to: (i32, i32)) -> Option<Direction> {
        let step = (to.0 - from.0, to.1 - from.1);
        Direction::ALL.into_iter().find(|d| d.offset() == step)
    }

    fn rotate(self, steps: usize) -> Direction {
        let index = Direction::ALL.iter().position(|d| *d == self).unwrap_or(0);
        Direction::ALL[(index + steps) % 8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_priority_order() {
        for pair in Zone::ALL.windows(2) {
            assert!(pair[0].is_earlier_than(pair[1]));
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_stage_compatibility() {
        assert!(Stage::Early.allows_zone(Zone::Poi1));
        assert!(!Stage::Early.allows_zone(Zone::Poi2));
        assert!(Stage::Late.allows_zone(Zone::ExtraCampable));
        assert!(!Stage::Late.allows_zone(Zone::PassageToCamp));
        assert!(Stage::Late.allows_zone(Zone::Entrance));
    }

    #[test]
    fn test_direction_opposites() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            let (dx, dy) = d.offset();
            let (ox, oy) = d.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn test_next_directions_of_cardinal_are_diagonal() {
        for d in Direction::CARDINAL {
            for n in d.next_directions() {
                assert!(n.is_diagonal());
            }
        }
        assert_eq!(
            Direction::North.next_directions(),
            [Direction::NorthWest, Direction::NorthEast]
        );
    }

    #[test]
    fn test_direction_between() {
        assert_eq!(Direction::between((0, 0), (1, 0)), Some(Direction::East));
        assert_eq!(Direction::between((2, 2), (1, 1)), Some(Direction::NorthWest));
        assert_eq!(Direction::between((0, 0), (2, 0)), None);
    }

    #[test]
    fn test_max_path_length_grows_with_ordinal() {
        let early = CriticalPathType::CampToPoi1.max_length(1);
        let late = CriticalPathType::CampToPoi1.max_length(12);
        assert!(late > early);
    }
}
