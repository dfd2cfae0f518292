//! Collaborator tables consulted by the passes.
//!
//! The passes never own balancing, enemy, upgrade or trade data. They query it
//! through the narrow traits below, bundled in [`Collaborators`].
//! [`StaticTables`] is the built-in implementation: curves in code, item and
//! enemy lists loaded from `data/world_tables.json` at compile time via
//! `include_str!()`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::GenerationError;
use crate::constants::CampStep;
use crate::model::EnemyCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    Cold,
    Poison,
    Radiation,
}

/// Enemy habitat tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyCategory {
    Global,
    NoHazard,
    Cold,
    Toxic,
    Radiation,
    Sunlit,
    Dark,
    Dense,
    Sparse,
    Water,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlueprintKind {
    Early,
    Late,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    /// Camp ordinal at which the item first becomes relevant.
    pub camp_ordinal: u32,
    pub craftable: bool,
    pub scavenge_rarity: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPartner {
    pub name: String,
    pub camp_ordinal: u32,
}

pub trait BalancingTable {
    fn max_hazard(&self, kind: HazardKind, camp_ordinal: u32, step: CampStep, is_hard: bool) -> u32;
    fn min_hazard(&self, kind: HazardKind, camp_ordinal: u32, step: CampStep, is_hard: bool) -> u32;
    fn required_equipment(&self, camp_ordinal: u32, step: CampStep, is_hard: bool) -> Vec<String>;
    fn ingredients_to_craft(&self, equipment: &[String]) -> Vec<Ingredient>;
    fn new_equipment(&self, camp_ordinal: u32) -> Vec<Equipment>;
    fn bag_capacity(&self, level_ordinal: u32) -> u32;
    /// Every crafting ingredient id.
    fn ingredients(&self) -> Vec<String>;
}

pub trait EnemyTable {
    fn difficulty(&self, camp_ordinal: u32, step: CampStep) -> u32;
    fn enemies_of_category(&self, category: EnemyCategory, difficulty: u32, exact: bool) -> Vec<EnemyCandidate>;
    fn difficulty_level_of(&self, enemy: &EnemyCandidate) -> u32;
}

pub trait ProgressionTable {
    fn blueprint_piece_count(&self, camp_ordinal: u32, kind: BlueprintKind) -> u32;
    fn minimum_camp_ordinal_for_upgrade(&self, upgrade_id: &str) -> Option<u32>;
}

pub trait TradeTable {
    fn trading_partners(&self) -> Vec<TradingPartner>;
}

/// The collaborators one generation run consults.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub balancing: &'a dyn BalancingTable,
    pub enemies: &'a dyn EnemyTable,
    pub progression: &'a dyn ProgressionTable,
    pub trade: &'a dyn TradeTable,
}

// ── Static tables ──

#[derive(Debug, Clone, Deserialize)]
struct EnemySpec {
    id: String,
    category: EnemyCategory,
    rarity: u32,
    difficulty: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct BlueprintSpec {
    camp_ordinal: u32,
    early: u32,
    late: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct UpgradeSpec {
    id: String,
    camp_ordinal: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct TableData {
    enemies: Vec<EnemySpec>,
    equipment: Vec<Equipment>,
    ingredients: Vec<String>,
    blueprints: Vec<BlueprintSpec>,
    upgrades: Vec<UpgradeSpec>,
    trading_partners: Vec<TradingPartner>,
}

/// Enemies this many difficulty levels below the requested one still qualify
/// in a non-exact query.
const ENEMY_DIFFICULTY_WINDOW: u32 = 4;

/// Built-in tables.
#[derive(Debug, Clone)]
pub struct StaticTables {
    data: TableData,
    enemy_difficulty: HashMap<String, u32>,
}

impl StaticTables {
    /// Load the embedded table data.
    pub fn load() -> Result<Self, GenerationError> {
        const TABLES_JSON: &str = include_str!("../../../data/world_tables.json");
        Self::from_json(TABLES_JSON)
    }

    pub fn from_json(json: &str) -> Result<Self, GenerationError> {
        let data: TableData = serde_json::from_str(json)?;
        let enemy_difficulty = data
            .enemies
            .iter()
            .map(|e| (e.id.clone(), e.difficulty))
            .collect();
        Ok(Self {
            data,
            enemy_difficulty,
        })
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            balancing: self,
            enemies: self,
            progression: self,
            trade: self,
        }
    }
}

impl BalancingTable for StaticTables {
    fn max_hazard(&self, kind: HazardKind, camp_ordinal: u32, step: CampStep, is_hard: bool) -> u32 {
        let co = camp_ordinal;
        let step = step as u32;
        let hard = if is_hard { 10 } else { 0 };
        let value = match kind {
            HazardKind::Cold if co < 3 => return 0,
            HazardKind::Cold => (co - 2) * 8 + step * 5,
            HazardKind::Poison => co * 8 + step * 5,
            HazardKind::Radiation => co * 6 + step * 5,
        };
        (value + hard).min(100)
    }

    fn min_hazard(&self, kind: HazardKind, camp_ordinal: u32, step: CampStep, is_hard: bool) -> u32 {
        match kind {
            HazardKind::Cold => self.max_hazard(kind, camp_ordinal, step, is_hard) / 2,
            HazardKind::Poison | HazardKind::Radiation => 0,
        }
    }

    fn required_equipment(&self, camp_ordinal: u32, step: CampStep, is_hard: bool) -> Vec<String> {
        let mut max_ordinal = camp_ordinal;
        if is_hard || step == CampStep::End {
            max_ordinal += 1;
        }
        self.data
            .equipment
            .iter()
            .filter(|e| e.craftable)
            .filter(|e| e.camp_ordinal + 1 >= camp_ordinal && e.camp_ordinal <= max_ordinal)
            .map(|e| e.id.clone())
            .collect()
    }

    fn ingredients_to_craft(&self, equipment: &[String]) -> Vec<Ingredient> {
        let mut result: Vec<Ingredient> = Vec::new();
        let wanted = self.data.equipment.iter().filter(|e| equipment.contains(&e.id));
        for ingredient in wanted.flat_map(|e| &e.ingredients) {
            match result.iter_mut().find(|i| i.id == ingredient.id) {
                Some(existing) => existing.amount += ingredient.amount,
                None => result.push(ingredient.clone()),
            }
        }
        result
    }

    fn new_equipment(&self, camp_ordinal: u32) -> Vec<Equipment> {
        self.data
            .equipment
            .iter()
            .filter(|e| e.camp_ordinal == camp_ordinal)
            .cloned()
            .collect()
    }

    fn bag_capacity(&self, level_ordinal: u32) -> u32 {
        (10 + level_ordinal * 2).min(40)
    }

    fn ingredients(&self) -> Vec<String> {
        self.data.ingredients.clone()
    }
}

impl EnemyTable for StaticTables {
    fn difficulty(&self, camp_ordinal: u32, step: CampStep) -> u32 {
        camp_ordinal.saturating_sub(1) * 2 + step as u32
    }

    fn enemies_of_category(&self, category: EnemyCategory, difficulty: u32, exact: bool) -> Vec<EnemyCandidate> {
        let min = if exact {
            difficulty
        } else {
            difficulty.saturating_sub(ENEMY_DIFFICULTY_WINDOW)
        };
        self.data
            .enemies
            .iter()
            .filter(|e| e.category == category)
            .filter(|e| e.difficulty >= min && e.difficulty <= difficulty)
            .map(|e| EnemyCandidate {
                id: e.id.clone(),
                rarity: e.rarity,
                difficulty: e.difficulty,
            })
            .collect()
    }

    fn difficulty_level_of(&self, enemy: &EnemyCandidate) -> u32 {
        self.enemy_difficulty
            .get(&enemy.id)
            .copied()
            .unwrap_or(enemy.difficulty)
    }
}

impl ProgressionTable for StaticTables {
    fn blueprint_piece_count(&self, camp_ordinal: u32, kind: BlueprintKind) -> u32 {
        self.data
            .blueprints
            .iter()
            .find(|b| b.camp_ordinal == camp_ordinal)
            .map_or(0, |b| match kind {
                BlueprintKind::Early => b.early,
                BlueprintKind::Late => b.late,
            })
    }

    fn minimum_camp_ordinal_for_upgrade(&self, upgrade_id: &str) -> Option<u32> {
        self.data
            .upgrades
            .iter()
            .find(|u| u.id == upgrade_id)
            .map(|u| u.camp_ordinal)
    }
}

impl TradeTable for StaticTables {
    fn trading_partners(&self) -> Vec<TradingPartner> {
        self.data.trading_partners.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::UPGRADE_UNLOCK_ELEVATOR;

    #[test]
    fn test_embedded_tables_load() {
        let tables = StaticTables::load().unwrap();
        assert!(!tables.ingredients().is_empty());
        assert!(!tables.trading_partners().is_empty());
        assert!(tables
            .minimum_camp_ordinal_for_upgrade(UPGRADE_UNLOCK_ELEVATOR)
            .is_some());
    }

    #[test]
    fn test_malformed_tables_are_an_error() {
        let err = StaticTables::from_json("{ \"enemies\": 3 }").unwrap_err();
        assert!(matches!(err, GenerationError::TableData(_)));
    }

    #[test]
    fn test_global_enemies_cover_every_difficulty() {
        let tables = StaticTables::load().unwrap();
        for co in 1..=15 {
            for step in [CampStep::Start, CampStep::Poi1, CampStep::Poi2, CampStep::End] {
                let d = tables.difficulty(co, step);
                let found = tables.enemies_of_category(EnemyCategory::Global, d, false);
                assert!(!found.is_empty(), "no global enemy at difficulty {}", d);
            }
        }
    }

    #[test]
    fn test_hazard_curves() {
        let tables = StaticTables::load().unwrap();
        let low = tables.max_hazard(HazardKind::Poison, 2, CampStep::End, false);
        let high = tables.max_hazard(HazardKind::Poison, 8, CampStep::End, false);
        assert!(high > low);
        assert!(tables.max_hazard(HazardKind::Cold, 15, CampStep::End, true) <= 100);
        assert_eq!(tables.max_hazard(HazardKind::Cold, 2, CampStep::End, true), 0);
        let easy = tables.max_hazard(HazardKind::Cold, 3, CampStep::Start, false);
        let hard = tables.max_hazard(HazardKind::Cold, 3, CampStep::Start, true);
        assert!(hard > easy);
    }

    #[test]
    fn test_ingredients_merge_amounts() {
        let tables = StaticTables::load().unwrap();
        let ingredients =
            tables.ingredients_to_craft(&["weapon_1".to_string(), "weapon_2".to_string()]);
        let bands = ingredients.iter().find(|i| i.id == "res_bands").unwrap();
        assert_eq!(bands.amount, 9);
    }
}
