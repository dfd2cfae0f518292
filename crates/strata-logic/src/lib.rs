//! Deterministic sector generation for multi-level worlds.
//!
//! Takes a bare world (levels of sector grids with camps, passages and
//! progression stages already laid out) and decorates every sector with
//! zones, hazards, stashes, workshops, resources, locales, movement blockers
//! and enemies. Every decision is a pure function of the world seed and the
//! decision's coordinates, so the same seed and grid always give the same
//! world.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Pass tunables and up-front run errors |
//! | [`constants`] | Zones, stages, critical path types, sector/locale/blocker types |
//! | [`generation`] | The per-level pass pipeline and its orchestrator |
//! | [`model`] | World, level and sector records the passes fill in |
//! | [`pathfinding`] | BFS paths and distances over a level's sector grid |
//! | [`random`] | Salted deterministic sampling and sector selection |
//! | [`spatial`] | Distances, zone borders, camp protection, Voronoi anchors |
//! | [`tables`] | Collaborator traits (balancing, enemies, progression, trade) |
//! | [`template`] | Bare-world builder from a [`template::WorldTemplateConfig`] |
//!
//! ```
//! use strata_logic::{generate_world, build_world, GenerationConfig, StaticTables, WorldTemplateConfig};
//!
//! let template = WorldTemplateConfig { seed: 42, ..Default::default() };
//! let mut world = build_world(&template).unwrap();
//! let tables = StaticTables::load().unwrap();
//! let report = generate_world(&mut world, 42, tables.collaborators(), &GenerationConfig::default()).unwrap();
//! assert_eq!(report.levels.len(), world.level_numbers().len());
//! ```

pub mod config;
pub mod constants;
pub mod generation;
pub mod model;
pub mod pathfinding;
pub mod random;
pub mod spatial;
pub mod tables;
pub mod template;

pub use config::{GenerationConfig, GenerationError};
pub use generation::{
    add_movement_blocker, generate_world, summarize_level, validate_world, BlockerOptions,
    BlockerOutcome, GenerationReport, LevelSummary, RefusalReason,
};
pub use model::{Level, Position, Sector, World};
pub use tables::{Collaborators, StaticTables};
pub use template::{build_world, WorldTemplateConfig};
