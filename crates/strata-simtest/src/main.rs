//! Strata Headless Generation Harness
//!
//! Generates whole worlds for a sweep of seeds and checks the properties
//! every run must keep. Runs entirely in-process.
//!
//! Usage:
//!   cargo run -p strata-simtest
//!   cargo run -p strata-simtest -- --verbose
//!   cargo run -p strata-simtest -- --seeds 20 --template world.json
//!   cargo run -p strata-simtest -- --json

use std::collections::HashSet;

use strata_logic::constants::{BlockerType, Zone};
use strata_logic::pathfinding::{all_reachable, PathQuery};
use strata_logic::spatial::protected_sectors;
use strata_logic::{
    build_world, generate_world, GenerationConfig, GenerationError, GenerationReport, Position,
    StaticTables, World, WorldTemplateConfig,
};
use tracing_subscriber::EnvFilter;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn check(name: &str, failures: &[String], ok: String) -> Self {
        TestResult {
            name: name.into(),
            passed: failures.is_empty(),
            detail: if failures.is_empty() {
                ok
            } else {
                format!("{} failures, first: {}", failures.len(), failures[0])
            },
        }
    }
}

struct Options {
    verbose: bool,
    json: bool,
    seeds: usize,
    template: WorldTemplateConfig,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options {
        verbose: false,
        json: false,
        seeds: 8,
        template: WorldTemplateConfig::default(),
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verbose" => options.verbose = true,
            "--json" => options.json = true,
            "--seeds" => {
                let n = args.next().ok_or("--seeds needs a count")?;
                options.seeds = n.parse().map_err(|e| format!("bad seed count {}: {}", n, e))?;
            }
            "--template" => {
                let path = args.next().ok_or("--template needs a path")?;
                let text = std::fs::read_to_string(&path).map_err(|e| format!("{}: {}", path, e))?;
                options.template =
                    serde_json::from_str(&text).map_err(|e| format!("{}: {}", path, e))?;
            }
            other => return Err(format!("unknown argument {}", other)),
        }
    }
    Ok(options)
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("strata-simtest: {}", e);
            std::process::exit(2);
        }
    };
    init_logging(options.verbose);

    let tables = match StaticTables::load() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("strata-simtest: tables failed to load: {}", e);
            std::process::exit(1);
        }
    };

    if options.json {
        match run(&options.template, options.template.seed, &tables) {
            Ok((_, report)) => match serde_json::to_string_pretty(&report) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("strata-simtest: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("strata-simtest: generation failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("=== Strata Generation Harness ===\n");
    let mut results = Vec::new();

    // 1. Determinism
    results.extend(validate_determinism(&options, &tables));

    // 2. Properties across a seed sweep
    results.extend(validate_seed_sweep(&options, &tables));

    // 3. Fixed scenarios on the default world
    results.extend(validate_scenarios(&tables));

    // 4. Up-front configuration errors
    results.extend(validate_config_errors(&tables));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || options.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn run(
    template: &WorldTemplateConfig,
    seed: i64,
    tables: &StaticTables,
) -> Result<(World, GenerationReport), GenerationError> {
    let template = WorldTemplateConfig {
        seed,
        ..template.clone()
    };
    log::debug!("generating seed {}", seed);
    let mut world = build_world(&template)?;
    let report = generate_world(&mut world, seed, tables.collaborators(), &GenerationConfig::default())?;
    Ok((world, report))
}

/// Seeds for the sweep: the template's own seed first, then a fixed stride.
fn sweep_seeds(options: &Options) -> Vec<i64> {
    (0..options.seeds as i64)
        .map(|i| options.template.seed + i * 7919)
        .collect()
}

// ── 1. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(options: &Options, tables: &StaticTables) -> Vec<TestResult> {
    println!("--- Determinism ---");
    let mut failures = Vec::new();
    let seeds: Vec<i64> = sweep_seeds(options).into_iter().take(3).collect();

    for &seed in &seeds {
        let a = run(&options.template, seed, tables).map(|(w, _)| serde_json::to_string(&w).ok());
        let b = run(&options.template, seed, tables).map(|(w, _)| serde_json::to_string(&w).ok());
        match (a, b) {
            (Ok(Some(a)), Ok(Some(b))) if a == b => {}
            (Ok(_), Ok(_)) => failures.push(format!("seed {} differs between runs", seed)),
            (Err(e), _) | (_, Err(e)) => failures.push(format!("seed {}: {}", seed, e)),
        }
    }

    vec![TestResult::check(
        "same_seed_same_world",
        &failures,
        format!("{} seeds reproduced exactly", seeds.len()),
    )]
}

// ── 2. Seed sweep ───────────────────────────────────────────────────────

fn validate_seed_sweep(options: &Options, tables: &StaticTables) -> Vec<TestResult> {
    println!("--- Seed Sweep ---");
    let seeds = sweep_seeds(options);

    let mut errors = Vec::new();
    let mut connectivity = Vec::new();
    let mut protection = Vec::new();
    let mut hazards = Vec::new();
    let mut tails = Vec::new();
    let mut labels = Vec::new();
    let mut symmetry = Vec::new();
    let mut gangs = Vec::new();
    let mut gang_count = 0;

    let tail = GenerationConfig::default().required_resource_tail_steps;

    for &seed in &seeds {
        let world = match run(&options.template, seed, tables) {
            Ok((w, report)) => {
                if options.verbose {
                    let blocked: usize = report.levels.iter().map(|l| l.blocked_edges).sum();
                    let locales: usize = report.levels.iter().map(|l| l.locales).sum();
                    println!(
                        "  seed {}: {} levels, {} locales, {} blocked edges",
                        seed,
                        report.levels.len(),
                        locales,
                        blocked
                    );
                }
                w
            }
            Err(e) => {
                errors.push(format!("seed {}: {}", seed, e));
                continue;
            }
        };

        for level in world.levels() {
            let l = level.level;

            // camp and locales reachable from the excursion start
            if let Some(start) = level.excursion_start {
                let mut targets: Vec<Position> = level.camp_positions.clone();
                targets.extend(&level.locale_sectors);
                if !all_reachable(&world, start, &targets, PathQuery::WALK) {
                    connectivity.push(format!("seed {} level {}", seed, l));
                }
            }

            let protected: HashSet<Position> = protected_sectors(&world, l);
            for pos in &protected {
                let Some(s) = world.sector(*pos) else { continue };
                if s.hazards.has_hazards() || s.stash.is_some() || !s.movement_blockers.is_empty() {
                    protection.push(format!("seed {} at {}", seed, pos));
                }
            }

            for s in level.sectors() {
                let h = s.hazards;
                if h.cold > 0 && (h.poison > 0 || h.radiation > 0) {
                    hazards.push(format!("seed {}: cold and toxic at {}", seed, s.position));
                }
                if [h.cold, h.poison, h.radiation].iter().any(|v| *v > 100 || v % 5 != 0) {
                    hazards.push(format!("seed {}: {:?} at {}", seed, h, s.position));
                }
                if s.zone.is_none() || s.sector_type.is_none() {
                    labels.push(format!("seed {}: {} unlabelled", seed, s.position));
                }
                for (dir, blocker) in &s.movement_blockers {
                    let other = world.sector(s.position.step(*dir));
                    if other.and_then(|o| o.blocker(dir.opposite())) != Some(*blocker) {
                        symmetry.push(format!("seed {}: {} {:?}", seed, s.position, dir));
                    }
                }
            }

            for path in &level.paths {
                if path.len() <= tail {
                    continue;
                }
                let last = path.len() - 1;
                let flags = |p: &Position| {
                    world
                        .sector(*p)
                        .map(|s| s.required_resources)
                        .unwrap_or_default()
                };
                let recent = &path[last - tail..last];
                let end = flags(&path[last]);
                if (!recent.iter().any(|p| flags(p).water) && !end.water)
                    || (!recent.iter().any(|p| flags(p).food) && !end.food)
                {
                    tails.push(format!("seed {} level {} path ending {}", seed, l, path[last]));
                }
            }

            for gang in &level.gangs {
                gang_count += 1;
                let blocked = world
                    .sector(gang.pos1)
                    .map(|s| s.movement_blockers.values().any(|b| *b == BlockerType::Gang))
                    .unwrap_or(false);
                if !blocked || gang.enemy_id.is_none() {
                    gangs.push(format!("seed {} gang at {}", seed, gang.pos1));
                }
            }
        }
    }

    vec![
        TestResult::check(
            "sweep_generates",
            &errors,
            format!("{} seeds generated", seeds.len()),
        ),
        TestResult::check(
            "key_sectors_reachable",
            &connectivity,
            "camps and locales reachable on every level".into(),
        ),
        TestResult::check(
            "camp_protection",
            &protection,
            "no hazard, stash or blocker near camps".into(),
        ),
        TestResult::check(
            "hazard_exclusivity",
            &hazards,
            "cold never shares a sector with poison or radiation".into(),
        ),
        TestResult::check(
            "every_sector_labelled",
            &labels,
            "all sectors have a zone and a type".into(),
        ),
        TestResult::check(
            "blockers_symmetric",
            &symmetry,
            "every blocked edge is stored on both sides".into(),
        ),
        TestResult::check(
            "path_tail_resources",
            &tails,
            format!("paths longer than {} steps end in supplies", tail),
        ),
        TestResult::check(
            "gangs_consistent",
            &gangs,
            format!("{} gangs, all blocked with an enemy", gang_count),
        ),
    ]
}

// ── 3. Scenarios ────────────────────────────────────────────────────────

fn validate_scenarios(tables: &StaticTables) -> Vec<TestResult> {
    println!("--- Scenarios ---");
    let mut results = Vec::new();
    let template = WorldTemplateConfig::default();

    match run(&template, 42, tables) {
        Ok((world, _)) => {
            let start = world.level(world.start_level);
            let entrance = start.and_then(|l| l.passage_up);
            let mut failures = Vec::new();
            if let (Some(level), Some(entrance)) = (start, entrance) {
                let mut around = level.neighbour_positions(entrance, false);
                around.push(entrance);
                for pos in around {
                    let Some(s) = level.sector_at(pos) else { continue };
                    if s.zone != Some(Zone::Entrance) {
                        failures.push(format!("{} is {:?}", s.position, s.zone));
                    }
                }
            } else {
                failures.push("start level has no entrance".into());
            }
            results.push(TestResult::check(
                "start_entrance_zone",
                &failures,
                "sectors around the entrance are labelled entrance".into(),
            ));
        }
        Err(e) => results.push(TestResult {
            name: "start_entrance_zone".into(),
            passed: false,
            detail: e.to_string(),
        }),
    }

    // preset cold must keep toxic hazards out
    let preset = build_world(&template).and_then(|mut world| {
        let pos = Position::new(10, 0, 1);
        if let Some(s) = world.sector_mut(pos) {
            s.hazards.cold = 20;
        }
        generate_world(&mut world, 42, tables.collaborators(), &GenerationConfig::default())?;
        Ok(world.sector(pos).map(|s| s.hazards))
    });
    results.push(match preset {
        Ok(Some(h)) => TestResult {
            name: "preset_cold_kept".into(),
            passed: h.cold == 20 && h.poison == 0 && h.radiation == 0,
            detail: format!("{:?}", h),
        },
        Ok(None) => TestResult {
            name: "preset_cold_kept".into(),
            passed: false,
            detail: "sector missing from default grid".into(),
        },
        Err(e) => TestResult {
            name: "preset_cold_kept".into(),
            passed: false,
            detail: e.to_string(),
        },
    });

    results
}

// ── 4. Configuration errors ─────────────────────────────────────────────

fn validate_config_errors(tables: &StaticTables) -> Vec<TestResult> {
    println!("--- Configuration Errors ---");
    let mut results = Vec::new();

    let bad_start = WorldTemplateConfig {
        start_level: 99,
        ..Default::default()
    };
    let err = build_world(&bad_start).err();
    results.push(TestResult {
        name: "start_outside_range".into(),
        passed: matches!(err, Some(GenerationError::StartLevelOutOfRange { .. })),
        detail: format!("{:?}", err),
    });

    let config = GenerationConfig {
        border_blocker_frequency: 1.5,
        ..Default::default()
    };
    let outcome = build_world(&WorldTemplateConfig::default()).map(|mut world| {
        let err = generate_world(&mut world, 42, tables.collaborators(), &config).err();
        let untouched = world.levels().all(|l| l.sectors().iter().all(|s| s.zone.is_none()));
        (err, untouched)
    });
    results.push(match outcome {
        Ok((err, untouched)) => TestResult {
            name: "invalid_config_rejected".into(),
            passed: matches!(err, Some(GenerationError::InvalidConfig(_))) && untouched,
            detail: format!("{:?}, world untouched: {}", err, untouched),
        },
        Err(e) => TestResult {
            name: "invalid_config_rejected".into(),
            passed: false,
            detail: e.to_string(),
        },
    });

    let negative = build_world(&WorldTemplateConfig::default())
        .map(|mut world| generate_world(&mut world, -1, tables.collaborators(), &GenerationConfig::default()).err());
    results.push(TestResult {
        name: "negative_seed_rejected".into(),
        passed: matches!(negative, Ok(Some(GenerationError::InvalidSeed(-1)))),
        detail: format!("{:?}", negative),
    });

    results
}
