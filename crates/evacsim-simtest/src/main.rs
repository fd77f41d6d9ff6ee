//! EvacSim Headless Simulation Harness
//!
//! Validates the pure controller logic, then runs whole evacuation
//! scenarios through the engine and checks that every agent musters.
//! Runs entirely in-process, with no rendering.
//!
//! Usage:
//!   cargo run -p evacsim-simtest
//!   cargo run -p evacsim-simtest -- --verbose
//!   cargo run -p evacsim-simtest -- --scenario deck.json --runs 5 --log-dir out
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use evacsim_core::prelude::*;
use evacsim_logic::avoidance::{repulsion, repulsion_strength, steer};
use evacsim_logic::config::{
    validate_config, AvoidanceConfig, ConfigError, ControllerConfig, TuningConfig,
};
use evacsim_logic::footprint::{Footprint, FootprintSize};
use evacsim_logic::locomotion::FloorContact;
use evacsim_logic::navigation::NavigationSurface;
use evacsim_logic::nudge::{downhill_nudge, is_on_incline};
use evacsim_logic::stuck::StuckDetector;
use evacsim_logic::tuning::{corridor_weight, speed_cap};
use tracing_subscriber::EnvFilter;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Options {
    verbose: bool,
    scenario: Option<PathBuf>,
    runs: u64,
    log_dir: Option<PathBuf>,
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        verbose: false,
        scenario: None,
        runs: 1,
        log_dir: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verbose" => options.verbose = true,
            "--scenario" => {
                let path = args.next().ok_or("--scenario needs a path")?;
                options.scenario = Some(PathBuf::from(path));
            }
            "--runs" => {
                let n = args.next().ok_or("--runs needs a count")?;
                options.runs = n
                    .parse()
                    .map_err(|_| format!("--runs expects a number, got '{}'", n))?;
            }
            "--log-dir" => {
                let path = args.next().ok_or("--log-dir needs a path")?;
                options.log_dir = Some(PathBuf::from(path));
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(options)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let options = match parse_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };
    let verbose = options.verbose;
    println!("=== EvacSim Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Controller configuration
    results.extend(validate_configuration(verbose));

    // 2. Avoidance force model
    results.extend(validate_avoidance(verbose));

    // 3. Speed and corridor tuning
    results.extend(validate_tuning(verbose));

    // 4. Stall detection, footprint resize, slope nudge
    results.extend(validate_stuck_handling(verbose));

    // 5. Scenario documents
    results.extend(validate_scenarios(&options));

    // 6. Full evacuation runs
    results.extend(validate_runs(&options));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
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

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_configuration(_verbose: bool) -> Vec<TestResult> {
    println!("--- Configuration ---");
    let mut results = Vec::new();

    let defaults = validate_config(&ControllerConfig::default());
    results.push(TestResult {
        name: "config_defaults_valid".into(),
        passed: defaults.is_empty(),
        detail: format!("{} errors in defaults", defaults.len()),
    });

    let mut bad = ControllerConfig::default();
    bad.footprint.shrink_radius_factor = 0.0;
    bad.tuning.narrow_width = 500.0;
    bad.schedule.throttle_interval.min = 2.0;
    bad.schedule.throttle_interval.max = 1.0;
    let errors = validate_config(&bad);
    results.push(TestResult {
        name: "config_collects_all_errors".into(),
        passed: errors.len() == 3,
        detail: format!("{} errors: {:?}", errors.len(), errors),
    });
    results.push(TestResult {
        name: "config_reports_corridor_order".into(),
        passed: errors
            .iter()
            .any(|e| matches!(e, ConfigError::CorridorWidths { .. })),
        detail: "narrow >= wide corridor width is rejected".into(),
    });

    let json = r#"{ "avoidance": { "interaction_radius": 120.0 } }"#;
    let parsed: Result<ControllerConfig, _> = serde_json::from_str(json);
    results.push(TestResult {
        name: "config_partial_json".into(),
        passed: parsed
            .as_ref()
            .map(|c| c.avoidance.interaction_radius == 120.0 && c.tuning == TuningConfig::default())
            .unwrap_or(false),
        detail: "missing sections fall back to defaults".into(),
    });

    results
}

// ── 2. Avoidance ────────────────────────────────────────────────────────

fn validate_avoidance(verbose: bool) -> Vec<TestResult> {
    println!("--- Avoidance ---");
    let mut results = Vec::new();
    let cfg = AvoidanceConfig::default();

    // Strength must fall off monotonically from contact to the radius
    let mut last = f32::INFINITY;
    let mut monotone = true;
    let mut d = 1.0;
    while d < cfg.interaction_radius + 20.0 {
        let s = repulsion_strength(d, cfg.interaction_radius, cfg.epsilon);
        if s > last || !(0.0..=1.0).contains(&s) {
            monotone = false;
        }
        last = s;
        d += 1.0;
    }
    results.push(TestResult {
        name: "avoidance_falloff_monotone".into(),
        passed: monotone,
        detail: format!("strength sweep 1..{}", cfg.interaction_radius + 20.0),
    });

    // A ring of neighbours cancels; a packed side saturates at unit length
    let ring: Vec<Vec3> = (0..8)
        .map(|i| {
            let a = i as f32 * std::f32::consts::FRAC_PI_4;
            Vec3::new(a.cos() * 40.0, a.sin() * 40.0, 0.0)
        })
        .collect();
    let balanced = repulsion(Vec3::ZERO, ring, &cfg);
    let packed: Vec<Vec3> = (0..20)
        .map(|i| Vec3::new(10.0 + i as f32, 0.0, 0.0))
        .collect();
    let saturated = repulsion(Vec3::ZERO, packed, &cfg);
    if verbose {
        println!(
            "  ring residual {:.4}, packed magnitude {:.4}",
            balanced.length(),
            saturated.length()
        );
    }
    results.push(TestResult {
        name: "avoidance_ring_cancels".into(),
        passed: balanced.length() < 1e-3,
        detail: format!("residual {:.5}", balanced.length()),
    });
    results.push(TestResult {
        name: "avoidance_clamped_to_unit".into(),
        passed: (saturated.length() - 1.0).abs() < 1e-3 && saturated.x < 0.0,
        detail: format!("20 neighbours on one side → {:.4}", saturated.length()),
    });

    // Idle agents ignore noise-level pushes
    let tiny = Vec3::new(0.01, 0.0, 0.0);
    results.push(TestResult {
        name: "avoidance_idle_threshold".into(),
        passed: steer(Vec3::ZERO, tiny, &cfg).is_none()
            && steer(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0), &cfg).is_some(),
        detail: "idle agent moves only on a real push".into(),
    });

    results
}

// ── 3. Tuning ───────────────────────────────────────────────────────────

fn validate_tuning(verbose: bool) -> Vec<TestResult> {
    println!("--- Tuning ---");
    let mut results = Vec::new();
    let cfg = TuningConfig::default();

    let mut in_band = true;
    let mut non_increasing = true;
    let mut last = f32::INFINITY;
    for width in (0..=400).step_by(10) {
        let w = corridor_weight(width as f32, &cfg);
        if verbose && width % 100 == 0 {
            println!("  width {:>3} → weight {:.1}", width, w);
        }
        in_band &= (cfg.wide_weight..=cfg.narrow_weight).contains(&w);
        non_increasing &= w <= last;
        last = w;
    }
    results.push(TestResult {
        name: "tuning_weight_in_band".into(),
        passed: in_band,
        detail: format!("weights within [{}, {}]", cfg.wide_weight, cfg.narrow_weight),
    });
    results.push(TestResult {
        name: "tuning_weight_narrow_is_heavier".into(),
        passed: non_increasing,
        detail: "weight never grows with corridor width".into(),
    });

    results.push(TestResult {
        name: "tuning_stairs_speed".into(),
        passed: speed_cap(0.0, &cfg) == cfg.flat_speed
            && speed_cap(-40.0, &cfg) == cfg.stairs_speed
            && speed_cap(cfg.stairs_vertical_speed, &cfg) == cfg.flat_speed,
        detail: format!("flat {} / stairs {}", cfg.flat_speed, cfg.stairs_speed),
    });

    results
}

// ── 4. Stuck handling ───────────────────────────────────────────────────

fn validate_stuck_handling(_verbose: bool) -> Vec<TestResult> {
    println!("--- Stuck Handling ---");
    let mut results = Vec::new();
    let cfg = ControllerConfig::default();

    let here = Vec3::new(100.0, 100.0, 0.0);
    let mut detector = StuckDetector::new(here);
    let samples = (0..20)
        .position(|_| detector.sample(here, &cfg.stuck))
        .map(|i| i + 1);
    results.push(TestResult {
        name: "stuck_detects_stall".into(),
        passed: samples.is_some(),
        detail: format!("stalled after {:?} samples", samples),
    });

    detector.sample(here + Vec3::new(50.0, 0.0, 0.0), &cfg.stuck);
    results.push(TestResult {
        name: "stuck_movement_resets".into(),
        passed: detector.stalled_for() == 0.0,
        detail: "displacement clears accumulated stall".into(),
    });

    let defaults = FootprintSize::new(34.0, 88.0);
    let mut footprint = Footprint::capture(defaults);
    footprint.begin_shrink(&cfg.footprint);
    let mut frames = 0;
    while footprint.is_resizing() && frames < 1000 {
        footprint.step(1.0 / 30.0, &cfg.footprint);
        frames += 1;
    }
    let shrunk = footprint.current() == footprint.shrunk_size(&cfg.footprint);
    footprint.begin_restore();
    while footprint.is_resizing() && frames < 2000 {
        footprint.step(1.0 / 30.0, &cfg.footprint);
        frames += 1;
    }
    results.push(TestResult {
        name: "footprint_shrink_restore".into(),
        passed: shrunk && footprint.current() == defaults && !footprint.is_shrunk(),
        detail: format!("round trip in {} frames", frames),
    });

    let r = 20f32.to_radians();
    let ramp = FloorContact {
        grounded: true,
        normal: Vec3::new(-r.sin(), 0.0, r.cos()),
    };
    let nudge = downhill_nudge(Vec3::FORWARD, &cfg.nudge);
    results.push(TestResult {
        name: "nudge_on_ramp".into(),
        passed: is_on_incline(&ramp, &cfg.nudge)
            && !is_on_incline(&FloorContact::FLAT, &cfg.nudge)
            && nudge.z < 0.0
            && (nudge.length() - cfg.nudge.magnitude).abs() < 1e-2,
        detail: format!("impulse ({:.1}, {:.1}, {:.1})", nudge.x, nudge.y, nudge.z),
    });

    results
}

// ── 5. Scenarios ────────────────────────────────────────────────────────

fn load_scenario(options: &Options) -> Result<Scenario, SimError> {
    match &options.scenario {
        Some(path) => Scenario::load(path),
        None => Ok(Scenario::demo_deck()),
    }
}

fn validate_scenarios(options: &Options) -> Vec<TestResult> {
    println!("--- Scenarios ---");
    let mut results = Vec::new();

    let scenario = match load_scenario(options) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult {
                name: "scenario_load".into(),
                passed: false,
                detail: format!("{}", e),
            });
            return results;
        }
    };

    results.push(TestResult {
        name: "scenario_valid".into(),
        passed: scenario.validate().is_ok(),
        detail: format!(
            "'{}': {} regions, {} muster points, {} agents",
            scenario.name,
            scenario.regions.len(),
            scenario.muster_points.len(),
            scenario.agent_count
        ),
    });

    let round_trip = scenario
        .to_json()
        .and_then(|json| Scenario::from_json(&json))
        .map(|back| back == scenario)
        .unwrap_or(false);
    results.push(TestResult {
        name: "scenario_json_round_trip".into(),
        passed: round_trip,
        detail: "serialised scenario reloads unchanged".into(),
    });

    match NavMesh::new(scenario.regions.clone()) {
        Ok(mesh) => {
            let unreachable: Vec<&str> = scenario
                .muster_points
                .iter()
                .filter(|p| mesh.project(p.location, 100.0).is_none())
                .map(|p| p.name.as_str())
                .collect();
            results.push(TestResult {
                name: "scenario_muster_points_on_mesh".into(),
                passed: unreachable.is_empty(),
                detail: if unreachable.is_empty() {
                    format!("{} regions, {} links", mesh.regions().len(), mesh.links().len())
                } else {
                    format!("off mesh: {}", unreachable.join(", "))
                },
            });
        }
        Err(e) => results.push(TestResult {
            name: "scenario_mesh_builds".into(),
            passed: false,
            detail: format!("{}", e),
        }),
    }

    results
}

// ── 6. Evacuation runs ──────────────────────────────────────────────────

fn validate_runs(options: &Options) -> Vec<TestResult> {
    println!("--- Evacuation Runs ---");
    let mut results = Vec::new();

    let base = match load_scenario(options) {
        Ok(s) => s,
        Err(_) => return results,
    };

    if let Some(dir) = &options.log_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            results.push(TestResult {
                name: "run_log_dir".into(),
                passed: false,
                detail: format!("{}: {}", dir.display(), e),
            });
            return results;
        }
    }

    for i in 0..options.runs {
        let scenario = Scenario {
            seed: run_seed(base.seed, i),
            ..base.clone()
        };
        let outcome = match &options.log_dir {
            Some(dir) => run_once(&scenario, dir.join(format!("Run_{}.csv", i))),
            None => run_to_memory(&scenario),
        };

        match outcome {
            Ok((report, active_timers)) => {
                if options.verbose {
                    println!(
                        "  run {} (seed {}): {:?} after {:.1}s, {:?}",
                        i, scenario.seed, report.end, report.elapsed_seconds, report.stats
                    );
                }
                results.push(TestResult {
                    name: format!("run_{}_all_mustered", i),
                    passed: report.all_mustered(),
                    detail: format!(
                        "{}/{} mustered in {:.1}s",
                        report.stats.mustered, report.agents, report.elapsed_seconds
                    ),
                });
                results.push(TestResult {
                    name: format!("run_{}_timers_released", i),
                    passed: !report.all_mustered() || active_timers == 0,
                    detail: format!("{} timers still armed", active_timers),
                });
            }
            Err(e) => results.push(TestResult {
                name: format!("run_{}", i),
                passed: false,
                detail: format!("{}", e),
            }),
        }
    }

    results
}

/// Seed for run `index`; wraps so any base seed is accepted.
fn run_seed(base: u64, index: u64) -> u64 {
    base.wrapping_add(index)
}

fn run_to_memory(scenario: &Scenario) -> Result<(RunReport, usize), SimError> {
    let mut engine = SimulationEngine::from_scenario(scenario)?;
    let (report, _bytes) = engine.run(RunLog::new(Vec::new())?)?;
    Ok((report, engine.timers().active_count()))
}

fn run_once(scenario: &Scenario, path: PathBuf) -> Result<(RunReport, usize), SimError> {
    let mut engine = SimulationEngine::from_scenario(scenario)?;
    let out = BufWriter::new(File::create(&path)?);
    let (report, _out) = engine.run(RunLog::new(out)?)?;
    log::info!("wrote {}", path.display());
    Ok((report, engine.timers().active_count()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_seed_wraps_at_max() {
        assert_eq!(run_seed(7, 3), 10);
        assert_eq!(run_seed(u64::MAX, 0), u64::MAX);
        assert_eq!(run_seed(u64::MAX, 1), 0);
        assert_eq!(run_seed(u64::MAX - 1, 4), 2);
    }
}
