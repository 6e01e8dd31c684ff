//! EcoChase Headless Simulation Harness
//!
//! Validates the pure simulation logic, then plays one paced chase in the
//! terminal. Runs entirely in-process: no UI, no networking.
//!
//! Usage:
//!   cargo run -p ecochase-simtest
//!   cargo run -p ecochase-simtest -- --verbose --algorithm bfs --interval-ms 50
//!   cargo run -p ecochase-simtest -- --prompt "a dense 30x30 maze with 5 prey" --explain

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use ecochase_logic::collaborators::{
    ConfigGenerator, PathExplainer, PromptConfigGenerator, TemplateExplainer,
};
use ecochase_logic::config::{FinishPolicy, RunOptions, SearchAlgorithm, SimConfig};
use ecochase_logic::grid::{manhattan, Grid, Position};
use ecochase_logic::pathfinding::{astar_with_stats, bfs_with_stats};
use ecochase_logic::rng::create_rng;
use ecochase_logic::session::{ApplyOutcome, Session};
use ecochase_logic::simulation::{set_phase, tick, CAPTURE_REWARD};
use ecochase_logic::state::{Phase, SimulationState};
use ecochase_logic::world::{from_layout, initialize, Layout};
use ecochase_logic::ConfigurationError;
use log::{info, warn};

#[derive(Parser)]
#[command(name = "ecochase-simtest")]
#[command(version)]
#[command(about = "Headless predator/prey grid chase: logic validation and paced runs")]
struct Cli {
    /// JSON run configuration; missing fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Grid side length
    #[arg(short, long)]
    grid_size: Option<u32>,

    /// Number of prey
    #[arg(short, long)]
    prey: Option<usize>,

    /// Obstacle density (0.0-1.0)
    #[arg(short, long)]
    density: Option<f64>,

    /// Predator search algorithm: bfs or a*
    #[arg(short, long)]
    algorithm: Option<String>,

    /// Tick limit for the paced run
    #[arg(long, default_value = "500")]
    max_ticks: u64,

    /// Delay between ticks; 0 runs as fast as possible
    #[arg(long, default_value = "0")]
    interval_ms: u64,

    /// Replace the run with one described in free text
    #[arg(long)]
    prompt: Option<String>,

    /// Explain the predator's last path after the run
    #[arg(long)]
    explain: bool,

    /// Print every check and every tick
    #[arg(short, long)]
    verbose: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let verbose = cli.verbose;
    println!("=== EcoChase Simulation Harness ===\n");

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. BFS / A* agreement on random worlds
    results.extend(validate_pathfinding(verbose));

    // 2. World initialization sweep
    results.extend(validate_initialization(verbose));

    // 3. Reward accounting over full runs
    results.extend(validate_rewards(verbose));

    // 4. Deterministic replay and reset
    results.extend(validate_replay(&config, verbose));

    // 5. Paced chase with the requested configuration
    results.extend(run_chase(&cli, config));

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

/// Defaults, then the JSON file, then individual flags.
fn load_config(cli: &Cli) -> Result<SimConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            println!("Loading config from: {:?}", path);
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str(&text)?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(size) = cli.grid_size {
        config.grid_size = size;
    }
    if let Some(prey) = cli.prey {
        config.num_prey = prey;
    }
    if let Some(density) = cli.density {
        config.obstacle_density = density;
    }
    if let Some(algorithm) = &cli.algorithm {
        config.algorithm = algorithm.parse::<SearchAlgorithm>()?;
    }
    config.validate()?;
    Ok(config)
}

// ── 1. Pathfinding ──────────────────────────────────────────────────────

fn validate_pathfinding(verbose: bool) -> Vec<TestResult> {
    println!("--- Pathfinding ---");
    let mut results = Vec::new();

    // Straight row on an open 5x5 grid
    let open = Grid::open(5);
    let row = bfs_with_stats(Position::new(0, 2), Position::new(4, 2), &open);
    let expected = [(1, 2), (2, 2), (3, 2), (4, 2)].map(|(x, y)| Position::new(x, y));
    results.push(TestResult {
        name: "path_open_row".into(),
        passed: matches!(&row, Ok(r) if r.path == expected),
        detail: "(0,2)→(4,2) = 4 steps along the row".into(),
    });

    // Wall with a single gap
    let walled = Grid::new(5, (0..4).map(|x| Position::new(x, 2)));
    let detour = astar_with_stats(Position::new(0, 0), Position::new(0, 4), &walled);
    results.push(TestResult {
        name: "path_wall_detour".into(),
        passed: matches!(&detour, Ok(r) if r.path.len() == 12),
        detail: "detour through the gap = 12 steps".into(),
    });

    // Enclosed goal
    let sealed = Grid::new(
        5,
        [(2, 1), (2, 3), (1, 2), (3, 2)].map(|(x, y)| Position::new(x, y)),
    );
    let none = bfs_with_stats(Position::new(0, 0), Position::new(2, 2), &sealed);
    results.push(TestResult {
        name: "path_unreachable".into(),
        passed: matches!(&none, Ok(r) if r.path.is_empty()),
        detail: "enclosed goal → empty path".into(),
    });

    // Out of bounds
    results.push(TestResult {
        name: "path_out_of_bounds".into(),
        passed: bfs_with_stats(Position::new(0, 0), Position::new(5, 0), &open).is_err(),
        detail: "goal outside the grid → InvalidPositionError".into(),
    });

    // Random-world sweep
    let mut queries = 0;
    let mut mismatches = 0;
    let mut bfs_expanded = 0;
    let mut astar_expanded = 0;
    for seed in 0..50u64 {
        let config = SimConfig {
            grid_size: 24,
            num_prey: 8,
            obstacle_density: 0.3,
            seed,
            ..Default::default()
        };
        let state = match initialize(&config, &mut create_rng(seed)) {
            Ok(s) => s,
            Err(_) => {
                mismatches += 1;
                continue;
            }
        };
        for prey in state.prey() {
            let b = bfs_with_stats(state.predator(), prey.position, state.grid());
            let a = astar_with_stats(state.predator(), prey.position, state.grid());
            queries += 1;
            match (b, a) {
                (Ok(b), Ok(a)) if b.path.len() == a.path.len() => {
                    bfs_expanded += b.expanded;
                    astar_expanded += a.expanded;
                }
                _ => mismatches += 1,
            }
        }
    }
    results.push(TestResult {
        name: "path_bfs_astar_agree".into(),
        passed: mismatches == 0,
        detail: format!("{} queries, {} length mismatches", queries, mismatches),
    });
    results.push(TestResult {
        name: "path_astar_expands_less".into(),
        passed: astar_expanded <= bfs_expanded,
        detail: format!("A* expanded {} vs BFS {}", astar_expanded, bfs_expanded),
    });
    if verbose {
        println!(
            "  sweep: {} queries, BFS expanded {}, A* expanded {}",
            queries, bfs_expanded, astar_expanded
        );
    }

    results
}

// ── 2. Initialization ───────────────────────────────────────────────────

fn validate_initialization(verbose: bool) -> Vec<TestResult> {
    println!("--- Initialization ---");
    let mut results = Vec::new();

    let mut worlds = 0;
    let mut violations = Vec::new();
    for grid_size in [5u32, 10, 20, 50] {
        for density in [0.0, 0.1, 0.3, 0.5] {
            for num_prey in [0usize, 1, 5] {
                let config = SimConfig {
                    grid_size,
                    num_prey,
                    obstacle_density: density,
                    seed: grid_size as u64 * 31 + num_prey as u64,
                    ..Default::default()
                };
                let state = match initialize(&config, &mut create_rng(config.seed)) {
                    Ok(s) => s,
                    Err(e) => {
                        violations.push(format!("{}x{} d={}: {}", grid_size, grid_size, density, e));
                        continue;
                    }
                };
                worlds += 1;
                if let Some(problem) = placement_problem(&config, &state) {
                    violations.push(format!("{}x{} d={}: {}", grid_size, grid_size, density, problem));
                }
            }
        }
    }
    if verbose {
        for v in &violations {
            println!("  {}", v);
        }
    }
    results.push(TestResult {
        name: "init_placement_sweep".into(),
        passed: violations.is_empty(),
        detail: format!("{} worlds, {} violations", worlds, violations.len()),
    });

    // Impossible requests fail cleanly
    let crowded = SimConfig {
        grid_size: 3,
        num_prey: 5,
        obstacle_density: 0.5,
        ..Default::default()
    };
    results.push(TestResult {
        name: "init_insufficient_space".into(),
        passed: matches!(
            initialize(&crowded, &mut create_rng(1)),
            Err(ConfigurationError::InsufficientSpace { .. })
        ),
        detail: "3x3, density 0.5, 5 prey → InsufficientSpace".into(),
    });

    let bad_density = SimConfig {
        obstacle_density: 1.5,
        ..Default::default()
    };
    results.push(TestResult {
        name: "init_invalid_density".into(),
        passed: matches!(
            initialize(&bad_density, &mut create_rng(1)),
            Err(ConfigurationError::InvalidDensity(_))
        ),
        detail: "density 1.5 rejected".into(),
    });

    results.push(TestResult {
        name: "init_rejects_learning_agents".into(),
        passed: "PPO".parse::<SearchAlgorithm>().is_err()
            && "a*".parse::<SearchAlgorithm>() == Ok(SearchAlgorithm::AStar),
        detail: "PPO rejected, a* accepted".into(),
    });

    results
}

fn placement_problem(config: &SimConfig, state: &SimulationState) -> Option<String> {
    let size = config.grid_size as i32;
    if state.obstacles().len() != config.obstacle_count() {
        return Some(format!(
            "{} obstacles, expected {}",
            state.obstacles().len(),
            config.obstacle_count()
        ));
    }
    if state.prey().len() != config.num_prey {
        return Some(format!("{} prey, expected {}", state.prey().len(), config.num_prey));
    }
    if state.predator().x >= size / 2 || state.grid().is_obstacle(state.predator()) {
        return Some(format!("predator misplaced at {}", state.predator()));
    }
    for prey in state.prey() {
        if prey.position.x < size / 2
            || !state.grid().is_walkable(prey.position)
            || prey.position == state.predator()
        {
            return Some(format!("prey {} misplaced at {}", prey.id, prey.position));
        }
    }
    None
}

// ── 3. Rewards ──────────────────────────────────────────────────────────

fn validate_rewards(verbose: bool) -> Vec<TestResult> {
    println!("--- Rewards ---");
    let mut results = Vec::new();

    // Open grid, even starting distance: only the capture changes the total.
    let layout = Layout {
        grid_size: 12,
        predator: Position::new(0, 6),
        prey: vec![Position::new(6, 6)],
        obstacles: Vec::new(),
    };
    match from_layout(&layout, RunOptions::default()) {
        Ok(state) => {
            let mut rng = create_rng(7);
            let mut state = set_phase(state, Phase::Running);
            for _ in 0..5_000 {
                if state.is_finished() {
                    break;
                }
                state = tick(state, &mut rng);
            }
            if verbose {
                println!(
                    "  open chase: finished={} after {} ticks, reward {}",
                    state.is_finished(),
                    state.tick_count(),
                    state.reward()
                );
            }
            results.push(TestResult {
                name: "reward_open_chase".into(),
                passed: state.is_finished() && state.reward() == CAPTURE_REWARD,
                detail: format!(
                    "single capture after {} ticks, reward {}",
                    state.tick_count(),
                    state.reward()
                ),
            });
        }
        Err(e) => results.push(TestResult {
            name: "reward_open_chase".into(),
            passed: false,
            detail: format!("layout rejected: {}", e),
        }),
    }

    // Per-tick deltas on obstacle worlds
    let mut ticks = 0;
    let mut bad_deltas = 0;
    for seed in 0..10u64 {
        let config = SimConfig {
            grid_size: 16,
            num_prey: 4,
            obstacle_density: 0.2,
            seed,
            ..Default::default()
        };
        let Ok(state) = initialize(&config, &mut create_rng(seed)) else {
            bad_deltas += 1;
            continue;
        };
        let mut rng = create_rng(seed);
        let mut state = set_phase(state, Phase::Running);
        for _ in 0..200 {
            let before_reward = state.reward();
            let before_prey = state.prey().len();
            state = tick(state, &mut rng);
            if state.is_finished() {
                break;
            }
            ticks += 1;
            let captured = (before_prey - state.prey().len()) as i64;
            let rest = state.reward() - before_reward - captured * CAPTURE_REWARD;
            if rest != -1 && rest != 0 {
                bad_deltas += 1;
            }
        }
    }
    results.push(TestResult {
        name: "reward_tick_deltas".into(),
        passed: bad_deltas == 0,
        detail: format!("{} ticks, {} malformed deltas", ticks, bad_deltas),
    });

    // Finish timing
    let capture = Layout {
        grid_size: 5,
        predator: Position::new(4, 3),
        prey: vec![Position::new(4, 4)],
        obstacles: vec![Position::new(3, 4), Position::new(3, 3)],
    };
    for policy in [FinishPolicy::NextTick, FinishPolicy::Immediate] {
        let options = RunOptions {
            finish_policy: policy,
            ..RunOptions::default()
        };
        let name = format!("finish_{:?}", policy).to_lowercase();
        match from_layout(&capture, options) {
            Ok(state) => {
                let after = tick(set_phase(state, Phase::Running), &mut create_rng(1));
                let expected = policy == FinishPolicy::Immediate;
                results.push(TestResult {
                    name,
                    passed: after.prey().is_empty() && after.is_finished() == expected,
                    detail: format!("finished on capturing tick: {}", after.is_finished()),
                });
            }
            Err(e) => results.push(TestResult {
                name,
                passed: false,
                detail: format!("layout rejected: {}", e),
            }),
        }
    }

    results
}

// ── 4. Replay ───────────────────────────────────────────────────────────

fn validate_replay(config: &SimConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Replay ---");
    let mut results = Vec::new();

    let replay = || -> Result<SimulationState, ConfigurationError> {
        let mut session = Session::new(config.clone())?;
        session.start();
        session.run(300);
        Ok(session.state().clone())
    };
    let (a, b) = (replay(), replay());
    results.push(TestResult {
        name: "replay_same_seed".into(),
        passed: matches!((&a, &b), (Ok(a), Ok(b)) if a == b),
        detail: format!("seed {} replays identically", config.seed),
    });

    let reset_matches = Session::new(config.clone()).and_then(|mut session| {
        session.start();
        session.run(25);
        session.reset(config.clone())?;
        let fresh = Session::new(config.clone())?;
        Ok(session.state() == fresh.state())
    });
    results.push(TestResult {
        name: "replay_reset_is_fresh".into(),
        passed: matches!(reset_matches, Ok(true)),
        detail: "reset after 25 ticks equals a new session".into(),
    });

    results
}

// ── 5. Paced chase ──────────────────────────────────────────────────────

fn run_chase(cli: &Cli, config: SimConfig) -> Vec<TestResult> {
    println!("--- Chase ---");
    let mut results = Vec::new();

    let mut session = match Session::new(config) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult {
                name: "chase_initialize".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };

    if let Some(prompt) = &cli.prompt {
        let ticket = session.ticket();
        let (tx, rx) = mpsc::channel();
        let generator = PromptConfigGenerator::with_defaults(
            session.config().seed,
            session.config().clone(),
        );
        let prompt = prompt.clone();
        let worker = thread::spawn(move || {
            let _ = tx.send(generator.generate(&prompt));
        });
        let outcome = match rx.recv() {
            Ok(result) => session.apply_generated(ticket, result),
            Err(_) => ApplyOutcome::Stale,
        };
        if worker.join().is_err() {
            warn!("generator thread panicked");
        }
        results.push(TestResult {
            name: "chase_prompt".into(),
            passed: outcome == ApplyOutcome::Applied,
            detail: format!("{:?}", outcome),
        });
    }

    let config = session.config().clone();
    println!(
        "  {}x{} grid, {} prey, {} obstacles, {} (seed {})",
        config.grid_size,
        config.grid_size,
        session.state().prey().len(),
        session.state().obstacles().len(),
        config.algorithm,
        config.seed
    );
    if cli.verbose {
        print!("{}", render(session.state()));
    }

    session.start();
    let interval = Duration::from_millis(cli.interval_ms);
    let mut evaluated = 0;
    while evaluated < cli.max_ticks && session.state().phase() == Phase::Running {
        let before = session.state().log().total_appended();
        let state = session.step();
        evaluated += 1;
        let fresh = (state.log().total_appended() - before) as usize;
        let skip = state.log().len().saturating_sub(fresh);
        for entry in state.log().iter().skip(skip) {
            println!("  [tick {}] {}", entry.tick, entry.message);
        }
        if cli.verbose {
            println!(
                "  tick {}: predator {}, {} prey, reward {}",
                state.tick_count(),
                state.predator(),
                state.prey().len(),
                state.reward()
            );
        }
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }

    let state = session.state();
    info!(
        "chase stopped after {} evaluations: {:?}, reward {}",
        evaluated,
        state.phase(),
        state.reward()
    );
    println!(
        "  {} after {} ticks, {} prey left, reward {}",
        if state.is_finished() { "finished" } else { "stopped" },
        state.tick_count(),
        state.prey().len(),
        state.reward()
    );
    if cli.verbose {
        print!("{}", render(state));
    }

    // Hitting the tick limit is not a failure: prey may be walled off.
    let walkable = state.grid().is_walkable(state.predator())
        && state.prey().iter().all(|p| state.grid().is_walkable(p.position));
    results.push(TestResult {
        name: "chase_run".into(),
        passed: walkable && state.log().len() <= state.log().capacity(),
        detail: format!(
            "{} ticks, phase {:?}, reward {}",
            state.tick_count(),
            state.phase(),
            state.reward()
        ),
    });

    if cli.explain {
        let ticket = session.ticket();
        match session.explanation_request() {
            Some(request) => {
                let direct = manhattan(request.predator_position, request.prey_position);
                let result = TemplateExplainer.explain(&request);
                match session.accept_explanation(ticket, result) {
                    Some(text) => println!("\n  {}\n", text),
                    None => println!("\n  (no explanation available)\n"),
                }
                if cli.verbose {
                    println!("  direct distance {}, path {} steps", direct, request.path.len());
                }
            }
            None => println!("\n  (no path to explain yet)\n"),
        }
    }

    results
}

/// ASCII snapshot: `P` predator, `o` prey, `#` obstacle, `*` last path.
fn render(state: &SimulationState) -> String {
    let size = state.grid_size() as i32;
    let mut out = String::new();
    for y in 0..size {
        out.push_str("  ");
        for x in 0..size {
            let pos = Position::new(x, y);
            let c = if pos == state.predator() {
                'P'
            } else if state.prey().iter().any(|p| p.position == pos) {
                'o'
            } else if state.grid().is_obstacle(pos) {
                '#'
            } else if state.last_path().contains(&pos) {
                '*'
            } else {
                '.'
            };
            out.push(c);
        }
        out.push('\n');
    }
    out
}
