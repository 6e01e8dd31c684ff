//! Boundary to the configuration generator and path explainer.
//!
//! Both collaborators sit outside the simulation. A generator turns free
//! text into explicit positions, which must pass the same validation as a
//! randomly initialized world before they replace anything. An explainer
//! turns a finished path into display text and never touches state.
//!
//! The payloads mirror the generator's JSON schema (camelCase keys), so a
//! remote backend's output can be parsed with [`GeneratedConfig::from_json`].
//! [`PromptConfigGenerator`] and [`TemplateExplainer`] are deterministic
//! offline implementations.
//!
//! ```
//! use ecochase_logic::collaborators::{ConfigGenerator, PromptConfigGenerator};
//!
//! let generator = PromptConfigGenerator::new(7);
//! let generated = generator.generate("a 12x12 maze with 4 prey").unwrap();
//! assert_eq!(generated.grid_size, 12);
//! assert_eq!(generated.prey_initial_positions.len(), 4);
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{SearchAlgorithm, SimConfig, MAX_GRID_SIZE};
use crate::error::{CollaboratorError, ConfigurationError};
use crate::grid::{manhattan, Grid, Position};
use crate::rng::create_rng;
use crate::world::{initialize, Layout};

/// Smallest grid the prompt generator will produce.
pub const GENERATED_MIN_GRID: u32 = 10;
/// Largest grid the prompt generator will produce.
pub const GENERATED_MAX_GRID: u32 = 50;
/// Most prey the prompt generator will produce.
pub const GENERATED_MAX_PREY: usize = 10;

/// Structured output of a configuration generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedConfig {
    pub grid_size: u32,
    pub num_prey: usize,
    pub obstacle_density: f64,
    pub predator_initial_position: Position,
    pub prey_initial_positions: Vec<Position>,
    pub obstacle_positions: Vec<Position>,
}

impl GeneratedConfig {
    pub fn from_json(text: &str) -> Result<Self, CollaboratorError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Explicit layout, checked for internal consistency. Bounds and
    /// overlap are checked when the layout is turned into a state.
    pub fn to_layout(&self) -> Result<Layout, ConfigurationError> {
        if self.num_prey != self.prey_initial_positions.len() {
            return Err(ConfigurationError::CountMismatch {
                declared: self.num_prey,
                actual: self.prey_initial_positions.len(),
            });
        }
        if !self.obstacle_density.is_finite() || !(0.0..=1.0).contains(&self.obstacle_density) {
            return Err(ConfigurationError::InvalidDensity(self.obstacle_density));
        }
        Ok(Layout {
            grid_size: self.grid_size,
            predator: self.predator_initial_position,
            prey: self.prey_initial_positions.clone(),
            obstacles: self.obstacle_positions.clone(),
        })
    }

    /// `base` with this configuration's size, prey count and density.
    /// Algorithm, finish policy, seed and log capacity carry over.
    pub fn merge_into(&self, base: &SimConfig) -> SimConfig {
        SimConfig {
            grid_size: self.grid_size,
            num_prey: self.num_prey,
            obstacle_density: self.obstacle_density,
            ..base.clone()
        }
    }
}

/// Snapshot handed to a path explainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationRequest {
    pub grid_size: u32,
    pub predator_position: Position,
    pub prey_position: Position,
    pub obstacle_positions: Vec<Position>,
    pub search_algorithm: SearchAlgorithm,
    pub path: Vec<Position>,
}

impl ExplanationRequest {
    /// Reject snapshots that do not describe a route on their own grid:
    /// endpoints off the grid, or a path that does not end at the prey or
    /// is shorter than the Manhattan distance it has to cover.
    pub fn validate(&self) -> Result<(), CollaboratorError> {
        if self.grid_size > MAX_GRID_SIZE {
            return Err(CollaboratorError::Malformed(format!(
                "grid size {} exceeds {}",
                self.grid_size, MAX_GRID_SIZE
            )));
        }
        let grid = Grid::open(self.grid_size);
        grid.check_position(self.predator_position)
            .and_then(|_| grid.check_position(self.prey_position))
            .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        if self.path.is_empty() {
            return Ok(());
        }
        let direct = manhattan(self.predator_position, self.prey_position) as usize;
        if self.path.last() != Some(&self.prey_position) {
            return Err(CollaboratorError::Malformed(format!(
                "path does not end at the prey at {}",
                self.prey_position
            )));
        }
        if self.path.len() < direct {
            return Err(CollaboratorError::Malformed(format!(
                "{}-step path is shorter than the distance {} it covers",
                self.path.len(),
                direct
            )));
        }
        Ok(())
    }
}

/// Free text in, explicit world out.
pub trait ConfigGenerator {
    fn generate(&self, prompt: &str) -> Result<GeneratedConfig, CollaboratorError>;
}

/// Path snapshot in, display text out.
pub trait PathExplainer {
    fn explain(&self, request: &ExplanationRequest) -> Result<String, CollaboratorError>;
}

/// Offline generator that reads sizes, prey counts and density words out
/// of the prompt and lays the world out with a seeded initializer.
///
/// | Prompt fragment | Effect |
/// |-----------------|--------|
/// | `30x30`, `30 by 30`, `grid 30`, `size 30` | grid size |
/// | `5 prey` | prey count |
/// | `25%` | obstacle density 0.25 |
/// | `empty`, `open` | density 0.0 |
/// | `sparse`, `few`, `low` | density 0.1 |
/// | `medium`, `moderate`, `some` | density 0.2 |
/// | `dense`, `high`, `many`, `maze` | density 0.35 |
#[derive(Debug, Clone)]
pub struct PromptConfigGenerator {
    seed: u64,
    defaults: SimConfig,
}

impl PromptConfigGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            defaults: SimConfig::default(),
        }
    }

    pub fn with_defaults(seed: u64, defaults: SimConfig) -> Self {
        Self { seed, defaults }
    }

    /// The run configuration a prompt describes.
    pub fn interpret(&self, prompt: &str) -> SimConfig {
        let words: Vec<String> = prompt
            .to_lowercase()
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == '!' || c == '?')
            .map(|w| w.trim_matches(|c: char| c == '.' || c == '(' || c == ')').to_string())
            .filter(|w| !w.is_empty())
            .collect();

        let mut config = SimConfig {
            seed: self.seed,
            ..self.defaults.clone()
        };

        for (i, word) in words.iter().enumerate() {
            let next = words.get(i + 1).map(String::as_str);
            let after = words.get(i + 2).map(String::as_str);

            if let Some((a, b)) = word.split_once('x') {
                if let (Ok(a), Ok(_)) = (a.parse::<u32>(), b.parse::<u32>()) {
                    config.grid_size = a;
                    continue;
                }
            }
            if let Ok(n) = word.parse::<u32>() {
                match next {
                    Some("by") if after.and_then(|w| w.parse::<u32>().ok()).is_some() => {
                        config.grid_size = n;
                    }
                    Some(w) if w.starts_with("prey") => config.num_prey = n as usize,
                    _ => {}
                }
                continue;
            }
            if matches!(word.as_str(), "grid" | "size") {
                if let Some(n) = next.and_then(|w| w.parse::<u32>().ok()) {
                    config.grid_size = n;
                }
                continue;
            }
            if let Some(pct) = word.strip_suffix('%') {
                if let Ok(pct) = pct.parse::<f64>() {
                    config.obstacle_density = pct / 100.0;
                }
                continue;
            }
            if let Some(density) = density_word(word) {
                config.obstacle_density = density;
            }
        }

        config.grid_size = config
            .grid_size
            .clamp(GENERATED_MIN_GRID, GENERATED_MAX_GRID);
        config.num_prey = config.num_prey.min(GENERATED_MAX_PREY);
        config.obstacle_density = config.obstacle_density.clamp(0.0, 0.5);
        config
    }
}

fn density_word(word: &str) -> Option<f64> {
    match word {
        "empty" | "open" => Some(0.0),
        "sparse" | "few" | "low" => Some(0.1),
        "medium" | "moderate" | "some" => Some(0.2),
        "dense" | "high" | "many" | "maze" => Some(0.35),
        _ => None,
    }
}

impl ConfigGenerator for PromptConfigGenerator {
    fn generate(&self, prompt: &str) -> Result<GeneratedConfig, CollaboratorError> {
        let config = self.interpret(prompt);
        let state = initialize(&config, &mut create_rng(config.seed))
            .map_err(|e| CollaboratorError::Malformed(format!("cannot lay out prompt: {}", e)))?;
        Ok(GeneratedConfig {
            grid_size: config.grid_size,
            num_prey: state.prey().len(),
            obstacle_density: config.obstacle_density,
            predator_initial_position: state.predator(),
            prey_initial_positions: state.prey().iter().map(|p| p.position).collect(),
            obstacle_positions: state.obstacles().iter().copied().collect(),
        })
    }
}

/// Offline explainer producing a fixed-form description of the route.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateExplainer;

impl PathExplainer for TemplateExplainer {
    fn explain(&self, request: &ExplanationRequest) -> Result<String, CollaboratorError> {
        request.validate()?;
        let from = request.predator_position;
        let to = request.prey_position;
        let direct = manhattan(from, to) as usize;
        let n = request.grid_size;

        if request.path.is_empty() {
            return Ok(format!(
                "{} found no route from {} to the prey at {} on the {}x{} grid: \
                 the {} obstacles wall the prey off, so the predator holds its position.",
                request.search_algorithm,
                from,
                to,
                n,
                n,
                request.obstacle_positions.len()
            ));
        }

        let steps = request.path.len();
        let shape = if steps == direct {
            "matches the Manhattan distance, so no obstacle forced a detour".to_string()
        } else {
            format!(
                "is {} steps longer than the Manhattan distance of {} because obstacles block the direct line",
                steps - direct,
                direct
            )
        };
        let method = match request.search_algorithm {
            SearchAlgorithm::Bfs => {
                "BFS expands cells in rings of increasing step count, so the first time it \
                 reaches the prey the route is a shortest one"
            }
            SearchAlgorithm::AStar => {
                "A* orders its frontier by steps taken plus Manhattan distance remaining; that \
                 estimate never overshoots on a 4-connected grid, so the route is a shortest one \
                 while fewer cells are expanded than BFS would need"
            }
        };
        Ok(format!(
            "{} chose a {}-step route from {} to the prey at {} on the {}x{} grid. \
             The route {}. {}.",
            request.search_algorithm, steps, from, to, n, n, shape, method
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunOptions;
    use crate::world::from_layout;

    #[test]
    fn test_parse_generator_json() {
        let json = r#"{
            "gridSize": 10,
            "numPrey": 2,
            "obstacleDensity": 0.1,
            "predatorInitialPosition": {"x": 0, "y": 5},
            "preyInitialPositions": [{"x": 7, "y": 2}, {"x": 9, "y": 9}],
            "obstaclePositions": [{"x": 3, "y": 3}]
        }"#;
        let generated = GeneratedConfig::from_json(json).unwrap();
        assert_eq!(generated.grid_size, 10);
        assert_eq!(generated.prey_initial_positions[1], Position::new(9, 9));
        let layout = generated.to_layout().unwrap();
        assert_eq!(layout.obstacles, vec![Position::new(3, 3)]);
    }

    #[test]
    fn test_malformed_json() {
        let err = GeneratedConfig::from_json(r#"{"gridSize": "big"}"#).unwrap_err();
        assert!(matches!(err, CollaboratorError::Malformed(_)));
    }

    #[test]
    fn test_count_mismatch() {
        let generated = GeneratedConfig {
            grid_size: 10,
            num_prey: 3,
            obstacle_density: 0.0,
            predator_initial_position: Position::new(0, 5),
            prey_initial_positions: vec![Position::new(6, 6)],
            obstacle_positions: vec![],
        };
        assert_eq!(
            generated.to_layout(),
            Err(ConfigurationError::CountMismatch {
                declared: 3,
                actual: 1,
            })
        );
    }

    #[test]
    fn test_merge_keeps_algorithm() {
        let generated = PromptConfigGenerator::new(1).generate("15x15, 2 prey").unwrap();
        let base = SimConfig {
            algorithm: SearchAlgorithm::Bfs,
            ..Default::default()
        };
        let merged = generated.merge_into(&base);
        assert_eq!(merged.grid_size, 15);
        assert_eq!(merged.num_prey, 2);
        assert_eq!(merged.algorithm, SearchAlgorithm::Bfs);
    }

    #[test]
    fn test_interpret_prompt() {
        let generator = PromptConfigGenerator::new(3);
        let config = generator.interpret("A dense 30 by 30 field with 6 prey.");
        assert_eq!(config.grid_size, 30);
        assert_eq!(config.num_prey, 6);
        assert_eq!(config.obstacle_density, 0.35);
        assert_eq!(config.seed, 3);

        let config = generator.interpret("grid 25, empty, 1 prey");
        assert_eq!(config.grid_size, 25);
        assert_eq!(config.obstacle_density, 0.0);
        assert_eq!(config.num_prey, 1);

        let config = generator.interpret("size 40 with 15% obstacles");
        assert_eq!(config.grid_size, 40);
        assert!((config.obstacle_density - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_interpret_clamps() {
        let generator = PromptConfigGenerator::new(3);
        let config = generator.interpret("a 500x500 grid with 99 prey and 90% walls");
        assert_eq!(config.grid_size, GENERATED_MAX_GRID);
        assert_eq!(config.num_prey, GENERATED_MAX_PREY);
        assert_eq!(config.obstacle_density, 0.5);
    }

    #[test]
    fn test_interpret_defaults() {
        let config = PromptConfigGenerator::new(9).interpret("surprise me");
        let defaults = SimConfig::default();
        assert_eq!(config.grid_size, defaults.grid_size);
        assert_eq!(config.num_prey, defaults.num_prey);
    }

    #[test]
    fn test_generated_layout_is_valid() {
        let generator = PromptConfigGenerator::new(11);
        for prompt in ["10x10 sparse 3 prey", "50x50 maze 10 prey", "open 20x20"] {
            let generated = generator.generate(prompt).unwrap();
            let layout = generated.to_layout().unwrap();
            assert!(from_layout(&layout, RunOptions::default()).is_ok(), "{}", prompt);
        }
    }

    #[test]
    fn test_generator_is_deterministic() {
        let a = PromptConfigGenerator::new(5).generate("12x12 4 prey").unwrap();
        let b = PromptConfigGenerator::new(5).generate("12x12 4 prey").unwrap();
        assert_eq!(a, b);
    }

    fn request(path: Vec<Position>) -> ExplanationRequest {
        ExplanationRequest {
            grid_size: 5,
            predator_position: Position::new(0, 0),
            prey_position: Position::new(0, 4),
            obstacle_positions: (0..4).map(|x| Position::new(x, 2)).collect(),
            search_algorithm: SearchAlgorithm::AStar,
            path,
        }
    }

    #[test]
    fn test_explain_detour() {
        let path = crate::pathfinding::astar(
            Position::new(0, 0),
            Position::new(0, 4),
            &crate::grid::Grid::new(5, (0..4).map(|x| Position::new(x, 2))),
        )
        .unwrap();
        let text = TemplateExplainer.explain(&request(path)).unwrap();
        assert!(text.starts_with("A* chose a 12-step route"));
        assert!(text.contains("8 steps longer than the Manhattan distance of 4"));
    }

    #[test]
    fn test_explain_rejects_short_path() {
        let json = r#"{
            "gridSize": 10,
            "predatorPosition": {"x": 0, "y": 0},
            "preyPosition": {"x": 9, "y": 9},
            "obstaclePositions": [],
            "searchAlgorithm": "bfs",
            "path": [{"x": 0, "y": 1}]
        }"#;
        let request: ExplanationRequest = serde_json::from_str(json).unwrap();
        let err = TemplateExplainer.explain(&request).unwrap_err();
        assert!(matches!(err, CollaboratorError::Malformed(_)));

        let mut ends_elsewhere = request.clone();
        ends_elsewhere.path = (1..=18).map(|i| Position::new(0, i.min(9))).collect();
        assert!(TemplateExplainer.explain(&ends_elsewhere).is_err());
    }

    #[test]
    fn test_explain_rejects_off_grid_endpoints() {
        let mut far = request(vec![]);
        far.predator_position = Position::new(i32::MIN, i32::MAX);
        assert!(matches!(
            TemplateExplainer.explain(&far),
            Err(CollaboratorError::Malformed(_))
        ));

        let mut huge = request(vec![]);
        huge.grid_size = u32::MAX;
        huge.predator_position = Position::new(i32::MIN, 0);
        assert!(TemplateExplainer.explain(&huge).is_err());

        let mut outside = request(vec![Position::new(0, 5)]);
        outside.prey_position = Position::new(0, 5);
        assert!(TemplateExplainer.explain(&outside).is_err());
    }

    #[test]
    fn test_explain_no_path() {
        let text = TemplateExplainer.explain(&request(vec![])).unwrap();
        assert!(text.contains("found no route"));
        assert!(text.contains("4 obstacles"));
    }
}
