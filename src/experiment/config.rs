use crate::agents::RotaryDiscipline;
use crate::grid::lattice::CityGrid;
use crate::utils::rand::replicate_seed;
use serde::Serialize;
use std::fmt;

/// Custom error type for experiment configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// A configuration field is out of range or empty.
    BadConfig {
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::BadConfig {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BadConfig { field, reason } => {
                write!(f, "bad config field '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Complete description of a single simulation run.
///
/// A run is a pure function of this value: the same `RunConfig` always
/// reproduces the same metric sequence.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    /// Lattice edge length.
    pub grid_size: usize,
    /// Block size, i.e. the road-segment length between crossings.
    pub block_size: usize,
    /// Lattice speed ceiling; compliant cars adopt it.
    pub max_speed: i32,
    /// Share of compliant cars, integer percent.
    pub compliance_pct: u8,
    /// Global car density, integer percent of the drivable cells.
    pub density_pct: u8,
    /// Rotary policy for every car of the run.
    pub discipline: RotaryDiscipline,
    /// Number of ticks to simulate.
    pub steps: u64,
    /// Share of `steps` discarded as warmup before gridlock detection and
    /// steady-state averaging start.
    pub warmup_fraction: f64,
    /// Share of `steps`, counted from the end, entering the steady-state mean.
    pub steady_state_fraction: f64,
    /// Fixed-destination re-commitment probability.
    pub rotary_indecision: f64,
    /// Seed of the run's random generator.
    pub seed: u64,
}

impl RunConfig {
    /// Checks all range constraints. Geometry constraints (size vs block) are
    /// verified later by [`CityGrid::build`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compliance_pct > 100 {
            return Err(ConfigError::new("compliance_pct", "must be within 0..=100"));
        }
        if self.density_pct > 100 {
            return Err(ConfigError::new("density_pct", "must be within 0..=100"));
        }
        if self.max_speed < 1 {
            return Err(ConfigError::new("max_speed", "must be at least 1"));
        }
        if self.steps < 1 {
            return Err(ConfigError::new("steps", "must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.warmup_fraction) {
            return Err(ConfigError::new("warmup_fraction", "must be within [0, 1)"));
        }
        if !(self.steady_state_fraction > 0.0 && self.steady_state_fraction <= 1.0) {
            return Err(ConfigError::new("steady_state_fraction", "must be within (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.rotary_indecision) {
            return Err(ConfigError::new("rotary_indecision", "must be within [0, 1]"));
        }
        Ok(())
    }

    /// The car count this run places on `grid`: the floor of the global
    /// density times the number of drivable cells.
    pub fn car_count(&self, grid: &CityGrid) -> usize {
        self.density_pct as usize * grid.n_drivable_cells() / 100
    }

    /// Ticks discarded as warmup.
    pub fn warmup_ticks(&self) -> u64 {
        (self.steps as f64 * self.warmup_fraction).floor() as u64
    }

    /// Width of the steady-state window in ticks.
    pub fn steady_state_ticks(&self) -> u64 {
        (self.steps as f64 * self.steady_state_fraction).floor() as u64
    }
}

/// The swept parameter of an experiment: exactly one dimension varies besides
/// the density grid.
#[derive(Debug, Clone)]
pub enum SweepAxis {
    /// Vary the road-segment length (block size); the lattice is resized per value.
    RoadLengths(Vec<usize>),
    /// Vary the lattice speed ceiling.
    MaxSpeeds(Vec<i32>),
    /// Vary the share of compliant cars.
    CompliancePcts(Vec<u8>),
}

impl SweepAxis {
    /// The record-file name of the axis.
    pub fn name(&self) -> &'static str {
        match self {
            SweepAxis::RoadLengths(_) => "road_length",
            SweepAxis::MaxSpeeds(_) => "max_speed",
            SweepAxis::CompliancePcts(_) => "compliance_pct",
        }
    }

    /// The axis values as plain numbers, in sweep order.
    pub fn values(&self) -> Vec<f64> {
        match self {
            SweepAxis::RoadLengths(v) => v.iter().map(|&x| x as f64).collect(),
            SweepAxis::MaxSpeeds(v) => v.iter().map(|&x| x as f64).collect(),
            SweepAxis::CompliancePcts(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SweepAxis::RoadLengths(v) => v.is_empty(),
            SweepAxis::MaxSpeeds(v) => v.is_empty(),
            SweepAxis::CompliancePcts(v) => v.is_empty(),
        }
    }
}

/// Complete description of a parameter sweep: one axis, a density grid, and
/// the fixed parameters shared by every run.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// The varied parameter.
    pub axis: SweepAxis,
    /// Density grid, integer percents; processed in ascending order.
    pub density_pcts: Vec<u8>,
    /// Rotary policy, fixed per sweep.
    pub discipline: RotaryDiscipline,
    /// Block size for runs where the axis does not override it.
    pub block_size: usize,
    /// Speed ceiling for runs where the axis does not override it.
    pub max_speed: i32,
    /// Compliance for runs where the axis does not override it.
    pub compliance_pct: u8,
    /// Ticks per run.
    pub steps: u64,
    pub warmup_fraction: f64,
    pub steady_state_fraction: f64,
    /// Independent replicates per sweep point.
    pub replicates: u32,
    /// Base seed; replicate `r` runs with `base_seed + r`.
    pub base_seed: u64,
    /// Fixed-destination re-commitment probability.
    pub rotary_indecision: f64,
    /// Worker threads for replicate execution; 0 keeps the pool default.
    pub thread_limit: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            axis: SweepAxis::RoadLengths(vec![10]),
            density_pcts: (5u8..100).step_by(5).collect(),
            discipline: RotaryDiscipline::FreeMovement,
            block_size: 10,
            max_speed: 2,
            compliance_pct: 100,
            steps: 500,
            warmup_fraction: 0.2,
            steady_state_fraction: 1.0,
            replicates: 5,
            base_seed: 42,
            rotary_indecision: 0.2,
            thread_limit: 0,
        }
    }
}

impl SweepConfig {
    /// Checks all range constraints before any simulation work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.axis.is_empty() {
            return Err(ConfigError::new("axis", "axis values must not be empty"));
        }
        if self.density_pcts.is_empty() {
            return Err(ConfigError::new("density_pcts", "density grid must not be empty"));
        }
        if self.density_pcts.iter().any(|&d| d > 100) {
            return Err(ConfigError::new("density_pcts", "densities must be within 0..=100"));
        }
        if let SweepAxis::RoadLengths(lengths) = &self.axis {
            if lengths.iter().any(|&b| b < 4 || b % 2 != 0) {
                return Err(ConfigError::new("road_lengths", "road lengths must be even and at least 4"));
            }
        }
        if let SweepAxis::MaxSpeeds(speeds) = &self.axis {
            if speeds.iter().any(|&v| v < 1) {
                return Err(ConfigError::new("max_speeds", "speeds must be at least 1"));
            }
        }
        if let SweepAxis::CompliancePcts(pcts) = &self.axis {
            if pcts.iter().any(|&p| p > 100) {
                return Err(ConfigError::new("compliance_pcts", "compliance must be within 0..=100"));
            }
        }
        if self.replicates < 1 {
            return Err(ConfigError::new("replicates", "must be at least 1"));
        }
        // Shared per-run ranges, checked through a template run.
        self.run_config(0, self.density_pcts[0], 0).validate()
    }

    /// Lattice edge length for a given road-segment length: enough blocks for
    /// meaningful statistics without blowing up small-block lattices.
    pub fn grid_size_for(road_length: usize) -> usize {
        let n_blocks = if road_length <= 8 {
            8
        } else if road_length <= 32 {
            12
        } else {
            8
        };
        road_length * n_blocks
    }

    /// The concrete run configuration for one `(axis index, density, replicate)`
    /// combination.
    pub fn run_config(&self, axis_index: usize, density_pct: u8, replicate: u32) -> RunConfig {
        let mut block_size = self.block_size;
        let mut max_speed = self.max_speed;
        let mut compliance_pct = self.compliance_pct;
        match &self.axis {
            SweepAxis::RoadLengths(v) => block_size = v[axis_index],
            SweepAxis::MaxSpeeds(v) => max_speed = v[axis_index],
            SweepAxis::CompliancePcts(v) => compliance_pct = v[axis_index],
        }

        RunConfig {
            grid_size: Self::grid_size_for(block_size),
            block_size,
            max_speed,
            compliance_pct,
            density_pct,
            discipline: self.discipline,
            steps: self.steps,
            warmup_fraction: self.warmup_fraction,
            steady_state_fraction: self.steady_state_fraction,
            rotary_indecision: self.rotary_indecision,
            seed: replicate_seed(self.base_seed, replicate),
        }
    }

    /// The density grid in ascending order, as the driver processes it.
    pub fn sorted_densities(&self) -> Vec<u8> {
        let mut densities = self.density_pcts.clone();
        densities.sort_unstable();
        densities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep() -> SweepConfig {
        SweepConfig::default()
    }

    #[test]
    fn test_validate_accepts_default() {
        sweep().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_empty_axis() {
        let mut cfg = sweep();
        cfg.axis = SweepAxis::MaxSpeeds(vec![]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_percentages() {
        let mut cfg = sweep();
        cfg.density_pcts = vec![50, 101];
        assert!(cfg.validate().is_err());

        let mut cfg = sweep();
        cfg.warmup_fraction = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = sweep();
        cfg.steady_state_fraction = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_axis_overrides_reach_run_configs() {
        let mut cfg = sweep();
        cfg.axis = SweepAxis::MaxSpeeds(vec![1, 5]);
        let run = cfg.run_config(1, 30, 2);
        assert_eq!(run.max_speed, 5);
        assert_eq!(run.block_size, cfg.block_size);
        assert_eq!(run.density_pct, 30);
        assert_eq!(run.seed, cfg.base_seed + 2);
    }

    #[test]
    fn test_grid_size_tiers() {
        assert_eq!(SweepConfig::grid_size_for(8), 64);
        assert_eq!(SweepConfig::grid_size_for(10), 120);
        assert_eq!(SweepConfig::grid_size_for(32), 384);
        assert_eq!(SweepConfig::grid_size_for(64), 512);
    }

    #[test]
    fn test_car_count_floors_density() {
        let grid = CityGrid::build(15, 10, 1).unwrap();
        let run = sweep().run_config(0, 33, 0);
        assert_eq!(run.car_count(&grid), 33 * grid.n_drivable_cells() / 100);
    }
}
