use crate::agents::RotaryDiscipline;
use crate::experiment::config::{ConfigError, RunConfig, SweepConfig};
use crate::experiment::stats;
use crate::grid::lattice::{CityGrid, GeometryError};
use crate::metrics::density::TickMetrics;
use crate::simulation::session::{Simulation, SimulationError};
use crate::verbose::{
    EVENT_BUILD, EVENT_DENSITY_SKIPPED, EVENT_GRIDLOCK, EVENT_RUN_DONE, EVENT_RUN_FAILED,
    EVENT_RUN_START, EVENT_SWEEP_DONE, EVENT_SWEEP_POINT, EVENT_SWEEP_START,
};
use crate::{log_additional, log_main};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Consecutive motionless ticks (after warmup) that end a run as gridlocked.
pub const GRIDLOCK_STREAK: u64 = 50;

/// Unified error type for experiment execution.
#[derive(Debug)]
pub enum RunError {
    Config(ConfigError),
    Geometry(GeometryError),
    Simulation(SimulationError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Config(e) => write!(f, "configuration error: {}", e),
            RunError::Geometry(e) => write!(f, "geometry error: {}", e),
            RunError::Simulation(e) => write!(f, "simulation error: {}", e),
        }
    }
}

impl std::error::Error for RunError {}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        RunError::Config(e)
    }
}

impl From<GeometryError> for RunError {
    fn from(e: GeometryError) -> Self {
        RunError::Geometry(e)
    }
}

impl From<SimulationError> for RunError {
    fn from(e: SimulationError) -> Self {
        RunError::Simulation(e)
    }
}

/// Everything one finished run reports back.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub config: RunConfig,
    /// True when the run hit the gridlock cutoff before its tick budget.
    pub gridlocked: bool,
    /// Steady-state mean of `average_velocity`; see [`steady_state_mean`].
    pub mean_velocity: f64,
    /// Ticks actually executed (shorter than `config.steps` on gridlock).
    pub ticks_observed: usize,
    /// Jam-cluster sizes at the end of the run, sorted descending.
    pub jam_cluster_sizes: Vec<usize>,
    pub largest_jam_cluster: usize,
    /// Full per-tick history; retained only when explicitly requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<TickMetrics>>,
}

/// Best-effort cancellation for a running sweep: already started runs finish,
/// no further runs are scheduled.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        CancelHandle::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Aggregated replicate statistics of one `(axis value, density)` sweep point.
#[derive(Debug, Clone, Serialize)]
pub struct SweepPointRecord {
    /// Name of the swept parameter.
    pub axis: String,
    pub axis_value: f64,
    /// Global density as a 0..1 decimal.
    pub density: f64,
    pub discipline: RotaryDiscipline,
    /// Replicates that finished without error.
    pub n: usize,
    /// Of those, how many ended gridlocked.
    pub n_gridlocked: usize,
    pub mean: f64,
    pub std: f64,
    pub std_error: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// Absent when the normality test could not run; serializes as an empty
    /// CSV field and a JSON null.
    pub normality_p: Option<f64>,
}

/// Per-axis-value completion report of a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct AxisReport {
    pub axis_value: f64,
    /// Runs that finished (gridlocked or not).
    pub completed: usize,
    /// Runs never scheduled: densities above an all-gridlocked one, or cancellation.
    pub skipped: usize,
    /// Runs aborted by an invariant violation or bad geometry.
    pub failed: usize,
}

/// The complete result of one sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub points: Vec<SweepPointRecord>,
    pub reports: Vec<AxisReport>,
}

/// Executes a single run to completion or gridlock.
///
/// The run is a pure function of its configuration; no state survives it
/// except the returned record. Set `keep_history` to retain the full per-tick
/// metric sequence (experiments usually do not, to bound memory).
pub fn run_once(config: &RunConfig, keep_history: bool) -> Result<RunRecord, RunError> {
    config.validate()?;
    log_additional!(
        EVENT_RUN_START,
        "run starting",
        seed = config.seed,
        density_pct = config.density_pct,
        grid_size = config.grid_size
    );
    let grid = CityGrid::build(config.grid_size, config.block_size, config.max_speed)?;
    log_additional!(
        EVENT_BUILD,
        "lattice built",
        size = grid.size(),
        road_cells = grid.n_road_cells(),
        intersection_cells = grid.n_intersection_cells()
    );
    let car_count = config.car_count(&grid);

    let mut sim = Simulation::new(grid, config.discipline, config.seed)
        .with_indecision(config.rotary_indecision);
    sim.populate(car_count, config.compliance_pct)?;

    let warmup_ticks = config.warmup_ticks();
    let mut zero_streak = 0u64;
    let mut gridlocked = false;
    sim.run(config.steps, |tick, metrics| {
        if tick > warmup_ticks {
            if metrics.cells_moved == 0 {
                zero_streak += 1;
            } else {
                zero_streak = 0;
            }
            if zero_streak >= GRIDLOCK_STREAK {
                gridlocked = true;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    })?;

    if gridlocked {
        log_additional!(
            EVENT_GRIDLOCK,
            "run gridlocked",
            seed = config.seed,
            density_pct = config.density_pct,
            ticks = sim.ticks()
        );
    }

    let history = sim.tracker().history();
    let ticks_observed = history.len();
    let mean_velocity = steady_state_mean(history, config);
    let jam_cluster_sizes = sim.jam_cluster_sizes();

    log_additional!(
        EVENT_RUN_DONE,
        "run finished",
        seed = config.seed,
        density_pct = config.density_pct,
        mean_velocity = mean_velocity,
        gridlocked = gridlocked
    );

    Ok(RunRecord {
        config: config.clone(),
        gridlocked,
        mean_velocity,
        ticks_observed,
        largest_jam_cluster: jam_cluster_sizes.first().copied().unwrap_or(0),
        jam_cluster_sizes,
        history: keep_history.then(|| history.to_vec()),
    })
}

/// Mean `average_velocity` over the steady-state window: the last
/// `steady_state_fraction * steps` ticks, but never anything before
/// `warmup_fraction * steps`. An empty window yields 0.
pub fn steady_state_mean(history: &[TickMetrics], config: &RunConfig) -> f64 {
    let observed = history.len();
    let warmup = config.warmup_ticks() as usize;
    let window = config.steady_state_ticks() as usize;
    let start = warmup.max(observed.saturating_sub(window));
    if start >= observed {
        return 0.0;
    }
    stats::mean(
        &history[start..]
            .iter()
            .map(|m| m.average_velocity)
            .collect::<Vec<_>>(),
    )
}

/// Executes a full parameter sweep.
///
/// For every axis value the density grid is processed in ascending order;
/// the replicates of one sweep point run in parallel on the rayon pool.
/// When every replicate of a density gridlocks, the remaining higher
/// densities of that axis value are skipped (they are monotonically worse).
/// Failed replicates are reported and excluded from aggregation without
/// aborting the sweep.
pub fn run_sweep(config: &SweepConfig, cancel: &CancelHandle) -> Result<SweepOutcome, RunError> {
    config.validate()?;
    if config.thread_limit > 0 {
        // Tolerates an already-initialized pool, e.g. across sweeps in one process.
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(config.thread_limit)
            .build_global();
    }

    let axis_values = config.axis.values();
    let densities = config.sorted_densities();
    let replicates = config.replicates;

    log_main!(
        EVENT_SWEEP_START,
        "sweep started",
        axis = config.axis.name(),
        axis_points = axis_values.len(),
        densities = densities.len(),
        replicates = replicates
    );

    let mut points = Vec::new();
    let mut reports = Vec::new();

    for (axis_index, &axis_value) in axis_values.iter().enumerate() {
        let mut report = AxisReport {
            axis_value,
            completed: 0,
            skipped: 0,
            failed: 0,
        };
        let mut saturated = false;

        for &density in &densities {
            if saturated || cancel.is_cancelled() {
                report.skipped += replicates as usize;
                continue;
            }

            let run_configs: Vec<RunConfig> = (0..replicates)
                .map(|r| config.run_config(axis_index, density, r))
                .collect();
            let results: Vec<Result<RunRecord, RunError>> = run_configs
                .par_iter()
                .map(|rc| run_once(rc, false))
                .collect();

            let mut velocities = Vec::with_capacity(results.len());
            let mut n_gridlocked = 0usize;
            for result in results {
                match result {
                    Ok(record) => {
                        if record.gridlocked {
                            n_gridlocked += 1;
                        }
                        velocities.push(record.mean_velocity);
                        report.completed += 1;
                    }
                    Err(error) => {
                        report.failed += 1;
                        log_main!(
                            EVENT_RUN_FAILED,
                            "replicate failed",
                            axis_value = axis_value,
                            density_pct = density,
                            error = error.to_string()
                        );
                    }
                }
            }

            if velocities.is_empty() {
                continue;
            }

            let agg = stats::aggregate(&velocities);
            log_additional!(
                EVENT_SWEEP_POINT,
                "sweep point aggregated",
                axis_value = axis_value,
                density_pct = density,
                mean_velocity = agg.mean,
                gridlocked = n_gridlocked
            );
            points.push(SweepPointRecord {
                axis: config.axis.name().to_string(),
                axis_value,
                density: density as f64 / 100.0,
                discipline: config.discipline,
                n: agg.n,
                n_gridlocked,
                mean: agg.mean,
                std: agg.std,
                std_error: agg.std_error,
                ci_lower: agg.ci_lower,
                ci_upper: agg.ci_upper,
                normality_p: agg.normality_p,
            });

            if n_gridlocked == velocities.len() {
                saturated = true;
                log_additional!(
                    EVENT_DENSITY_SKIPPED,
                    "all replicates gridlocked, skipping higher densities",
                    axis_value = axis_value,
                    density_pct = density
                );
            }
        }

        reports.push(report);
    }

    log_main!(
        EVENT_SWEEP_DONE,
        "sweep finished",
        points = points.len(),
        completed = reports.iter().map(|r| r.completed).sum::<usize>(),
        skipped = reports.iter().map(|r| r.skipped).sum::<usize>(),
        failed = reports.iter().map(|r| r.failed).sum::<usize>()
    );

    Ok(SweepOutcome { points, reports })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::config::SweepAxis;

    fn small_sweep() -> SweepConfig {
        SweepConfig {
            axis: SweepAxis::MaxSpeeds(vec![2]),
            density_pcts: vec![10],
            block_size: 4,
            steps: 60,
            warmup_fraction: 0.2,
            steady_state_fraction: 0.5,
            replicates: 3,
            base_seed: 42,
            ..SweepConfig::default()
        }
    }

    #[test]
    fn test_run_once_executes_all_ticks_at_low_density() {
        let config = small_sweep().run_config(0, 10, 0);
        let record = run_once(&config, true).unwrap();
        assert!(!record.gridlocked);
        assert_eq!(record.ticks_observed, 60);
        assert!(record.mean_velocity > 0.0);
        let history = record.history.unwrap();
        assert_eq!(history.len(), 60);
        // Flow identity holds on every tick.
        for m in &history {
            assert!((m.traffic_flow - m.global_density * m.average_velocity).abs() < 1e-12);
        }
    }

    #[test]
    fn test_steady_state_window_respects_warmup() {
        let config = small_sweep().run_config(0, 10, 0);
        let record = run_once(&config, true).unwrap();
        let history = record.history.unwrap();
        // steady fraction 0.5 of 60 steps: last 30 ticks, warmup 12 < 30 start.
        let expected = stats::mean(
            &history[30..].iter().map(|m| m.average_velocity).collect::<Vec<_>>(),
        );
        assert_eq!(record.mean_velocity, expected);
    }

    #[test]
    fn test_sweep_produces_one_point_per_density() {
        let outcome = run_sweep(&small_sweep(), &CancelHandle::new()).unwrap();
        assert_eq!(outcome.points.len(), 1);
        let point = &outcome.points[0];
        assert_eq!(point.n, 3);
        assert_eq!(point.axis, "max_speed");
        assert!((point.density - 0.1).abs() < 1e-12);
        assert_eq!(outcome.reports[0].completed, 3);
        assert_eq!(outcome.reports[0].skipped, 0);
    }

    #[test]
    fn test_cancel_skips_everything() {
        let cancel = CancelHandle::new();
        cancel.cancel();
        let outcome = run_sweep(&small_sweep(), &cancel).unwrap();
        assert!(outcome.points.is_empty());
        assert_eq!(outcome.reports[0].skipped, 3);
    }

    #[test]
    fn test_sweeps_are_deterministic() {
        let a = run_sweep(&small_sweep(), &CancelHandle::new()).unwrap();
        let b = run_sweep(&small_sweep(), &CancelHandle::new()).unwrap();
        let means_a: Vec<f64> = a.points.iter().map(|p| p.mean).collect();
        let means_b: Vec<f64> = b.points.iter().map(|p| p.mean).collect();
        assert_eq!(means_a, means_b);
    }
}
