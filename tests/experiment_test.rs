use city_traffic_sim_core::agents::RotaryDiscipline;
use city_traffic_sim_core::experiment::config::{SweepAxis, SweepConfig};
use city_traffic_sim_core::experiment::driver::{
    CancelHandle, GRIDLOCK_STREAK, run_once, run_sweep,
};

fn base_sweep() -> SweepConfig {
    SweepConfig {
        axis: SweepAxis::MaxSpeeds(vec![2]),
        density_pcts: vec![10],
        block_size: 4,
        steps: 200,
        warmup_fraction: 0.2,
        steady_state_fraction: 1.0,
        replicates: 3,
        base_seed: 42,
        ..SweepConfig::default()
    }
}

/// Mean velocity degrades monotonically with density: a sparse system flows,
/// a crowded one queues.
#[test]
fn test_velocity_degrades_with_density() {
    let sparse = run_once(&base_sweep().run_config(0, 10, 0), false).unwrap();
    let crowded = run_once(&base_sweep().run_config(0, 70, 0), false).unwrap();

    assert!(
        sparse.mean_velocity > crowded.mean_velocity,
        "10% density ({}) should flow faster than 70% ({})",
        sparse.mean_velocity,
        crowded.mean_velocity
    );
    assert!(sparse.mean_velocity > 0.5);
    assert!(crowded.mean_velocity < 0.5);
}

/// Committed exits hold cars on the rings longer, so fixed-destination never
/// beats free movement at saturation.
#[test]
fn test_fixed_destination_is_no_faster_than_free_movement() {
    let velocity = |discipline: RotaryDiscipline| -> f64 {
        let mut config = base_sweep();
        config.discipline = discipline;
        let mut total = 0.0;
        for replicate in 0..3 {
            let run = config.run_config(0, 40, replicate);
            total += run_once(&run, false).unwrap().mean_velocity;
        }
        total / 3.0
    };

    let free = velocity(RotaryDiscipline::FreeMovement);
    let fixed = velocity(RotaryDiscipline::FixedDestination);
    assert!(
        free >= fixed,
        "free movement ({}) must not be slower than fixed destination ({})",
        free,
        fixed
    );
}

/// A fully packed lattice cannot move at all, so the gridlock cutoff fires
/// exactly one streak after warmup and the run stops early.
#[test]
fn test_gridlock_short_circuits_the_run() {
    let mut config = base_sweep().run_config(0, 100, 0);
    config.steps = 400;
    config.warmup_fraction = 0.1;

    let record = run_once(&config, true).unwrap();
    assert!(record.gridlocked);
    let expected_stop = config.warmup_ticks() + GRIDLOCK_STREAK;
    assert_eq!(record.ticks_observed as u64, expected_stop);
    assert!((record.ticks_observed as u64) < config.steps);
    assert_eq!(record.mean_velocity, 0.0);

    // Every occupied cell is jammed, and they all belong to clusters.
    let total_cars = record.history.as_ref().unwrap()[0].total_cars;
    assert_eq!(record.jam_cluster_sizes.iter().sum::<usize>(), total_cars);
    assert!(record.largest_jam_cluster > 0);
}

/// Once every replicate of a density gridlocks, higher densities of the same
/// axis value are never scheduled.
#[test]
fn test_saturated_density_cuts_off_the_rest() {
    let mut config = base_sweep();
    config.density_pcts = vec![100, 100];
    config.steps = 120;
    config.warmup_fraction = 0.1;
    config.replicates = 2;

    let outcome = run_sweep(&config, &CancelHandle::new()).unwrap();
    assert_eq!(outcome.points.len(), 1, "the second density is skipped");
    assert_eq!(outcome.points[0].n_gridlocked, 2);
    assert_eq!(outcome.reports[0].completed, 2);
    assert_eq!(outcome.reports[0].skipped, 2);
    assert_eq!(outcome.reports[0].failed, 0);
}

/// Identical configurations and seeds reproduce identical sweeps, including
/// across worker threads.
#[test]
fn test_sweep_results_are_reproducible() {
    let mut config = base_sweep();
    config.density_pcts = vec![10, 30];
    config.axis = SweepAxis::CompliancePcts(vec![50, 100]);

    let first = run_sweep(&config, &CancelHandle::new()).unwrap();
    let second = run_sweep(&config, &CancelHandle::new()).unwrap();

    assert_eq!(first.points.len(), second.points.len());
    for (a, b) in first.points.iter().zip(&second.points) {
        assert_eq!(a.axis_value, b.axis_value);
        assert_eq!(a.density, b.density);
        assert_eq!(a.mean, b.mean);
        assert_eq!(a.std, b.std);
        assert_eq!(a.ci_lower, b.ci_lower);
        assert_eq!(a.ci_upper, b.ci_upper);
        assert_eq!(a.normality_p, b.normality_p);
    }
}

/// Replicate aggregation fills in the confidence interval and counts.
#[test]
fn test_sweep_points_carry_replicate_statistics() {
    let mut config = base_sweep();
    config.replicates = 5;

    let outcome = run_sweep(&config, &CancelHandle::new()).unwrap();
    assert_eq!(outcome.points.len(), 1);
    let point = &outcome.points[0];
    assert_eq!(point.n, 5);
    assert_eq!(point.n_gridlocked, 0);
    assert!(point.ci_lower <= point.mean && point.mean <= point.ci_upper);
    assert!(point.std >= 0.0);
    assert_eq!(point.density, 0.1);
}
