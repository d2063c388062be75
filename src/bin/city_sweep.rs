use anyhow::{Context, bail};
use city_traffic_sim_core::agents::RotaryDiscipline;
use city_traffic_sim_core::experiment::config::{SweepAxis, SweepConfig};
use city_traffic_sim_core::experiment::driver::{CancelHandle, run_sweep};
use city_traffic_sim_core::experiment::writer::{self, SweepMetadata};
use city_traffic_sim_core::verbose::{VerboseLevel, set_verbose_level};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(
    name = "city_sweep",
    about = "Parameter sweeps for the rotary-lattice city traffic simulator"
)]
struct SweepOpts {
    // AXIS ----------------------------------------------------------------------------------------
    /// Sweep over road-segment lengths (block sizes); exactly one axis must be given
    #[clap(long, value_delimiter = ',')]
    road_lengths: Vec<usize>,

    /// Sweep over lattice speed ceilings
    #[clap(long, value_delimiter = ',')]
    max_speeds: Vec<i32>,

    /// Sweep over compliance percentages
    #[clap(long, value_delimiter = ',')]
    compliance_pcts: Vec<u8>,

    /// Density grid in integer percent, processed ascending
    #[clap(long, value_delimiter = ',', default_value = "5,10,15,20,25,30,35,40,45,50,55,60,65,70,75,80,85,90,95")]
    densities: Vec<u8>,

    // FIXED PARAMETERS ----------------------------------------------------------------------------
    /// Rotary policy: "free" or "fixed"
    #[clap(long, default_value = "free")]
    discipline: String,

    /// Block size where the axis does not override it
    #[clap(long, default_value = "10")]
    block_size: usize,

    /// Speed ceiling where the axis does not override it
    #[clap(long, default_value = "2")]
    max_speed: i32,

    /// Compliance percentage where the axis does not override it
    #[clap(long, default_value = "100")]
    compliance: u8,

    /// Ticks per run
    #[clap(long, default_value = "500")]
    steps: u64,

    /// Warmup fraction in [0, 1)
    #[clap(long, default_value = "0.2")]
    warmup: f64,

    /// Steady-state fraction in (0, 1]
    #[clap(long, default_value = "1.0")]
    steady: f64,

    /// Replicates per sweep point
    #[clap(long, default_value = "5")]
    replicates: u32,

    /// Base seed; replicate r runs with base_seed + r
    #[clap(long, default_value = "42")]
    seed: u64,

    /// Fixed-destination re-commitment probability
    #[clap(long, default_value = "0.2")]
    indecision: f64,

    /// Worker threads for replicates; 0 keeps the pool default
    #[clap(long, default_value = "0")]
    threads: usize,

    // OUTPUT --------------------------------------------------------------------------------------
    /// Output directory; falls back to $OUTPUT_DIR, then ./data
    #[clap(long)]
    output_dir: Option<PathBuf>,

    /// Logging level: none, main, additional, detailed, all
    #[clap(long, default_value = "main")]
    verbose: String,
}

fn parse_discipline(value: &str) -> anyhow::Result<RotaryDiscipline> {
    match value {
        "free" | "free-movement" => Ok(RotaryDiscipline::FreeMovement),
        "fixed" | "fixed-destination" => Ok(RotaryDiscipline::FixedDestination),
        other => bail!("unknown discipline '{}', expected 'free' or 'fixed'", other),
    }
}

fn parse_verbose(value: &str) -> anyhow::Result<VerboseLevel> {
    match value {
        "none" => Ok(VerboseLevel::None),
        "main" => Ok(VerboseLevel::Main),
        "additional" => Ok(VerboseLevel::Additional),
        "detailed" => Ok(VerboseLevel::Detailed),
        "all" => Ok(VerboseLevel::All),
        other => bail!("unknown verbose level '{}'", other),
    }
}

fn build_axis(opts: &SweepOpts) -> anyhow::Result<SweepAxis> {
    let mut axes = Vec::new();
    if !opts.road_lengths.is_empty() {
        axes.push(SweepAxis::RoadLengths(opts.road_lengths.clone()));
    }
    if !opts.max_speeds.is_empty() {
        axes.push(SweepAxis::MaxSpeeds(opts.max_speeds.clone()));
    }
    if !opts.compliance_pcts.is_empty() {
        axes.push(SweepAxis::CompliancePcts(opts.compliance_pcts.clone()));
    }
    match axes.len() {
        1 => Ok(axes.remove(0)),
        0 => bail!("no sweep axis given: pass one of --road-lengths, --max-speeds, --compliance-pcts"),
        _ => bail!("more than one sweep axis given: pass exactly one"),
    }
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    let opts = SweepOpts::parse();
    set_verbose_level(parse_verbose(&opts.verbose)?);

    let config = SweepConfig {
        axis: build_axis(&opts)?,
        density_pcts: opts.densities.clone(),
        discipline: parse_discipline(&opts.discipline)?,
        block_size: opts.block_size,
        max_speed: opts.max_speed,
        compliance_pct: opts.compliance,
        steps: opts.steps,
        warmup_fraction: opts.warmup,
        steady_state_fraction: opts.steady,
        replicates: opts.replicates,
        base_seed: opts.seed,
        rotary_indecision: opts.indecision,
        thread_limit: opts.threads,
    };

    // EXECUTION -----------------------------------------------------------------------------------
    let outcome = run_sweep(&config, &CancelHandle::new()).context("sweep failed")?;

    // POST-PROCESSING -----------------------------------------------------------------------------
    let out_dir = opts.output_dir.clone().unwrap_or_else(writer::default_output_dir);
    let csv_path = out_dir.join("sweep.csv");
    let json_path = out_dir.join("sweep.json");
    writer::write_csv(&csv_path, &outcome).context("could not persist CSV results")?;
    let metadata = SweepMetadata::for_sweep(&config);
    writer::write_json(&json_path, &metadata, &outcome)
        .context("could not persist JSON results")?;

    println!("Results written to {} and {}", csv_path.display(), json_path.display());
    for report in &outcome.reports {
        println!(
            "axis value {:>8}: {} completed, {} skipped, {} failed",
            report.axis_value, report.completed, report.skipped, report.failed
        );
    }

    Ok(())
}
