use crate::experiment::config::SweepConfig;
use crate::experiment::driver::SweepOutcome;
use crate::verbose::{EVENT_WRITE_CSV, EVENT_WRITE_JSON};
use crate::log_main;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Custom error type for result persistence.
#[derive(Debug)]
pub enum WriterError {
    /// Creating, writing or flushing an output file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Encoding records into CSV or JSON failed.
    Encode { path: PathBuf, reason: String },
}

impl fmt::Display for WriterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterError::Io { path, source } => {
                write!(f, "failed to write '{}': {}", path.display(), source)
            }
            WriterError::Encode { path, reason } => {
                write!(f, "failed to encode '{}': {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for WriterError {}

/// The output directory: `$OUTPUT_DIR` when set, `./data` otherwise.
pub fn default_output_dir() -> PathBuf {
    std::env::var_os("OUTPUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Descriptors of the statistical methods behind the aggregated columns.
#[derive(Debug, Clone, Serialize)]
pub struct MethodDescriptors {
    pub deviation: &'static str,
    pub confidence_interval: &'static str,
    pub normality_test: &'static str,
}

impl Default for MethodDescriptors {
    fn default() -> Self {
        MethodDescriptors {
            deviation: "sample standard deviation (n-1)",
            confidence_interval: "Student-t, 95%, df = n-1",
            normality_test: "Shapiro-Wilk (Royston AS R94), n >= 3",
        }
    }
}

/// The `metadata` section of the structured result document.
#[derive(Debug, Clone, Serialize)]
pub struct SweepMetadata {
    pub sweep_id: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    pub axis: String,
    pub axis_values: Vec<f64>,
    /// Densities as 0..1 decimals, ascending.
    pub densities: Vec<f64>,
    pub discipline: String,
    pub steps: u64,
    pub replicates: u32,
    pub base_seed: u64,
    pub methods: MethodDescriptors,
}

impl SweepMetadata {
    /// Captures the metadata of a sweep at write time.
    pub fn for_sweep(config: &SweepConfig) -> Self {
        SweepMetadata {
            sweep_id: Uuid::new_v4().to_string(),
            created_at: Utc::now().to_rfc3339(),
            axis: config.axis.name().to_string(),
            axis_values: config.axis.values(),
            densities: config
                .sorted_densities()
                .iter()
                .map(|&d| d as f64 / 100.0)
                .collect(),
            discipline: config.discipline.to_string(),
            steps: config.steps,
            replicates: config.replicates,
            base_seed: config.base_seed,
            methods: MethodDescriptors::default(),
        }
    }
}

/// The full structured result document: metadata plus every sweep point and
/// per-axis report.
#[derive(Debug, Clone, Serialize)]
pub struct SweepDocument<'a> {
    pub metadata: &'a SweepMetadata,
    #[serde(flatten)]
    pub outcome: &'a SweepOutcome,
}

/// Writes one CSV row per sweep point.
///
/// Missing normality p-values serialize as empty fields.
pub fn write_csv(path: &Path, outcome: &SweepOutcome) -> Result<(), WriterError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path).map_err(|e| encode_error(path, e))?;
    for point in &outcome.points {
        writer.serialize(point).map_err(|e| encode_error(path, e))?;
    }
    writer.flush().map_err(|source| WriterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log_main!(
        EVENT_WRITE_CSV,
        "wrote sweep csv",
        path = path.display().to_string(),
        rows = outcome.points.len()
    );
    Ok(())
}

/// Writes the structured JSON document with a metadata section.
pub fn write_json(
    path: &Path,
    metadata: &SweepMetadata,
    outcome: &SweepOutcome,
) -> Result<(), WriterError> {
    ensure_parent(path)?;
    let document = SweepDocument { metadata, outcome };
    let file = fs::File::create(path).map_err(|source| WriterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(file, &document).map_err(|e| encode_error(path, e))?;
    log_main!(
        EVENT_WRITE_JSON,
        "wrote sweep json",
        path = path.display().to_string(),
        sweep_id = metadata.sweep_id.clone()
    );
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), WriterError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| WriterError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

fn encode_error(path: &Path, error: impl fmt::Display) -> WriterError {
    WriterError::Encode {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::RotaryDiscipline;
    use crate::experiment::driver::{AxisReport, SweepPointRecord};

    fn outcome() -> SweepOutcome {
        SweepOutcome {
            points: vec![SweepPointRecord {
                axis: "road_length".to_string(),
                axis_value: 10.0,
                density: 0.25,
                discipline: RotaryDiscipline::FreeMovement,
                n: 5,
                n_gridlocked: 0,
                mean: 1.25,
                std: 0.1,
                std_error: 0.044,
                ci_lower: 1.12,
                ci_upper: 1.38,
                normality_p: Some(0.6),
            }],
            reports: vec![AxisReport {
                axis_value: 10.0,
                completed: 5,
                skipped: 0,
                failed: 0,
            }],
        }
    }

    #[test]
    fn test_csv_has_one_row_per_point() {
        let dir = std::env::temp_dir().join("city_traffic_sim_core_csv_test");
        let path = dir.join("sweep.csv");
        write_csv(&path, &outcome()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2, "header plus one record");
        assert!(lines[0].contains("axis_value"));
        assert!(lines[1].contains("road_length"));
        assert!(lines[1].contains("0.25"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_json_document_carries_metadata() {
        let dir = std::env::temp_dir().join("city_traffic_sim_core_json_test");
        let path = dir.join("sweep.json");
        let metadata = SweepMetadata::for_sweep(&SweepConfig::default());
        write_json(&path, &metadata, &outcome()).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["metadata"]["axis"], "road_length");
        assert!(parsed["metadata"]["created_at"].as_str().unwrap().contains('T'));
        assert_eq!(parsed["points"][0]["n"], 5);
        assert_eq!(parsed["reports"][0]["completed"], 5);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_io_failure_is_reported_with_path() {
        // A regular file cannot serve as a parent directory.
        let blocker = std::env::temp_dir().join("city_traffic_sim_core_writer_blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let path = blocker.join("nested").join("sweep.csv");
        let error = write_csv(&path, &outcome()).unwrap_err();
        assert!(error.to_string().contains("city_traffic_sim_core_writer_blocker"));
        fs::remove_file(&blocker).unwrap();
    }
}
