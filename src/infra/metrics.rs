// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training progress to a CSV file after each pass.
//
// Metrics recorded per pass:
//   - variant:       which extractor was being trained
//   - pass:          the pass number (1, 2, 3, ...)
//   - documents:     documents visited in the pass
//   - mismatches:    documents whose free decode differed from
//                    the gold-constrained decode
//   - mismatch_rate: mismatches / documents
//   - objective:     Σ (free score − gold score) over the pass
//
// Output file: checkpoints/metrics.csv
//
// Example CSV output:
//   variant,pass,documents,mismatches,mismatch_rate,objective
//   global,1,120,87,0.725000,3.412000
//   global,2,120,41,0.341667,1.207310
//   ...
//
// How to read the metrics:
//   - The mismatch rate should fall pass over pass
//   - A flat rate from the first pass means no feature separates
//     the gold decode from the best wrong one

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::ml::trainer::PassStats;

const HEADER: &str = "variant,pass,documents,mismatches,mismatch_rate,objective";

/// Logs pass metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");

        // Appends across runs; header only on first creation
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one pass as a new row in the CSV.
    pub fn log(&self, variant: &str, stats: &PassStats) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;

        writeln!(
            f,
            "{},{},{},{},{:.6},{:.6}",
            variant,
            stats.pass,
            stats.documents,
            stats.mismatches,
            stats.mismatch_rate(),
            stats.objective,
        )?;

        tracing::debug!(
            "Logged {} pass {} metrics: mismatch_rate={:.4}",
            variant,
            stats.pass,
            stats.mismatch_rate(),
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    #[cfg(test)]
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
