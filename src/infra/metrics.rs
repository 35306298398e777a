// ============================================================
// Layer 6 — Metric Sinks and CSV Logger
// ============================================================
// The model reports scalars through domain::traits::MetricSink.
// This file provides the concrete sinks:
//
//   MetricsRecorder — keeps every reported value in memory so the
//                     trainer can average them per epoch
//   TracingSink     — forwards each value to the tracing log
//
// and the MetricsLogger, which appends one row of epoch-level
// averages to a CSV file:
//
//   epoch,train_loss,train_perp,val_correlation,val_perp
//   1,41.203311,3.104412,0.493120,1.057103
//   2,33.874020,2.531876,0.411983,1.047580
//   ...
//
// Reading the columns:
//   - train_loss / train_perp should fall epoch over epoch
//   - val_correlation is a distance: lower = predictions closer
//     to the reference
//
// Reference: Rust Book §8 (HashMap), §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::domain::traits::{MetricSink, TRAIN_LOSS, TRAIN_PERP, VAL_CORRELATION, VAL_PERP};

// ─── MetricsRecorder ──────────────────────────────────────────────────────────
/// In-memory sink: every reported value, grouped by key.
#[derive(Debug, Default, Clone)]
pub struct MetricsRecorder {
    values: HashMap<String, Vec<f64>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent value reported under `key`
    #[cfg(test)]
    pub fn last(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(|v| v.last().copied())
    }

    /// Mean of all values reported under `key`, NaN if none
    pub fn mean(&self, key: &str) -> f64 {
        match self.values.get(key) {
            Some(v) if !v.is_empty() => v.iter().sum::<f64>() / v.len() as f64,
            _ => f64::NAN,
        }
    }

    #[cfg(test)]
    pub fn count(&self, key: &str) -> usize {
        self.values.get(key).map_or(0, Vec::len)
    }

    /// Forget everything (called at the start of each epoch)
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl MetricSink for MetricsRecorder {
    fn report(&mut self, key: &str, value: f64) {
        self.values.entry(key.to_string()).or_default().push(value);
    }
}

// ─── TracingSink ──────────────────────────────────────────────────────────────
/// Logs each metric at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MetricSink for TracingSink {
    fn report(&mut self, key: &str, value: f64) {
        tracing::info!("{key}={value:.6}");
    }
}

// ─── EpochMetrics ─────────────────────────────────────────────────────────────
/// One row of epoch-level averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean train_loss over the epoch's training batches
    pub train_loss: f64,

    /// Mean train_perp over the epoch's training batches
    pub train_perp: f64,

    /// Mean val_correlation over validation batches (NaN if none)
    pub val_correlation: f64,

    /// Mean val_perp over validation batches (NaN if none)
    pub val_perp: f64,
}

impl EpochMetrics {
    /// Average everything `recorder` saw during `epoch`.
    pub fn from_recorder(epoch: usize, recorder: &MetricsRecorder) -> Self {
        Self {
            epoch,
            train_loss:      recorder.mean(TRAIN_LOSS),
            train_perp:      recorder.mean(TRAIN_PERP),
            val_correlation: recorder.mean(VAL_CORRELATION),
            val_perp:        recorder.mean(VAL_PERP),
        }
    }

    /// True if this epoch's validation distance beats `best`
    pub fn is_improvement(&self, best: f64) -> bool {
        self.val_correlation < best
    }
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
/// Appends epoch metrics to `<dir>/metrics.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory if needed and write the CSV header if the
    /// file is new. An existing file is appended to.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,train_perp,val_correlation,val_perp")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.train_perp, m.val_correlation, m.val_perp,
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
