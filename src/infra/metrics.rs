// ============================================================
// Layer 6 — Metrics
// ============================================================
// Running statistics for the training loop plus a CSV logger
// that records one row per epoch.
//
//   AverageMeter     — mean of per-batch losses so far
//   RunningAccuracy  — correct / total * 100 so far
//   MetricsLogger    — appends EpochMetrics to metrics.csv
//
// Both meters live for the whole run: they are created once
// before the first epoch and never reset, so the values in
// the progress log and in checkpoint metadata are cumulative.
//
// Example CSV output:
//   epoch,train_loss,train_acc,lr,test_loss,test_acc
//   1,0.693100,51.250000,0.000010,,
//   5,0.412300,81.000000,0.000000,0.455000,78.500000

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// Mean of every value pushed so far.
#[derive(Debug, Default, Clone)]
pub struct AverageMeter {
    sum:   f64,
    count: usize,
}

impl AverageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f64) {
        self.sum   += value;
        self.count += 1;
    }

    /// 0.0 before the first update.
    pub fn average(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.sum / self.count as f64 }
    }
}

/// Accuracy in percent over every prediction seen so far.
#[derive(Debug, Default, Clone)]
pub struct RunningAccuracy {
    correct: usize,
    total:   usize,
}

impl RunningAccuracy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, correct: usize, total: usize) {
        self.correct += correct;
        self.total   += total;
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }
}

/// Evaluation result on the test split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics {
    pub loss:     f64,
    pub accuracy: f64,
}

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone)]
pub struct EpochMetrics {
    pub epoch:      usize,
    /// Running train loss at the end of the epoch
    pub train_loss: f64,
    /// Running train accuracy (percent) at the end of the epoch
    pub train_acc:  f64,
    pub lr:         f64,
    /// Present only on evaluation epochs
    pub eval:       Option<EvalMetrics>,
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger in `dir`.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,train_acc,lr,test_loss,test_acc")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        let (test_loss, test_acc) = match m.eval {
            Some(e) => (format!("{:.6}", e.loss), format!("{:.6}", e.accuracy)),
            None    => (String::new(), String::new()),
        };

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{},{}",
            m.epoch, m.train_loss, m.train_acc, m.lr, test_loss, test_acc,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, train_acc={:.2}",
            m.epoch,
            m.train_loss,
            m.train_acc,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_meter() {
        let mut meter = AverageMeter::new();
        assert_eq!(meter.average(), 0.0);
        for v in [1.0, 2.0, 6.0] {
            meter.update(v);
        }
        assert!((meter.average() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_is_pooled_not_averaged() {
        // 2/2 then 1/4: pooled 3/6 = 50%, averaged per batch would be 62.5%
        let mut acc = RunningAccuracy::new();
        acc.update(2, 2);
        acc.update(1, 4);
        assert!((acc.percent() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_csv_rows_append() {
        let temp = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(temp.path()).unwrap();
        logger
            .log(&EpochMetrics { epoch: 1, train_loss: 0.7, train_acc: 50.0, lr: 0.01, eval: None })
            .unwrap();
        logger
            .log(&EpochMetrics {
                epoch:      2,
                train_loss: 0.5,
                train_acc:  75.0,
                lr:         0.001,
                eval:       Some(EvalMetrics { loss: 0.6, accuracy: 70.0 }),
            })
            .unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,train_acc,lr,test_loss,test_acc");
        assert!(lines[1].ends_with(",,"));
        assert!(lines[2].starts_with("2,0.500000,75.000000,0.001000,0.600000,70.000000"));
    }
}
