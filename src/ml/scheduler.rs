// ============================================================
// Layer 5 — Step learning-rate schedule
// ============================================================
// Wraps Burn's StepLrScheduler:
//
//   lr = init_lr * gamma ^ floor(steps / step_size)
//
// The driver asks for the next rate once per batch or once
// per epoch depending on StepUnit, and uses it for the Adam
// updates that follow. The step counter is part of every
// checkpoint, so a resumed run continues the same decay curve.

use anyhow::{anyhow, Result};
use burn::{
    lr_scheduler::{
        step::{StepLrScheduler, StepLrSchedulerConfig},
        LrScheduler,
    },
    prelude::Backend,
};
use serde::{Deserialize, Serialize};

/// Granularity at which the training driver advances the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepUnit {
    Batch,
    Epoch,
}

/// Build the schedule; a zero step size is rejected by Burn.
pub fn step_lr(init_lr: f64, step_size: usize, gamma: f64) -> Result<StepLrScheduler> {
    StepLrSchedulerConfig::new(init_lr, step_size)
        .with_gamma(gamma)
        .init()
        .map_err(|e| anyhow!("Invalid learning-rate schedule: {e}"))
}

/// Advance one step and return the rate for the next update(s).
pub fn next_lr<B: Backend>(scheduler: &mut StepLrScheduler) -> f64 {
    LrScheduler::step(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn rates(scheduler: &mut StepLrScheduler, n: usize) -> Vec<f64> {
        (0..n).map(|_| next_lr::<TestBackend>(scheduler)).collect()
    }

    #[test]
    fn test_first_update_uses_initial_rate() {
        let mut s = step_lr(1e-3, 1, 0.1).unwrap();
        let r = rates(&mut s, 3);
        assert!((r[0] - 1e-3).abs() < 1e-15);
        assert!((r[1] - 1e-4).abs() < 1e-15);
        assert!((r[2] - 1e-5).abs() < 1e-15);
    }

    #[test]
    fn test_step_size_holds_rate() {
        let mut s = step_lr(1.0, 3, 0.5).unwrap();
        let r = rates(&mut s, 6);
        assert_eq!(&r[..3], &[1.0, 1.0, 1.0]);
        assert_eq!(&r[3..], &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_record_round_trip_continues_the_curve() {
        let mut uninterrupted = step_lr(1.0, 3, 0.5).unwrap();
        let expected = rates(&mut uninterrupted, 5);

        let mut first = step_lr(1.0, 3, 0.5).unwrap();
        rates(&mut first, 2);
        let record = LrScheduler::to_record::<TestBackend>(&first);

        let fresh = step_lr(1.0, 3, 0.5).unwrap();
        let mut resumed = LrScheduler::load_record::<TestBackend>(fresh, record);
        assert_eq!(rates(&mut resumed, 3), expected[2..].to_vec());
    }

    #[test]
    fn test_zero_step_size_is_rejected() {
        assert!(step_lr(1.0, 0, 0.5).is_err());
    }
}
