// ============================================================
// Layer 5 — Execution Mode
// ============================================================
// Train vs. eval is passed explicitly to every forward call
// instead of living in a global flag, so a pass can never run
// with a stale mode left behind by an earlier (or failed) pass.
//
//   Mode::Train → dropout masks are sampled between layers
//   Mode::Eval  → dropout is the identity; decoding is deterministic
//
// burn's own Dropout module decides on B::ad_enabled(), i.e. on
// the backend type. We want the caller's mode to decide, so the
// mask is drawn here directly.

use burn::prelude::*;
use burn::tensor::Distribution;

/// Whether a forward pass runs with training-time stochasticity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

impl Mode {
    pub fn is_train(self) -> bool {
        matches!(self, Mode::Train)
    }
}

/// Inverted dropout: zero each element with probability `prob` and
/// rescale survivors by 1 / (1 - prob). Identity outside training.
pub fn dropout<B: Backend, const D: usize>(x: Tensor<B, D>, prob: f64, mode: Mode) -> Tensor<B, D> {
    if !mode.is_train() || prob <= 0.0 {
        return x;
    }
    let keep = 1.0 - prob;
    let mask = Tensor::<B, D>::random(x.shape(), Distribution::Bernoulli(keep), &x.device());
    (x * mask).div_scalar(keep)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_eval_is_identity() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::ones([4, 8], &device);
        let y = dropout(x.clone(), 0.5, Mode::Eval);
        let diff: f32 = (y - x).abs().sum().into_scalar();
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_zero_prob_is_identity_in_train() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::ones([3, 3], &device);
        let y = dropout(x.clone(), 0.0, Mode::Train);
        let diff: f32 = (y - x).abs().sum().into_scalar();
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_train_values_are_zero_or_rescaled() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::ones([16, 16], &device);
        let y = dropout(x, 0.5, Mode::Train);
        for v in y.into_data().iter::<f32>() {
            assert!(v == 0.0 || (v - 2.0).abs() < 1e-6, "unexpected value {v}");
        }
    }
}
