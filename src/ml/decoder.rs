// ============================================================
// Layer 5 — Autoregressive LSTM Decoder
// ============================================================
// A unidirectional stack of `layers` LSTMs. Its depth is twice
// the encoder's stack depth so the encoder's [4, batch, n]
// bidirectional state can be used directly as the initial
// state: slot l of the encoder state seeds decoder layer l.
//
// The same forward() serves both paths:
//   - training: steps = the whole shifted target, [batch, T, n]
//   - greedy decoding: steps = one token per call, [batch, 1, n]
//
// Dropout sits between layers and is only active in Mode::Train.
//
// Reference: Burn Book §3 (Building Blocks)
//            Sutskever et al. (2014) Sequence to Sequence Learning

use anyhow::{ensure, Result};
use burn::{
    nn::{Lstm, LstmConfig, LstmState},
    prelude::*,
};

use crate::ml::encoder::StatePair;
use crate::ml::mode::{dropout, Mode};

#[derive(Config, Debug)]
pub struct DecoderConfig {
    pub n_units: usize,
    pub layers:  usize,
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        let layers = (0..self.layers)
            .map(|_| LstmConfig::new(self.n_units, self.n_units, true).init(device))
            .collect();
        Decoder { layers, n_units: self.n_units, dropout: self.dropout }
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub layers:  Vec<Lstm<B>>,
    pub n_units: usize,
    pub dropout: f64,
}

impl<B: Backend> Decoder<B> {
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Advance the decoder over `steps` (`[batch, T, n_units]`) starting
    /// from `state` (`[layers, batch, n_units]`).
    ///
    /// Returns the new state and the top-layer outputs `[batch, T, n_units]`.
    pub fn forward(
        &self,
        state: StatePair<B>,
        steps: Tensor<B, 3>,
        mode:  Mode,
    ) -> Result<(StatePair<B>, Tensor<B, 3>)> {
        let [slots, batch, width] = state.dims();
        ensure!(
            slots == self.depth(),
            "decoder has {} layers but was given a {}-slot state",
            self.depth(),
            slots,
        );
        ensure!(
            width == self.n_units,
            "decoder hidden size is {} but state width is {}",
            self.n_units,
            width,
        );
        let [step_batch, _, step_width] = steps.dims();
        ensure!(
            step_batch == batch && step_width == self.n_units,
            "step input [{step_batch}, _, {step_width}] does not match state batch {batch} / width {}",
            self.n_units,
        );

        let mut input  = steps;
        let mut hidden = Vec::with_capacity(slots);
        let mut cell   = Vec::with_capacity(slots);

        for (l, layer) in self.layers.iter().enumerate() {
            if l > 0 {
                input = dropout(input, self.dropout, mode);
            }
            let init = LstmState::new(
                state.cell.clone().narrow(0, l, 1).reshape([batch, width]),
                state.hidden.clone().narrow(0, l, 1).reshape([batch, width]),
            );
            let (output, next) = layer.forward(input, Some(init));
            hidden.push(next.hidden);
            cell.push(next.cell);
            input = output;
        }

        let next = StatePair {
            hidden: Tensor::stack::<3>(hidden, 0),
            cell:   Tensor::stack::<3>(cell, 0),
        };
        Ok((next, input))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn zero_state(layers: usize, batch: usize, n: usize) -> StatePair<TestBackend> {
        let device = Default::default();
        StatePair {
            hidden: Tensor::zeros([layers, batch, n], &device),
            cell:   Tensor::zeros([layers, batch, n], &device),
        }
    }

    #[test]
    fn test_full_sequence_shapes() {
        let device = Default::default();
        let dec = DecoderConfig::new(8, 4).init::<TestBackend>(&device);
        let steps = Tensor::<TestBackend, 3>::ones([2, 5, 8], &device);

        let (state, out) = dec.forward(zero_state(4, 2, 8), steps, Mode::Eval).unwrap();

        assert_eq!(out.dims(), [2, 5, 8]);
        assert_eq!(state.dims(), [4, 2, 8]);
        assert_eq!(state.cell.dims(), [4, 2, 8]);
    }

    #[test]
    fn test_step_by_step_matches_full_sequence() {
        let device = Default::default();
        let dec = DecoderConfig::new(4, 4).init::<TestBackend>(&device);
        let steps = Tensor::<TestBackend, 3>::random(
            [1, 3, 4], burn::tensor::Distribution::Default, &device,
        );

        let (_, full) = dec.forward(zero_state(4, 1, 4), steps.clone(), Mode::Eval).unwrap();

        let mut state = zero_state(4, 1, 4);
        let mut last = None;
        for t in 0..3 {
            let (next, out) = dec
                .forward(state, steps.clone().narrow(1, t, 1), Mode::Eval)
                .unwrap();
            state = next;
            last = Some(out);
        }

        let tail = full.narrow(1, 2, 1);
        let diff: f32 = (tail - last.unwrap()).abs().sum().into_scalar();
        assert!(diff < 1e-5, "diff = {diff}");
    }

    #[test]
    fn test_rejects_layer_mismatch() {
        let device = Default::default();
        let dec = DecoderConfig::new(8, 4).init::<TestBackend>(&device);
        let steps = Tensor::<TestBackend, 3>::ones([1, 1, 8], &device);
        let err = dec.forward(zero_state(2, 1, 8), steps, Mode::Eval).unwrap_err();
        assert!(err.to_string().contains("2-slot"));
    }

    #[test]
    fn test_rejects_width_mismatch() {
        let device = Default::default();
        let dec = DecoderConfig::new(8, 4).init::<TestBackend>(&device);
        let steps = Tensor::<TestBackend, 3>::ones([1, 1, 8], &device);
        assert!(dec.forward(zero_state(4, 1, 6), steps, Mode::Eval).is_err());
    }
}
