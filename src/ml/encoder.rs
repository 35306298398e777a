// ============================================================
// Layer 5 — Bidirectional LSTM Encoder
// ============================================================
// Summarises each source sequence into a (hidden, cell) pair.
//
// Architecture (stack_depth = 2):
//
//   embedded [len, n]
//       │
//       ▼
//   BiLstm layer 0  (n → n per direction)  → out [len, 2n], state [2, n]
//       │ dropout (train only)
//       ▼
//   BiLstm layer 1  (2n → n per direction) → out [len, 2n], state [2, n]
//
//   final state = cat(layer0, layer1) → [4, n] per example
//   slot order: l0-forward, l0-backward, l1-forward, l1-backward
//
// Sequences have different lengths and burn's LSTMs only return
// the state after the LAST timestep of the padded tensor. To get
// each example's state after its own last token, every example
// runs through the stack as a batch of one; the per-example
// states are then concatenated along the batch axis.
//
// Initial state is always zero (None).
//
// Reference: Burn Book §3 (Building Blocks)
//            Graves & Schmidhuber (2005) Bidirectional LSTM

use burn::{
    nn::{BiLstm, BiLstmConfig},
    prelude::*,
};

use crate::ml::mode::{dropout, Mode};

/// Layer-stacked (hidden, cell) tensors, each `[layers, batch, n_units]`.
#[derive(Debug, Clone)]
pub struct StatePair<B: Backend> {
    pub hidden: Tensor<B, 3>,
    pub cell:   Tensor<B, 3>,
}

impl<B: Backend> StatePair<B> {
    /// [layers, batch, n_units]
    pub fn dims(&self) -> [usize; 3] {
        self.hidden.dims()
    }
}

/// Encoder result: final states plus per-step top-layer outputs.
pub struct EncoderOutput<B: Backend> {
    pub state:   StatePair<B>,
    /// `[len_i, 2 * n_units]` per example. Only traced; the decoder starts from `state`.
    pub outputs: Vec<Tensor<B, 2>>,
}

#[derive(Config, Debug)]
pub struct BiEncoderConfig {
    pub n_units:     usize,
    pub stack_depth: usize,
    #[config(default = 0.5)]
    pub dropout:     f64,
}

impl BiEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BiEncoder<B> {
        let layers = (0..self.stack_depth)
            .map(|i| {
                // Upper layers read both directions of the layer below.
                let d_input = if i == 0 { self.n_units } else { 2 * self.n_units };
                BiLstmConfig::new(d_input, self.n_units, true).init(device)
            })
            .collect();
        BiEncoder { layers, dropout: self.dropout }
    }
}

#[derive(Module, Debug)]
pub struct BiEncoder<B: Backend> {
    pub layers:  Vec<BiLstm<B>>,
    pub dropout: f64,
}

impl<B: Backend> BiEncoder<B> {
    /// Number of state slots produced: layers × 2 directions
    pub fn state_slots(&self) -> usize {
        self.layers.len() * 2
    }

    /// Encode a batch of embedded sequences (each `[len_i, n_units]`).
    pub fn forward(&self, xs: Vec<Tensor<B, 2>>, mode: Mode) -> EncoderOutput<B> {
        let mut hiddens = Vec::with_capacity(xs.len());
        let mut cells   = Vec::with_capacity(xs.len());
        let mut outputs = Vec::with_capacity(xs.len());

        for x in xs {
            let (state, out) = self.encode_one(x, mode);
            hiddens.push(state.hidden);
            cells.push(state.cell);
            outputs.push(out);
        }

        EncoderOutput {
            state: StatePair {
                hidden: Tensor::cat(hiddens, 1),
                cell:   Tensor::cat(cells, 1),
            },
            outputs,
        }
    }

    /// Run one example through the stack. Returns its `[slots, 1, n]`
    /// state and its `[len, 2n]` top-layer outputs.
    fn encode_one(&self, x: Tensor<B, 2>, mode: Mode) -> (StatePair<B>, Tensor<B, 2>) {
        let [len, width] = x.dims();
        let mut input = x.reshape([1, len, width]);
        let mut hidden = Vec::with_capacity(self.layers.len());
        let mut cell   = Vec::with_capacity(self.layers.len());

        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                input = dropout(input, self.dropout, mode);
            }
            let (output, state) = layer.forward(input, None);
            // state tensors: [2 directions, 1, n]
            hidden.push(state.hidden);
            cell.push(state.cell);
            input = output;
        }

        let [_, len, width] = input.dims();
        let state = StatePair {
            hidden: Tensor::cat(hidden, 0),
            cell:   Tensor::cat(cell, 0),
        };
        (state, input.reshape([len, width]))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn encoder(n_units: usize) -> BiEncoder<TestBackend> {
        BiEncoderConfig::new(n_units, 2).init(&Default::default())
    }

    #[test]
    fn test_state_has_four_slots() {
        let device = Default::default();
        let enc = encoder(8);
        let xs = vec![
            Tensor::<TestBackend, 2>::ones([4, 8], &device),
            Tensor::<TestBackend, 2>::ones([6, 8], &device),
        ];

        let out = enc.forward(xs, Mode::Eval);

        assert_eq!(enc.state_slots(), 4);
        assert_eq!(out.state.hidden.dims(), [4, 2, 8]);
        assert_eq!(out.state.cell.dims(), [4, 2, 8]);
        assert_eq!(out.outputs[0].dims(), [4, 16]);
        assert_eq!(out.outputs[1].dims(), [6, 16]);
    }

    #[test]
    fn test_examples_do_not_interact() {
        let device = Default::default();
        let enc = encoder(4);
        let a = Tensor::<TestBackend, 2>::random([3, 4], burn::tensor::Distribution::Default, &device);
        let b = Tensor::<TestBackend, 2>::random([5, 4], burn::tensor::Distribution::Default, &device);

        let together = enc.forward(vec![a.clone(), b], Mode::Eval);
        let alone    = enc.forward(vec![a], Mode::Eval);

        let first = together.state.hidden.narrow(1, 0, 1);
        let diff: f32 = (first - alone.state.hidden).abs().sum().into_scalar();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_eval_is_deterministic() {
        let device = Default::default();
        let enc = encoder(4);
        let x = Tensor::<TestBackend, 2>::ones([3, 4], &device);

        let first  = enc.forward(vec![x.clone()], Mode::Eval).state.cell;
        let second = enc.forward(vec![x], Mode::Eval).state.cell;

        let diff: f32 = (first - second).abs().sum().into_scalar();
        assert_eq!(diff, 0.0);
    }
}
