// ============================================================
// Layer 5 — Text2Sum Encoder-Decoder Model
// ============================================================
// The full sequence-to-sequence model:
//
//   encoder_input ──► encoder_embed ──► BiEncoder (2 × BiLSTM)
//                                            │ final (h, c) [4, B, n]
//                                            ▼
//   decoder_input ──► decoder_embed ──► Decoder (4 × LSTM) ──► W ──► logits
//
// Two entry points:
//
//   forward_loss()  teacher-forced training pass, Mode::Train
//                   reports train_loss / train_perp
//
//   validate()      greedy decoding from an EOS bootstrap, Mode::Eval
//                   reports val_correlation / val_perp
//
// The model never updates its own parameters. forward_loss()
// returns the loss tensor; the trainer owns backward() and the
// optimiser step.
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Sutskever et al. (2014) Sequence to Sequence Learning

use anyhow::{ensure, Result};
use burn::{
    module::Ignored,
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::{activation::log_softmax, ElementConversion},
};

use crate::domain::{
    batch::SeqBatch,
    traits::{MetricSink, TRAIN_LOSS, TRAIN_PERP, VAL_CORRELATION, VAL_PERP},
    vocab::ID_EOS,
};
use crate::ml::{
    decoder::{Decoder, DecoderConfig},
    embedder::sequence_embed,
    encoder::{BiEncoder, BiEncoderConfig, StatePair},
    mode::Mode,
    similarity::SimilarityMetric,
};

/// Recurrent layers in the encoder. The decoder gets twice as many.
pub const STACK_DEPTH: usize = 2;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct Text2SumConfig {
    pub source_vocab: usize,
    pub target_vocab: usize,
    pub n_units:      usize,
    #[config(default = 0.5)]
    pub dropout:      f64,
    /// When false the training loss is returned detached from the graph.
    #[config(default = true)]
    pub track_gradients: bool,
    #[config(default = "SimilarityMetric::CorrelationDistance")]
    pub similarity:   SimilarityMetric,
}

impl Text2SumConfig {
    pub fn check(&self) -> Result<()> {
        ensure!(self.source_vocab > 0, "source_vocab must be positive");
        ensure!(self.target_vocab > 0, "target_vocab must be positive");
        ensure!(self.n_units > 0, "n_units must be positive");
        ensure!(
            (0.0..1.0).contains(&self.dropout),
            "dropout must be in [0, 1), got {}",
            self.dropout,
        );
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Text2SumModel<B>> {
        self.check()?;

        let encoder_embed = EmbeddingConfig::new(self.source_vocab, self.n_units).init(device);
        let decoder_embed = EmbeddingConfig::new(self.target_vocab, self.n_units).init(device);
        let encoder = BiEncoderConfig::new(self.n_units, STACK_DEPTH)
            .with_dropout(self.dropout)
            .init(device);
        // One decoder layer per encoder state slot (layers × directions).
        let decoder = DecoderConfig::new(self.n_units, encoder.state_slots())
            .with_dropout(self.dropout)
            .init(device);
        let output = LinearConfig::new(self.n_units, self.target_vocab).init(device);

        Ok(Text2SumModel {
            encoder_embed,
            decoder_embed,
            encoder,
            decoder,
            output,
            source_vocab:    self.source_vocab,
            target_vocab:    self.target_vocab,
            track_gradients: self.track_gradients,
            similarity:      Ignored(self.similarity),
        })
    }
}

#[derive(Module, Debug)]
pub struct Text2SumModel<B: Backend> {
    pub encoder_embed:   Embedding<B>,
    pub decoder_embed:   Embedding<B>,
    pub encoder:         BiEncoder<B>,
    pub decoder:         Decoder<B>,
    /// Projection from decoder hidden size to target vocabulary logits
    pub output:          Linear<B>,
    pub source_vocab:    usize,
    pub target_vocab:    usize,
    pub track_gradients: bool,
    pub similarity:      Ignored<SimilarityMetric>,
}

/// Everything a validation pass produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Greedy predictions, one row per example, `target_len - 1` tokens each
    pub predictions:     Vec<Vec<usize>>,
    pub val_correlation: f64,
    pub val_perp:        f64,
}

/// Loop accumulator for greedy decoding.
struct DecodeState<B: Backend> {
    state:  StatePair<B>,
    /// Next decoder input, one token per example
    tokens: Vec<usize>,
    /// Predictions so far, indexed [step][example]
    steps:  Vec<Vec<usize>>,
}

impl<B: Backend> Text2SumModel<B> {
    pub fn n_units(&self) -> usize {
        self.decoder.n_units
    }

    fn device(&self) -> B::Device {
        self.output.weight.val().device()
    }

    // ─── Training Loss Path ──────────────────────────────────────────────────
    /// Teacher-forced loss: summed token cross-entropy divided by batch size.
    ///
    /// Reports `train_loss` and `train_perp` to `sink`.
    pub fn forward_loss(&self, batch: &SeqBatch, sink: &mut dyn MetricSink) -> Result<Tensor<B, 1>> {
        self.check_vocab(batch)?;
        let width = batch.target_width();
        ensure!(
            width >= 2,
            "training needs decoder sources of length >= 2, got {width}",
        );

        let mode       = Mode::Train;
        let device     = self.device();
        let batch_size = batch.len();
        let (decoder_input, decoder_target) = batch.teacher_forcing();

        let encoder_emb = sequence_embed(&self.encoder_embed, batch.encoder_input(), &device);
        let decoder_emb = sequence_embed(&self.decoder_embed, &decoder_input, &device);

        let encoded = self.encoder.forward(encoder_emb, mode);
        tracing::trace!(
            "encoded {} sequences, top-layer widths {:?}",
            encoded.outputs.len(),
            encoded.outputs.iter().map(|o| o.dims()[1]).collect::<Vec<_>>(),
        );
        // Every decoder row has the same length, so the whole batch runs
        // as one [B, T, n] tensor.
        let steps = Tensor::stack::<3>(decoder_emb, 0);
        let (_, outputs) = self.decoder.forward(encoded.state, steps, mode)?;

        // Row order: example 0 steps 0..T, example 1 steps 0..T, ...
        let n_words = batch_size * (width - 1);
        let flat_outputs = outputs.reshape([n_words, self.n_units()]);
        let flat_targets = ids_tensor::<B>(decoder_target.iter().flatten(), &device);

        let logits = self.output.forward(flat_outputs);
        let loss = token_cross_entropy(logits, flat_targets)
            .sum()
            .div_scalar(batch_size as f64);
        let loss = if self.track_gradients { loss } else { loss.detach() };

        let train_loss: f64 = loss.clone().into_scalar().elem::<f64>();
        let train_perp = perplexity(train_loss, batch_size, n_words);
        sink.report(TRAIN_LOSS, train_loss);
        sink.report(TRAIN_PERP, train_perp);

        tracing::debug!(
            "train batch: size={} words={} loss={:.4} perp={:.4}",
            batch_size, n_words, train_loss, train_perp,
        );
        Ok(loss)
    }

    // ─── Greedy Decoding / Evaluation Path ───────────────────────────────────
    /// Greedy decode, score against the shifted target, report
    /// `val_correlation` and `val_perp`.
    ///
    /// The reference tokens are only used for scoring.
    pub fn validate(&self, batch: &SeqBatch, sink: &mut dyn MetricSink) -> Result<ValidationReport> {
        self.check_vocab(batch)?;
        let batch_size = batch.len();
        let (_, decoder_target) = batch.teacher_forcing();

        let predictions = self.greedy_decode(batch.encoder_input(), batch.target_width() - 1)?;

        let predicted: Vec<usize> = predictions.iter().flatten().copied().collect();
        let reference: Vec<usize> = decoder_target.into_iter().flatten().collect();
        let n_words = reference.len();

        let val_correlation = self.similarity.score(&predicted, &reference) / batch_size as f64;
        let val_perp = perplexity(val_correlation, batch_size, n_words);
        sink.report(VAL_CORRELATION, val_correlation);
        sink.report(VAL_PERP, val_perp);

        tracing::debug!(
            "validation batch: size={} words={} score={:.4} perp={:.4}",
            batch_size, n_words, val_correlation, val_perp,
        );
        Ok(ValidationReport { predictions, val_correlation, val_perp })
    }

    /// Decode `steps` tokens per example, starting every example from a
    /// single EOS token and feeding each arg-max back in as the next input.
    pub fn greedy_decode(&self, encoder_input: &[Vec<usize>], steps: usize) -> Result<Vec<Vec<usize>>> {
        ensure!(!encoder_input.is_empty(), "batch is empty");
        if let Some(row) = encoder_input.iter().position(Vec::is_empty) {
            anyhow::bail!("encoder input row {row} is empty");
        }
        check_ids(encoder_input, self.source_vocab, "source")?;

        let device     = self.device();
        let batch_size = encoder_input.len();

        let encoder_emb = sequence_embed(&self.encoder_embed, encoder_input, &device);
        let encoded = self.encoder.forward(encoder_emb, Mode::Eval);

        let initial = DecodeState {
            state:  encoded.state,
            tokens: vec![ID_EOS; batch_size],
            steps:  Vec::with_capacity(steps),
        };
        let done = (0..steps).try_fold(initial, |acc, _| self.decode_step(acc, &device))?;

        Ok(transpose(done.steps, batch_size))
    }

    fn decode_step(&self, acc: DecodeState<B>, device: &B::Device) -> Result<DecodeState<B>> {
        let batch_size = acc.tokens.len();

        // One singleton chunk per example, stacked to [B, 1, n].
        let inputs: Vec<Vec<usize>> = acc.tokens.iter().map(|&t| vec![t]).collect();
        let embedded = sequence_embed(&self.decoder_embed, &inputs, device);
        let (state, outputs) =
            self.decoder.forward(acc.state, Tensor::stack::<3>(embedded, 0), Mode::Eval)?;

        let logits = self.output.forward(outputs.reshape([batch_size, self.n_units()]));
        let next: Vec<usize> = logits
            .argmax(1)
            .into_data()
            .iter::<i64>()
            .map(|id| id as usize)
            .collect();

        let mut steps = acc.steps;
        steps.push(next.clone());
        Ok(DecodeState { state, tokens: next, steps })
    }

    fn check_vocab(&self, batch: &SeqBatch) -> Result<()> {
        if batch.max_source_id().is_some_and(|id| id >= self.source_vocab) {
            check_ids(batch.encoder_input(), self.source_vocab, "source")?;
        }
        if batch.max_target_id().is_some_and(|id| id >= self.target_vocab) {
            check_ids(batch.decoder_source(), self.target_vocab, "target")?;
        }
        Ok(())
    }
}

/// `exp(score * batch_size / n_words)`: undoes the batch normalisation
/// to get a per-token average before exponentiating. 1.0 when there
/// are no tokens.
pub fn perplexity(score: f64, batch_size: usize, n_words: usize) -> f64 {
    if n_words == 0 {
        return 1.0;
    }
    (score * batch_size as f64 / n_words as f64).exp()
}

/// Per-token cross-entropy with no reduction: `[N, V]`, `[N]` → `[N]`.
fn token_cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let [n, _] = logits.dims();
    log_softmax(logits, 1)
        .gather(1, targets.reshape([n, 1]))
        .reshape([n])
        .neg()
}

fn ids_tensor<'a, B: Backend>(ids: impl Iterator<Item = &'a usize>, device: &B::Device) -> Tensor<B, 1, Int> {
    let flat: Vec<i32> = ids.map(|&id| id as i32).collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device)
}

fn check_ids(seqs: &[Vec<usize>], vocab: usize, side: &str) -> Result<()> {
    for (row, seq) in seqs.iter().enumerate() {
        if let Some(&id) = seq.iter().find(|&&id| id >= vocab) {
            anyhow::bail!("{side} row {row} contains id {id}, outside vocabulary of size {vocab}");
        }
    }
    Ok(())
}

/// [step][example] → [example][step]
fn transpose(steps: Vec<Vec<usize>>, batch_size: usize) -> Vec<Vec<usize>> {
    let mut rows = vec![Vec::with_capacity(steps.len()); batch_size];
    for step in steps {
        for (row, token) in rows.iter_mut().zip(step) {
            row.push(token);
        }
    }
    rows
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::metrics::MetricsRecorder;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;
    type TestAutodiffBackend = Autodiff<NdArray>;

    fn model_with(config: Text2SumConfig) -> Text2SumModel<TestBackend> {
        config.init(&Default::default()).unwrap()
    }

    fn scenario_model() -> Text2SumModel<TestBackend> {
        model_with(Text2SumConfig::new(50, 60, 16))
    }

    fn scenario_batch() -> SeqBatch {
        SeqBatch::new(
            vec![vec![2, 3, 4, 5], vec![10, 11, 12, 13, 14, 15]],
            vec![vec![1, 20, 21, 22, 1], vec![1, 30, 31, 32, 1]],
        ).unwrap()
    }

    #[test]
    fn test_decoder_depth_matches_encoder_slots() {
        let model = scenario_model();
        assert_eq!(model.decoder.depth(), model.encoder.state_slots());
        assert_eq!(model.decoder.depth(), STACK_DEPTH * 2);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(Text2SumConfig::new(0, 10, 4).check().is_err());
        assert!(Text2SumConfig::new(10, 10, 0).check().is_err());
        assert!(Text2SumConfig::new(10, 10, 4).with_dropout(1.0).check().is_err());
        assert!(Text2SumConfig::new(10, 10, 4).check().is_ok());
    }

    #[test]
    fn test_scenario_loss_is_finite() {
        let model = scenario_model();
        let mut metrics = MetricsRecorder::new();

        let loss = model.forward_loss(&scenario_batch(), &mut metrics).unwrap();

        assert_eq!(loss.dims(), [1]);
        let value: f64 = loss.into_scalar().elem::<f64>();
        assert!(value.is_finite());
        assert!(value >= 0.0);
        assert!(metrics.last(TRAIN_PERP).unwrap() >= 1.0);
    }

    #[test]
    fn test_train_perp_derives_from_loss() {
        let model = scenario_model();
        let mut metrics = MetricsRecorder::new();
        model.forward_loss(&scenario_batch(), &mut metrics).unwrap();

        let loss = metrics.last(TRAIN_LOSS).unwrap();
        let perp = metrics.last(TRAIN_PERP).unwrap();
        // batch_size = 2, total target tokens = 2 × 4
        assert_eq!(perp, (loss * 2.0 / 8.0).exp());
    }

    #[test]
    fn test_training_rejects_width_one() {
        let model = scenario_model();
        let batch = SeqBatch::new(vec![vec![2]], vec![vec![1]]).unwrap();
        let err = model.forward_loss(&batch, &mut MetricsRecorder::new()).unwrap_err();
        assert!(err.to_string().contains(">= 2"));
    }

    #[test]
    fn test_rejects_out_of_vocab_ids() {
        let model = scenario_model();
        let batch = SeqBatch::new(vec![vec![2, 50]], vec![vec![1, 2, 1]]).unwrap();
        assert!(model.forward_loss(&batch, &mut MetricsRecorder::new()).is_err());

        let batch = SeqBatch::new(vec![vec![2]], vec![vec![1, 60, 1]]).unwrap();
        assert!(model.validate(&batch, &mut MetricsRecorder::new()).is_err());
    }

    #[test]
    fn test_training_loss_is_order_invariant_without_dropout() {
        let model = model_with(Text2SumConfig::new(50, 60, 16).with_dropout(0.0));
        let permuted = SeqBatch::new(
            vec![vec![10, 11, 12, 13, 14, 15], vec![2, 3, 4, 5]],
            vec![vec![1, 30, 31, 32, 1], vec![1, 20, 21, 22, 1]],
        ).unwrap();

        let mut sink = MetricsRecorder::new();
        let a: f64 = model.forward_loss(&scenario_batch(), &mut sink).unwrap().into_scalar().elem();
        let b: f64 = model.forward_loss(&permuted, &mut sink).unwrap().into_scalar().elem();
        assert!((a - b).abs() < 1e-4, "{a} vs {b}");
    }

    #[test]
    fn test_loss_carries_gradients_by_default() {
        let device = Default::default();
        let model: Text2SumModel<TestAutodiffBackend> =
            Text2SumConfig::new(50, 60, 16).init(&device).unwrap();

        let loss = model.forward_loss(&scenario_batch(), &mut MetricsRecorder::new()).unwrap();
        let grads = loss.backward();
        assert!(model.output.weight.val().grad(&grads).is_some());
        assert!(model.encoder_embed.weight.val().grad(&grads).is_some());
    }

    #[test]
    fn test_validate_reports_both_metrics() {
        let model = scenario_model();
        let mut metrics = MetricsRecorder::new();

        let report = model.validate(&scenario_batch(), &mut metrics).unwrap();

        assert_eq!(report.predictions.len(), 2);
        assert!(report.predictions.iter().all(|p| p.len() == 4));
        assert!(report.predictions.iter().flatten().all(|&id| id < 60));
        assert_eq!(metrics.last(VAL_CORRELATION), Some(report.val_correlation));
        assert_eq!(metrics.last(VAL_PERP), Some(report.val_perp));
        assert_eq!(report.val_perp, (report.val_correlation * 2.0 / 8.0).exp());
    }

    #[test]
    fn test_validate_with_target_length_one() {
        let model = scenario_model();
        let batch = SeqBatch::new(vec![vec![2, 3], vec![4]], vec![vec![1], vec![1]]).unwrap();
        let mut metrics = MetricsRecorder::new();

        let report = model.validate(&batch, &mut metrics).unwrap();

        assert_eq!(report.predictions, vec![Vec::<usize>::new(), Vec::new()]);
        assert_eq!(report.val_correlation, 0.0);
        assert_eq!(report.val_perp, 1.0);
    }

    #[test]
    fn test_greedy_decoding_is_deterministic() {
        // Dropout stays at 0.5: eval mode must switch it off.
        let model = scenario_model();
        let input = vec![vec![2, 3, 4, 5], vec![10, 11, 12]];

        let first  = model.greedy_decode(&input, 6).unwrap();
        let second = model.greedy_decode(&input, 6).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_reference_tokens_never_reach_the_decoder() {
        let model = scenario_model();
        let a = scenario_batch();
        let b = SeqBatch::new(
            a.encoder_input().to_vec(),
            vec![vec![7, 59, 58, 57, 56], vec![3, 3, 3, 3, 3]],
        ).unwrap();

        let mut sink = MetricsRecorder::new();
        let pa = model.validate(&a, &mut sink).unwrap().predictions;
        let pb = model.validate(&b, &mut sink).unwrap().predictions;
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_greedy_decoding_follows_batch_order() {
        let model = scenario_model();
        let rows = vec![vec![2, 3, 4, 5], vec![10, 11, 12, 13, 14, 15], vec![40]];
        let reversed: Vec<Vec<usize>> = rows.iter().rev().cloned().collect();

        let forward  = model.greedy_decode(&rows, 5).unwrap();
        let backward = model.greedy_decode(&reversed, 5).unwrap();

        let unreversed: Vec<Vec<usize>> = backward.into_iter().rev().collect();
        assert_eq!(forward, unreversed);
    }

    #[test]
    fn test_exact_match_metric_is_selectable() {
        let model = model_with(
            Text2SumConfig::new(50, 60, 16).with_similarity(SimilarityMetric::ExactMatchError),
        );
        let report = model.validate(&scenario_batch(), &mut MetricsRecorder::new()).unwrap();
        // error rate in [0, 1], divided by batch size 2
        assert!((0.0..=0.5).contains(&report.val_correlation));
    }

    #[test]
    fn test_perplexity_helper() {
        assert_eq!(perplexity(3.0, 2, 0), 1.0);
        assert!((perplexity(4.0, 2, 8) - 1.0f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn test_transpose() {
        let steps = vec![vec![1, 2], vec![3, 4], vec![5, 6]];
        assert_eq!(transpose(steps, 2), vec![vec![1, 3, 5], vec![2, 4, 6]]);
        assert_eq!(transpose(vec![], 3), vec![Vec::<usize>::new(); 3]);
    }
}
