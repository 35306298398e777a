// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full training run:
//
//   Step 1: Build the synthetic task       (Layer 4 - data)
//   Step 2: Generate seeded pairs          (Layer 4 - data)
//   Step 3: Split train/validation         (Layer 4 - data)
//   Step 4: Batch both splits              (Layer 4 - data)
//   Step 5: Save config                    (Layer 6 - infra)
//   Step 6: Run training loop              (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::{batcher::SeqBatcher, splitter::split_train_val, synthetic::ReverseCopyTask};
use crate::infra::{checkpoint::CheckpointManager, metrics::EpochMetrics};
use crate::ml::{model::Text2SumConfig, similarity::SimilarityMetric, trainer::run_training};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything needed to reproduce a run. Saved next to the
// checkpoints as train_config.json; `evaluate` reads it back to
// rebuild the model and regenerate comparable data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub checkpoint_dir:  String,
    pub source_vocab:    usize,
    pub target_vocab:    usize,
    pub n_units:         usize,
    pub samples:         usize,
    pub min_source_len:  usize,
    pub max_source_len:  usize,
    pub target_len:      usize,
    pub batch_size:      usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub dropout:         f64,
    pub track_gradients: bool,
    pub similarity:      SimilarityMetric,
    pub train_fraction:  f64,
    pub seed:            u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir:  "checkpoints".to_string(),
            source_vocab:    50,
            target_vocab:    60,
            n_units:         32,
            samples:         512,
            min_source_len:  4,
            max_source_len:  8,
            target_len:      6,
            batch_size:      16,
            epochs:          5,
            lr:              1e-3,
            dropout:         0.5,
            track_gradients: true,
            similarity:      SimilarityMetric::CorrelationDistance,
            train_fraction:  0.8,
            seed:            42,
        }
    }
}

impl TrainConfig {
    /// The model hyperparameters carried by this run configuration
    pub fn model_config(&self) -> Text2SumConfig {
        Text2SumConfig::new(self.source_vocab, self.target_vocab, self.n_units)
            .with_dropout(self.dropout)
            .with_track_gradients(self.track_gradients)
            .with_similarity(self.similarity)
    }
}

pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        let cfg = &self.config;
        cfg.model_config().check()?;

        // ── Step 1–2: Synthetic corpus ────────────────────────────────────────
        let task  = ReverseCopyTask::from_config(cfg)?;
        let pairs = task.generate(cfg.samples, cfg.seed);
        tracing::info!("Generated {} reverse-copy pairs (seed {})", pairs.len(), cfg.seed);

        // ── Step 3: Train / validation split ──────────────────────────────────
        let (train_pairs, val_pairs) = split_train_val(pairs, cfg.train_fraction, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train_pairs.len(), val_pairs.len());

        // ── Step 4: Batches ───────────────────────────────────────────────────
        let batcher       = SeqBatcher::new(cfg.batch_size);
        let train_batches = batcher.batches(train_pairs)?;
        let val_batches   = batcher.batches(val_pairs)?;
        anyhow::ensure!(!train_batches.is_empty(), "no training batches; raise --samples");

        // ── Step 5: Save config for evaluation ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(cfg.checkpoint_dir.as_str())?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 6: Training loop (Layer 5) ───────────────────────────────────
        run_training(cfg, &train_batches, &val_batches, &ckpt_manager)
    }
}
