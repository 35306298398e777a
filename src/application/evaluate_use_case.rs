// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Reloads a trained model and greedy-decodes fresh data:
//
//   Step 1: Load train_config.json          (Layer 6 - infra)
//   Step 2: Rebuild model, load weights     (Layer 5 + 6)
//   Step 3: Generate held-out pairs         (Layer 4 - data)
//           with a seed the training run never used
//   Step 4: Validate every batch            (Layer 5 - ml)
//
// Runs on the plain NdArray backend: no autodiff, eval mode.

use anyhow::Result;

use crate::data::{batcher::SeqBatcher, synthetic::ReverseCopyTask};
use crate::domain::{
    batch::SeqPair,
    traits::{MetricSink, VAL_CORRELATION, VAL_PERP},
};
use crate::infra::{checkpoint::CheckpointManager, metrics::TracingSink};
use crate::ml::{
    model::Text2SumModel,
    trainer::{run_validation, EvalBackend},
};

/// What `evaluate` prints.
#[derive(Debug, Clone)]
pub struct EvaluationSummary {
    pub val_correlation: f64,
    pub val_perp:        f64,
    /// A few pairs with the model's greedy prediction for each
    pub samples:         Vec<(SeqPair, Vec<usize>)>,
}

pub struct EvaluateUseCase {
    ckpt_manager: CheckpointManager,
    samples:      usize,
    show:         usize,
}

impl EvaluateUseCase {
    pub fn new(checkpoint_dir: impl Into<String>, samples: usize, show: usize) -> Result<Self> {
        let dir: String = checkpoint_dir.into();
        let ckpt_manager = CheckpointManager::new(dir)?;
        Ok(Self { ckpt_manager, samples, show })
    }

    pub fn execute(&self) -> Result<EvaluationSummary> {
        // ── Step 1–2: Model ───────────────────────────────────────────────────
        let cfg    = self.ckpt_manager.load_config()?;
        let device = Default::default();
        let model: Text2SumModel<EvalBackend> = cfg.model_config().init(&device)?;
        let model  = self.ckpt_manager.load_model(model, &device)?;

        // ── Step 3: Held-out data ─────────────────────────────────────────────
        let task  = ReverseCopyTask::from_config(&cfg)?;
        let pairs = task.generate(self.samples, cfg.seed.wrapping_add(1));
        let shown: Vec<SeqPair> = pairs.iter().take(self.show).cloned().collect();
        let batches = SeqBatcher::new(cfg.batch_size).batches(pairs)?;
        anyhow::ensure!(!batches.is_empty(), "nothing to evaluate; raise --samples");

        // ── Step 4: Validation ────────────────────────────────────────────────
        let metrics = run_validation(&model, &batches)?;
        let mut sink = TracingSink;
        sink.report(VAL_CORRELATION, metrics.val_correlation);
        sink.report(VAL_PERP, metrics.val_perp);

        let sources: Vec<Vec<usize>> = shown.iter().map(|p| p.source.clone()).collect();
        let predictions = if sources.is_empty() {
            Vec::new()
        } else {
            model.greedy_decode(&sources, cfg.target_len - 1)?
        };

        Ok(EvaluationSummary {
            val_correlation: metrics.val_correlation,
            val_perp:        metrics.val_perp,
            samples:         shown.into_iter().zip(predictions).collect(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};

    #[test]
    fn test_evaluate_after_training() {
        let dir = std::env::temp_dir().join(format!("text2sum-evaluate-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let cfg = TrainConfig {
            checkpoint_dir: dir.display().to_string(),
            source_vocab:   10,
            target_vocab:   12,
            n_units:        8,
            samples:        20,
            min_source_len: 2,
            max_source_len: 4,
            target_len:     4,
            batch_size:     5,
            epochs:         1,
            ..TrainConfig::default()
        };
        TrainUseCase::new(cfg).execute().unwrap();

        let summary = EvaluateUseCase::new(dir.display().to_string(), 10, 3)
            .unwrap()
            .execute()
            .unwrap();

        assert!(summary.val_correlation.is_finite());
        assert!(summary.val_perp >= 1.0);
        assert_eq!(summary.samples.len(), 3);
        assert!(summary.samples.iter().all(|(_, prediction)| prediction.len() == 3));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_evaluate_without_training_fails() {
        let dir = std::env::temp_dir().join(format!("text2sum-untrained-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let use_case = EvaluateUseCase::new(dir.display().to_string(), 10, 0).unwrap();
        assert!(use_case.execute().is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
