// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop around the model's two entry points:
//
//   for each epoch:
//     for each training batch:
//       loss = model.forward_loss(batch)       (Mode::Train)
//       grads = loss.backward(); Adam step
//     valid = model.valid()                    (inner backend, no autodiff)
//     for each validation batch:
//       valid.validate(batch)                  (Mode::Eval, greedy)
//     average the recorded metrics, append to metrics.csv,
//     save a checkpoint
//
// Key Burn insight:
//   - Training uses Autodiff<NdArray> so loss.backward() works
//   - model.valid() returns the same weights on plain NdArray,
//     so validation builds no autodiff graph at all
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::batch::SeqBatch;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger, MetricsRecorder},
};
use crate::ml::model::{Text2SumConfig, Text2SumModel};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
pub type EvalBackend  = burn::backend::NdArray;

/// Train a fresh model on `train_batches`, validating on `val_batches`
/// after every epoch. Returns the metrics of each epoch.
pub fn run_training(
    cfg:           &TrainConfig,
    train_batches: &[SeqBatch],
    val_batches:   &[SeqBatch],
    ckpt_manager:  &CheckpointManager,
) -> Result<Vec<EpochMetrics>> {
    let device = Default::default();
    let model_cfg: Text2SumConfig = cfg.model_config();
    let mut model: Text2SumModel<TrainBackend> = model_cfg.init(&device)?;
    tracing::info!(
        "Model ready: vocab {}→{}, n_units={}, dropout={}",
        cfg.source_vocab, cfg.target_vocab, cfg.n_units, cfg.dropout,
    );

    if !model.track_gradients {
        tracing::warn!("Gradient tracking disabled: losses are reported but weights will not change");
    }

    let mut optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .init::<TrainBackend, Text2SumModel<TrainBackend>>();
    let logger       = MetricsLogger::new(ckpt_manager.dir().clone())?;
    let mut history  = Vec::with_capacity(cfg.epochs);
    let mut recorder = MetricsRecorder::new();
    let mut best_val = f64::INFINITY;

    for epoch in 1..=cfg.epochs {
        recorder.clear();

        // ── Training phase ────────────────────────────────────────────────────
        model = train_epoch(model, &mut optim, train_batches, cfg.lr, &mut recorder)?;

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid: Text2SumModel<EvalBackend> = model.valid();
        for batch in val_batches {
            model_valid.validate(batch, &mut recorder)?;
        }

        let metrics = EpochMetrics::from_recorder(epoch, &recorder);
        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | train_perp={:.4} | val_correlation={:.4} | val_perp={:.4}",
            epoch, cfg.epochs, metrics.train_loss, metrics.train_perp,
            metrics.val_correlation, metrics.val_perp,
        );
        logger.log(&metrics)?;

        if metrics.is_improvement(best_val) {
            best_val = metrics.val_correlation;
            tracing::info!("New best val_correlation={:.4} at epoch {}", best_val, epoch);
        }

        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
        history.push(metrics);
    }

    tracing::info!("Training complete!");
    Ok(history)
}

/// One pass over `batches`, reporting the training metrics to `recorder`.
///
/// The optimiser only steps when the model tracks gradients; a detached
/// loss has no graph to run `backward()` on.
pub fn train_epoch<O>(
    mut model: Text2SumModel<TrainBackend>,
    optim:     &mut O,
    batches:   &[SeqBatch],
    lr:        f64,
    recorder:  &mut MetricsRecorder,
) -> Result<Text2SumModel<TrainBackend>>
where
    O: Optimizer<Text2SumModel<TrainBackend>, TrainBackend>,
{
    for batch in batches {
        let loss = model.forward_loss(batch, recorder)?;
        if model.track_gradients {
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }
    }
    Ok(model)
}

/// Validate an already-built model over `batches`, returning the averages.
pub fn run_validation<B: Backend>(model: &Text2SumModel<B>, batches: &[SeqBatch]) -> Result<EpochMetrics> {
    let mut recorder = MetricsRecorder::new();
    for batch in batches {
        let report = model.validate(batch, &mut recorder)?;
        tracing::debug!(
            "validated {} examples: val_correlation={:.4} val_perp={:.4}",
            report.predictions.len(), report.val_correlation, report.val_perp,
        );
    }
    Ok(EpochMetrics::from_recorder(0, &recorder))
}
