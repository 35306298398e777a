// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn framework code lives here.
//
//   mode.rs       — Train/Eval mode and mode-aware dropout
//   embedder.rs   — one-lookup embedding of variable-length batches
//   encoder.rs    — 2-layer bidirectional LSTM encoder
//   decoder.rs    — 4-layer LSTM decoder seeded by the encoder state
//   similarity.rs — validation scores (correlation distance, exact match)
//   model.rs      — Text2SumModel: teacher-forced loss and greedy
//                   decoding / validation
//   trainer.rs    — Adam epoch loop, validation, checkpoints
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Sutskever et al. (2014) Sequence to Sequence Learning

pub mod mode;

pub mod embedder;

pub mod encoder;

pub mod decoder;

pub mod similarity;

/// Encoder-decoder model with its training and validation entry points
pub mod model;

/// Training loop with per-epoch validation and checkpointing
pub mod trainer;
