// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Stand-ins for the corpus, vocabulary and loader that normally
// feed the model. They produce exactly what the model consumes:
// ordered batches of integer ID sequences.
//
//   ReverseCopyTask   → seeded synthetic (source, target) pairs
//       │
//       ▼
//   split_train_val   → seeded shuffle, train / validation split
//       │
//       ▼
//   SeqBatcher        → SeqBatches (validated, order preserved)
//       │
//       ▼
//   ml::trainer       → forward_loss / validate
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Synthetic reverse-copy corpus generator
pub mod synthetic;

/// Shuffles and splits data into train/validation sets
pub mod splitter;

/// Groups pairs into validated batches
pub mod batcher;
