// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The model reports its scalar metrics through a sink instead
// of printing or returning them all. Any key/value logger can
// sit behind it:
//
//   - MetricsRecorder → keeps values in memory (infra::metrics)
//   - TracingSink     → writes each value to the tracing log
//   - (future) a TensorBoard or HTTP exporter
//
// The model only ever calls report() with the four keys below,
// spelled exactly as they are here.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

/// Mean per-batch training loss (summed token CE / batch size)
pub const TRAIN_LOSS: &str = "train_loss";

/// Training perplexity derived from TRAIN_LOSS
pub const TRAIN_PERP: &str = "train_perp";

/// Greedy-decoding similarity score on a validation batch
pub const VAL_CORRELATION: &str = "val_correlation";

/// Perplexity-style transform of VAL_CORRELATION
pub const VAL_PERP: &str = "val_perp";

// ─── MetricSink ───────────────────────────────────────────────────────────────
/// Anything that accepts named scalar metrics.
pub trait MetricSink {
    /// Record one scalar under `key`.
    fn report(&mut self, key: &str, value: f64);
}
