// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the application layer but not
// part of the model itself:
//
//   checkpoint.rs — model weights via Burn's CompactRecorder,
//                   plus TrainConfig as JSON so `evaluate` can
//                   rebuild the exact architecture
//
//   metrics.rs    — MetricSink implementations (in-memory and
//                   tracing) and the per-epoch CSV logger
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Metric sinks and the metrics CSV logger
pub mod metrics;
