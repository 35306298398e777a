// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, constants and traits describing what the
// system works with: token sequences, batches of them, and the
// metric sink the model reports into.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, traits and constants
//
// Everything here is unit-testable without a tensor backend.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Reserved token IDs (EOS, PAD)
pub mod vocab;

// Sequence pairs and validated batches
pub mod batch;

// MetricSink and the metric key names
pub mod traits;
