// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each.
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Train on a synthetic corpus, validating every epoch
pub mod train_use_case;

// Reload a checkpoint and greedy-decode held-out data
pub mod evaluate_use_case;
