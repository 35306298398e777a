// ============================================================
// Layer 3 — Reserved Vocabulary IDs
// ============================================================
// Token IDs with a fixed meaning in every vocabulary the model
// sees. The vocabulary builder itself lives outside this crate;
// these constants are the part of its contract the model needs.
//
// ID_EOS bootstraps greedy decoding: the first decoder input of
// every example is a single EOS token, never a reference token.

/// End-of-sequence ID, shared by source and target ID spaces.
pub const ID_EOS: usize = 1;

/// First ID available for ordinary content tokens. ID 0 is reserved
/// for padding, which this crate never produces.
pub const FIRST_CONTENT_ID: usize = 2;
