// ============================================================
// Layer 4 — Synthetic Reverse-Copy Task
// ============================================================
// Real corpora and vocabularies come from outside this crate.
// To exercise the model end to end we generate a toy
// "summarisation" task with a known answer:
//
//   source: random content tokens, length in [min_len, max_len]
//   target: EOS + the last k source tokens in reverse order + EOS
//           (k = target_len - 2, so every target has target_len)
//
//   source [5, 9, 3, 7, 4]   target_len 5 → k = 3
//   target [EOS, 4, 7, 3, EOS]
//
// Every target in a run has the same length, which is exactly
// what the decoder batch contract asks for. Content tokens are
// drawn from [FIRST_CONTENT_ID, min(source_vocab, target_vocab))
// so every ID is valid on both sides.
//
// Generation is seeded: the same seed gives the same corpus.

use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::domain::{
    batch::SeqPair,
    vocab::{FIRST_CONTENT_ID, ID_EOS},
};

#[derive(Debug, Clone)]
pub struct ReverseCopyTask {
    /// Exclusive upper bound on content token IDs
    pub vocab_limit: usize,
    pub min_len:     usize,
    pub max_len:     usize,
    /// Length of every target, EOS markers included
    pub target_len:  usize,
}

impl ReverseCopyTask {
    pub fn new(vocab_limit: usize, min_len: usize, max_len: usize, target_len: usize) -> Result<Self> {
        ensure!(
            vocab_limit > FIRST_CONTENT_ID,
            "vocabulary of size {vocab_limit} leaves no room for content tokens",
        );
        ensure!(min_len >= 1, "source sequences need at least one token");
        ensure!(min_len <= max_len, "min_len {min_len} exceeds max_len {max_len}");
        ensure!(target_len >= 2, "target_len must cover both EOS markers, got {target_len}");
        ensure!(
            target_len - 2 <= min_len,
            "target_len {target_len} needs sources of at least {} tokens",
            target_len - 2,
        );
        Ok(Self { vocab_limit, min_len, max_len, target_len })
    }

    pub fn from_config(cfg: &TrainConfig) -> Result<Self> {
        Self::new(
            cfg.source_vocab.min(cfg.target_vocab),
            cfg.min_source_len,
            cfg.max_source_len,
            cfg.target_len,
        )
    }

    /// Expected target for `source`.
    pub fn target_for(&self, source: &[usize]) -> Vec<usize> {
        let k = self.target_len - 2;
        let mut target = Vec::with_capacity(self.target_len);
        target.push(ID_EOS);
        target.extend(source.iter().rev().take(k));
        target.push(ID_EOS);
        target
    }

    /// `count` pairs drawn from a generator seeded with `seed`.
    pub fn generate(&self, count: usize, seed: u64) -> Vec<SeqPair> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let len = rng.gen_range(self.min_len..=self.max_len);
                let source: Vec<usize> = (0..len)
                    .map(|_| rng.gen_range(FIRST_CONTENT_ID..self.vocab_limit))
                    .collect();
                let target = self.target_for(&source);
                SeqPair::new(source, target)
            })
            .collect()
    }
}
