// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Groups SeqPairs into SeqBatches of at most batch_size examples.
//
// Unlike image or classification batchers we do NOT build padded
// tensors here. The model embeds variable-length sequences
// itself (one flat lookup, then re-split by offsets), so a batch
// stays a list of ID vectors until it reaches ml::embedder.
//
// Input order is kept: pair i of the input ends up at position
// i % batch_size of batch i / batch_size. The last batch may be
// smaller.
//
// Every batch goes through SeqBatch::from_pairs, so a pair that
// breaks the batch contract (empty sequence, target length
// differing from its neighbours) is reported here.

use anyhow::{ensure, Context, Result};

use crate::domain::batch::{SeqBatch, SeqPair};

#[derive(Clone, Debug)]
pub struct SeqBatcher {
    pub batch_size: usize,
}

impl SeqBatcher {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    pub fn batches(&self, pairs: Vec<SeqPair>) -> Result<Vec<SeqBatch>> {
        ensure!(self.batch_size > 0, "batch_size must be positive");

        let mut batches = Vec::with_capacity(pairs.len().div_ceil(self.batch_size));
        let mut pairs = pairs.into_iter().peekable();
        while pairs.peek().is_some() {
            let index = batches.len();
            let chunk: Vec<SeqPair> = pairs.by_ref().take(self.batch_size).collect();
            let batch = SeqBatch::from_pairs(chunk)
                .with_context(|| format!("invalid batch #{index}"))?;
            batches.push(batch);
        }

        tracing::debug!("Built {} batches of up to {} pairs", batches.len(), self.batch_size);
        Ok(batches)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn pair(tag: usize) -> SeqPair {
        SeqPair::new(vec![tag, tag], vec![1, tag, 1])
    }

    #[test]
    fn test_batch_sizes() {
        let pairs: Vec<SeqPair> = (2..12).map(pair).collect();
        let batches = SeqBatcher::new(4).batches(pairs).unwrap();
        let sizes: Vec<usize> = batches.iter().map(SeqBatch::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_order_is_preserved() {
        let pairs: Vec<SeqPair> = (2..7).map(pair).collect();
        let batches = SeqBatcher::new(2).batches(pairs).unwrap();
        let firsts: Vec<usize> = batches
            .iter()
            .flat_map(|b| b.encoder_input().iter().map(|s| s[0]))
            .collect();
        assert_eq!(firsts, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_empty_input_gives_no_batches() {
        assert!(SeqBatcher::new(3).batches(vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_ragged_targets_are_rejected() {
        let pairs = vec![pair(2), SeqPair::new(vec![3], vec![1, 1])];
        let err = SeqBatcher::new(2).batches(pairs).unwrap_err();
        assert!(format!("{err:#}").contains("batch #0"));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        assert!(SeqBatcher::new(0).batches(vec![pair(2)]).is_err());
    }
}
