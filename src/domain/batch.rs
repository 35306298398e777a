// ============================================================
// Layer 3 — Sequence Pairs and Batches
// ============================================================
// A SeqPair is one training example: a source token sequence
// and a target token sequence, both already mapped to integer
// vocabulary IDs.
//
// A SeqBatch groups N pairs. It is the only input type the
// model accepts, and it can only be built through SeqBatch::new,
// which enforces the batch contract up front:
//
//   - at least one example
//   - as many decoder rows as encoder rows
//   - no empty sequence anywhere
//   - every decoder row has the same length
//
// A violation means the upstream data pipeline is broken, so
// we fail fast with a message naming the offending row instead
// of letting the tensor backend panic later.
//
// Row i of every result produced from a batch belongs to row i
// of the batch; nothing in the model reorders examples.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// One (source, target) example as vocabulary IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqPair {
    /// Source token IDs, fed to the encoder
    pub source: Vec<usize>,

    /// Target token IDs, including the leading and trailing EOS
    pub target: Vec<usize>,
}

impl SeqPair {
    pub fn new(source: Vec<usize>, target: Vec<usize>) -> Self {
        Self { source, target }
    }
}

/// A validated batch of encoder inputs and decoder sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqBatch {
    encoder_input:  Vec<Vec<usize>>,
    decoder_source: Vec<Vec<usize>>,
}

impl SeqBatch {
    /// Build a batch, checking the batch contract described above.
    pub fn new(encoder_input: Vec<Vec<usize>>, decoder_source: Vec<Vec<usize>>) -> Result<Self> {
        ensure!(!encoder_input.is_empty(), "batch is empty");
        ensure!(
            encoder_input.len() == decoder_source.len(),
            "batch size mismatch: {} encoder rows vs {} decoder rows",
            encoder_input.len(),
            decoder_source.len(),
        );

        if let Some(row) = encoder_input.iter().position(Vec::is_empty) {
            anyhow::bail!("encoder input row {row} is empty");
        }
        if let Some(row) = decoder_source.iter().position(Vec::is_empty) {
            anyhow::bail!("decoder source row {row} is empty");
        }

        let width = decoder_source[0].len();
        if let Some(row) = decoder_source.iter().position(|s| s.len() != width) {
            anyhow::bail!(
                "decoder source row {row} has length {}, expected {width}",
                decoder_source[row].len(),
            );
        }

        Ok(Self { encoder_input, decoder_source })
    }

    /// Build a batch from owned pairs, keeping their order.
    pub fn from_pairs(pairs: Vec<SeqPair>) -> Result<Self> {
        let (encoder_input, decoder_source) = pairs
            .into_iter()
            .map(|p| (p.source, p.target))
            .unzip();
        Self::new(encoder_input, decoder_source)
    }

    pub fn len(&self) -> usize {
        self.encoder_input.len()
    }

    pub fn encoder_input(&self) -> &[Vec<usize>] {
        &self.encoder_input
    }

    pub fn decoder_source(&self) -> &[Vec<usize>] {
        &self.decoder_source
    }

    /// Common length of every decoder source row
    pub fn target_width(&self) -> usize {
        self.decoder_source[0].len()
    }

    /// Teacher-forcing split of the decoder source.
    ///
    /// Returns (decoder_input, decoder_target): the input drops the
    /// last token, the target drops the first, so position t of the
    /// input is trained to predict position t of the target.
    pub fn teacher_forcing(&self) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        self.decoder_source
            .iter()
            .map(|row| (row[..row.len() - 1].to_vec(), row[1..].to_vec()))
            .unzip()
    }

    /// Largest ID in the encoder input, if any
    pub fn max_source_id(&self) -> Option<usize> {
        self.encoder_input.iter().flatten().copied().max()
    }

    /// Largest ID in the decoder source, if any
    pub fn max_target_id(&self) -> Option<usize> {
        self.decoder_source.iter().flatten().copied().max()
    }
}
