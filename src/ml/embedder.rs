// ============================================================
// Layer 5 — Sequence Embedder
// ============================================================
// Embeds a batch of variable-length ID sequences with ONE table
// lookup instead of one per example:
//
//   [a1 a2 a3] [b1 b2] [c1 c2 c3 c4]
//        │ concatenate
//        ▼
//   [a1 a2 a3 b1 b2 c1 c2 c3 c4]      ← single Embedding::forward
//        │ split at prefix sums of all-but-last lengths: [3, 5]
//        ▼
//   [ea1 ea2 ea3] [eb1 eb2] [ec1 ec2 ec3 ec4]
//
// Each chunk is a [len_i, n_units] tensor, returned in batch
// order. With one example there are no split points at all.
//
// Reference: Burn Book §3 (Building Blocks: Embedding)

use burn::{nn::Embedding, prelude::*};

/// Split points for re-partitioning a flat batch: the running sum
/// of every length except the last.
///
/// `[3, 2, 4]` → `[3, 5]`, `[7]` → `[]`.
pub fn section_offsets(lengths: &[usize]) -> Vec<usize> {
    let head = &lengths[..lengths.len().saturating_sub(1)];
    head.iter()
        .scan(0usize, |acc, &len| {
            *acc += len;
            Some(*acc)
        })
        .collect()
}

/// Embed every sequence of `seqs` with `embed`, preserving order and
/// per-example length.
///
/// Sequences must be non-empty; `SeqBatch` guarantees that.
pub fn sequence_embed<B: Backend>(
    embed:  &Embedding<B>,
    seqs:   &[Vec<usize>],
    device: &B::Device,
) -> Vec<Tensor<B, 2>> {
    let lengths: Vec<usize> = seqs.iter().map(Vec::len).collect();
    let total: usize = lengths.iter().sum();

    let flat: Vec<i32> = seqs
        .iter()
        .flat_map(|s| s.iter().map(|&id| id as i32))
        .collect();
    let ids = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([1, total]);

    // [1, total, n_units] → [total, n_units]
    let embedded = embed.forward(ids);
    let [_, _, n_units] = embedded.dims();
    let embedded = embedded.reshape([total, n_units]);

    let mut bounds = Vec::with_capacity(lengths.len() + 1);
    bounds.push(0);
    bounds.extend(section_offsets(&lengths));
    bounds.push(total);

    bounds
        .windows(2)
        .map(|w| embedded.clone().narrow(0, w[0], w[1] - w[0]))
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::EmbeddingConfig;

    type TestBackend = NdArray;

    #[test]
    fn test_offsets() {
        assert_eq!(section_offsets(&[3, 2, 4]), vec![3, 5]);
        assert_eq!(section_offsets(&[4, 6]), vec![4]);
    }

    #[test]
    fn test_offsets_single_example_has_no_split() {
        assert!(section_offsets(&[7]).is_empty());
        assert!(section_offsets(&[]).is_empty());
    }

    #[test]
    fn test_shapes_follow_input() {
        let device = Default::default();
        let embed = EmbeddingConfig::new(20, 8).init::<TestBackend>(&device);
        let seqs = vec![vec![1, 2, 3], vec![4, 5], vec![6, 7, 8, 9]];

        let out = sequence_embed(&embed, &seqs, &device);

        assert_eq!(out.len(), seqs.len());
        for (chunk, seq) in out.iter().zip(&seqs) {
            assert_eq!(chunk.dims(), [seq.len(), 8]);
        }
    }

    #[test]
    fn test_single_example() {
        let device = Default::default();
        let embed = EmbeddingConfig::new(10, 4).init::<TestBackend>(&device);
        let out = sequence_embed(&embed, &[vec![3, 3, 9]], &device);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].dims(), [3, 4]);
    }

    #[test]
    fn test_chunks_match_per_example_lookup() {
        let device = Default::default();
        let embed = EmbeddingConfig::new(12, 6).init::<TestBackend>(&device);
        let seqs = vec![vec![5, 1], vec![11, 0, 7]];

        let batched = sequence_embed(&embed, &seqs, &device);

        for (chunk, seq) in batched.into_iter().zip(&seqs) {
            let alone = sequence_embed(&embed, std::slice::from_ref(seq), &device)
                .pop()
                .unwrap();
            let diff: f32 = (chunk - alone).abs().sum().into_scalar();
            assert_eq!(diff, 0.0);
        }
    }
}
