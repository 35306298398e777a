// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and all
// their flags. clap's derive macros generate --help text, error
// messages and string → number conversion.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::ml::similarity::SimilarityMetric;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the encoder-decoder on a synthetic reverse-copy corpus
    Train(TrainArgs),

    /// Greedy-decode held-out data with the latest checkpoint
    Evaluate(EvaluateArgs),
}

/// Score used for val_correlation
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SimilarityArg {
    /// 1 - Pearson correlation of the raw token IDs
    Correlation,
    /// Fraction of positions with the wrong token
    Exact,
}

impl From<SimilarityArg> for SimilarityMetric {
    fn from(a: SimilarityArg) -> Self {
        match a {
            SimilarityArg::Correlation => SimilarityMetric::CorrelationDistance,
            SimilarityArg::Exact       => SimilarityMetric::ExactMatchError,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory for checkpoints, train_config.json and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Source vocabulary size
    #[arg(long, default_value_t = 50)]
    pub source_vocab: usize,

    /// Target vocabulary size
    #[arg(long, default_value_t = 60)]
    pub target_vocab: usize,

    /// Embedding and LSTM hidden size
    #[arg(long, default_value_t = 32)]
    pub n_units: usize,

    /// Number of synthetic pairs to generate
    #[arg(long, default_value_t = 512)]
    pub samples: usize,

    #[arg(long, default_value_t = 4)]
    pub min_source_len: usize,

    #[arg(long, default_value_t = 8)]
    pub max_source_len: usize,

    /// Target length including both EOS markers
    #[arg(long, default_value_t = 6)]
    pub target_len: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Dropout between recurrent layers (training only)
    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Report training losses without building gradients
    #[arg(long)]
    pub no_grad: bool,

    #[arg(long, value_enum, default_value_t = SimilarityArg::Correlation)]
    pub similarity: SimilarityArg,

    /// Fraction of pairs used for training; the rest validate
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Seed for corpus generation and the train/validation shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            checkpoint_dir:  a.checkpoint_dir,
            source_vocab:    a.source_vocab,
            target_vocab:    a.target_vocab,
            n_units:         a.n_units,
            samples:         a.samples,
            min_source_len:  a.min_source_len,
            max_source_len:  a.max_source_len,
            target_len:      a.target_len,
            batch_size:      a.batch_size,
            epochs:          a.epochs,
            lr:              a.lr,
            dropout:         a.dropout,
            track_gradients: !a.no_grad,
            similarity:      a.similarity.into(),
            train_fraction:  a.train_fraction,
            seed:            a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of held-out pairs to generate
    #[arg(long, default_value_t = 64)]
    pub samples: usize,

    /// How many predictions to print
    #[arg(long, default_value_t = 5)]
    pub show: usize,
}
