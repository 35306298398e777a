// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, built on clap.
// All work is delegated to Layer 2 (application).
//
//   1. `train`    — train on a synthetic corpus, checkpoint each epoch
//   2. `evaluate` — reload the latest checkpoint and greedy-decode
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "text2sum",
    version,
    about = "Train and evaluate a bidirectional LSTM encoder-decoder with greedy decoding."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case. The CLI layer never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training, checkpoints in: {}", args.checkpoint_dir);
    let history = TrainUseCase::new(args.into()).execute()?;

    if let Some(last) = history.last() {
        println!(
            "Training complete. Final val_correlation={:.4}, val_perp={:.4}",
            last.val_correlation, last.val_perp,
        );
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let summary = EvaluateUseCase::new(args.checkpoint_dir, args.samples, args.show)?.execute()?;

    println!(
        "val_correlation={:.4} val_perp={:.4}",
        summary.val_correlation, summary.val_perp,
    );
    for (pair, prediction) in &summary.samples {
        println!(
            "source={:?}\n  target={:?}\n  predicted={:?}",
            pair.source, pair.target.get(1..).unwrap_or_default(), prediction,
        );
    }
    Ok(())
}
