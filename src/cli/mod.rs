// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train` — trains extractors on annotated posts
//   2. `eval`  — scores saved extractors on annotated posts
//   3. `run`   — labels raw posts, printing CSV

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, RunArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "fx-extract",
    version,
    about = "Extract currency exchange offers (have / want / rate) from forum posts."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Eval(args)  => run_eval(args),
            Commands::Run(args)   => run_run(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on documents listed in: {}", args.train_data);

    let use_case = TrainUseCase::new(args.into());
    if let Some(summary) = use_case.execute()? {
        println!("{}", summary.render());
    }

    println!("Training complete. Extractors saved.");
    Ok(())
}

fn run_eval(args: EvalArgs) -> Result<()> {
    use crate::application::extract_use_case::ExtractUseCase;

    let use_case = ExtractUseCase::new(&args.checkpoint_dir, &args.models)?;
    let summary  = use_case.evaluate(&args.eval_data, args.all_values)?;
    print!("{}", summary.render());
    Ok(())
}

fn run_run(args: RunArgs) -> Result<()> {
    use crate::application::extract_use_case::ExtractUseCase;

    let use_case = ExtractUseCase::new(&args.checkpoint_dir, &args.models)?;
    print!("{}", use_case.run(&args.run_data)?);
    Ok(())
}
