// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `eval` and `run`
// and all their configurable flags.
//
// Corpus arguments name a list file with one document per
// line: the raw post path, then (for train / eval) the path of
// its annotated copy.
//
// Training defaults are read from TrainConfig::default().

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train extractors on annotated posts
    Train(TrainArgs),

    /// Score trained extractors against annotated posts
    Eval(EvalArgs),

    /// Label raw posts and print CSV
    Run(RunArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// List file of `raw gold` path pairs
    #[arg(long)]
    pub train_data: String,

    /// Directory to save trained extractors into
    #[arg(long, default_value_t = TrainConfig::default().checkpoint_dir)]
    pub checkpoint_dir: String,

    /// Variants to train: "all" or a comma separated list of
    /// fixed_order, pattern, classifier, global, linked
    #[arg(long = "model", default_value_t = TrainConfig::default().models)]
    pub models: String,

    /// Number of shuffled passes over the training documents
    #[arg(long, default_value_t = TrainConfig::default().passes)]
    pub passes: usize,

    /// Documents per weight update
    #[arg(long, default_value_t = TrainConfig::default().batch_size)]
    pub batch_size: usize,

    /// Adaptive step size η
    #[arg(long, default_value_t = TrainConfig::default().step)]
    pub step: f64,

    /// L2 regularisation strength λ
    #[arg(long, default_value_t = TrainConfig::default().reg)]
    pub reg: f64,

    /// Use plain perceptron updates instead of AdaGrad
    #[arg(long)]
    pub perceptron: bool,

    /// Use only this leading share of the training documents
    #[arg(long, default_value_t = TrainConfig::default().fraction)]
    pub fraction: f64,

    /// Expansions before the search stops at the first
    /// improvement (decoder default when absent)
    #[arg(long)]
    pub search_steps: Option<usize>,

    /// Hard cap on search expansions (decoder default when absent)
    #[arg(long)]
    pub search_steps_max: Option<usize>,

    /// Share of documents held out and scored after training
    #[arg(long, default_value_t = TrainConfig::default().holdout)]
    pub holdout: f64,

    /// Seed for the held-out split
    #[arg(long, default_value_t = TrainConfig::default().seed)]
    pub seed: u64,

    /// JSON file replacing the built-in alias tables
    #[arg(long)]
    pub gazetteer: Option<String>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_data:       a.train_data,
            checkpoint_dir:   a.checkpoint_dir,
            models:           a.models,
            passes:           a.passes,
            batch_size:       a.batch_size,
            step:             a.step,
            reg:              a.reg,
            perceptron:       a.perceptron,
            fraction:         a.fraction,
            search_steps:     a.search_steps,
            search_steps_max: a.search_steps_max,
            holdout:          a.holdout,
            seed:             a.seed,
            gazetteer:        a.gazetteer,
        }
    }
}

/// All arguments for the `eval` command
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// List file of `raw gold` path pairs
    #[arg(long)]
    pub eval_data: String,

    #[arg(long = "model", default_value = "all")]
    pub models: String,

    /// Directory where extractors were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Also score every occurrence, not only unique values
    #[arg(long)]
    pub all_values: bool,
}

/// All arguments for the `run` command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// List file of raw post paths
    #[arg(long)]
    pub run_data: String,

    #[arg(long = "model", default_value = "all")]
    pub models: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config() {
        let cli = Cli::try_parse_from(["fx-extract", "train", "--train-data", "a.list"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(
            cfg,
            TrainConfig { train_data: "a.list".to_string(), ..TrainConfig::default() }
        );
    }

    #[test]
    fn test_train_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "fx-extract", "train", "--train-data", "a.list", "--passes", "2", "--step", "0.5",
            "--perceptron", "--holdout", "0.25",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.passes, 2);
        assert_eq!(cfg.step, 0.5);
        assert!(cfg.perceptron);
        assert_eq!(cfg.holdout, 0.25);
        assert_eq!(cfg.reg, TrainConfig::default().reg);
    }

    #[test]
    fn test_eval_flags() {
        let cli = Cli::try_parse_from([
            "fx-extract", "eval", "--eval-data", "e.list", "--model", "global,linked", "--all-values",
        ])
        .unwrap();
        let Commands::Eval(args) = cli.command else { panic!("expected eval") };
        assert_eq!(args.models, "global,linked");
        assert!(args.all_values);
        assert_eq!(args.checkpoint_dir, "checkpoints");
    }
}
