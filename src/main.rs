//! trie-esn CLI — train and query the trie-conditioned reservoir classifier.
//!
//! Usage:
//!   trie-esn demo
//!   trie-esn predict hello cat
//!   trie-esn config > model.json

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use trie_esn::data;
use trie_esn::train::{self, TrainingSet};
use trie_esn::{Model, ModelConfig, Result, TrainConfig};

#[derive(Parser)]
#[command(name = "trie-esn", version, about = "Trie-conditioned echo state network classifier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// JSON model config (missing fields take defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Tab-separated `sequence<TAB>label` training file (default: built-in demo)
    #[arg(short, long)]
    data: Option<PathBuf>,
    /// Training epochs
    #[arg(long, default_value = "100")]
    epochs: usize,
    /// Base learning rate
    #[arg(long, default_value = "0.01")]
    lr: f64,
    /// Random seed (default: OS entropy)
    #[arg(long)]
    seed: Option<u64>,
    /// Symbol drive amplitude; 0 runs the plain recurrence
    /// (default: 1.0 without --config, otherwise the config's value)
    #[arg(long)]
    input_scale: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on the examples, then print probabilities for each one
    Demo {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Train on the examples, then classify the given sequences
    Predict {
        /// Sequences to classify
        #[arg(required = true)]
        inputs: Vec<String>,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Print the default model config as JSON
    Config,
}

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        if let Ok(d) = "trie_esn=info".parse() {
            filter = filter.add_directive(d);
        }
    }
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Demo { model } => cmd_demo(&model),
        Commands::Predict { inputs, model } => cmd_predict(&inputs, &model),
        Commands::Config => cmd_config(),
    };

    if let Err(e) = outcome {
        tracing::error!("{e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Build and train a model from CLI arguments.
///
/// The trie vocabulary is the demo vocabulary plus every training sequence.
fn trained_model(args: &ModelArgs) -> Result<(Model, TrainingSet)> {
    let mut config = match &args.config {
        Some(path) => ModelConfig::from_json_file(path)?,
        None => data::demo_config(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(scale) = args.input_scale {
        config.input_scale = scale;
    }

    let (training, mut vocabulary): (TrainingSet, Vec<Vec<u8>>) = match &args.data {
        Some(path) => (data::load_examples_from_file(path)?, Vec::new()),
        None => (
            data::demo_training_set(),
            data::demo_vocabulary().iter().map(|w| w.as_bytes().to_vec()).collect(),
        ),
    };
    vocabulary.extend(training.samples.iter().map(|s| s.sequence.clone()));

    let mut model = Model::from_vocabulary(config, &vocabulary)?;
    tracing::info!(
        size_bytes = model.size_bytes(),
        input_scale = model.config().input_scale,
        "model ready"
    );
    let train_config = TrainConfig {
        epochs: args.epochs,
        learning_rate: args.lr,
        ..TrainConfig::default()
    };
    let report = train::train(&mut model, &training, &train_config)?;
    if let (Some(first), Some(last)) = (report.first_loss(), report.last_loss()) {
        println!(
            "Trained {} epochs on '{}' ({} examples): loss {:.4} -> {:.4}",
            report.epochs,
            training.name,
            training.len(),
            first,
            last
        );
    }
    Ok((model, training))
}

fn format_probs(probs: &[f64]) -> String {
    probs.iter().map(|p| format!("{p:.3}")).collect::<Vec<_>>().join(" ")
}

fn cmd_demo(args: &ModelArgs) -> Result<()> {
    let (mut model, training) = trained_model(args)?;

    for sample in &training.samples {
        let probs = model.probabilities(&sample.sequence)?;
        println!(
            "Input: '{}' (gold {}) -> Output Probs: {}",
            String::from_utf8_lossy(&sample.sequence),
            sample.label,
            format_probs(&probs)
        );
    }

    let eval = train::evaluate(&mut model, &training)?;
    println!(
        "Accuracy: {:.1}%  mean gold probability: {:.3}",
        eval.accuracy * 100.0,
        eval.mean_gold_probability
    );
    Ok(())
}

fn cmd_predict(inputs: &[String], args: &ModelArgs) -> Result<()> {
    let (mut model, _) = trained_model(args)?;

    for input in inputs {
        let (state, report) = model.trace(input.as_bytes())?;
        let probs = model.predict(&state)?;
        let class = model.classify_state(&state)?;
        let note = if report.complete { "" } else { " (partial match)" };
        println!(
            "{input}: class {class} [{}] consumed {}/{}{note}",
            format_probs(&probs),
            report.consumed,
            input.len()
        );
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    let json = serde_json::to_string_pretty(&ModelConfig::default())?;
    println!("{json}");
    Ok(())
}
