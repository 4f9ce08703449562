//! `optic`: offline model tooling.
//!
//!   optic train --train-dir data/train --test-dir data/test --out model.json
//!   optic convert model.json model.optc
//!   optic classify photo.jpg

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use optic::classifier::{self, CompactModel};
use optic::train::load_image_folder;
use optic::{
    Config, EpochStats, ImagePipeline, LossType, Network, NetworkSpec, Sgd, TrainConfig,
    preprocess::{INPUT_HEIGHT, INPUT_WIDTH},
};

#[derive(Parser)]
#[command(author, version, about = "Optic model tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the licit/illicit classifier from two class directories
    Train {
        /// Directory with one sub-directory per class
        #[arg(long)]
        train_dir: PathBuf,
        /// Held-out images, same layout as --train-dir
        #[arg(long)]
        test_dir: PathBuf,
        /// Output network JSON
        #[arg(long, default_value = "model.json")]
        out: PathBuf,
        #[arg(long, default_value_t = 20)]
        epochs: usize,
        #[arg(long, default_value_t = 32)]
        batch_size: usize,
        #[arg(long, default_value_t = 0.01)]
        learning_rate: f64,
        /// Hidden layer width
        #[arg(long, default_value_t = 64)]
        hidden: usize,
        /// Training loss: `bce` or `mse`
        #[arg(long, default_value = "bce")]
        loss: LossType,
        /// L2 penalty on weights
        #[arg(long, default_value_t = 0.0)]
        weight_decay: f64,
    },
    /// Convert a network JSON into the compact int8 format
    Convert {
        input: PathBuf,
        output: PathBuf,
    },
    /// Classify one image with the configured backend
    Classify {
        image: PathBuf,
    },
}

fn main() -> Result<()> {
    optic::logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            train_dir,
            test_dir,
            out,
            epochs,
            batch_size,
            learning_rate,
            hidden,
            loss,
            weight_decay,
        } => {
            let hyper = Hyperparams { epochs, batch_size, learning_rate, hidden, loss, weight_decay };
            train(&train_dir, &test_dir, &out, &hyper)
        }
        Commands::Convert { input, output } => convert(&input, &output),
        Commands::Classify { image } => classify(&image),
    }
}

struct Hyperparams {
    epochs: usize,
    batch_size: usize,
    learning_rate: f64,
    hidden: usize,
    loss: LossType,
    weight_decay: f64,
}

fn train(train_dir: &Path, test_dir: &Path, out: &Path, hyper: &Hyperparams) -> Result<()> {
    if hyper.epochs == 0 || hyper.batch_size == 0 || hyper.hidden == 0 {
        bail!("--epochs, --batch-size and --hidden must be positive");
    }
    if hyper.weight_decay.is_nan() || hyper.weight_decay < 0.0 {
        bail!("--weight-decay must be zero or positive");
    }

    let train_set = load_image_folder(train_dir)
        .with_context(|| format!("loading {}", train_dir.display()))?;
    let test_set = load_image_folder(test_dir)
        .with_context(|| format!("loading {}", test_dir.display()))?;
    if train_set.class_names != test_set.class_names {
        bail!(
            "class directories differ: {:?} vs {:?}",
            train_set.class_names,
            test_set.class_names
        );
    }
    log::info!(
        "Loaded {} training / {} test images, classes {:?} ({} skipped)",
        train_set.inputs.len(),
        test_set.inputs.len(),
        train_set.class_names,
        train_set.skipped + test_set.skipped
    );

    let name = out.file_stem().and_then(|s| s.to_str()).unwrap_or("optic").to_owned();
    let mut spec = NetworkSpec::binary_image_classifier(
        name,
        INPUT_WIDTH,
        INPUT_HEIGHT,
        hyper.hidden,
        train_set.class_names.clone(),
    );
    spec.loss = hyper.loss;
    let optimizer = Sgd::new(hyper.learning_rate).with_weight_decay(hyper.weight_decay);
    let (epochs, batch_size) = (hyper.epochs, hyper.batch_size);

    let (tx, rx) = mpsc::channel::<EpochStats>();
    let worker = thread::spawn(move || {
        let mut network = spec.build();
        let config = TrainConfig::new(epochs, batch_size, spec.loss).with_progress(tx);
        // Both folders hold at least one image; load_image_folder rejects empty ones.
        optic::train_loop(
            &mut network,
            &train_set.inputs,
            &train_set.labels,
            Some(test_set.inputs.as_slice()),
            Some(test_set.labels.as_slice()),
            &optimizer,
            &config,
        );
        network
    });

    // Ends when the worker drops its sender.
    for stats in rx {
        log::info!(
            "epoch {}/{}: loss {:.4} acc {:.3} | val loss {} val acc {} ({} ms)",
            stats.epoch,
            stats.total_epochs,
            stats.train_loss,
            stats.train_accuracy,
            fmt_opt(stats.val_loss),
            fmt_opt(stats.val_accuracy),
            stats.elapsed_ms
        );
    }

    let network: Network = worker.join().map_err(|_| anyhow!("training thread panicked"))?;
    network.save_json(out).with_context(|| format!("writing {}", out.display()))?;
    log::info!("Model saved to {}", out.display());
    Ok(())
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.4}", x)).unwrap_or_else(|| "-".into())
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let network = Network::load_json(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let compact = CompactModel::from_network(&network);
    compact.save(output).with_context(|| format!("writing {}", output.display()))?;

    let original = std::fs::metadata(input)?.len();
    let converted = std::fs::metadata(output)?.len();
    let reduction = if original > 0 {
        100.0 * (1.0 - converted as f64 / original as f64)
    } else {
        0.0
    };
    println!("Original:  {:.2} MB", original as f64 / (1024.0 * 1024.0));
    println!("Converted: {:.2} MB", converted as f64 / (1024.0 * 1024.0));
    println!("Reduction: {:.1}%", reduction);
    Ok(())
}

fn classify(image: &Path) -> Result<()> {
    let config = Config::from_env()?;
    let model = std::sync::Arc::new(classifier::from_config(&config));
    let pipeline = ImagePipeline::new(model);

    let bytes = std::fs::read(image).with_context(|| format!("reading {}", image.display()))?;
    let verdict = pipeline.classify(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}
