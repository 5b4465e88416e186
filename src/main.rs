//! Waste classifier command-line interface
//!
//! Subcommands cover the full pipeline: train, evaluate, export, verify
//! and dataset stats.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use waste_classifier::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use waste_classifier::inference::evaluate_checkpoint;
use waste_classifier::model::{ModelConfig, TrainingConfig};
use waste_classifier::quant::{run_export, run_verify, ExportOptions};
use waste_classifier::training::{run_training, TrainPaths};
use waste_classifier::utils::logging::{init_logging, LogConfig};
use waste_classifier::WasteDataset;

#[derive(Parser)]
#[command(name = "waste-classifier")]
#[command(about = "Binary organik/anorganik waste image classifier", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the classifier on the TRAIN split
    Train {
        /// Training split directory
        #[arg(long, default_value = "data/processed/TRAIN")]
        train_dir: PathBuf,

        /// Validation split directory (the held-out TEST folder)
        #[arg(long, default_value = "data/processed/TEST")]
        val_dir: PathBuf,

        /// Output directory for checkpoints
        #[arg(long, default_value = "model")]
        model_dir: PathBuf,

        /// Optional checkpoint providing pretrained backbone weights
        #[arg(long)]
        backbone: Option<PathBuf>,

        /// Number of epochs
        #[arg(long, default_value_t = 15)]
        epochs: usize,

        /// Batch size
        #[arg(long, default_value_t = 32)]
        batch_size: usize,

        /// Adam learning rate
        #[arg(long, default_value_t = 1e-4)]
        learning_rate: f64,

        /// Early stopping patience in epochs
        #[arg(long, default_value_t = 3)]
        patience: usize,

        /// Input image size
        #[arg(long, default_value_t = waste_classifier::IMAGE_SIZE)]
        image_size: usize,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Disable training-split augmentation
        #[arg(long)]
        no_augment: bool,
    },

    /// Evaluate a trained checkpoint on the TEST split
    Evaluate {
        /// Checkpoint file stem (without the .mpk extension)
        #[arg(long, default_value = "model/best_model")]
        checkpoint: PathBuf,

        /// Test split directory
        #[arg(long, default_value = "data/processed/TEST")]
        test_dir: PathBuf,

        /// Model configuration saved during training
        #[arg(long, default_value = "model/config.json")]
        config: PathBuf,

        /// Batch size
        #[arg(long, default_value_t = 32)]
        batch_size: usize,
    },

    /// Export a trained checkpoint as an int8-quantized artifact
    Export {
        /// Checkpoint file stem (without the .mpk extension)
        #[arg(long, default_value = "model/best_model")]
        checkpoint: PathBuf,

        /// Output path of the quantized artifact
        #[arg(long, default_value = "model/waste_classifier_quant.bin")]
        output: PathBuf,

        /// Model configuration saved during training
        #[arg(long, default_value = "model/config.json")]
        config: PathBuf,

        /// Directory of representative images for calibration
        #[arg(long, default_value = "data/processed/TRAIN")]
        calibration_dir: PathBuf,

        /// Calibration images sampled per class
        #[arg(long, default_value_t = 100)]
        calibration: usize,

        /// Skip the calibration divergence check
        #[arg(long)]
        skip_calibration: bool,
    },

    /// Classify images with a quantized artifact
    Verify {
        /// Path to the quantized artifact
        #[arg(long, default_value = "model/waste_classifier_quant.bin")]
        artifact: PathBuf,

        /// Image files to classify
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Print statistics for a dataset split
    Stats {
        /// Dataset split directory
        #[arg(long, default_value = "data/processed/TRAIN")]
        data_dir: PathBuf,
    },
}

/// Load the saved model configuration, falling back to defaults
fn load_model_config(path: &PathBuf) -> ModelConfig {
    if path.exists() {
        match ModelConfig::load(path) {
            Ok(config) => return config,
            Err(e) => eprintln!(
                "{}",
                format!("Warning: could not read {:?} ({}), using defaults", path, e).yellow()
            ),
        }
    }
    ModelConfig::default()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    println!(
        "{}",
        format!(
            "Waste Classifier v{} ({} backend)",
            waste_classifier::VERSION,
            backend_name()
        )
        .bold()
    );

    let device = default_device();

    match cli.command {
        Commands::Train {
            train_dir,
            val_dir,
            model_dir,
            backbone,
            epochs,
            batch_size,
            learning_rate,
            patience,
            image_size,
            seed,
            no_augment,
        } => {
            let paths = TrainPaths {
                train_dir,
                val_dir,
                model_dir,
                backbone,
            };
            let model_config = ModelConfig::with_image_size(image_size);
            let train_config = TrainingConfig {
                epochs,
                batch_size,
                learning_rate,
                patience,
                seed,
                augment: !no_augment,
            };

            run_training::<TrainingBackend>(&paths, &model_config, &train_config, &device)?;
        }

        Commands::Evaluate {
            checkpoint,
            test_dir,
            config,
            batch_size,
        } => {
            let model_config = load_model_config(&config);
            evaluate_checkpoint::<DefaultBackend>(
                &checkpoint,
                &test_dir,
                &model_config,
                batch_size,
                &device,
            )?;
        }

        Commands::Export {
            checkpoint,
            output,
            config,
            calibration_dir,
            calibration,
            skip_calibration,
        } => {
            let model_config = load_model_config(&config);
            let options = ExportOptions {
                checkpoint,
                artifact_path: output,
                calibration_dir: (!skip_calibration).then_some(calibration_dir),
                calibration_per_class: calibration,
            };
            run_export::<DefaultBackend>(&options, &model_config, &device)?;
        }

        Commands::Verify { artifact, images } => {
            run_verify::<DefaultBackend>(&artifact, &images, &device)?;
        }

        Commands::Stats { data_dir } => {
            let dataset = WasteDataset::new(&data_dir)?;
            dataset.stats().print();
        }
    }

    Ok(())
}
