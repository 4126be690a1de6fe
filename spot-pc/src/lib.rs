//! Prediction conversion (spot-pc)
//!
//! Turns a model's dense per-frame output into event lists:
//!
//! 1. load the class list, model configuration and split manifest,
//! 2. load `<prefix>.frame.json[.gz]` from the model directory,
//! 3. divide accumulated scores by their support,
//! 4. extract events and write `<prefix>.json`, `<prefix>.recall.json.gz`
//!    and `<prefix>.score.json.gz` next to the predictions.
//!
//! Every artifact is computed and staged before any of them replaces an
//! existing file.

use anyhow::{Context, Result};
use clap::Parser;
use spot_common::config::{resolve_high_recall_threshold, TomlConfig};
use spot_common::dataset::{Dataset, ModelConfig};
use spot_common::extract::{ArgmaxExtractor, EventExtractor};
use spot_common::prediction::{load_predictions, normalize_predictions, prediction_file};
use spot_common::store::ArtifactBatch;
use spot_common::Vocabulary;
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments for spot-pc
#[derive(Parser, Debug, Clone)]
#[command(name = "spot-pc")]
#[command(about = "Convert accumulated frame predictions into event lists")]
#[command(version)]
pub struct Args {
    /// Directory holding the model's config.json and prediction files
    #[arg(long, default_value = "pretrained/soccernet_rgb")]
    pub model_dir: PathBuf,

    /// Prediction file prefix inside the model directory
    #[arg(long, default_value = "pred-test.140")]
    pub prefix: String,

    /// Dataset name under the data root
    #[arg(long, default_value = "soccernetv2")]
    pub dataset: String,

    /// Root of the per-dataset class lists and split manifests
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    /// Root of the extracted frame folders
    #[arg(long, default_value = "frames")]
    pub frame_dir: PathBuf,

    /// Split to convert
    #[arg(long, default_value = "test")]
    pub split: String,

    /// Minimum score for the high-recall event list
    #[arg(long, env = "SPOT_HIGH_RECALL_THRESHOLD")]
    pub high_recall_threshold: Option<f64>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Args {
    fn dataset_dir(&self) -> PathBuf {
        self.data_root.join(&self.dataset)
    }

    pub fn class_file(&self) -> PathBuf {
        self.dataset_dir().join("class.txt")
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.dataset_dir().join(format!("{}.json", self.split))
    }

    pub fn output_files(&self) -> OutputFiles {
        OutputFiles {
            events: self.model_dir.join(format!("{}.json", self.prefix)),
            events_high_recall: self.model_dir.join(format!("{}.recall.json.gz", self.prefix)),
            frame_scores: self.model_dir.join(format!("{}.score.json.gz", self.prefix)),
        }
    }
}

/// Artifacts written by one run
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFiles {
    pub events: PathBuf,
    pub events_high_recall: PathBuf,
    pub frame_scores: PathBuf,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub prefix: String,
    pub videos: usize,
    pub events: usize,
    pub events_high_recall: usize,
    pub outputs: OutputFiles,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Wrote JSON/GZ predictions for {}", self.prefix)
    }
}

/// Run the conversion
pub fn run(args: &Args, config: &TomlConfig) -> Result<Summary> {
    let threshold = resolve_high_recall_threshold(&config.extraction, args.high_recall_threshold)
        .context("Invalid extraction settings")?;

    let class_file = args.class_file();
    let vocabulary = Vocabulary::load(&class_file)
        .with_context(|| format!("Failed to load class list {}", class_file.display()))?;

    let model_config_file = args.model_dir.join("config.json");
    let model = ModelConfig::load(&model_config_file)
        .with_context(|| format!("Failed to load model config {}", model_config_file.display()))?;

    let manifest = args.manifest_file();
    let dataset = Dataset::load(&manifest, &args.frame_dir, model)
        .with_context(|| format!("Failed to load split manifest {}", manifest.display()))?;

    let input = prediction_file(&args.model_dir, &args.prefix)?;
    info!("Reading predictions from {}", input.display());
    let predictions = load_predictions(&input)
        .with_context(|| format!("Failed to load predictions {}", input.display()))?;

    let normalized = normalize_predictions(&predictions);
    let extracted = ArgmaxExtractor::new(threshold)
        .extract(&dataset, &vocabulary, &normalized)
        .context("Event extraction failed")?;

    // All three artifacts land together or not at all
    let outputs = args.output_files();
    let mut batch = ArtifactBatch::new();
    batch
        .json(&outputs.events, &extracted.events, false)
        .with_context(|| format!("Failed to write {}", outputs.events.display()))?;
    batch
        .gz_json(&outputs.events_high_recall, &extracted.events_high_recall)
        .with_context(|| format!("Failed to write {}", outputs.events_high_recall.display()))?;
    batch
        .gz_json(&outputs.frame_scores, &extracted.frame_scores)
        .with_context(|| format!("Failed to write {}", outputs.frame_scores.display()))?;
    batch
        .commit()
        .with_context(|| format!("Failed to publish outputs in {}", args.model_dir.display()))?;

    let summary = Summary {
        prefix: args.prefix.clone(),
        videos: extracted.events.len(),
        events: extracted.events.iter().map(|set| set.events.len()).sum(),
        events_high_recall: extracted
            .events_high_recall
            .iter()
            .map(|set| set.events.len())
            .sum(),
        outputs,
    };
    info!(
        "Converted {} videos: {} events, {} high-recall events",
        summary.videos, summary.events, summary.events_high_recall
    );
    Ok(summary)
}
