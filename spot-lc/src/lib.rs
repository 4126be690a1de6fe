//! Label conversion (spot-lc)
//!
//! Converts one video's human annotations into a frame-indexed
//! [`VideoEventSet`] on the timeline of its extracted frames. The frame count
//! comes from the frame folder; labels outside the class list are reported
//! and dropped.

use anyhow::{Context, Result};
use clap::Parser;
use spot_common::annotation::{load_annotations, Aligner, AlignmentReport, MalformedClockPolicy};
use spot_common::config::{resolve_timeline, TomlConfig};
use spot_common::dataset::count_frames;
use spot_common::events::upsert_video;
use spot_common::store::{load_json, store_json};
use spot_common::{VideoEventSet, Vocabulary};
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments for spot-lc
#[derive(Parser, Debug, Clone)]
#[command(name = "spot-lc")]
#[command(about = "Convert match annotations into frame-indexed events")]
#[command(version)]
pub struct Args {
    /// Annotation file (e.g. Labels-v2.json)
    #[arg(long)]
    pub label_file: PathBuf,

    /// Video id written into the output
    #[arg(long)]
    pub video_name: String,

    /// Folder of the video's extracted frames
    #[arg(long)]
    pub frame_dir: PathBuf,

    /// Frame rate of the extracted frames
    #[arg(long, env = "SPOT_FPS")]
    pub fps: Option<f64>,

    /// Nominal seconds per half
    #[arg(long, env = "SPOT_HALF_DURATION")]
    pub half_duration: Option<f64>,

    /// Newline-delimited class list
    #[arg(long, default_value = "data/soccernetv2/class.txt")]
    pub class_file: PathBuf,

    /// Output split file
    #[arg(long, default_value = "data/soccernetv2/test.json")]
    pub output: PathBuf,

    /// Handling of unparsable time references (abort or skip)
    #[arg(long, env = "SPOT_MALFORMED_CLOCK")]
    pub malformed_clock: Option<MalformedClockPolicy>,

    /// Replace this video's entry in an existing output file instead of
    /// overwriting the file
    #[arg(long)]
    pub merge: bool,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub output: PathBuf,
    pub num_frames: usize,
    pub report: AlignmentReport,
}

impl Summary {
    /// Lines printed on success: the summary, then diagnostics if any
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Wrote {} events to {}",
            self.report.events.len(),
            self.output.display()
        )];
        if !self.report.unknown_labels.is_empty() {
            let labels: Vec<&str> = self.report.unknown_labels.iter().map(String::as_str).collect();
            lines.push(format!("Skipped labels not in class list: {}", labels.join(", ")));
        }
        if !self.report.skipped.is_empty() {
            let records: Vec<String> = self
                .report
                .skipped
                .iter()
                .map(|r| format!("#{} '{}' ({})", r.index, r.label, r.reason))
                .collect();
            lines.push(format!("Skipped malformed records: {}", records.join("; ")));
        }
        lines
    }
}

/// Run the conversion
pub fn run(args: &Args, config: &TomlConfig) -> Result<Summary> {
    let timeline = resolve_timeline(&config.alignment, args.fps, args.half_duration)
        .context("Invalid alignment settings")?;
    let policy = args.malformed_clock.unwrap_or(config.alignment.malformed_clock);

    let num_frames = count_frames(&args.frame_dir)
        .with_context(|| format!("Cannot use frame folder of '{}'", args.video_name))?;

    let vocabulary = Vocabulary::load(&args.class_file)
        .with_context(|| format!("Failed to load class list {}", args.class_file.display()))?;

    let records = load_annotations(&args.label_file)
        .with_context(|| format!("Failed to read annotations {}", args.label_file.display()))?;
    info!(
        "{}: {} annotation records, {} frames at {} fps",
        args.video_name,
        records.len(),
        num_frames,
        timeline.fps()
    );

    let report = Aligner::new(&vocabulary, timeline)
        .with_num_frames(num_frames)
        .with_policy(policy)
        .align(&records)
        .with_context(|| format!("Failed to align {}", args.label_file.display()))?;

    let entry = VideoEventSet::new(
        args.video_name.clone(),
        num_frames,
        timeline.fps(),
        report.events.clone(),
    );

    let sets = if args.merge && args.output.is_file() {
        let mut sets: Vec<VideoEventSet> = load_json(&args.output)
            .with_context(|| format!("Failed to read existing {}", args.output.display()))?;
        if upsert_video(&mut sets, entry) {
            info!("Replaced existing entry for {}", args.video_name);
        }
        sets
    } else {
        vec![entry]
    };

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    store_json(&args.output, &sets, true)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    Ok(Summary {
        output: args.output.clone(),
        num_frames,
        report,
    })
}
