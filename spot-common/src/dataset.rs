//! Dataset metadata: split manifests, model configuration and frame folders
//!
//! Extracted frames live under `<frame_root>/<video>/` as one JPEG per frame.
//! A split manifest (`<data_root>/<dataset>/<split>.json`) lists every video of
//! the split with its frame count and frame rate, in the same schema as
//! [`VideoEventSet`].

use crate::events::VideoEventSet;
use crate::store::load_json;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File extension of extracted frames
pub const FRAME_EXTENSION: &str = "jpg";

/// Count extracted frames (`*.jpg`) directly inside a directory
///
/// # Errors
///
/// [`Error::NoFramesFound`] if the directory is missing, unreadable or holds
/// no frame.
pub fn count_frames(frame_dir: &Path) -> Result<usize> {
    let entries = std::fs::read_dir(frame_dir).map_err(|e| {
        debug!("Cannot read frame directory {}: {}", frame_dir.display(), e);
        Error::NoFramesFound(frame_dir.to_path_buf())
    })?;

    let mut count = 0;
    for entry in entries {
        let path = entry?.path();
        let is_frame = path.is_file()
            && path
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case(FRAME_EXTENSION));
        if is_frame {
            count += 1;
        }
    }

    if count == 0 {
        return Err(Error::NoFramesFound(frame_dir.to_path_buf()));
    }
    debug!("Found {} frames in {}", count, frame_dir.display());
    Ok(count)
}

/// Clip and crop settings the model was trained with (`config.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Input modality, e.g. `rgb`
    pub modality: String,
    /// Frames per clip
    pub clip_len: usize,
    #[serde(default)]
    pub crop_dim: Option<u32>,
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }
}

/// Frame layout of one video
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub num_frames: usize,
    pub fps: f64,
}

/// Videos of one split, in manifest order
#[derive(Debug, Clone)]
pub struct Dataset {
    videos: Vec<(String, VideoInfo)>,
    model: ModelConfig,
    frame_root: PathBuf,
}

impl Dataset {
    /// Load a split manifest
    ///
    /// Videos whose frame folder is missing under `frame_root` are kept but
    /// logged; their predictions can still be converted.
    pub fn load(manifest: &Path, frame_root: &Path, model: ModelConfig) -> Result<Self> {
        let entries: Vec<VideoEventSet> = load_json(manifest)?;
        let dataset = Self::from_entries(entries, frame_root, model);

        let missing = dataset
            .videos
            .iter()
            .filter(|(video, _)| !frame_root.join(video).is_dir())
            .count();
        if missing > 0 {
            warn!(
                "{} of {} videos have no frame folder under {}",
                missing,
                dataset.len(),
                frame_root.display()
            );
        }

        info!(
            "Loaded {} videos from {} (modality {}, clip length {})",
            dataset.len(),
            manifest.display(),
            dataset.model.modality,
            dataset.model.clip_len
        );
        Ok(dataset)
    }

    pub fn from_entries(entries: Vec<VideoEventSet>, frame_root: &Path, model: ModelConfig) -> Self {
        let videos = entries
            .into_iter()
            .map(|entry| {
                (
                    entry.video,
                    VideoInfo {
                        num_frames: entry.num_frames,
                        fps: entry.fps,
                    },
                )
            })
            .collect();
        Self {
            videos,
            model,
            frame_root: frame_root.to_path_buf(),
        }
    }

    /// Frame layout of a video
    ///
    /// # Errors
    ///
    /// [`Error::UnknownVideo`] if the split does not list it.
    pub fn video_info(&self, video: &str) -> Result<VideoInfo> {
        self.videos
            .iter()
            .find(|(name, _)| name == video)
            .map(|(_, info)| *info)
            .ok_or_else(|| Error::UnknownVideo(video.to_string()))
    }

    pub fn videos(&self) -> impl Iterator<Item = &str> {
        self.videos.iter().map(|(name, _)| name.as_str())
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn frame_dir(&self, video: &str) -> PathBuf {
        self.frame_root.join(video)
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}
