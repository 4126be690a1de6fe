//! Frame-indexed event types exchanged with extraction and scoring tools
//!
//! The JSON shape of [`VideoEventSet`] is the wire format consumed downstream:
//!
//! ```json
//! {"video": "game1", "num_frames": 27000, "fps": 5.0,
//!  "events": [{"frame": 13950, "label": "Goal", "score": 0.9}]}
//! ```

use serde::{Deserialize, Serialize};

/// One event pinned to a global frame index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEvent {
    pub frame: u64,
    pub label: String,
    /// Confidence or normalized probability in `[0, 1]`
    pub score: f64,
}

impl FrameEvent {
    pub fn new(frame: u64, label: impl Into<String>, score: f64) -> Self {
        Self {
            frame,
            label: label.into(),
            score,
        }
    }
}

/// All events of one video plus the metadata needed to interpret frame indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEventSet {
    pub video: String,
    pub num_frames: usize,
    pub fps: f64,
    #[serde(default)]
    pub events: Vec<FrameEvent>,
}

impl VideoEventSet {
    pub fn new(video: impl Into<String>, num_frames: usize, fps: f64, events: Vec<FrameEvent>) -> Self {
        Self {
            video: video.into(),
            num_frames,
            fps,
            events,
        }
    }
}

/// Replace the entry for `entry.video` in a split list, or append it
///
/// Returns `true` when an existing entry was replaced.
pub fn upsert_video(sets: &mut Vec<VideoEventSet>, entry: VideoEventSet) -> bool {
    match sets.iter_mut().find(|existing| existing.video == entry.video) {
        Some(existing) => {
            *existing = entry;
            true
        }
        None => {
            sets.push(entry);
            false
        }
    }
}
