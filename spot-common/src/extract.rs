//! Dense-to-sparse event extraction
//!
//! Extractors consume normalized per-frame class scores and produce three
//! artifacts per run: frame-indexed events, a high-recall event list and the
//! per-frame score archive. [`EventExtractor`] is the seam; the conversion
//! command only relies on that contract.

use crate::dataset::Dataset;
use crate::events::{FrameEvent, VideoEventSet};
use crate::prediction::VideoPrediction;
use crate::vocabulary::Vocabulary;
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Default score floor for the high-recall list
pub const DEFAULT_HIGH_RECALL_THRESHOLD: f64 = 0.01;

/// Everything an extractor produces for a prediction set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedEvents {
    pub events: Vec<VideoEventSet>,
    pub events_high_recall: Vec<VideoEventSet>,
    /// Video → per-frame class scores
    pub frame_scores: BTreeMap<String, Vec<Vec<f32>>>,
}

/// Turns normalized per-frame scores into event lists
pub trait EventExtractor {
    fn extract(
        &self,
        dataset: &Dataset,
        vocabulary: &Vocabulary,
        predictions: &BTreeMap<String, VideoPrediction>,
    ) -> Result<ExtractedEvents>;
}

/// Per-frame argmax extractor
///
/// Score column 0 is the background class; column `i` is vocabulary entry
/// `i - 1`. A frame whose argmax is not background yields one event. Every
/// non-background class scoring at least `high_recall_threshold` on a frame
/// yields a high-recall event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArgmaxExtractor {
    pub high_recall_threshold: f64,
}

impl Default for ArgmaxExtractor {
    fn default() -> Self {
        Self {
            high_recall_threshold: DEFAULT_HIGH_RECALL_THRESHOLD,
        }
    }
}

impl ArgmaxExtractor {
    pub fn new(high_recall_threshold: f64) -> Self {
        Self {
            high_recall_threshold,
        }
    }

    fn extract_video(
        &self,
        video: &str,
        vocabulary: &Vocabulary,
        prediction: &VideoPrediction,
    ) -> Result<(Vec<FrameEvent>, Vec<FrameEvent>)> {
        if !prediction.is_normalized() {
            return Err(Error::NotNormalized(video.to_string()));
        }
        if prediction.num_classes() != vocabulary.len() + 1 {
            return Err(Error::ShapeMismatch {
                video: video.to_string(),
                detail: format!(
                    "{} score columns for {} classes plus background",
                    prediction.num_classes(),
                    vocabulary.len()
                ),
            });
        }

        let mut events = Vec::new();
        let mut events_high_recall = Vec::new();

        for (frame, row) in prediction.scores().outer_iter().enumerate() {
            let frame = frame as u64;

            // First maximum wins on ties
            let mut best = 0;
            for (class, &score) in row.iter().enumerate().skip(1) {
                if score > row[best] {
                    best = class;
                }
            }

            for (class, &score) in row.iter().enumerate().skip(1) {
                let label = vocabulary.name(class - 1).unwrap_or_default();
                if class == best {
                    events.push(FrameEvent::new(frame, label, f64::from(score)));
                }
                if f64::from(score) >= self.high_recall_threshold {
                    events_high_recall.push(FrameEvent::new(frame, label, f64::from(score)));
                }
            }
        }

        Ok((events, events_high_recall))
    }
}

impl EventExtractor for ArgmaxExtractor {
    fn extract(
        &self,
        dataset: &Dataset,
        vocabulary: &Vocabulary,
        predictions: &BTreeMap<String, VideoPrediction>,
    ) -> Result<ExtractedEvents> {
        let mut extracted = ExtractedEvents::default();

        for (video, prediction) in predictions {
            let info = dataset.video_info(video)?;
            if info.num_frames != prediction.num_frames() {
                warn!(
                    "{}: dataset lists {} frames, prediction has {}",
                    video,
                    info.num_frames,
                    prediction.num_frames()
                );
            }

            let (events, events_high_recall) = self.extract_video(video, vocabulary, prediction)?;
            debug!(
                "{}: {} events, {} high-recall events",
                video,
                events.len(),
                events_high_recall.len()
            );

            extracted
                .events
                .push(VideoEventSet::new(video.clone(), info.num_frames, info.fps, events));
            extracted.events_high_recall.push(VideoEventSet::new(
                video.clone(),
                info.num_frames,
                info.fps,
                events_high_recall,
            ));
            extracted
                .frame_scores
                .insert(video.clone(), prediction.score_rows());
        }

        Ok(extracted)
    }
}
