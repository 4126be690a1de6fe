//! Per-frame model predictions and their normalization
//!
//! A video model scores overlapping clips, so each frame accumulates a sum of
//! class scores from every clip that covered it together with a support count
//! of those clips. Normalization divides the sums by the support, producing
//! per-frame class probabilities carrying exactly one unit of evidence.
//!
//! # Zero Support
//!
//! Frames no clip touched have support 0. Their support is replaced with 1.0
//! before dividing, so they keep their raw (unscaled) score instead of
//! becoming NaN. Such frames are low-confidence by construction, whatever
//! their value. Any support that is not strictly positive (including NaN) is
//! treated the same way.

use crate::store::load_json_auto;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prediction record as written by the model: score sums and support counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPrediction {
    /// `num_frames` rows of `num_classes` score sums
    pub scores: Vec<Vec<f32>>,
    /// Number of clips contributing to each frame
    pub support: Vec<f32>,
}

/// One video's score matrix with a support vector of matching length
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPrediction {
    scores: Array2<f32>,
    support: Array1<f32>,
}

impl VideoPrediction {
    /// Pair a `(num_frames, num_classes)` score matrix with its support vector
    ///
    /// # Errors
    ///
    /// [`Error::ShapeMismatch`] if the frame counts differ.
    pub fn new(video: &str, scores: Array2<f32>, support: Array1<f32>) -> Result<Self> {
        if scores.nrows() != support.len() {
            return Err(Error::ShapeMismatch {
                video: video.to_string(),
                detail: format!(
                    "scores have {} frames but support has {}",
                    scores.nrows(),
                    support.len()
                ),
            });
        }
        Ok(Self { scores, support })
    }

    /// Build from the nested-list file representation
    ///
    /// # Errors
    ///
    /// [`Error::ShapeMismatch`] if score rows are ragged or the frame counts differ.
    pub fn from_raw(video: &str, raw: RawPrediction) -> Result<Self> {
        let num_frames = raw.scores.len();
        let num_classes = raw.scores.first().map_or(0, Vec::len);

        if let Some((frame, row)) = raw
            .scores
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != num_classes)
        {
            return Err(Error::ShapeMismatch {
                video: video.to_string(),
                detail: format!(
                    "frame {} has {} class scores, expected {}",
                    frame,
                    row.len(),
                    num_classes
                ),
            });
        }

        let flat: Vec<f32> = raw.scores.into_iter().flatten().collect();
        let scores = Array2::from_shape_vec((num_frames, num_classes), flat).map_err(|e| {
            Error::ShapeMismatch {
                video: video.to_string(),
                detail: e.to_string(),
            }
        })?;
        Self::new(video, scores, Array1::from(raw.support))
    }

    pub fn scores(&self) -> &Array2<f32> {
        &self.scores
    }

    pub fn support(&self) -> &Array1<f32> {
        &self.support
    }

    pub fn num_frames(&self) -> usize {
        self.scores.nrows()
    }

    pub fn num_classes(&self) -> usize {
        self.scores.ncols()
    }

    /// Number of frames no clip contributed to
    pub fn unsupported_frames(&self) -> usize {
        self.support.iter().filter(|&&s| !(s > 0.0)).count()
    }

    /// Whether every frame carries exactly one unit of support
    pub fn is_normalized(&self) -> bool {
        self.support.iter().all(|&s| s == 1.0)
    }

    /// Divide score sums by support, returning `(scores / support, ones)`
    ///
    /// Applying this to its own output returns the output unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::{array, Array1};
    /// use spot_common::prediction::VideoPrediction;
    ///
    /// let raw = VideoPrediction::new(
    ///     "game1",
    ///     array![[0.2, 0.8], [1.0, 3.0]],
    ///     array![0.0, 2.0],
    /// )
    /// .unwrap();
    ///
    /// let normalized = raw.normalize();
    /// assert_eq!(normalized.scores(), &array![[0.2, 0.8], [0.5, 1.5]]);
    /// assert_eq!(normalized.support(), &Array1::<f32>::ones(2));
    /// ```
    pub fn normalize(&self) -> VideoPrediction {
        let corrected = self.support.mapv(|s| if s > 0.0 { s } else { 1.0 });
        let scores = &self.scores / &corrected.view().insert_axis(Axis(1));
        VideoPrediction {
            scores,
            support: Array1::ones(self.support.len()),
        }
    }

    /// Score matrix as nested rows, the shape used by score archives
    pub fn score_rows(&self) -> Vec<Vec<f32>> {
        self.scores.outer_iter().map(|row| row.to_vec()).collect()
    }
}

/// Normalize every video of a prediction set
///
/// The input is left untouched; a new mapping is returned.
pub fn normalize_predictions(
    predictions: &BTreeMap<String, VideoPrediction>,
) -> BTreeMap<String, VideoPrediction> {
    let mut unsupported_total = 0;
    let normalized = predictions
        .iter()
        .map(|(video, prediction)| {
            let unsupported = prediction.unsupported_frames();
            if unsupported > 0 {
                debug!(
                    "{}: {} of {} frames without support, keeping raw scores",
                    video,
                    unsupported,
                    prediction.num_frames()
                );
            }
            unsupported_total += unsupported;
            (video.clone(), prediction.normalize())
        })
        .collect();

    info!(
        "Normalized {} videos ({} unsupported frames)",
        predictions.len(),
        unsupported_total
    );
    normalized
}

/// Locate `<prefix>.frame.json` or `<prefix>.frame.json.gz` in a model directory
pub fn prediction_file(model_dir: &Path, prefix: &str) -> Result<PathBuf> {
    let candidates = [
        model_dir.join(format!("{}.frame.json", prefix)),
        model_dir.join(format!("{}.frame.json.gz", prefix)),
    ];
    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "no prediction file {} or {}",
                    candidates[0].display(),
                    candidates[1].display()
                ),
            ))
        })
}

/// Load a video → prediction mapping, validating every video's shape
pub fn load_predictions(path: &Path) -> Result<BTreeMap<String, VideoPrediction>> {
    let raw: BTreeMap<String, RawPrediction> = load_json_auto(path)?;
    raw.into_iter()
        .map(|(video, prediction)| {
            let prediction = VideoPrediction::from_raw(&video, prediction)?;
            Ok((video, prediction))
        })
        .collect()
}
