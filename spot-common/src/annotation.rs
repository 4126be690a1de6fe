//! Human annotations and their alignment onto the frame timeline
//!
//! Annotation files come from several upstream schemas. A record carries its
//! instant either as a `"<half> - MM:SS"` game-time string or as an absolute
//! `position` (seconds) with an optional `half`. Numeric fields may be JSON
//! numbers or numeric strings. [`RawAnnotation`] accepts any JSON object, so
//! a mistyped field never rejects the file; [`RawAnnotation::resolve`] turns
//! one into a typed [`AnnotationRecord`] and reports such fields there.
//!
//! [`Aligner`] converts records into [`FrameEvent`]s:
//!
//! 1. the label is trimmed and checked against the vocabulary; unknown labels
//!    are collected once each and the record is skipped,
//! 2. the time reference is resolved (a malformed clock aborts or is skipped
//!    per [`MalformedClockPolicy`]),
//! 3. the instant is mapped to a frame and, when the video length is known,
//!    clamped into it.
//!
//! Output order is input order.

use crate::events::FrameEvent;
use crate::game_clock::{format_game_time, parse_game_time, ClockReference};
use crate::store::load_json;
use crate::timing::Timeline;
use crate::vocabulary::Vocabulary;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Label used for records that carry none
pub const MISSING_LABEL: &str = "Unknown";

/// A numeric field written either as a JSON number or as a string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
    /// Anything else; rejected when the value is read
    Other(Value),
}

impl NumberOrText {
    fn to_f64(&self, field: &'static str) -> Result<f64> {
        let value = match self {
            NumberOrText::Number(n) => *n,
            NumberOrText::Text(s) => s.trim().parse().map_err(|_| Error::InvalidField {
                field,
                value: s.clone(),
            })?,
            NumberOrText::Other(v) => {
                return Err(Error::InvalidField {
                    field,
                    value: v.to_string(),
                })
            }
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::InvalidField {
                field,
                value: value.to_string(),
            })
        }
    }

    fn to_half(&self) -> Result<u32> {
        let value = self.to_f64("half")?;
        if value >= 1.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
            Ok(value as u32)
        } else {
            Err(Error::InvalidTimestamp(format!(
                "half must be a whole number >= 1, got {}",
                value
            )))
        }
    }
}

/// Annotation record as found in an upstream file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAnnotation {
    /// `"<half> - MM:SS"`; any other JSON type is a malformed clock
    #[serde(rename = "gameTime", default)]
    pub game_time: Option<Value>,
    #[serde(default)]
    pub label: Option<Value>,
    /// Seconds within the half, used when `gameTime` is absent
    #[serde(default)]
    pub position: Option<NumberOrText>,
    #[serde(default)]
    pub half: Option<NumberOrText>,
    #[serde(default)]
    pub confidence: Option<NumberOrText>,
    #[serde(default)]
    pub score: Option<NumberOrText>,
}

/// When an annotation's instant is given
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeReference {
    /// `"<half> - MM:SS"` clock reading
    Clock(ClockReference),
    /// Seconds from the start of `half`
    Absolute { half: u32, seconds: f64 },
}

impl TimeReference {
    pub fn half(&self) -> u32 {
        match self {
            TimeReference::Clock(clock) => clock.half,
            TimeReference::Absolute { half, .. } => *half,
        }
    }

    pub fn seconds_within_half(&self) -> f64 {
        match self {
            TimeReference::Clock(clock) => clock.seconds_within_half(),
            TimeReference::Absolute { seconds, .. } => *seconds,
        }
    }
}

/// A validated annotation: trimmed label, typed instant, confidence
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub label: String,
    pub time: TimeReference,
    pub confidence: f64,
}

impl RawAnnotation {
    /// Trimmed label, [`MISSING_LABEL`] when absent
    ///
    /// A non-string label is taken in its JSON text form (`7` → `"7"`).
    pub fn label(&self) -> String {
        match &self.label {
            Some(Value::String(label)) => label.trim().to_string(),
            None | Some(Value::Null) => MISSING_LABEL.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Resolve the instant
    ///
    /// A non-blank `gameTime` wins. Otherwise `position` (default 0.0) in
    /// `half` (default 1) is used; missing optional fields never fail.
    pub fn time_reference(&self) -> Result<TimeReference> {
        match &self.game_time {
            Some(Value::String(game_time)) if !game_time.trim().is_empty() => {
                return Ok(TimeReference::Clock(parse_game_time(game_time)?));
            }
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(other) => {
                return Err(Error::malformed_clock(
                    &other.to_string(),
                    "gameTime must be a string",
                ))
            }
        }

        let half = match &self.half {
            Some(half) => half.to_half()?,
            None => 1,
        };
        let seconds = match &self.position {
            Some(position) => position.to_f64("position")?,
            None => 0.0,
        };
        if seconds < 0.0 {
            return Err(Error::InvalidTimestamp(format!(
                "position must be non-negative, got {}",
                seconds
            )));
        }
        Ok(TimeReference::Absolute { half, seconds })
    }

    /// Confidence from `confidence`, else `score`, else 1.0
    pub fn confidence(&self) -> Result<f64> {
        match (&self.confidence, &self.score) {
            (Some(confidence), _) => confidence.to_f64("confidence"),
            (None, Some(score)) => score.to_f64("score"),
            (None, None) => Ok(1.0),
        }
    }

    pub fn resolve(&self) -> Result<AnnotationRecord> {
        Ok(AnnotationRecord {
            label: self.label(),
            time: self.time_reference()?,
            confidence: self.confidence()?,
        })
    }
}

/// Read the spotting records of an annotation file
///
/// The top-level `annotations` member may be the record list itself or an
/// object holding it under `spotting` or `events`. Any other shape yields an
/// empty list.
///
/// # Errors
///
/// [`Error::Record`] if a list entry is not a JSON object. Field types are
/// not checked here.
pub fn load_annotations(path: &Path) -> Result<Vec<RawAnnotation>> {
    let document: Value = load_json(path)?;
    let records = match document.get("annotations") {
        Some(Value::Array(list)) => Value::Array(list.clone()),
        Some(Value::Object(map)) => ["spotting", "events"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|v| matches!(v, Value::Array(list) if !list.is_empty()))
            .cloned()
            .unwrap_or(Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    };
    let records: Vec<Value> = serde_json::from_value(records)?;
    let records = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value::<RawAnnotation>(record).map_err(|e| Error::Record {
                index,
                source: Box::new(e.into()),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("Read {} annotation records from {}", records.len(), path.display());
    Ok(records)
}

/// What to do with a record whose time reference cannot be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedClockPolicy {
    /// Abort the whole conversion
    #[default]
    Abort,
    /// Skip the record and list it in the report
    Skip,
}

impl std::str::FromStr for MalformedClockPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(MalformedClockPolicy::Abort),
            "skip" => Ok(MalformedClockPolicy::Skip),
            other => Err(Error::InvalidConfiguration(format!(
                "malformed clock policy must be 'abort' or 'skip', got '{}'",
                other
            ))),
        }
    }
}

/// A record dropped under [`MalformedClockPolicy::Skip`]
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// Position of the record in the input
    pub index: usize,
    pub label: String,
    pub reason: String,
}

/// Result of aligning one annotation list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentReport {
    pub events: Vec<FrameEvent>,
    /// Out-of-vocabulary labels, each listed once
    pub unknown_labels: BTreeSet<String>,
    pub skipped: Vec<SkippedRecord>,
    /// Events moved onto the last frame because they fell past the video
    pub clamped: usize,
}

/// Converts annotation records into frame events for one video
#[derive(Debug, Clone)]
pub struct Aligner<'a> {
    vocabulary: &'a Vocabulary,
    timeline: Timeline,
    num_frames: Option<usize>,
    policy: MalformedClockPolicy,
}

impl<'a> Aligner<'a> {
    pub fn new(vocabulary: &'a Vocabulary, timeline: Timeline) -> Self {
        Self {
            vocabulary,
            timeline,
            num_frames: None,
            policy: MalformedClockPolicy::default(),
        }
    }

    /// Clamp emitted frames to `[0, num_frames - 1]`
    pub fn with_num_frames(mut self, num_frames: usize) -> Self {
        self.num_frames = Some(num_frames);
        self
    }

    pub fn with_policy(mut self, policy: MalformedClockPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Align records in order
    ///
    /// # Errors
    ///
    /// Under [`MalformedClockPolicy::Abort`], the first record whose instant
    /// cannot be resolved aborts with [`Error::Record`] naming its index.
    pub fn align(&self, records: &[RawAnnotation]) -> Result<AlignmentReport> {
        let mut report = AlignmentReport::default();

        for (index, raw) in records.iter().enumerate() {
            let label = raw.label();
            if !self.vocabulary.contains(&label) {
                if report.unknown_labels.insert(label.clone()) {
                    warn!("Label '{}' is not in the class list, skipping", label);
                }
                continue;
            }

            let record = match raw.resolve() {
                Ok(record) => record,
                Err(e) if self.policy == MalformedClockPolicy::Skip && !e.is_fatal() => {
                    warn!("Skipping annotation {} ('{}'): {}", index, label, e);
                    report.skipped.push(SkippedRecord {
                        index,
                        label,
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    return Err(Error::Record {
                        index,
                        source: Box::new(e),
                    })
                }
            };

            let event = self.to_event(index, &record, &mut report.clamped)?;
            report.events.push(event);
        }

        info!(
            "Aligned {} events ({} unknown labels, {} skipped, {} clamped)",
            report.events.len(),
            report.unknown_labels.len(),
            report.skipped.len(),
            report.clamped
        );
        Ok(report)
    }

    fn to_event(&self, index: usize, record: &AnnotationRecord, clamped: &mut usize) -> Result<FrameEvent> {
        let half = record.time.half();
        let seconds = record.time.seconds_within_half();
        let mut frame = self.timeline.frame_at(half, seconds).map_err(|e| Error::Record {
            index,
            source: Box::new(e),
        })?;

        if let Some(num_frames) = self.num_frames {
            let last = num_frames.saturating_sub(1) as u64;
            if frame > last {
                warn!(
                    "'{}' at {} maps to frame {} past the last frame {}, clamping",
                    record.label,
                    format_game_time(half, seconds),
                    frame,
                    last
                );
                frame = last;
                *clamped += 1;
            }
        }

        let mut score = record.confidence;
        if !(0.0..=1.0).contains(&score) {
            warn!(
                "Confidence {} of '{}' at {} outside [0, 1], clamping",
                score,
                record.label,
                format_game_time(half, seconds)
            );
            score = score.clamp(0.0, 1.0);
        }

        debug!(
            "{} '{}' → frame {}",
            format_game_time(half, seconds),
            record.label,
            frame
        );
        Ok(FrameEvent::new(frame, record.label.clone(), score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawAnnotation {
        serde_json::from_value(value).unwrap()
    }

    fn goal_card() -> Vocabulary {
        Vocabulary::from_names(["Goal", "Card"])
    }

    fn timeline() -> Timeline {
        Timeline::new(5.0, 2700.0).unwrap()
    }

    #[test]
    fn test_reference_goal_in_second_half() {
        let vocab = goal_card();
        let records = vec![raw(json!({"gameTime": "2 - 01:30", "label": "Goal", "confidence": 0.9}))];

        let report = Aligner::new(&vocab, timeline()).align(&records).unwrap();

        assert_eq!(report.events, vec![FrameEvent::new(13_950, "Goal", 0.9)]);
        assert!(report.unknown_labels.is_empty());
    }

    #[test]
    fn test_unknown_label_emits_nothing() {
        let vocab = goal_card();
        let records = vec![raw(json!({"label": "OffsideFoul", "gameTime": "1 - 00:10"}))];

        let report = Aligner::new(&vocab, timeline()).align(&records).unwrap();

        assert!(report.events.is_empty());
        assert_eq!(
            report.unknown_labels.iter().collect::<Vec<_>>(),
            vec!["OffsideFoul"]
        );
    }

    #[test]
    fn test_unknown_label_reported_once() {
        let vocab = goal_card();
        let records: Vec<_> = (0..5)
            .map(|i| raw(json!({"label": " Kick-off ", "gameTime": format!("1 - 00:{:02}", i)})))
            .collect();

        let report = Aligner::new(&vocab, timeline()).align(&records).unwrap();

        assert!(report.events.is_empty());
        assert_eq!(report.unknown_labels.len(), 1);
        assert!(report.unknown_labels.contains("Kick-off"));
    }

    #[test]
    fn test_output_keeps_input_order() {
        let vocab = goal_card();
        let records = vec![
            raw(json!({"gameTime": "2 - 10:00", "label": "Card"})),
            raw(json!({"gameTime": "1 - 00:10", "label": "Goal"})),
        ];

        let report = Aligner::new(&vocab, timeline()).align(&records).unwrap();

        let frames: Vec<u64> = report.events.iter().map(|e| e.frame).collect();
        assert_eq!(frames, vec![(2700 + 600) * 5, 50]);
    }

    #[test]
    fn test_absolute_position_fallback() {
        let vocab = goal_card();
        let records = vec![
            raw(json!({"label": "Goal", "position": "12.4", "half": "2"})),
            raw(json!({"label": "Goal", "position": 3.0})),
            raw(json!({"label": "Goal", "gameTime": "  "})),
        ];

        let report = Aligner::new(&vocab, timeline()).align(&records).unwrap();

        let frames: Vec<u64> = report.events.iter().map(|e| e.frame).collect();
        assert_eq!(frames, vec![13_562, 15, 0]);
    }

    #[test]
    fn test_confidence_sources_and_default() {
        let records = [
            raw(json!({"label": "Goal", "confidence": "0.25"})),
            raw(json!({"label": "Goal", "score": 0.5})),
            raw(json!({"label": "Goal", "confidence": 0.75, "score": 0.1})),
            raw(json!({"label": "Goal"})),
        ];
        let confidences: Vec<f64> = records.iter().map(|r| r.confidence().unwrap()).collect();
        assert_eq!(confidences, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_out_of_range_confidence_clamped() {
        let vocab = goal_card();
        let records = vec![raw(json!({"label": "Goal", "confidence": 1.5}))];
        let report = Aligner::new(&vocab, timeline()).align(&records).unwrap();
        assert_eq!(report.events[0].score, 1.0);
    }

    #[test]
    fn test_missing_label_defaults_to_unknown() {
        let vocab = goal_card();
        let records = vec![raw(json!({"gameTime": "1 - 00:10"}))];
        let report = Aligner::new(&vocab, timeline()).align(&records).unwrap();
        assert!(report.unknown_labels.contains(MISSING_LABEL));
    }

    #[test]
    fn test_malformed_clock_aborts_by_default() {
        let vocab = goal_card();
        let records = vec![
            raw(json!({"gameTime": "1 - 00:10", "label": "Goal"})),
            raw(json!({"gameTime": "1 - 0x:10", "label": "Card"})),
        ];

        let err = Aligner::new(&vocab, timeline()).align(&records).unwrap_err();

        match err {
            Error::Record { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, Error::MalformedClock { .. }));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_malformed_clock_skipped_with_policy() {
        let vocab = goal_card();
        let records = vec![
            raw(json!({"gameTime": "1 - 0x:10", "label": "Card"})),
            raw(json!({"gameTime": "1 - 00:10", "label": "Goal"})),
        ];

        let report = Aligner::new(&vocab, timeline())
            .with_policy(MalformedClockPolicy::Skip)
            .align(&records)
            .unwrap();

        assert_eq!(report.events.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 0);
        assert_eq!(report.skipped[0].label, "Card");
    }

    #[test]
    fn test_malformed_clock_on_unknown_label_is_not_fatal() {
        let vocab = goal_card();
        let records = vec![raw(json!({"gameTime": "garbage", "label": "Throw-in"}))];
        let report = Aligner::new(&vocab, timeline()).align(&records).unwrap();
        assert!(report.unknown_labels.contains("Throw-in"));
    }

    #[test]
    fn test_mistyped_game_time_on_unknown_label_is_not_fatal() {
        let vocab = goal_card();
        let records = vec![raw(json!({"gameTime": 5400, "label": "Kick-off"}))];

        let report = Aligner::new(&vocab, timeline()).align(&records).unwrap();

        assert!(report.events.is_empty());
        assert!(report.unknown_labels.contains("Kick-off"));
    }

    #[test]
    fn test_mistyped_game_time_follows_policy() {
        let vocab = goal_card();
        let records = vec![
            raw(json!({"gameTime": 5400, "label": "Goal"})),
            raw(json!({"gameTime": "1 - 00:10", "label": "Card"})),
        ];

        match Aligner::new(&vocab, timeline()).align(&records).unwrap_err() {
            Error::Record { index, source } => {
                assert_eq!(index, 0);
                assert!(matches!(*source, Error::MalformedClock { .. }));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let report = Aligner::new(&vocab, timeline())
            .with_policy(MalformedClockPolicy::Skip)
            .align(&records)
            .unwrap();
        assert_eq!(report.events, vec![FrameEvent::new(50, "Card", 1.0)]);
        assert_eq!(report.skipped[0].index, 0);
    }

    #[test]
    fn test_mistyped_numeric_fields_are_record_errors() {
        let vocab = goal_card();
        let records = vec![
            raw(json!({"label": "Goal", "position": true})),
            raw(json!({"label": "Goal", "confidence": [0.5]})),
        ];

        let report = Aligner::new(&vocab, timeline())
            .with_policy(MalformedClockPolicy::Skip)
            .align(&records)
            .unwrap();

        assert!(report.events.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped[0].reason.contains("position"));
        assert!(report.skipped[1].reason.contains("confidence"));
    }

    #[test]
    fn test_non_string_label_uses_json_text() {
        let record = raw(json!({"label": 7}));
        assert_eq!(record.label(), "7");
        assert_eq!(raw(json!({"label": null})).label(), MISSING_LABEL);
    }

    #[test]
    fn test_frames_clamped_to_video_length() {
        let vocab = goal_card();
        let records = vec![
            raw(json!({"gameTime": "1 - 00:10", "label": "Goal"})),
            raw(json!({"gameTime": "2 - 44:00", "label": "Goal"})),
        ];

        let report = Aligner::new(&vocab, timeline())
            .with_num_frames(1000)
            .align(&records)
            .unwrap();

        assert_eq!(report.events[0].frame, 50);
        assert_eq!(report.events[1].frame, 999);
        assert_eq!(report.clamped, 1);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("skip".parse::<MalformedClockPolicy>().unwrap(), MalformedClockPolicy::Skip);
        assert_eq!(" Abort ".parse::<MalformedClockPolicy>().unwrap(), MalformedClockPolicy::Abort);
        assert!("ignore".parse::<MalformedClockPolicy>().is_err());
    }

    #[test]
    fn test_half_field_validation() {
        let record = raw(json!({"label": "Goal", "half": 0}));
        assert!(matches!(record.time_reference().unwrap_err(), Error::InvalidTimestamp(_)));

        let record = raw(json!({"label": "Goal", "half": "2.5"}));
        assert!(record.time_reference().is_err());

        let record = raw(json!({"label": "Goal", "half": 3, "position": 1}));
        assert_eq!(
            record.time_reference().unwrap(),
            TimeReference::Absolute { half: 3, seconds: 1.0 }
        );
    }
}
