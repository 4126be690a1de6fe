//! Frame-based timing model for aligning match time with extracted video frames
//!
//! This module is the shared temporal primitive for both conversion pipelines.
//! It maps human match time (half + seconds within the half) onto a single
//! video-long timeline and discretizes that timeline into frame indices at a
//! fixed frame rate.
//!
//! # Architecture
//!
//! Three time representations are used:
//!
//! 1. **Match time**: `(half, seconds_within_half)`, halves numbered from 1
//! 2. **Global seconds**: `f64` seconds since kick-off of the first half
//! 3. **Frame index**: `u64` global frame index at the extraction frame rate
//!
//! ```text
//! (half, MM:SS)
//!     ↓ to_global_seconds()
//! global seconds
//!     ↓ seconds_to_frame()
//! frame index  ──frame_to_seconds()──▶ global seconds (within 0.5 / fps)
//! ```
//!
//! # Equal Halves
//!
//! Every half is assumed to last exactly `half_duration_secs`. Real halves run
//! longer when stoppage time is played, so events late in a long first half
//! land slightly off in the second half's timeline. This is an accepted
//! approximation of the alignment model; callers needing per-half durations
//! must extend the model rather than adjust the constant.
//!
//! # Rounding
//!
//! `seconds_to_frame` uses [`f64::round`], i.e. round half away from zero.
//! Only non-negative seconds are accepted, so this is round-half-up:
//! `2.5 → 3`, `0.5 → 1`. The mapping never floors or ceils.
//!
//! # Clamping
//!
//! Functions here never clamp to a video length. Callers that know
//! `num_frames` clamp the resulting frame index themselves.
//!
//! # Examples
//!
//! ```rust
//! use spot_common::timing::*;
//!
//! // 2nd half, 01:30 with 45-minute halves at 5 fps
//! let global = to_global_seconds(2, 90.0, 2700.0).unwrap();
//! assert_eq!(global, 2790.0);
//! assert_eq!(seconds_to_frame(global, 5.0).unwrap(), 13_950);
//! ```

use crate::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Frame rate used when extracting frames, unless configured otherwise
pub const DEFAULT_FPS: f64 = 5.0;

/// Nominal duration of one half in seconds (45 minutes)
pub const DEFAULT_HALF_DURATION_SECS: f64 = 45.0 * 60.0;

// ============================================================================
// Validation
// ============================================================================

/// Reject frame rates that are zero, negative or not finite
///
/// # Examples
///
/// ```rust
/// use spot_common::timing::validate_fps;
///
/// assert!(validate_fps(25.0).is_ok());
/// assert!(validate_fps(0.0).is_err());
/// assert!(validate_fps(f64::NAN).is_err());
/// ```
pub fn validate_fps(fps: f64) -> Result<()> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "fps must be a positive finite number, got {}",
            fps
        )))
    }
}

/// Reject half durations that are zero, negative or not finite
pub fn validate_half_duration(half_duration_secs: f64) -> Result<()> {
    if half_duration_secs.is_finite() && half_duration_secs > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "half duration must be a positive finite number of seconds, got {}",
            half_duration_secs
        )))
    }
}

// ============================================================================
// Core Conversion Functions
// ============================================================================

/// Convert match time to seconds on the global timeline
///
/// Formula: `(half - 1) × half_duration_secs + seconds_within_half`
///
/// # Arguments
///
/// * `half` - 1-based half number (any positive index is accepted, so extra
///   periods of extra time map past the second half)
/// * `seconds_within_half` - Offset from the start of the half, `>= 0`
/// * `half_duration_secs` - Nominal length of every half
///
/// # Errors
///
/// * [`Error::InvalidTimestamp`] if `half == 0` or the offset is negative or not finite
/// * [`Error::InvalidConfiguration`] if `half_duration_secs` is not positive
///
/// # Examples
///
/// ```rust
/// use spot_common::timing::to_global_seconds;
///
/// assert_eq!(to_global_seconds(1, 10.0, 2700.0).unwrap(), 10.0);
/// assert_eq!(to_global_seconds(2, 0.0, 2700.0).unwrap(), 2700.0);
/// assert_eq!(to_global_seconds(3, 30.0, 900.0).unwrap(), 1830.0);
/// assert!(to_global_seconds(0, 10.0, 2700.0).is_err());
/// ```
pub fn to_global_seconds(half: u32, seconds_within_half: f64, half_duration_secs: f64) -> Result<f64> {
    validate_half_duration(half_duration_secs)?;

    if half == 0 {
        return Err(Error::InvalidTimestamp(
            "half numbering starts at 1, got 0".to_string(),
        ));
    }
    if !seconds_within_half.is_finite() || seconds_within_half < 0.0 {
        return Err(Error::InvalidTimestamp(format!(
            "seconds within half must be non-negative, got {}",
            seconds_within_half
        )));
    }

    Ok(f64::from(half - 1) * half_duration_secs + seconds_within_half)
}

/// Convert global seconds to a global frame index
///
/// Formula: `round(global_seconds × fps)` with round-half-up.
///
/// # Errors
///
/// * [`Error::InvalidConfiguration`] if `fps` is not positive
/// * [`Error::InvalidTimestamp`] if `global_seconds` is negative or not finite
///
/// # Examples
///
/// ```rust
/// use spot_common::timing::seconds_to_frame;
///
/// assert_eq!(seconds_to_frame(0.0, 5.0).unwrap(), 0);
/// assert_eq!(seconds_to_frame(2790.0, 5.0).unwrap(), 13_950);
///
/// // Exact halves round up
/// assert_eq!(seconds_to_frame(0.25, 2.0).unwrap(), 1);
/// assert_eq!(seconds_to_frame(1.25, 2.0).unwrap(), 3);
/// ```
pub fn seconds_to_frame(global_seconds: f64, fps: f64) -> Result<u64> {
    validate_fps(fps)?;

    if !global_seconds.is_finite() || global_seconds < 0.0 {
        return Err(Error::InvalidTimestamp(format!(
            "global seconds must be non-negative, got {}",
            global_seconds
        )));
    }

    Ok((global_seconds * fps).round() as u64)
}

/// Convert a global frame index back to global seconds
///
/// Inverse of [`seconds_to_frame`] up to rounding: the result lies within
/// `0.5 / fps` seconds of the seconds value the frame was derived from.
///
/// # Examples
///
/// ```rust
/// use spot_common::timing::{frame_to_seconds, seconds_to_frame};
///
/// assert_eq!(frame_to_seconds(13_950, 5.0).unwrap(), 2790.0);
///
/// let frame = seconds_to_frame(61.33, 5.0).unwrap();
/// let back = frame_to_seconds(frame, 5.0).unwrap();
/// assert!((back - 61.33).abs() <= 0.5 / 5.0);
/// ```
pub fn frame_to_seconds(frame: u64, fps: f64) -> Result<f64> {
    validate_fps(fps)?;
    Ok(frame as f64 / fps)
}

/// Split global seconds back into `(half, seconds_within_half)`
///
/// Under the equal-halves model this is the inverse of [`to_global_seconds`]
/// for offsets shorter than one half.
///
/// # Errors
///
/// [`Error::InvalidTimestamp`] for negative or non-finite seconds, and for
/// offsets whose half number does not fit in a `u32`.
///
/// # Examples
///
/// ```rust
/// use spot_common::timing::split_global_seconds;
///
/// assert_eq!(split_global_seconds(2790.0, 2700.0).unwrap(), (2, 90.0));
/// assert_eq!(split_global_seconds(0.0, 2700.0).unwrap(), (1, 0.0));
/// ```
pub fn split_global_seconds(global_seconds: f64, half_duration_secs: f64) -> Result<(u32, f64)> {
    validate_half_duration(half_duration_secs)?;

    if !global_seconds.is_finite() || global_seconds < 0.0 {
        return Err(Error::InvalidTimestamp(format!(
            "global seconds must be non-negative, got {}",
            global_seconds
        )));
    }

    let completed_halves = (global_seconds / half_duration_secs).floor();
    if completed_halves >= f64::from(u32::MAX) {
        return Err(Error::InvalidTimestamp(format!(
            "{} s lies beyond the last numbered half ({} s per half)",
            global_seconds, half_duration_secs
        )));
    }
    let within = global_seconds - completed_halves * half_duration_secs;
    Ok((completed_halves as u32 + 1, within))
}

// ============================================================================
// Timeline
// ============================================================================

/// Validated `(fps, half_duration)` pair
///
/// Validating once up front lets per-record conversions fail only on the
/// record's own data, never on configuration.
///
/// # Examples
///
/// ```rust
/// use spot_common::timing::Timeline;
///
/// let timeline = Timeline::new(5.0, 2700.0).unwrap();
/// assert_eq!(timeline.frame_at(2, 90.0).unwrap(), 13_950);
/// assert_eq!(timeline.match_time_of(13_950).unwrap(), (2, 90.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    fps: f64,
    half_duration_secs: f64,
}

impl Timeline {
    pub fn new(fps: f64, half_duration_secs: f64) -> Result<Self> {
        validate_fps(fps)?;
        validate_half_duration(half_duration_secs)?;
        Ok(Self {
            fps,
            half_duration_secs,
        })
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn half_duration_secs(&self) -> f64 {
        self.half_duration_secs
    }

    /// Global frame index of an instant given as match time
    pub fn frame_at(&self, half: u32, seconds_within_half: f64) -> Result<u64> {
        let global = to_global_seconds(half, seconds_within_half, self.half_duration_secs)?;
        seconds_to_frame(global, self.fps)
    }

    /// Match time `(half, seconds_within_half)` of a global frame index
    pub fn match_time_of(&self, frame: u64) -> Result<(u32, f64)> {
        let global = frame_to_seconds(frame, self.fps)?;
        split_global_seconds(global, self.half_duration_secs)
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            half_duration_secs: DEFAULT_HALF_DURATION_SECS,
        }
    }
}

// ============================================================================
// Tests Module
// ============================================================================

#[cfg(test)]
#[path = "timing_tests.rs"]
mod tests;
