//! Match clock parsing and formatting
//!
//! Annotation sources write instants as `"<half> - MM:SS"` game-time strings.
//! This module turns those strings into structured clock references and
//! renders them back for log and report output.

use crate::timing::to_global_seconds;
use crate::{Error, Result};

/// An instant given as a clock reading within a half
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReference {
    /// 1-based half number
    pub half: u32,
    pub minute: u32,
    /// Seconds past the minute; may be fractional
    pub second: f64,
}

impl ClockReference {
    /// Seconds elapsed since the start of the half
    pub fn seconds_within_half(&self) -> f64 {
        f64::from(self.minute) * 60.0 + self.second
    }

    /// Seconds on the global timeline under the equal-halves model
    pub fn global_seconds(&self, half_duration_secs: f64) -> Result<f64> {
        to_global_seconds(self.half, self.seconds_within_half(), half_duration_secs)
    }
}

/// Parse a `"MM:SS"` clock into seconds within the half
///
/// The seconds component may be fractional (`"12:07.4"`). Surrounding
/// whitespace on either component is ignored.
///
/// # Errors
///
/// [`Error::MalformedClock`] unless the string splits into exactly two
/// components, a whole minute count and a non-negative finite second count.
///
/// # Examples
///
/// ```
/// use spot_common::game_clock::parse_clock;
///
/// assert_eq!(parse_clock("01:30").unwrap(), 90.0);
/// assert_eq!(parse_clock("44:59.5").unwrap(), 2699.5);
/// assert!(parse_clock("1:2:3").is_err());
/// ```
pub fn parse_clock(clock: &str) -> Result<f64> {
    let (minute, second) = split_clock(clock)?;
    Ok(f64::from(minute) * 60.0 + second)
}

fn split_clock(clock: &str) -> Result<(u32, f64)> {
    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 2 {
        return Err(Error::malformed_clock(
            clock,
            format!("expected MM:SS, found {} component(s)", parts.len()),
        ));
    }

    let minute: u32 = parts[0]
        .trim()
        .parse()
        .map_err(|_| Error::malformed_clock(clock, format!("invalid minutes '{}'", parts[0].trim())))?;
    let second: f64 = parts[1]
        .trim()
        .parse()
        .map_err(|_| Error::malformed_clock(clock, format!("invalid seconds '{}'", parts[1].trim())))?;

    if !second.is_finite() || second < 0.0 {
        return Err(Error::malformed_clock(
            clock,
            format!("seconds must be non-negative, got {}", second),
        ));
    }

    Ok((minute, second))
}

/// Parse a `"<half> - MM:SS"` game-time string
///
/// The string is split on its first `-`; the left side is the half number,
/// the right side a clock accepted by [`parse_clock`].
///
/// # Errors
///
/// * [`Error::MalformedClock`] if there is no `-`, the half is not a whole
///   number, or the clock does not parse
/// * [`Error::InvalidTimestamp`] if the half is 0
///
/// # Examples
///
/// ```
/// use spot_common::game_clock::parse_game_time;
///
/// let clock = parse_game_time("2 - 01:30").unwrap();
/// assert_eq!((clock.half, clock.minute, clock.second), (2, 1, 30.0));
/// assert_eq!(clock.seconds_within_half(), 90.0);
/// ```
pub fn parse_game_time(game_time: &str) -> Result<ClockReference> {
    let (half_str, clock) = game_time
        .split_once('-')
        .ok_or_else(|| Error::malformed_clock(game_time, "expected '<half> - MM:SS'"))?;

    let half: u32 = half_str
        .trim()
        .parse()
        .map_err(|_| Error::malformed_clock(game_time, format!("invalid half '{}'", half_str.trim())))?;
    if half == 0 {
        return Err(Error::InvalidTimestamp(format!(
            "half numbering starts at 1 in '{}'",
            game_time
        )));
    }

    let (minute, second) = split_clock(clock.trim())?;
    Ok(ClockReference {
        half,
        minute,
        second,
    })
}

/// Render match time as `"<half> - MM:SS"`
///
/// Fractional seconds are shown to one decimal only when present.
///
/// # Examples
///
/// ```
/// use spot_common::game_clock::format_game_time;
///
/// assert_eq!(format_game_time(2, 90.0), "2 - 01:30");
/// assert_eq!(format_game_time(1, 7.5), "1 - 00:07.5");
/// assert_eq!(format_game_time(1, 6000.0), "1 - 100:00");
/// ```
pub fn format_game_time(half: u32, seconds_within_half: f64) -> String {
    let seconds_within_half = seconds_within_half.max(0.0);
    let minutes = (seconds_within_half / 60.0).floor();
    let secs = seconds_within_half - minutes * 60.0;

    if (secs - secs.round()).abs() < 0.05 {
        let secs = secs.round();
        // 59.97 rounds into the next minute
        if secs >= 60.0 {
            format!("{} - {:02}:00", half, minutes as u64 + 1)
        } else {
            format!("{} - {:02}:{:02}", half, minutes as u64, secs as u64)
        }
    } else {
        format!("{} - {:02}:{:04.1}", half, minutes as u64, secs)
    }
}
