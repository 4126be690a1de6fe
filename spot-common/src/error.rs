//! Common error types for spot alignment and conversion

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for spot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the normalizer, the aligner and the command surface
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML configuration could not be parsed
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Configuration file could not be located or read
    #[error("Configuration error: {0}")]
    Config(String),

    /// A numeric parameter is out of its valid domain (fps, half duration, thresholds)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A time value is outside the timeline (negative offset, half 0)
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A clock or game-time string could not be parsed
    #[error("Malformed clock '{input}': {reason}")]
    MalformedClock { input: String, reason: String },

    /// Score matrix and support vector disagree in shape
    #[error("Shape mismatch for video '{video}': {detail}")]
    ShapeMismatch { video: String, detail: String },

    /// The frame directory holds no extracted frames
    #[error("No frames found in {}", .0.display())]
    NoFramesFound(PathBuf),

    /// The class list holds no entries
    #[error("Empty class vocabulary: {}", .0.display())]
    EmptyVocabulary(PathBuf),

    /// A numeric annotation field holds something that is not a number
    #[error("Invalid value '{value}' for field '{field}'")]
    InvalidField { field: &'static str, value: String },

    /// A single annotation record failed and aborted the batch
    #[error("Annotation record {index}")]
    Record {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// Predictions handed to an event extractor still carry raw support
    #[error("Prediction for video '{0}' is not normalized")]
    NotNormalized(String),

    /// A prediction references a video the dataset does not know
    #[error("Unknown video: {0}")]
    UnknownVideo(String),
}

impl Error {
    /// Build a [`Error::MalformedClock`] from any displayable reason
    pub fn malformed_clock(input: &str, reason: impl std::fmt::Display) -> Self {
        Error::MalformedClock {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error aborts a whole batch rather than a single record
    ///
    /// Clock, timestamp and field problems are scoped to one annotation
    /// record; the caller's malformed-clock policy decides whether they abort.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::MalformedClock { .. } | Error::InvalidTimestamp(_) | Error::InvalidField { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_level_errors_are_not_fatal() {
        assert!(!Error::malformed_clock("1:xx", "bad seconds").is_fatal());
        assert!(!Error::InvalidTimestamp("half 0".into()).is_fatal());
        assert!(!Error::InvalidField {
            field: "position",
            value: "abc".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_configuration_errors_are_fatal() {
        assert!(Error::EmptyVocabulary(PathBuf::from("class.txt")).is_fatal());
        assert!(Error::NoFramesFound(PathBuf::from("frames")).is_fatal());
        assert!(Error::InvalidConfiguration("fps".into()).is_fatal());
        assert!(Error::Record {
            index: 3,
            source: Box::new(Error::malformed_clock("x", "y"))
        }
        .is_fatal());
        assert!(Error::ShapeMismatch {
            video: "v".into(),
            detail: "3 vs 4".into()
        }
        .is_fatal());
    }

    /// Display text of an error followed by each of its sources
    fn chain(err: &dyn std::error::Error) -> Vec<String> {
        let mut messages = vec![err.to_string()];
        let mut source = err.source();
        while let Some(inner) = source {
            messages.push(inner.to_string());
            source = inner.source();
        }
        messages
    }

    #[test]
    fn test_wrapped_errors_print_each_cause_once() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "Is a directory");
        let messages = chain(&Error::from(io));
        assert_eq!(messages, vec!["Is a directory".to_string()]);

        let record = Error::Record {
            index: 4,
            source: Box::new(Error::malformed_clock("1 - ten", "expected MM:SS")),
        };
        let joined = chain(&record).join(": ");
        assert_eq!(
            joined,
            "Annotation record 4: Malformed clock '1 - ten': expected MM:SS"
        );
    }

    #[test]
    fn test_messages_name_the_resource() {
        let err = Error::NoFramesFound(PathBuf::from("/data/frames/game1"));
        assert_eq!(err.to_string(), "No frames found in /data/frames/game1");

        let err = Error::malformed_clock("2 - 1:3:4", "expected MM:SS");
        assert_eq!(err.to_string(), "Malformed clock '2 - 1:3:4': expected MM:SS");
    }
}
