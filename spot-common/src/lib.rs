//! # Spot Common Library
//!
//! Shared code for the spotting conversion tools including:
//! - Frame-based timing model (match time ↔ global frame index)
//! - Match clock parsing and formatting
//! - Class vocabulary loading
//! - Prediction normalization (score sums ÷ support)
//! - Annotation alignment onto the frame timeline
//! - Dataset metadata and event extraction
//! - JSON / GZIP-JSON persistence
//! - Configuration loading

pub mod annotation;
pub mod config;
pub mod dataset;
pub mod error;
pub mod events;
pub mod extract;
pub mod game_clock;
pub mod prediction;
pub mod store;
pub mod timing;
pub mod vocabulary;

pub use error::{Error, Result};
pub use events::{FrameEvent, VideoEventSet};
pub use timing::Timeline;
pub use vocabulary::Vocabulary;
