//! Caption parsing and conversion
//!
//! Every dialect parses into the shared [`Cue`] list and renders from it:
//! - SubRip (`srt`) line-oriented cues
//! - TTML timed markup, namespace agnostic
//! - Plain text and structured JSON output targets

pub mod convert;
pub mod cue;
pub mod srt;
pub mod ttml;

pub use convert::{convert, convert_file, parse, render, ConversionTarget, CueRecord, Dialect};
pub use cue::{Cue, Timestamp};
