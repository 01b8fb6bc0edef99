//! Cue intermediate representation shared by every dialect

use std::fmt;

/// A point in time within a caption track, millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// `None` when the total does not fit in a `u64` of milliseconds.
    pub fn from_parts(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<Self> {
        hours
            .checked_mul(60)?
            .checked_add(minutes)?
            .checked_mul(60)?
            .checked_add(seconds)?
            .checked_mul(1000)?
            .checked_add(millis)
            .map(Self)
    }

    pub fn checked_add(&self, other: Timestamp) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Format as `HH:MM:SS<sep>mmm`
    pub fn format_with(&self, separator: char) -> String {
        let ms = self.0 % 1000;
        let total_secs = self.0 / 1000;
        let secs = total_secs % 60;
        let mins = (total_secs / 60) % 60;
        let hours = total_secs / 3600;
        format!("{:02}:{:02}:{:02}{}{:03}", hours, mins, secs, separator, ms)
    }

    /// SubRip form, comma before the fractional part
    pub fn to_srt(&self) -> String {
        self.format_with(',')
    }

    /// Markup form, dot before the fractional part
    pub fn to_clock(&self) -> String {
        self.format_with('.')
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_clock())
    }
}

/// Convert a fractional-seconds digit string ("5", "50", "500", "5004")
/// into milliseconds.
pub(crate) fn fraction_to_millis(digits: &str) -> u64 {
    let mut padded: String = digits.chars().take(3).collect();
    while padded.len() < 3 {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}

/// One timed caption entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// 1-based position in the parsed sequence
    pub index: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Normalized text, lines separated by `\n`
    pub text: String,
}

impl Cue {
    pub fn new(index: usize, start: Timestamp, end: Timestamp, text: &str) -> Self {
        Self {
            index,
            start,
            end,
            text: normalize_text(text),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end.as_millis().saturating_sub(self.start.as_millis())
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Trim every line and drop blank ones.
pub fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cues that carry text, renumbered from 1.
pub fn visible_cues(cues: &[Cue]) -> impl Iterator<Item = (usize, &Cue)> {
    cues.iter()
        .filter(|cue| !cue.is_blank())
        .enumerate()
        .map(|(i, cue)| (i + 1, cue))
}
