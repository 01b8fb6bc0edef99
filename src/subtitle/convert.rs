//! Dialect dispatch and target rendering

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, ServiceError};

use super::cue::{visible_cues, Cue};
use super::{srt, ttml};

/// Caption file dialects the parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Line-oriented `.srt`
    SubRip,
    /// Timed markup `.ttml`
    Ttml,
}

impl Dialect {
    /// Pick the dialect from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "srt" => Some(Dialect::SubRip),
            "ttml" | "xml" | "dfxp" => Some(Dialect::Ttml),
            _ => None,
        }
    }

    /// Guess the dialect from content.
    pub fn sniff(content: &str) -> Self {
        let head = content.trim_start_matches('\u{feff}').trim_start();
        if head.starts_with('<') {
            Dialect::Ttml
        } else {
            Dialect::SubRip
        }
    }

    /// Extension first, content as fallback.
    pub fn detect(path: &Path, content: &str) -> Self {
        Self::from_path(path).unwrap_or_else(|| Self::sniff(content))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Dialect::SubRip => "srt",
            Dialect::Ttml => "ttml",
        }
    }
}

/// Requested output representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionTarget {
    /// Plain text, one cue per line
    #[serde(rename = "txt")]
    Text,
    /// JSON array of cue records
    #[serde(rename = "json")]
    Structured,
    /// SubRip document
    #[serde(rename = "srt")]
    SubRip,
}

impl ConversionTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionTarget::Text => "txt",
            ConversionTarget::Structured => "json",
            ConversionTarget::SubRip => "srt",
        }
    }
}

impl fmt::Display for ConversionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionTarget {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(ConversionTarget::Text),
            "json" => Ok(ConversionTarget::Structured),
            "srt" => Ok(ConversionTarget::SubRip),
            other => Err(ServiceError::UnsupportedTarget(other.to_string())),
        }
    }
}

/// A cue as it appears in structured output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueRecord {
    pub index: usize,
    pub start: String,
    pub end: String,
    pub text: String,
}

/// Parse raw caption content in the given dialect.
pub fn parse(content: &str, dialect: Dialect) -> Result<Vec<Cue>> {
    match dialect {
        Dialect::SubRip => srt::parse(content),
        Dialect::Ttml => ttml::parse(content),
    }
}

/// Render cues into the requested target. Blank cues never appear in the
/// output and output indices run 1..n.
pub fn render(cues: &[Cue], target: ConversionTarget) -> Result<String> {
    match target {
        ConversionTarget::Text => Ok(render_text(cues)),
        ConversionTarget::Structured => render_structured(cues),
        ConversionTarget::SubRip => Ok(srt::render(cues)),
    }
}

fn render_text(cues: &[Cue]) -> String {
    visible_cues(cues)
        .map(|(_, cue)| cue.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_structured(cues: &[Cue]) -> Result<String> {
    let records: Vec<CueRecord> = visible_cues(cues)
        .map(|(index, cue)| CueRecord {
            index,
            start: cue.start.to_srt(),
            end: cue.end.to_srt(),
            text: cue.text.clone(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Parse then render in one step.
pub fn convert(content: &str, dialect: Dialect, target: ConversionTarget) -> Result<String> {
    let cues = parse(content, dialect)?;
    render(&cues, target)
}

/// Read a caption file and convert it, detecting its dialect.
pub async fn convert_file(path: &Path, target: ConversionTarget) -> Result<String> {
    let content = tokio::fs::read_to_string(path).await?;
    convert(&content, Dialect::detect(path, &content), target)
}
