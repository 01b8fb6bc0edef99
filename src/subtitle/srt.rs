//! SubRip (line-oriented) dialect
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:02,500
//! First line
//! Second line
//!
//! 2
//! ...
//! ```

use crate::error::{Result, ServiceError};

use super::cue::{fraction_to_millis, visible_cues, Cue, Timestamp};

/// Parse a SubRip timestamp. Accepts `,` or `.` before the fraction and
/// a missing hour field.
pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    let caps = regex!(r"^(?:(\d+):)?(\d{1,2}):(\d{1,2})(?:[,.](\d{1,9}))?$").captures(s.trim())?;
    let hours: u64 = match caps.get(1) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    let millis = caps.get(4).map_or(0, |m| fraction_to_millis(m.as_str()));
    Timestamp::from_parts(hours, minutes, seconds, millis)
}

fn parse_time_range(line: &str) -> Result<(Timestamp, Timestamp)> {
    let malformed = || ServiceError::MalformedInput(format!("unparsable time range: {:?}", line));

    let (left, right) = line.split_once("-->").ok_or_else(malformed)?;
    // Anything after the end timestamp is a position hint.
    let right = right.split_whitespace().next().ok_or_else(malformed)?;

    let start = parse_timestamp(left).ok_or_else(malformed)?;
    let end = parse_timestamp(right).ok_or_else(malformed)?;
    if end < start {
        return Err(ServiceError::MalformedInput(format!(
            "cue ends before it starts: {:?}",
            line
        )));
    }
    Ok((start, end))
}

/// Parse a SubRip document into cues. Source numbering is ignored.
pub fn parse(content: &str) -> Result<Vec<Cue>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let content = content.replace("\r\n", "\n").replace('\r', "\n");

    let mut cues = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in content.lines().chain(std::iter::once("")) {
        if !line.trim().is_empty() {
            block.push(line);
            continue;
        }
        if block.is_empty() {
            continue;
        }

        let mut lines = block.iter().copied();
        let mut first = lines.next().unwrap_or_default();
        if !first.contains("-->") && first.trim().chars().all(|c| c.is_ascii_digit()) {
            first = lines.next().ok_or_else(|| {
                ServiceError::MalformedInput(format!(
                    "cue {} has no time range",
                    first.trim()
                ))
            })?;
        }
        let (start, end) = parse_time_range(first)?;
        let text = lines.collect::<Vec<_>>().join("\n");

        cues.push(Cue::new(cues.len() + 1, start, end, &text));
        block.clear();
    }

    Ok(cues)
}

/// Render cues as SubRip. Blank cues are skipped and the rest renumbered.
pub fn render(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (index, cue) in visible_cues(cues) {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index,
            cue.start.to_srt(),
            cue.end.to_srt(),
            cue.text
        ));
    }
    out
}
