//! TTML (timed markup) dialect
//!
//! Cue timing lives in the `begin`/`end`/`dur` attributes of `<p>`
//! elements, text is the element content with `<br/>` as line breaks.
//! Elements are matched by local name so any namespace prefix works:
//! ```xml
//! <tt xmlns="http://www.w3.org/ns/ttml">
//!   <body><div>
//!     <p begin="00:00:01.000" end="00:00:02.500">Hello<br/>world</p>
//!   </div></body>
//! </tt>
//! ```

use crate::error::{Result, ServiceError};

use super::cue::{fraction_to_millis, Cue, Timestamp};

/// Parse a TTML time expression: clock time (`00:00:01.250`) or offset
/// time (`1.25s`, `1250ms`, `2m`, `1h`).
pub fn parse_time(s: &str) -> Option<Timestamp> {
    let s = s.trim();

    if let Some(caps) = regex!(r"^(\d+):(\d{2}):(\d{2})(?:\.(\d+))?$").captures(s) {
        let hours: u64 = caps[1].parse().ok()?;
        let minutes: u64 = caps[2].parse().ok()?;
        let seconds: u64 = caps[3].parse().ok()?;
        if minutes >= 60 || seconds >= 60 {
            return None;
        }
        let millis = caps.get(4).map_or(0, |m| fraction_to_millis(m.as_str()));
        return Timestamp::from_parts(hours, minutes, seconds, millis);
    }

    let caps = regex!(r"^(\d+(?:\.\d+)?)(h|m|s|ms)$").captures(s)?;
    let value: f64 = caps[1].parse().ok()?;
    let scale = match &caps[2] {
        "h" => 3_600_000.0,
        "m" => 60_000.0,
        "s" => 1_000.0,
        _ => 1.0,
    };
    let millis = (value * scale).round();
    if !millis.is_finite() || millis >= u64::MAX as f64 {
        return None;
    }
    Some(Timestamp::from_millis(millis as u64))
}

fn attr<'a>(node: &roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == name)
        .map(|a| a.value())
}

fn required_time(node: &roxmltree::Node, name: &str, value: &str) -> Result<Timestamp> {
    parse_time(value).ok_or_else(|| {
        ServiceError::MalformedInput(format!(
            "unparsable {} time {:?} at byte {}",
            name,
            value,
            node.range().start
        ))
    })
}

/// Collect the text of a `<p>`, turning `<br/>` into newlines and source
/// whitespace into single spaces.
fn cue_text(p: &roxmltree::Node) -> String {
    let mut raw = String::new();
    for node in p.descendants().skip(1) {
        if node.is_text() {
            if let Some(text) = node.text() {
                raw.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
        } else if node.is_element() && node.tag_name().name() == "br" {
            raw.push('\n');
        }
    }
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a TTML document into cues, in document order.
pub fn parse(content: &str) -> Result<Vec<Cue>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc = roxmltree::Document::parse(content)
        .map_err(|e| ServiceError::MalformedInput(format!("XML parse error: {}", e)))?;

    let mut cues = Vec::new();
    for p in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "p")
    {
        let begin = attr(&p, "begin").ok_or_else(|| {
            ServiceError::MalformedInput(format!(
                "<p> without begin attribute at byte {}",
                p.range().start
            ))
        })?;
        let start = required_time(&p, "begin", begin)?;

        let end = match (attr(&p, "end"), attr(&p, "dur")) {
            (Some(end), _) => required_time(&p, "end", end)?,
            (None, Some(dur)) => {
                let dur = required_time(&p, "dur", dur)?;
                start.checked_add(dur).ok_or_else(|| {
                    ServiceError::MalformedInput(format!(
                        "cue end out of range at byte {}",
                        p.range().start
                    ))
                })?
            }
            (None, None) => {
                return Err(ServiceError::MalformedInput(format!(
                    "<p> without end or dur attribute at byte {}",
                    p.range().start
                )))
            }
        };

        if end < start {
            return Err(ServiceError::MalformedInput(format!(
                "cue ends before it starts ({} > {})",
                start, end
            )));
        }

        cues.push(Cue::new(cues.len() + 1, start, end, &cue_text(&p)));
    }

    Ok(cues)
}
