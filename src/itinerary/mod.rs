//! Itinerary text codec.
//!
//! Tours carry their day-by-day plan as a single authored text blob. Each
//! line is classified independently, in priority order: inline image
//! (`![alt](url)`), timed step (`HH:MM: activity`), arrow sub-bullet
//! (`→ detail`), plain text. The blob is authoritative for display; the
//! structured step list decoded here is a flattened mirror kept for records
//! that predate the text format.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

use crate::models::ItineraryStep;

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("valid regex"));

static TIMED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}:\d{2}):\s*(.*)$").expect("valid regex"));

static HHMM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid regex"));

/// Alt text used when a step image has no caption of its own.
const DEFAULT_IMAGE_ALT: &str = "Hình ảnh";

/// One display block of the rendered itinerary.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RenderedBlock {
    Image { alt: String, url: String },
    Text { text: String },
    Spacer,
}

/// Decode an authored text blob into the flattened step list.
///
/// Image lines are pulled out of the narrative: each URL attaches to the
/// nearest preceding timed or plain step. URLs appearing before any such
/// step collect into a single leading image-only step so none are dropped.
/// Arrow lines become independent description-only entries; the grouping
/// under their timed step exists only in the original text.
pub fn decode(text: &str) -> Vec<ItineraryStep> {
    let mut steps: Vec<ItineraryStep> = Vec::new();
    let mut last_narrative: Option<usize> = None;
    let mut leading_images: Option<usize> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = IMAGE_RE.captures(line) {
            let url = caps[2].to_string();
            match last_narrative {
                Some(i) => steps[i].images.push(url),
                None => {
                    let i = *leading_images.get_or_insert_with(|| {
                        steps.push(ItineraryStep::default());
                        steps.len() - 1
                    });
                    steps[i].images.push(url);
                }
            }
        } else if let Some(caps) = TIMED_RE.captures(line) {
            steps.push(ItineraryStep {
                time: caps[1].to_string(),
                activity: caps[2].trim().to_string(),
                ..Default::default()
            });
            last_narrative = Some(steps.len() - 1);
        } else if let Some(rest) = line.strip_prefix('→') {
            steps.push(ItineraryStep {
                description: Some(rest.trim().to_string()),
                ..Default::default()
            });
        } else {
            steps.push(ItineraryStep {
                activity: line.to_string(),
                ..Default::default()
            });
            last_narrative = Some(steps.len() - 1);
        }
    }

    steps
}

/// Reconstruct a text blob from structured steps.
///
/// Inverse of [`decode`] for records that predate the text format: one line
/// per step combining time and activity, one arrow line per non-empty
/// description line, one image line per URL. Lossy the same way the decoder
/// is; arrow lines lose their parent step on the next round-trip.
pub fn encode(steps: &[ItineraryStep]) -> String {
    let mut lines: Vec<String> = Vec::new();

    for step in steps {
        let time = step.time.trim();
        let activity = step.activity.trim();
        if !time.is_empty() {
            // Legacy steps may carry a full date-time value.
            lines.push(format!("{}: {}", format_time(time), activity));
        } else if !activity.is_empty() {
            lines.push(activity.to_string());
        }

        if let Some(description) = &step.description {
            for part in description.lines() {
                let part = part.trim();
                if !part.is_empty() {
                    lines.push(format!("→ {}", part));
                }
            }
        }

        let alt = step.image_caption.as_deref().unwrap_or(DEFAULT_IMAGE_ALT);
        for url in &step.images {
            lines.push(format!("![{}]({})", alt, url));
        }

        lines.push(String::new());
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Render a text blob into display blocks for the public detail page.
///
/// Never fails: image lines become inline image blocks, other non-blank
/// lines become text blocks, blank lines become fixed-height spacers, and
/// anything malformed falls through as literal text.
pub fn render(text: &str) -> Vec<RenderedBlock> {
    let mut blocks = Vec::new();

    for raw in text.lines() {
        if let Some(caps) = IMAGE_RE.captures(raw) {
            blocks.push(RenderedBlock::Image {
                alt: caps[1].to_string(),
                url: caps[2].to_string(),
            });
        } else if raw.trim().is_empty() {
            blocks.push(RenderedBlock::Spacer);
        } else {
            blocks.push(RenderedBlock::Text {
                text: raw.trim().to_string(),
            });
        }
    }

    blocks
}

/// Format a step time for display.
///
/// `HH:MM` values pass through unchanged; date-time values render their
/// wall-clock hour and minute without timezone conversion; empty input
/// shows the not-available marker; anything else passes through as-is.
pub fn format_time(time: &str) -> String {
    if time.is_empty() {
        return "N/A".to_string();
    }
    if HHMM_RE.is_match(time) {
        return time.to_string();
    }
    if time.contains('T') {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(time) {
            return parsed.format("%H:%M").to_string();
        }
        if let Ok(parsed) = NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M:%S") {
            return parsed.format("%H:%M").to_string();
        }
    }
    time.to_string()
}
