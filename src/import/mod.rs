//! Free-text chapter import.
//!
//! Accepts `"HH:mm:ss - label"` lines, one per chapter, and turns them into
//! splits anchored so the latest imported entry is treated as having just
//! occurred. Also tracks the in-progress import buffer and the cancellation
//! confirmation around it.

use chrono::{DateTime, Duration, Utc};

use crate::error::ImportError;
use crate::splits::SavedTime;

/// How `ImportSession::cancel` decides whether to ask for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelMode {
    /// Always ask.
    Always,
    /// Ask only if there are unsaved chapter lines.
    IfNeeded,
    /// Cancel immediately.
    Never,
}

/// The in-progress import: a line buffer and an importing flag.
#[derive(Debug, Default)]
pub struct ImportSession {
    chapters: String,
    importing: bool,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the buffer and enter importing mode.
    pub fn start(&mut self) {
        self.chapters.clear();
        self.importing = true;
    }

    pub fn is_importing(&self) -> bool {
        self.importing
    }

    pub fn buffer(&self) -> &str {
        &self.chapters
    }

    pub fn push_line(&mut self, line: &str) {
        if !self.chapters.is_empty() {
            self.chapters.push('\n');
        }
        self.chapters.push_str(line);
    }

    pub fn has_unsaved_chapters(&self) -> bool {
        !self.chapters.trim().is_empty()
    }

    /// Cancel the import, consulting `confirm` according to `mode`.
    /// Returns true if the import was actually cancelled.
    pub fn cancel<F: FnOnce() -> bool>(&mut self, mode: CancelMode, confirm: F) -> bool {
        let needs_confirmation = mode == CancelMode::Always
            || (mode == CancelMode::IfNeeded && self.has_unsaved_chapters());

        if needs_confirmation && !confirm() {
            return false;
        }

        self.chapters.clear();
        self.importing = false;
        true
    }

    /// Leave importing mode and hand the buffered text to the caller.
    pub fn finish(&mut self) -> String {
        self.importing = false;
        std::mem::take(&mut self.chapters)
    }
}

/// One parsed chapter line: elapsed seconds and its label (possibly empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub seconds: i64,
    pub label: String,
}

/// Convert an `"HH:mm:ss"` timecode to a number of seconds.
pub fn timecode_to_seconds(timecode: &str) -> Result<i64, ImportError> {
    let invalid = || ImportError::InvalidTimecode {
        text: timecode.to_string(),
    };

    let parts: Vec<&str> = timecode.split(':').collect();
    if parts.len() != 3 {
        return Err(invalid());
    }
    let hours: i64 = parts[0].trim().parse().map_err(|_| invalid())?;
    let minutes: i64 = parts[1].trim().parse().map_err(|_| invalid())?;
    let seconds: i64 = parts[2].trim().parse().map_err(|_| invalid())?;

    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Parse chapter text into a list sorted ascending by elapsed seconds.
///
/// Each line is `"<timecode> - <label>"`; labels containing `" - "` keep
/// their remaining pieces. Blank lines are skipped; a line whose timecode
/// does not parse fails the whole import.
pub fn parse_chapters(text: &str) -> Result<Vec<Chapter>, ImportError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut chapters = Vec::new();
    for line in trimmed.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let mut pieces = line.split(" - ");
        let timecode = pieces.next().unwrap_or_default().trim();
        let label = pieces.collect::<Vec<_>>().join(" - ").trim().to_string();
        chapters.push(Chapter {
            seconds: timecode_to_seconds(timecode)?,
            label,
        });
    }

    chapters.sort_by_key(|chapter| chapter.seconds);
    Ok(chapters)
}

/// Turn sorted chapters into splits, assuming the last chapter happened at
/// `now`: each split's value is `now` minus its distance from the latest
/// elapsed time. Empty labels become `None` so display defaulting applies.
pub fn chapters_to_times(chapters: &[Chapter], now: DateTime<Utc>) -> Vec<SavedTime> {
    let Some(max_seconds) = chapters.last().map(|chapter| chapter.seconds) else {
        return Vec::new();
    };

    chapters
        .iter()
        .map(|chapter| {
            let value = now - Duration::seconds(max_seconds - chapter.seconds);
            SavedTime {
                value,
                label: (!chapter.label.is_empty()).then(|| chapter.label.clone()),
                offset_seconds: None,
            }
        })
        .collect()
}
