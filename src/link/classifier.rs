//! Signal/noise filter for receiver lines.
//!
//! [`classify`] is pure: the verdict depends only on the line bytes and the
//! oversized flag. Logging is done separately by [`log_line`].

use super::frame::is_frame;
use crate::port::RawLine;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Lines of this many characters or fewer are never treated as frames.
pub const MIN_FRAME_CHARS: usize = 40;

/// Markers the receiver firmware puts in lines it failed to decode.
pub const ERROR_MARKERS: [&str; 4] = ["_ENC", "_BAD", "BAD", "ERR"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    ValidFrame,
    FlaggedError,
    Oversized,
    Other,
}

pub fn classify(line: &RawLine) -> Verdict {
    if line.is_oversized() {
        return Verdict::Oversized;
    }

    let text = line.text();
    let flagged = ERROR_MARKERS.iter().any(|marker| text.contains(marker));
    if text.chars().count() <= MIN_FRAME_CHARS || flagged {
        return Verdict::FlaggedError;
    }

    if is_frame(&text) {
        Verdict::ValidFrame
    } else {
        Verdict::Other
    }
}

/// Log a classified line at the level its verdict calls for.
pub fn log_line(line: &RawLine, verdict: Verdict) {
    let text = line.text();
    match verdict {
        Verdict::Oversized => warn!(
            line = %text,
            "Message is too long for buffer and split over multiple lines"
        ),
        Verdict::ValidFrame => debug!("evohome: {}", text),
        Verdict::FlaggedError | Verdict::Other => info!("{}", text),
    }
}

/// Running totals per verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictCounts {
    pub valid_frames: u64,
    pub flagged_errors: u64,
    pub oversized: u64,
    pub other: u64,
}

impl VerdictCounts {
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::ValidFrame => self.valid_frames += 1,
            Verdict::FlaggedError => self.flagged_errors += 1,
            Verdict::Oversized => self.oversized += 1,
            Verdict::Other => self.other += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.valid_frames + self.flagged_errors + self.oversized + self.other
    }
}
