//! The read side of the link.
//!
//! Each iteration waits for the gate, reads one line, then checks the
//! teardown signal before doing anything with the result. A read blocks for
//! at most the handle's timeout (2s), which bounds how long teardown takes.

use super::classifier::{classify, log_line, Verdict, VerdictCounts};
use super::error::LinkError;
use super::frame::Frame;
use super::session::SessionStats;
use super::Link;
use crate::collector::FrameSink;
use crate::port::{PortError, RawLine, ReadOutcome};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReaderState {
    Running,
    AwaitingGate,
    ResettingOnError,
    TornDown,
}

/// What the reader saw before it was torn down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReaderSummary {
    pub verdicts: VerdictCounts,
    pub read_errors: u64,
    pub error_resets: u64,
    pub session: SessionStats,
}

pub struct ReaderLoop {
    link: Arc<Link>,
    sink: Arc<dyn FrameSink>,
    state: ReaderState,
    summary: ReaderSummary,
}

impl ReaderLoop {
    pub fn new(link: Arc<Link>, sink: Arc<dyn FrameSink>) -> Self {
        Self {
            link,
            sink,
            state: ReaderState::Running,
            summary: ReaderSummary::default(),
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Read until teardown, then close the port.
    ///
    /// Returns an error only when the port cannot be reopened after a fault.
    pub fn run(mut self) -> Result<ReaderSummary, LinkError> {
        loop {
            self.state = ReaderState::AwaitingGate;
            self.link.gate.await_clear();
            self.state = ReaderState::Running;

            let (outcome, generation) = {
                let mut session = self.link.session.lock();
                (session.read_line(), session.generation())
            };

            if self.link.teardown.is_triggered() {
                return Ok(self.tear_down());
            }

            match outcome {
                Ok(ReadOutcome::Line(line)) => {
                    self.link.clock.mark_seen();
                    self.handle_line(&line);
                }
                Ok(ReadOutcome::EndOfStream) => {}
                Err(e) => {
                    if !self.reset_after_error(&e, generation)? {
                        return Ok(self.tear_down());
                    }
                }
            }
        }
    }

    fn handle_line(&mut self, line: &RawLine) {
        let verdict = classify(line);
        log_line(line, verdict);
        self.summary.verdicts.record(verdict);

        if verdict == Verdict::ValidFrame {
            match Frame::parse(&line.text()) {
                Some(frame) => self.sink.accept(frame),
                None => debug!("Frame matched but could not be parsed"),
            }
        }
    }

    /// Reset the port after a read fault. Returns `false` when the link is
    /// going down instead and the reader should stop.
    fn reset_after_error(&mut self, error: &PortError, generation: u64) -> Result<bool, LinkError> {
        self.state = ReaderState::ResettingOnError;

        let guard = self.link.gate.acquire_exclusive();
        let mut session = self.link.session.lock();
        if self.link.teardown.is_triggered() || session.has_failed() {
            debug!(error = %error, "Serial link is going down, not resetting");
            return Ok(false);
        }

        warn!(error = %error, "Error reading from serial port, resetting port...");
        self.summary.read_errors += 1;
        if session.generation() != generation && session.is_open() {
            debug!("Serial port was already reset, not resetting again");
            return Ok(true);
        }
        session.reset(&guard)?;
        self.summary.error_resets += 1;
        Ok(true)
    }

    fn tear_down(&mut self) -> ReaderSummary {
        self.state = ReaderState::TornDown;

        let guard = self.link.gate.acquire_exclusive();
        let mut session = self.link.session.lock();
        session.close();
        self.summary.session = session.stats();
        drop(session);
        drop(guard);

        info!(
            lines = self.summary.session.lines,
            frames = self.summary.verdicts.valid_frames,
            resets = self.summary.session.resets,
            "Serial port closed, reader stopped"
        );
        self.summary
    }
}
