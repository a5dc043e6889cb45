//! Starts and stops the link threads for one device.

use super::error::LinkError;
use super::reader::{ReaderLoop, ReaderSummary};
use super::teardown::TeardownSignal;
use super::watchdog::Watchdog;
use super::{Link, LinkSettings};
use crate::collector::FrameSink;
use crate::port::PortOpener;
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

/// Final state of a supervised link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SupervisorReport {
    pub reader: ReaderSummary,
    pub watchdog_resets: u64,
}

pub struct Supervisor;

impl Supervisor {
    /// Open `device` and start the reader and watchdog threads.
    ///
    /// Fails if the device cannot be opened. A fatal error in either
    /// thread later on triggers teardown of the other and is returned by
    /// [`SupervisorHandle::wait`].
    pub fn start(
        device: &str,
        opener: Arc<dyn PortOpener>,
        sink: Arc<dyn FrameSink>,
        settings: LinkSettings,
    ) -> Result<SupervisorHandle, LinkError> {
        Self::start_with_signal(device, opener, sink, settings, TeardownSignal::new())
    }

    /// Like [`Supervisor::start`], with a teardown signal owned by the caller.
    pub fn start_with_signal(
        device: &str,
        opener: Arc<dyn PortOpener>,
        sink: Arc<dyn FrameSink>,
        settings: LinkSettings,
        teardown: TeardownSignal,
    ) -> Result<SupervisorHandle, LinkError> {
        let link = Link::open(device, opener, &settings, teardown)?;
        info!(device, "Supervising serial device");

        let reader = {
            let reader = ReaderLoop::new(Arc::clone(&link), sink);
            let teardown = link.teardown.clone();
            spawn("reader", move || halt_on_error(reader.run(), &teardown))?
        };

        let watchdog = {
            let watchdog = Watchdog::new(Arc::clone(&link), &settings);
            let teardown = link.teardown.clone();
            match spawn("watchdog", move || halt_on_error(watchdog.run(), &teardown)) {
                Ok(handle) => handle,
                Err(e) => {
                    link.teardown.trigger();
                    let _ = reader.join();
                    return Err(e);
                }
            }
        };

        Ok(SupervisorHandle {
            link,
            reader,
            watchdog,
        })
    }
}

fn spawn<T, F>(name: &'static str, f: F) -> Result<JoinHandle<T>, LinkError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(format!("link-{name}"))
        .spawn(f)
        .map_err(|source| LinkError::Spawn { name, source })
}

fn halt_on_error<T>(result: Result<T, LinkError>, teardown: &TeardownSignal) -> Result<T, LinkError> {
    if let Err(e) = &result {
        error!(error = %e, "Serial link failed");
        teardown.trigger();
    }
    result
}

pub struct SupervisorHandle {
    link: Arc<Link>,
    reader: JoinHandle<Result<ReaderSummary, LinkError>>,
    watchdog: JoinHandle<Result<u64, LinkError>>,
}

impl SupervisorHandle {
    /// Ask both threads to stop. The reader notices within one read timeout.
    pub fn teardown(&self) {
        if self.link.teardown.trigger() {
            info!("Tearing down serial link");
        }
    }

    pub fn teardown_signal(&self) -> TeardownSignal {
        self.link.teardown.clone()
    }

    /// Whether the reader has stopped (after teardown or a fatal error).
    pub fn is_finished(&self) -> bool {
        self.reader.is_finished()
    }

    /// Time since the reader last received a line.
    pub fn since_last_line(&self) -> Duration {
        self.link.clock.since_last_seen()
    }

    pub fn link(&self) -> &Arc<Link> {
        &self.link
    }

    /// Block until both threads have stopped.
    pub fn wait(self) -> Result<SupervisorReport, LinkError> {
        let reader = self.reader.join();
        // The watchdog only stops on teardown; make sure it is set, also
        // when the reader panicked.
        self.link.teardown.trigger();
        let watchdog = self.watchdog.join();

        let reader = reader.map_err(|_| LinkError::Panicked("reader"))?;
        let watchdog = watchdog.map_err(|_| LinkError::Panicked("watchdog"))?;

        let (reader, watchdog_resets) = match (reader, watchdog) {
            (Err(e), _) | (_, Err(e)) => return Err(e),
            (Ok(reader), Ok(resets)) => (reader, resets),
        };

        Ok(SupervisorReport {
            reader,
            watchdog_resets,
        })
    }
}
