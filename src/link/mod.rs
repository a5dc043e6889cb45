//! Serial-link supervision.
//!
//! Two threads share one [`Link`]:
//!
//! ```text
//! ReaderLoop ── await_clear ──> Gate <── acquire_exclusive ── Watchdog
//!     │                          │                               │
//!     ├── read_line ──────> PortSession <──────── reset ─────────┤
//!     └── mark_seen ──────> LivenessClock <── since_last_seen ───┘
//! ```
//!
//! The reader pulls lines, classifies them and forwards frames; the
//! watchdog resets the port when the clock goes stale. Both stop on the
//! [`TeardownSignal`].

pub mod classifier;
pub mod clock;
pub mod error;
pub mod frame;
pub mod gate;
pub mod reader;
pub mod session;
pub mod supervisor;
pub mod teardown;
pub mod watchdog;

pub use classifier::{classify, log_line, Verdict, VerdictCounts};
pub use clock::LivenessClock;
pub use error::LinkError;
pub use frame::{Frame, Verb};
pub use gate::{Gate, GateGuard};
pub use reader::{ReaderLoop, ReaderState, ReaderSummary};
pub use session::{PortSession, SessionStats, DEFAULT_COOL_DOWN};
pub use supervisor::{Supervisor, SupervisorHandle, SupervisorReport};
pub use teardown::TeardownSignal;
pub use watchdog::{jittered, Watchdog};

use crate::port::PortOpener;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Timing of the supervision loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    /// Pause after closing the port.
    pub cool_down: Duration,
    /// Base interval between watchdog checks.
    pub watchdog_interval: Duration,
    /// Watchdog interval jitter, in percent of the base interval either way.
    pub jitter_percent: u8,
    /// Silence after which the watchdog resets the port.
    pub stale_after: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            cool_down: DEFAULT_COOL_DOWN,
            watchdog_interval: Duration::from_secs(120),
            jitter_percent: 25,
            stale_after: Duration::from_secs(120),
        }
    }
}

/// State shared by the reader loop and the watchdog of one device.
#[derive(Debug)]
pub struct Link {
    pub gate: Gate,
    pub session: Mutex<PortSession>,
    pub clock: LivenessClock,
    pub teardown: TeardownSignal,
}

impl Link {
    /// Open the device and wrap it for sharing. Failing to open is fatal.
    pub fn open(
        device: &str,
        opener: Arc<dyn PortOpener>,
        settings: &LinkSettings,
        teardown: TeardownSignal,
    ) -> Result<Arc<Self>, LinkError> {
        let session = PortSession::open(device, opener, settings.cool_down)?;
        Ok(Arc::new(Self {
            gate: Gate::new(),
            session: Mutex::new(session),
            clock: LivenessClock::new(),
            teardown,
        }))
    }
}
