//! Connection lifecycle and the public capture entry points.
//!
//! `ScreenCapture` owns the compositor connection, its event queue and the
//! `CaptureState` every protocol event is dispatched into. All asynchronous
//! protocol progress happens inside `roundtrip`/`blocking_dispatch` calls
//! made from these methods; there is no background thread.

use wayland_client::{Connection, EventQueue, QueueHandle};

use crate::core::errors::{Capability, CaptureError, Result};
use crate::core::shm::PixelBuffer;
use crate::core::state::CaptureState;
use crate::core::wayland::output::Output;

pub struct ScreenCapture {
    conn: Connection,
    queue: EventQueue<CaptureState>,
    qh: QueueHandle<CaptureState>,
    state: CaptureState,
}

impl ScreenCapture {
    /// Connect to the compositor named by the environment and prepare for
    /// capturing: bind globals, verify support, populate output geometry.
    ///
    /// An unreachable compositor is fatal; it cannot become reachable
    /// mid-run, so there is no retry.
    pub fn new() -> Result<Self> {
        Self::with_options(false)
    }

    /// Like [`ScreenCapture::new`], selecting the damage-tracking copy
    /// variant. The flag only changes which copy request is sent.
    pub fn with_options(use_damage: bool) -> Result<Self> {
        let conn = Connection::connect_to_env()?;
        let mut capture = Self::from_connection(conn, use_damage);
        capture.bind_globals()?;
        capture.verify_support()?;
        capture.populate_geometry()?;
        Ok(capture)
    }

    /// Build an unprepared engine over an existing connection. The caller
    /// runs `bind_globals`, `verify_support` and `populate_geometry` before
    /// capturing. The test harness injects socketpair connections here.
    pub fn from_connection(conn: Connection, use_damage: bool) -> Self {
        let queue = conn.new_event_queue();
        let qh = queue.handle();
        Self {
            conn,
            queue,
            qh,
            state: CaptureState::new(use_damage),
        }
    }

    /// Enumerate compositor globals and bind the ones we understand. One
    /// roundtrip guarantees all synchronous global announcements have been
    /// delivered before this returns.
    pub fn bind_globals(&mut self) -> Result<()> {
        let display = self.conn.display();
        let _registry = display.get_registry(&self.qh, ());
        self.queue.roundtrip(&mut self.state)?;
        tracing::info!("registry reported {} output(s)", self.state.output_count());
        Ok(())
    }

    /// Error out if a required capability is missing. Any error here is
    /// fatal for the caller: the compositor cannot perform the service.
    pub fn verify_support(&self) -> Result<()> {
        self.state.verify_support()
    }

    /// Fetch logical geometry, name and description for every output.
    /// Fields the compositor never sends stay at their defaults.
    pub fn populate_geometry(&mut self) -> Result<()> {
        self.state.request_geometry(&self.qh);
        self.queue.roundtrip(&mut self.state)?;
        for (i, output) in self.state.outputs.iter().enumerate() {
            tracing::debug!(
                "output {}: {:?} {}x{} at ({}, {})",
                i + 1,
                output.name,
                output.width,
                output.height,
                output.x,
                output.y
            );
        }
        Ok(())
    }

    /// Every output the compositor advertised, in announcement order.
    pub fn outputs(&self) -> &[Output] {
        &self.state.outputs
    }

    pub fn output_count(&self) -> usize {
        self.state.output_count()
    }

    /// Resolve a 1-based output ordinal.
    pub fn resolve(&self, index: usize) -> Result<&Output> {
        self.state.resolve(index)
    }

    /// Capture one frame from the 1-based `index`-th output.
    ///
    /// Blocks until the compositor either delivers or fails the frame; the
    /// returned buffer is released when dropped. At most one capture may be
    /// in flight per connection, which this synchronous signature enforces.
    pub fn capture_frame(&mut self, index: usize) -> Result<PixelBuffer> {
        let output = self.state.resolve(index)?.wl_output.clone();
        let manager = self
            .state
            .screencopy
            .clone()
            .ok_or(CaptureError::CapabilityMissing(Capability::ScreenCopy))?;

        self.state.session.begin();
        let frame = manager.capture_output(0, &output, &self.qh, ());

        // The only busy-wait in the system: a capture is a short, bounded
        // interactive exchange, so we block on the queue until it ends.
        while !self.state.session.finished() {
            if let Err(err) = self.queue.blocking_dispatch(&mut self.state) {
                frame.destroy();
                self.state.session.abort();
                return Err(err.into());
            }
        }

        frame.destroy();
        self.state.session.finish()
    }
}
