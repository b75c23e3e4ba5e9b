//! wlr-screencopy capture session.
//!
//! One capture-output request travels
//! `Idle -> BufferRequested -> CopyInFlight -> {Completed | Failed}`.
//! The compositor announces the buffer it wants, we allocate it, issue the
//! copy against it, and wait for the verdict. All transitions happen inside
//! frame events delivered through the connection's dispatch loop.

use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum};
use wayland_protocols_wlr::screencopy::v1::client::{
    zwlr_screencopy_frame_v1::{self, Flags, ZwlrScreencopyFrameV1},
    zwlr_screencopy_manager_v1::ZwlrScreencopyManagerV1,
};

use crate::core::errors::CaptureError;
use crate::core::shm::{self, PixelBuffer};
use crate::core::state::CaptureState;

/// Capture progress, advanced only from frame events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SessionStatus {
    /// No capture in flight.
    #[default]
    Idle,
    /// capture_output sent; waiting for buffer requirements.
    BufferRequested,
    /// Buffer allocated and copy issued; waiting for ready/failed.
    CopyInFlight,
    Completed,
    Failed,
}

/// Transient state for one capture-output call.
#[derive(Default)]
pub(crate) struct CaptureSession {
    pub(crate) status: SessionStatus,
    /// The buffer being filled. At most one may exist at any time.
    pub(crate) pending: Option<PixelBuffer>,
    /// Failure cause when `status` is `Failed`.
    pub(crate) error: Option<CaptureError>,
}

impl CaptureSession {
    /// Enter `BufferRequested`. Calling this with a capture already in
    /// flight is a programming error, not a runtime condition.
    pub(crate) fn begin(&mut self) {
        assert_eq!(
            self.status,
            SessionStatus::Idle,
            "a capture is already in flight"
        );
        assert!(
            self.pending.is_none(),
            "previous pixel buffer was never released"
        );
        self.status = SessionStatus::BufferRequested;
        self.error = None;
    }

    pub(crate) fn finished(&self) -> bool {
        matches!(self.status, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Take the terminal result and return to `Idle`. On failure any buffer
    /// allocated before the verdict is dropped, which releases its mapping
    /// and compositor-side object.
    pub(crate) fn finish(&mut self) -> Result<PixelBuffer, CaptureError> {
        let status = self.status;
        self.status = SessionStatus::Idle;
        match status {
            SessionStatus::Completed => Ok(self
                .pending
                .take()
                .expect("completed capture must hold a pixel buffer")),
            SessionStatus::Failed => {
                self.pending = None;
                Err(self.error.take().unwrap_or(CaptureError::CaptureFailed))
            }
            other => unreachable!("finish() called in state {:?}", other),
        }
    }

    /// Reset after a dispatch error, releasing anything outstanding.
    pub(crate) fn abort(&mut self) {
        self.status = SessionStatus::Idle;
        self.pending = None;
        self.error = None;
    }
}

impl Dispatch<ZwlrScreencopyFrameV1, ()> for CaptureState {
    fn event(
        state: &mut Self,
        frame: &ZwlrScreencopyFrameV1,
        event: zwlr_screencopy_frame_v1::Event,
        _: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_screencopy_frame_v1::Event::Buffer {
                format,
                width,
                height,
                stride,
            } => {
                assert!(
                    state.session.pending.is_none(),
                    "buffer requirements announced while a pixel buffer is outstanding"
                );
                assert_eq!(
                    state.session.status,
                    SessionStatus::BufferRequested,
                    "buffer requirements announced with no capture awaiting them"
                );

                let format = match format {
                    WEnum::Value(format) => format,
                    WEnum::Unknown(raw) => {
                        state.session.status = SessionStatus::Failed;
                        state.session.error = Some(CaptureError::Allocation(format!(
                            "compositor announced unknown pixel format {raw:#x}"
                        )));
                        return;
                    }
                };

                let shm = state
                    .shm
                    .as_ref()
                    .expect("wl_shm presence was verified at startup");
                match shm::allocate(shm, format, width, height, stride, qh) {
                    Ok(buffer) => {
                        // copy_with_damage only exists from protocol v2 on;
                        // a v1 compositor gets the plain copy instead.
                        if state.use_damage && frame.version() >= 2 {
                            frame.copy_with_damage(buffer.wl_buffer());
                        } else {
                            if state.use_damage {
                                tracing::warn!(
                                    "screencopy v{} lacks copy_with_damage, using plain copy",
                                    frame.version()
                                );
                            }
                            frame.copy(buffer.wl_buffer());
                        }
                        state.session.pending = Some(buffer);
                        state.session.status = SessionStatus::CopyInFlight;
                    }
                    Err(err) => {
                        tracing::error!("buffer allocation failed: {}", err);
                        state.session.status = SessionStatus::Failed;
                        state.session.error = Some(err);
                    }
                }
            }
            zwlr_screencopy_frame_v1::Event::Flags { flags } => {
                let y_invert = flags
                    .into_result()
                    .map(|f| f.contains(Flags::YInvert))
                    .unwrap_or(false);
                if let Some(pending) = state.session.pending.as_mut() {
                    pending.set_y_invert(y_invert);
                }
            }
            zwlr_screencopy_frame_v1::Event::Ready { .. } => {
                // Timestamp ignored; the buffer is now valid to read.
                state.session.status = SessionStatus::Completed;
            }
            zwlr_screencopy_frame_v1::Event::Failed => {
                state.session.status = SessionStatus::Failed;
                state.session.error = Some(CaptureError::CaptureFailed);
            }
            // Changed-region reports; full-frame semantics only.
            zwlr_screencopy_frame_v1::Event::Damage { .. } => {}
            zwlr_screencopy_frame_v1::Event::LinuxDmabuf { .. } => {}
            zwlr_screencopy_frame_v1::Event::BufferDone => {}
            _ => {}
        }
    }
}

wayland_client::delegate_noop!(CaptureState: ZwlrScreencopyManagerV1);
