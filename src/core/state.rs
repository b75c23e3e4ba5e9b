//! Per-connection capture state.
//!
//! One `CaptureState` holds everything the protocol handlers touch: the
//! bound manager handles, the output directory and the in-flight capture
//! session. It is threaded explicitly through every dispatch call instead
//! of living in process-wide globals.

use wayland_client::protocol::wl_shm::WlShm;
use wayland_protocols::xdg::xdg_output::zv1::client::zxdg_output_manager_v1::ZxdgOutputManagerV1;
use wayland_protocols_wlr::screencopy::v1::client::zwlr_screencopy_manager_v1::ZwlrScreencopyManagerV1;

use crate::core::errors::{Capability, CaptureError, Result};
use crate::core::wayland::output::Output;
use crate::core::wayland::screencopy::CaptureSession;

pub struct CaptureState {
    /// Shared-memory global, required for buffer allocation.
    pub(crate) shm: Option<WlShm>,
    /// Screen-copy manager global.
    pub(crate) screencopy: Option<ZwlrScreencopyManagerV1>,
    /// Output-geometry manager global.
    pub(crate) output_manager: Option<ZxdgOutputManagerV1>,
    /// Every output the registry advertised, in announcement order.
    /// Hot-unplug is not supported; entries live until teardown.
    pub(crate) outputs: Vec<Output>,
    /// State machine for the single in-flight capture.
    pub(crate) session: CaptureSession,
    /// Ask the compositor for the damage-tracking copy variant.
    pub(crate) use_damage: bool,
}

impl CaptureState {
    pub(crate) fn new(use_damage: bool) -> Self {
        Self {
            shm: None,
            screencopy: None,
            output_manager: None,
            outputs: Vec::new(),
            session: CaptureSession::default(),
            use_damage,
        }
    }

    /// Check that every capability a capture needs was advertised.
    pub fn verify_support(&self) -> Result<()> {
        if self.shm.is_none() {
            return Err(CaptureError::CapabilityMissing(Capability::SharedMemory));
        }
        if self.screencopy.is_none() {
            return Err(CaptureError::CapabilityMissing(Capability::ScreenCopy));
        }
        if self.output_manager.is_none() {
            return Err(CaptureError::CapabilityMissing(Capability::OutputGeometry));
        }
        if self.outputs.is_empty() {
            return Err(CaptureError::CapabilityMissing(Capability::Output));
        }
        Ok(())
    }

    /// Number of outputs the compositor advertised.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Resolve a 1-based output ordinal.
    pub fn resolve(&self, index: usize) -> Result<&Output> {
        if index == 0 || index > self.outputs.len() {
            return Err(CaptureError::OutOfRange {
                index,
                count: self.outputs.len(),
            });
        }
        Ok(&self.outputs[index - 1])
    }
}
