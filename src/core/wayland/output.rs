//! Output directory.
//!
//! Per-output metadata populated asynchronously through the xdg-output
//! protocol. Geometry fields are only meaningful after `populate_geometry`
//! has completed its roundtrip; until then they hold their empty/zero
//! defaults, which the geometry protocol also permits as a silent omission.

use wayland_client::protocol::wl_output::WlOutput;
use wayland_client::{Connection, Dispatch, QueueHandle};
use wayland_protocols::xdg::xdg_output::zv1::client::{
    zxdg_output_manager_v1::ZxdgOutputManagerV1,
    zxdg_output_v1::{self, ZxdgOutputV1},
};

use crate::core::state::CaptureState;

/// One compositor-advertised display.
pub struct Output {
    /// Registry-bound handle, owned here for the connection lifetime.
    pub(crate) wl_output: WlOutput,
    /// Geometry handle, bound lazily once the geometry manager is available.
    pub(crate) xdg_output: Option<ZxdgOutputV1>,
    /// Compositor-assigned name, e.g. "DP-1". Empty until populated.
    pub name: String,
    /// Human-readable description. Empty until populated.
    pub description: String,
    /// Logical position in the global compositor space.
    pub x: i32,
    pub y: i32,
    /// Logical size, after scaling and transforms.
    pub width: i32,
    pub height: i32,
}

impl Output {
    pub(crate) fn new(wl_output: WlOutput) -> Self {
        Self {
            wl_output,
            xdg_output: None,
            name: String::new(),
            description: String::new(),
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        }
    }
}

impl CaptureState {
    /// Request a geometry handle for every known output. The events land
    /// during the caller's following roundtrip.
    pub(crate) fn request_geometry(&mut self, qh: &QueueHandle<CaptureState>) {
        let Some(manager) = self.output_manager.clone() else {
            return;
        };
        for output in &mut self.outputs {
            output.xdg_output = Some(manager.get_xdg_output(&output.wl_output, qh, ()));
        }
    }

    /// Geometry events carry no back-reference, so the owning output is
    /// found by handle equality.
    fn output_by_xdg_mut(&mut self, handle: &ZxdgOutputV1) -> Option<&mut Output> {
        self.outputs
            .iter_mut()
            .find(|o| o.xdg_output.as_ref() == Some(handle))
    }
}

impl Dispatch<ZxdgOutputV1, ()> for CaptureState {
    fn event(
        state: &mut Self,
        handle: &ZxdgOutputV1,
        event: zxdg_output_v1::Event,
        _: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            zxdg_output_v1::Event::LogicalPosition { x, y } => {
                if let Some(output) = state.output_by_xdg_mut(handle) {
                    output.x = x;
                    output.y = y;
                }
            }
            zxdg_output_v1::Event::LogicalSize { width, height } => {
                if let Some(output) = state.output_by_xdg_mut(handle) {
                    output.width = width;
                    output.height = height;
                }
            }
            zxdg_output_v1::Event::Name { name } => {
                if let Some(output) = state.output_by_xdg_mut(handle) {
                    output.name = name;
                }
            }
            zxdg_output_v1::Event::Description { description } => {
                if let Some(output) = state.output_by_xdg_mut(handle) {
                    output.description = description;
                }
            }
            // The populate roundtrip already guarantees delivery ordering.
            zxdg_output_v1::Event::Done => {}
            _ => {}
        }
    }
}

// Logical geometry comes from xdg-output; raw wl_output events are unused.
wayland_client::delegate_noop!(CaptureState: ignore WlOutput);
wayland_client::delegate_noop!(CaptureState: ZxdgOutputManagerV1);
