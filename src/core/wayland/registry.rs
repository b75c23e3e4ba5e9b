//! Registry discovery and global binding.
//!
//! Enumerates compositor-advertised globals and binds the four we care
//! about: wl_output, wl_shm, the screen-copy manager and the
//! output-geometry manager. Everything else is ignored.

use wayland_client::protocol::wl_output::WlOutput;
use wayland_client::protocol::wl_registry::{self, WlRegistry};
use wayland_client::protocol::wl_shm::WlShm;
use wayland_client::{Connection, Dispatch, QueueHandle};
use wayland_protocols::xdg::xdg_output::zv1::client::zxdg_output_manager_v1::ZxdgOutputManagerV1;
use wayland_protocols_wlr::screencopy::v1::client::zwlr_screencopy_manager_v1::ZwlrScreencopyManagerV1;

use crate::core::state::CaptureState;
use crate::core::wayland::output::Output;

/// Version requested for the managers that gained output name/description
/// support in their second revision. Lower advertisements soft-degrade.
const MANAGER_VERSION: u32 = 2;

impl Dispatch<WlRegistry, ()> for CaptureState {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => match interface.as_str() {
                "wl_output" => {
                    let wl_output = registry.bind::<WlOutput, _, _>(name, 1, qh, ());
                    state.outputs.push(Output::new(wl_output));
                }
                "wl_shm" => {
                    state.shm = Some(registry.bind::<WlShm, _, _>(name, 1, qh, ()));
                }
                "zwlr_screencopy_manager_v1" => {
                    let version = version.min(MANAGER_VERSION);
                    state.screencopy =
                        Some(registry.bind::<ZwlrScreencopyManagerV1, _, _>(name, version, qh, ()));
                    tracing::debug!("bound zwlr_screencopy_manager_v1 v{}", version);
                }
                "zxdg_output_manager_v1" => {
                    let version = version.min(MANAGER_VERSION);
                    state.output_manager =
                        Some(registry.bind::<ZxdgOutputManagerV1, _, _>(name, version, qh, ()));
                    tracing::debug!("bound zxdg_output_manager_v1 v{}", version);
                }
                _ => {}
            },
            // Hot-unplug is out of scope; bound outputs live until teardown.
            wl_registry::Event::GlobalRemove { .. } => {}
            _ => {}
        }
    }
}
