// wlrgrab
//
// Still-frame screenshot client for Wayland compositors that implement
// the wlroots screencopy extension. Compositors without a native
// screenshot facility get one from the outside: discover outputs,
// negotiate a shared-memory buffer in the compositor's chosen format,
// and drive the capture-and-copy handshake to completion.

pub mod core;
pub mod prelude;

pub use crate::core::errors::{Capability, CaptureError, Result};
pub use crate::core::session::ScreenCapture;
pub use crate::core::shm::PixelBuffer;
pub use crate::core::wayland::output::Output;

#[cfg(test)]
mod tests;
