//! Common imports and types used throughout wlrgrab.

pub use crate::core::errors::{Capability, CaptureError, Result};
pub use crate::core::session::ScreenCapture;
pub use crate::core::shm::PixelBuffer;
