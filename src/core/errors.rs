//! Core error types

use thiserror::Error;
use wayland_client::{ConnectError, DispatchError};

/// A compositor capability the capture engine cannot work without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    SharedMemory,
    ScreenCopy,
    OutputGeometry,
    Output,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::SharedMemory => "wl_shm",
            Capability::ScreenCopy => "zwlr_screencopy_manager_v1",
            Capability::OutputGeometry => "zxdg_output_manager_v1",
            Capability::Output => "wl_output",
        };
        f.write_str(name)
    }
}

/// Capture engine errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to connect to the Wayland compositor: {0}")]
    Connect(#[from] ConnectError),

    #[error("Wayland dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("compositor is missing required capability: {0}")]
    CapabilityMissing(Capability),

    #[error("output index {index} is out of range (1..={count})")]
    OutOfRange { index: usize, count: usize },

    #[error("shared-memory buffer allocation failed: {0}")]
    Allocation(String),

    #[error("compositor failed to copy the frame")]
    CaptureFailed,
}

/// Result type for capture operations
pub type Result<T> = std::result::Result<T, CaptureError>;
