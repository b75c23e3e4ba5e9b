pub mod errors;
pub mod session;
pub mod shm;
pub mod state;
pub mod wayland;

// Re-export key types
pub use session::ScreenCapture;
pub use shm::PixelBuffer;
pub use state::CaptureState;
