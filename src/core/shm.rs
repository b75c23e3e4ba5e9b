//! Shared-memory pixel buffers.
//!
//! The compositor announces which format, size and stride it intends to
//! write; we answer with a `wl_buffer` backed by an anonymous POSIX
//! shared-memory object mapped read-write into this process.

use std::fs::File;
use std::os::fd::AsFd;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use memmap2::MmapMut;
use rustix::fs::{ftruncate, Mode};
use rustix::io::Errno;
use rustix::shm;
use wayland_client::protocol::wl_buffer::WlBuffer;
use wayland_client::protocol::wl_shm::{Format, WlShm};
use wayland_client::protocol::wl_shm_pool::WlShmPool;
use wayland_client::QueueHandle;

use crate::core::errors::{CaptureError, Result};
use crate::core::state::CaptureState;

/// A captured (or in-flight) frame: the compositor-side buffer object plus
/// the mapped memory the compositor writes into.
///
/// Dropping the buffer destroys the `wl_buffer` and unmaps the region, so
/// release is tied to ownership and cannot be forgotten or done twice.
pub struct PixelBuffer {
    buffer: WlBuffer,
    mmap: MmapMut,
    format: Format,
    width: u32,
    height: u32,
    stride: u32,
    y_invert: bool,
}

impl PixelBuffer {
    /// Compositor-chosen shared-memory pixel format.
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row; may exceed `width * bytes_per_pixel` and must be
    /// honored when addressing rows.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Rows are stored bottom-to-top when set.
    pub fn y_invert(&self) -> bool {
        self.y_invert
    }

    /// The raw pixel bytes, exactly `stride * height` long.
    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub(crate) fn wl_buffer(&self) -> &WlBuffer {
        &self.buffer
    }

    pub(crate) fn set_y_invert(&mut self, y_invert: bool) {
        self.y_invert = y_invert;
    }
}

impl Drop for PixelBuffer {
    fn drop(&mut self) {
        // The mapping itself goes away when `mmap` drops.
        self.buffer.destroy();
    }
}

static SHM_SEQ: AtomicU64 = AtomicU64::new(0);

/// Process-unique name for a fresh shm object. A fixed name would let
/// concurrent processes collide; the exclusive-create flag in `allocate`
/// still catches the remaining (practically impossible) case.
pub(crate) fn unique_shm_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = SHM_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("/wlrgrab-{}-{:x}-{}", std::process::id(), nanos, seq)
}

/// Create the shared-memory object the compositor asked for and wrap it as
/// a `wl_buffer` of the requested format and dimensions.
///
/// Only ever called in response to a buffer-requirements event, never
/// speculatively. Every failure point surfaces as `Allocation` and is fatal
/// for the current capture attempt only.
pub(crate) fn allocate(
    shm: &WlShm,
    format: Format,
    width: u32,
    height: u32,
    stride: u32,
    qh: &QueueHandle<CaptureState>,
) -> Result<PixelBuffer> {
    let size = u64::from(stride) * u64::from(height);
    let pool_size = i32::try_from(size)
        .map_err(|_| CaptureError::Allocation(format!("buffer size {size} exceeds pool limit")))?;
    let name = unique_shm_name();

    let fd = shm::open(
        name.as_str(),
        shm::OFlags::RDWR | shm::OFlags::CREATE | shm::OFlags::EXCL,
        Mode::RUSR | Mode::WUSR,
    )
    .map_err(|e| CaptureError::Allocation(format!("shm_open({name}): {e}")))?;

    // Unlink right away so the object has no path identity; the fd keeps it
    // alive and nothing leaks on the error paths below.
    if let Err(e) = shm::unlink(name.as_str()) {
        tracing::warn!("shm_unlink({}) failed: {}", name, e);
    }

    loop {
        match ftruncate(&fd, size) {
            Ok(()) => break,
            Err(Errno::INTR) => continue,
            Err(e) => {
                return Err(CaptureError::Allocation(format!(
                    "ftruncate to {size} bytes: {e}"
                )))
            }
        }
    }

    let file = File::from(fd);
    let mmap = unsafe { MmapMut::map_mut(&file) }
        .map_err(|e| CaptureError::Allocation(format!("mmap of {size} bytes: {e}")))?;

    let pool = shm.create_pool(file.as_fd(), pool_size, qh, ());
    let buffer = pool.create_buffer(
        0,
        width as i32,
        height as i32,
        stride as i32,
        format,
        qh,
        (),
    );
    // The buffer keeps the pool memory alive on the compositor side.
    pool.destroy();

    tracing::debug!(
        "allocated {}x{} {:?} buffer, stride {} ({} bytes)",
        width,
        height,
        format,
        stride,
        size
    );

    Ok(PixelBuffer {
        buffer,
        mmap,
        format,
        width,
        height,
        stride,
        y_invert: false,
    })
}

wayland_client::delegate_noop!(CaptureState: ignore WlShm);
wayland_client::delegate_noop!(CaptureState: WlShmPool);
wayland_client::delegate_noop!(CaptureState: ignore WlBuffer);
