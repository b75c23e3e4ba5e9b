use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use image::RgbaImage;
use wayland_client::protocol::wl_shm::Format;
use wlrgrab::{PixelBuffer, ScreenCapture};

/// Command-line options; kept deliberately small.
struct Options {
    /// 1-based output to capture; `None` captures every output.
    output_index: Option<usize>,
    /// Frames to capture per output.
    count: u32,
    /// Pause between repeated frames of the same output.
    delay: Duration,
    /// Send copy_with_damage instead of copy.
    use_damage: bool,
    /// Directory PNG files are written into.
    out_dir: PathBuf,
}

fn parse_args() -> Result<Options> {
    let mut opts = Options {
        output_index: None,
        count: 1,
        delay: Duration::from_secs(1),
        use_damage: false,
        out_dir: PathBuf::from("."),
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--count" => {
                opts.count = args
                    .next()
                    .context("--count needs a value")?
                    .parse()
                    .context("invalid --count")?;
            }
            "--delay" => {
                let secs: f64 = args
                    .next()
                    .context("--delay needs a value")?
                    .parse()
                    .context("invalid --delay")?;
                opts.delay = Duration::from_secs_f64(secs);
            }
            "--with-damage" => opts.use_damage = true,
            "--out" => {
                opts.out_dir = PathBuf::from(args.next().context("--out needs a value")?);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                let index = other
                    .parse()
                    .with_context(|| format!("unrecognized argument: {other}"))?;
                opts.output_index = Some(index);
            }
        }
    }
    Ok(opts)
}

fn print_usage() {
    println!("usage: wlrgrab [OPTIONS] [OUTPUT_INDEX]");
    println!();
    println!("Capture still frames from a wlroots-based Wayland compositor.");
    println!();
    println!("  OUTPUT_INDEX     1-based output to capture (default: all outputs)");
    println!("  --count N        frames to capture per output (default: 1)");
    println!("  --delay SECS     pause between repeated frames (default: 1)");
    println!("  --with-damage    request the damage-tracking copy variant");
    println!("  --out DIR        directory to write PNG files into (default: .)");
}

fn main() -> Result<()> {
    // Initialize logging
    // Set default log level to info
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,wlrgrab=debug");
    }
    tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S".to_string(),
        ))
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts = parse_args()?;
    let mut capture = ScreenCapture::with_options(opts.use_damage)?;

    let targets: Vec<usize> = match opts.output_index {
        Some(index) => vec![index],
        None => (1..=capture.output_count()).collect(),
    };

    for index in targets {
        for shot in 0..opts.count {
            let frame = capture.capture_frame(index)?;
            let path = frame_path(&opts.out_dir, &capture, index, shot);
            save_png(&frame, &path)?;
            tracing::info!("wrote {}", path.display());
            if shot + 1 < opts.count {
                std::thread::sleep(opts.delay);
            }
        }
    }

    Ok(())
}

fn frame_path(dir: &Path, capture: &ScreenCapture, index: usize, shot: u32) -> PathBuf {
    let label = capture
        .resolve(index)
        .ok()
        .filter(|o| !o.name.is_empty())
        .map(|o| o.name.clone())
        .unwrap_or_else(|| format!("screen{index}"));
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    dir.join(format!("wayland-screenshot-{label}-{stamp}-{shot}.png"))
}

/// Convert the raw shm pixels to RGBA and write a PNG.
fn save_png(frame: &PixelBuffer, path: &Path) -> Result<()> {
    // The 32-bit shm formats are stored little-endian, so XRGB/ARGB memory
    // reads as B,G,R,A per pixel and XBGR/ABGR as R,G,B,A.
    let swap_rb = match frame.format() {
        Format::Xrgb8888 | Format::Argb8888 => true,
        Format::Xbgr8888 | Format::Abgr8888 => false,
        other => bail!("unsupported pixel format {other:?}"),
    };
    let image = convert_rows(
        frame.bytes(),
        frame.width(),
        frame.height(),
        frame.stride(),
        frame.y_invert(),
        swap_rb,
    );
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Repack 32-bit rows into an opaque RGBA image, honoring the
/// compositor-chosen stride and the bottom-to-top row flag.
fn convert_rows(
    bytes: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    y_invert: bool,
    swap_rb: bool,
) -> RgbaImage {
    let mut image = RgbaImage::new(width, height);
    for row in 0..height {
        let src_row = if y_invert { height - 1 - row } else { row };
        let offset = (src_row * stride) as usize;
        for col in 0..width {
            let px = &bytes[offset + col as usize * 4..offset + col as usize * 4 + 4];
            let (r, g, b) = if swap_rb {
                (px[2], px[1], px[0])
            } else {
                (px[0], px[1], px[2])
            };
            image.put_pixel(col, row, image::Rgba([r, g, b, 0xff]));
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2x2 image with a 12-byte stride: each row carries 4 bytes of padding
    // that must never leak into the output.
    fn sample_bytes() -> Vec<u8> {
        let mut bytes = vec![0xaa; 24];
        // row 0: red, green (B,G,R,A layout)
        bytes[0..4].copy_from_slice(&[0x00, 0x00, 0xff, 0xff]);
        bytes[4..8].copy_from_slice(&[0x00, 0xff, 0x00, 0xff]);
        // row 1: blue, white
        bytes[12..16].copy_from_slice(&[0xff, 0x00, 0x00, 0xff]);
        bytes[16..20].copy_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        bytes
    }

    #[test]
    fn conversion_honors_stride() {
        let image = convert_rows(&sample_bytes(), 2, 2, 12, false, true);
        assert_eq!(image.get_pixel(0, 0), &image::Rgba([0xff, 0x00, 0x00, 0xff]));
        assert_eq!(image.get_pixel(1, 0), &image::Rgba([0x00, 0xff, 0x00, 0xff]));
        assert_eq!(image.get_pixel(0, 1), &image::Rgba([0x00, 0x00, 0xff, 0xff]));
        assert_eq!(image.get_pixel(1, 1), &image::Rgba([0xff, 0xff, 0xff, 0xff]));
    }

    #[test]
    fn conversion_flips_inverted_rows() {
        let image = convert_rows(&sample_bytes(), 2, 2, 12, true, true);
        // Bottom row comes out on top.
        assert_eq!(image.get_pixel(0, 0), &image::Rgba([0x00, 0x00, 0xff, 0xff]));
        assert_eq!(image.get_pixel(0, 1), &image::Rgba([0xff, 0x00, 0x00, 0xff]));
    }

    #[test]
    fn conversion_preserves_channel_order_for_bgr_formats() {
        let image = convert_rows(&sample_bytes(), 2, 2, 12, false, false);
        // Without the swap the first pixel reads as stored: R=0, G=0, B=0xff.
        assert_eq!(image.get_pixel(0, 0), &image::Rgba([0x00, 0x00, 0xff, 0xff]));
    }
}
