//! End-to-end capture engine tests against the mock compositor.

use wayland_client::Connection;

use super::mock::{self, BufferSpec, CopyReply, MockConfig, MockOutput};
use crate::core::errors::{Capability, CaptureError};
use crate::ScreenCapture;

fn connect(config: MockConfig) -> (mock::MockHandle, ScreenCapture) {
    connect_with(config, false)
}

fn connect_with(config: MockConfig, use_damage: bool) -> (mock::MockHandle, ScreenCapture) {
    let (handle, stream) = mock::spawn(config);
    let conn = Connection::from_socket(stream).expect("socket connection");
    (handle, ScreenCapture::from_connection(conn, use_damage))
}

fn prepared(config: MockConfig) -> (mock::MockHandle, ScreenCapture) {
    prepared_with(config, false)
}

fn prepared_with(config: MockConfig, use_damage: bool) -> (mock::MockHandle, ScreenCapture) {
    let (handle, mut capture) = connect_with(config, use_damage);
    capture.bind_globals().expect("bind_globals");
    capture.verify_support().expect("verify_support");
    capture.populate_geometry().expect("populate_geometry");
    (handle, capture)
}

fn two_output_config() -> MockConfig {
    MockConfig {
        outputs: vec![
            MockOutput {
                name: "DP-1".into(),
                description: "left monitor".into(),
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
            },
            MockOutput {
                name: "HDMI-A-1".into(),
                description: "right monitor".into(),
                x: 1920,
                y: 0,
                width: 2560,
                height: 1440,
            },
        ],
        ..Default::default()
    }
}

#[test]
fn binds_globals_and_reports_advertised_geometry() {
    let (_mock, capture) = prepared(two_output_config());

    assert_eq!(capture.output_count(), 2);

    let first = capture.resolve(1).unwrap();
    assert_eq!(first.name, "DP-1");
    assert_eq!(first.description, "left monitor");
    assert_eq!((first.x, first.y), (0, 0));
    assert_eq!((first.width, first.height), (1920, 1080));

    let second = capture.resolve(2).unwrap();
    assert_eq!(second.name, "HDMI-A-1");
    assert_eq!((second.x, second.y), (1920, 0));
    assert_eq!((second.width, second.height), (2560, 1440));
}

#[test]
fn missing_output_geometry_manager_is_fatal() {
    let config = MockConfig {
        with_xdg_output: false,
        ..two_output_config()
    };
    let (_mock, mut capture) = connect(config);
    capture.bind_globals().unwrap();
    match capture.verify_support() {
        Err(CaptureError::CapabilityMissing(Capability::OutputGeometry)) => {}
        other => panic!("expected missing output-geometry capability, got {other:?}"),
    }
}

#[test]
fn missing_shm_is_fatal() {
    let config = MockConfig {
        with_shm: false,
        ..two_output_config()
    };
    let (_mock, mut capture) = connect(config);
    capture.bind_globals().unwrap();
    match capture.verify_support() {
        Err(CaptureError::CapabilityMissing(Capability::SharedMemory)) => {}
        other => panic!("expected missing shm capability, got {other:?}"),
    }
}

#[test]
fn no_outputs_is_fatal() {
    let config = MockConfig {
        outputs: Vec::new(),
        ..Default::default()
    };
    let (_mock, mut capture) = connect(config);
    capture.bind_globals().unwrap();
    match capture.verify_support() {
        Err(CaptureError::CapabilityMissing(Capability::Output)) => {}
        other => panic!("expected missing output capability, got {other:?}"),
    }
}

#[test]
fn resolve_rejects_out_of_range_ordinals() {
    let (_mock, capture) = prepared(two_output_config());

    assert!(matches!(
        capture.resolve(0),
        Err(CaptureError::OutOfRange { index: 0, count: 2 })
    ));
    assert!(matches!(
        capture.resolve(3),
        Err(CaptureError::OutOfRange { index: 3, count: 2 })
    ));
    assert!(capture.resolve(1).is_ok());
    assert!(capture.resolve(2).is_ok());
}

#[test]
fn capture_produces_buffer_matching_requirements() {
    let (_mock, mut capture) = prepared(two_output_config());

    let frame = capture.capture_frame(1).expect("capture");
    assert_eq!(frame.width(), 800);
    assert_eq!(frame.height(), 600);
    assert_eq!(frame.stride(), 3200);
    assert_eq!(frame.bytes().len(), 3200 * 600);
    assert!(!frame.y_invert());
}

#[test]
fn y_invert_flag_is_reported() {
    let config = MockConfig {
        y_invert: true,
        ..two_output_config()
    };
    let (_mock, mut capture) = prepared(config);

    let frame = capture.capture_frame(1).expect("capture");
    assert!(frame.y_invert());
}

#[test]
fn v1_geometry_manager_omits_names_but_reports_geometry() {
    let config = MockConfig {
        xdg_output_version: 1,
        ..two_output_config()
    };
    let (_mock, capture) = prepared(config);

    let first = capture.resolve(1).unwrap();
    assert_eq!(first.name, "");
    assert_eq!(first.description, "");
    assert_eq!((first.x, first.y), (0, 0));
    assert_eq!((first.width, first.height), (1920, 1080));
}

#[test]
fn damage_request_degrades_on_a_v1_screencopy_manager() {
    let config = MockConfig {
        screencopy_version: 1,
        ..two_output_config()
    };
    let (_mock, mut capture) = prepared_with(config, true);

    // copy_with_damage does not exist at v1; the capture must fall back to
    // the plain copy request instead of dying on a protocol error.
    let frame = capture.capture_frame(1).expect("capture");
    assert_eq!(frame.bytes().len(), 3200 * 600);
}

#[test]
fn oversized_buffer_requirements_surface_as_allocation_failure() {
    let config = MockConfig {
        buffer: BufferSpec {
            width: 100_000,
            height: 100_000,
            stride: 400_000,
            ..Default::default()
        },
        ..two_output_config()
    };
    let (_mock, mut capture) = prepared(config);

    match capture.capture_frame(1) {
        Err(CaptureError::Allocation(msg)) => assert!(msg.contains("exceeds pool limit")),
        other => panic!("expected Allocation error, got {:?}", other.map(|_| ())),
    }

    // The failure left nothing outstanding, so the next attempt runs the
    // buffer handshake again instead of tripping the in-flight asserts.
    match capture.capture_frame(1) {
        Err(CaptureError::Allocation(_)) => {}
        other => panic!("expected Allocation error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn compositor_failure_surfaces_as_capture_failed() {
    let config = MockConfig {
        reply: CopyReply::Failed,
        ..two_output_config()
    };
    let (_mock, mut capture) = prepared(config);

    match capture.capture_frame(1) {
        Err(CaptureError::CaptureFailed) => {}
        other => panic!("expected CaptureFailed, got {:?}", other.map(|_| ())),
    }

    // The failed attempt left nothing outstanding, so the next capture is
    // free to run the buffer handshake again.
    match capture.capture_frame(2) {
        Err(CaptureError::CaptureFailed) => {}
        other => panic!("expected CaptureFailed, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn sequential_captures_release_previous_buffers() {
    let (_mock, mut capture) = prepared(two_output_config());

    for _ in 0..4 {
        let frame = capture.capture_frame(1).expect("capture");
        assert_eq!(frame.bytes().len(), 3200 * 600);
        // Dropping the frame destroys its wl_buffer and mapping before the
        // next allocation is requested.
        drop(frame);
    }
}

#[test]
#[should_panic(expected = "outstanding")]
fn duplicate_buffer_requirements_violate_contract() {
    let config = MockConfig {
        duplicate_buffer_event: true,
        ..two_output_config()
    };
    let (_mock, mut capture) = prepared(config);
    let _ = capture.capture_frame(1);
}
