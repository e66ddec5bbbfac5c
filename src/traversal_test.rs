// Unit tests for traversal helpers

use super::*;
use crate::targets::StateKind;
use crate::types::{MOBILE, Theme};
use std::io::Cursor;
use tempfile::TempDir;

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([30, 60, 90, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn test_encode_jpeg_keeps_dimensions() {
    let jpeg = encode_jpeg(&png(40, 20), 80).unwrap();

    // SOI marker
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 20));
}

#[test]
fn test_encode_jpeg_quality_changes_size() {
    let img = image::RgbImage::from_fn(64, 64, |x, y| image::Rgb([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8]));
    let mut source = Vec::new();
    img.write_to(&mut Cursor::new(&mut source), image::ImageOutputFormat::Png)
        .unwrap();

    let low = encode_jpeg(&source, 10).unwrap();
    let high = encode_jpeg(&source, 95).unwrap();
    assert!(low.len() < high.len());
}

#[test]
fn test_encode_jpeg_rejects_empty_and_garbage() {
    let err = encode_jpeg(&[], 80).unwrap_err();
    assert!(err.to_string().contains("no image data"));
    assert!(!err.is_fatal());

    assert!(encode_jpeg(b"definitely not a png", 80).is_err());
}

#[test]
fn test_verify_file() {
    let temp_dir = TempDir::new().unwrap();

    let written = temp_dir.path().join("shot.jpg");
    std::fs::write(&written, [0xFF, 0xD8, 0xFF]).unwrap();
    assert_eq!(
        verify_file(&written).unwrap(),
        CaptureOutcome::Success {
            path: written.clone(),
            bytes: 3
        }
    );

    let empty = temp_dir.path().join("empty.jpg");
    std::fs::write(&empty, b"").unwrap();
    let outcome = verify_file(&empty).unwrap();
    assert!(matches!(outcome, CaptureOutcome::Failure { ref reason } if reason.starts_with("file is empty")));

    let missing = temp_dir.path().join("missing.jpg");
    let outcome = verify_file(&missing).unwrap();
    assert!(matches!(outcome, CaptureOutcome::Failure { ref reason } if reason.starts_with("file not created")));
}

#[test]
fn test_screenshot_naming() {
    assert_eq!(
        screenshot_file_name(0, "home_default", "desktop_dark"),
        "0001_home_default_desktop_dark.jpg"
    );
    assert_eq!(
        screenshot_file_name(33, "modal_movienight", "mobile_light"),
        "0034_modal_movienight_mobile_light.jpg"
    );

    let target = TargetState::new("modal_logs", StateKind::Modal, "LOGS");
    let bp = Breakpoint::new("mobile_dark", MOBILE, Theme::Dark);
    assert_eq!(
        screenshot_path(Path::new("out"), 3, &target, &bp),
        PathBuf::from("out/mobile_dark/0004_modal_logs_mobile_dark.jpg")
    );
}

#[test]
fn test_display_relative() {
    assert_eq!(
        display_relative(Path::new("/out/desktop_dark/a.jpg"), Path::new("/out")),
        "desktop_dark/a.jpg"
    );
    assert_eq!(display_relative(Path::new("elsewhere/a.jpg"), Path::new("/out")), "elsewhere/a.jpg");
}
