//! Codec detection against on-disk container files.
//!
//! The unit tests cover parsing; these cover the file-window mechanics:
//! metadata beyond the header window, tail windows that start mid-box,
//! and the unknown-format contract.

use porthole_core::media::fixtures::{
    MoovPlacement, synthetic_avi, synthetic_mp4, synthetic_mp4_with_mdat,
};
use porthole_core::media::{detect_codec, is_browser_compatible};

#[test]
fn test_avi_fourcc_round_trips_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("camera.avi");
    std::fs::write(&path, synthetic_avi(b"MJPG")).unwrap();

    let codec = detect_codec(&path);
    assert_eq!(codec.as_deref(), Some("MJPG"));
    assert!(!is_browser_compatible(codec.as_deref()));
}

#[test]
fn test_mp4_front_loaded_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("front.mp4");
    std::fs::write(&path, synthetic_mp4(b"avc1", MoovPlacement::Front)).unwrap();

    let codec = detect_codec(&path);
    assert_eq!(codec.as_deref(), Some("avc1"));
    assert!(is_browser_compatible(codec.as_deref()));
}

#[test]
fn test_mp4_metadata_just_past_header_window() {
    // mdat slightly larger than the 32 KiB header window: moov is only
    // reachable through the tail window, which here covers the whole file.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("end.mp4");
    std::fs::write(
        &path,
        synthetic_mp4_with_mdat(b"mp4v", MoovPlacement::End, 48 * 1024),
    )
    .unwrap();

    assert_eq!(detect_codec(&path).as_deref(), Some("mp4v"));
}

#[test]
fn test_mp4_metadata_behind_misaligned_tail_window() {
    // A media payload larger than the tail window (8 x 32 KiB) makes the
    // tail start inside mdat, so box walking cannot line up and the byte
    // scan has to find the trailing moov.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.mp4");
    std::fs::write(
        &path,
        synthetic_mp4_with_mdat(b"mp4v", MoovPlacement::End, 300 * 1024),
    )
    .unwrap();

    assert_eq!(detect_codec(&path).as_deref(), Some("mp4v"));
}

#[test]
fn test_non_container_files_yield_none() {
    let dir = tempfile::tempdir().unwrap();

    let text = dir.path().join("notes.txt");
    std::fs::write(&text, b"just some words\n").unwrap();
    assert_eq!(detect_codec(&text), None);

    let noise = dir.path().join("noise.bin");
    let bytes: Vec<u8> = (0..4096u32).map(|i| (i.wrapping_mul(2654435761) >> 24) as u8).collect();
    std::fs::write(&noise, bytes).unwrap();
    assert_eq!(detect_codec(&noise), None);
}

#[test]
fn test_unknown_format_is_not_blocked() {
    assert!(is_browser_compatible(None));
}
