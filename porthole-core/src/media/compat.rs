//! Browser compatibility policy for video codecs.
//!
//! A fixed membership test over the codecs every mainstream browser
//! decodes natively. Unknown containers fail open: a file we cannot
//! classify is never blocked.

use std::path::Path;

use super::MediaError;
use super::sniff::detect_codec;

/// Codec FourCCs browsers decode natively, in the spellings containers
/// actually use. Membership is exact; no prefix or fuzzy matching.
#[rustfmt::skip]
pub const BROWSER_COMPATIBLE_CODECS: &[&str] = &[
    "avc1", "AVC1", "h264", "H264",         // H.264
    "vp08", "vp8", "VP08", "VP8", "VP80",   // VP8
    "vp09", "vp9", "VP09", "VP9", "VP90",   // VP9
    "av01", "AV01",                         // AV1
];

/// Whether a browser's native decoder can play `codec`.
///
/// `None` (format unrecognized) is compatible: the policy never blocks
/// what the sniffer could not classify.
pub fn is_browser_compatible(codec: Option<&str>) -> bool {
    match codec {
        None => true,
        Some(codec) => BROWSER_COMPATIBLE_CODECS.contains(&codec),
    }
}

/// The literal shell command that re-encodes `path` into a playable
/// sibling file with an `_h264` suffix.
pub fn remediation_command(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let target = path.with_file_name(format!("{stem}_h264.mp4"));
    format!(
        "ffmpeg -i \"{}\" -c:v libx264 -pix_fmt yuv420p \"{}\"",
        path.display(),
        target.display()
    )
}

/// Check that `path` is browser playable as-is.
///
/// # Errors
/// `MediaError::IncompatibleCodec` naming the file, the detected codec,
/// and a copy-pasteable re-encode command.
pub fn validate_codec(path: &Path) -> Result<(), MediaError> {
    match detect_codec(path) {
        Some(codec) if !is_browser_compatible(Some(&codec)) => {
            Err(MediaError::IncompatibleCodec {
                path: path.to_path_buf(),
                remediation: remediation_command(path),
                codec,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::super::fixtures::{MoovPlacement, synthetic_avi, synthetic_mp4};
    use super::*;

    #[test]
    fn test_h264_spellings_are_compatible() {
        assert!(is_browser_compatible(Some("avc1")));
        assert!(is_browser_compatible(Some("h264")));
        assert!(is_browser_compatible(Some("H264")));
    }

    #[test]
    fn test_vp_and_av1_spellings_are_compatible() {
        assert!(is_browser_compatible(Some("vp09")));
        assert!(is_browser_compatible(Some("VP80")));
        assert!(is_browser_compatible(Some("av01")));
    }

    #[test]
    fn test_legacy_codecs_are_incompatible() {
        assert!(!is_browser_compatible(Some("mp4v")));
        assert!(!is_browser_compatible(Some("MJPG")));
        assert!(!is_browser_compatible(Some("hvc1")));
    }

    #[test]
    fn test_unknown_codec_fails_open() {
        assert!(is_browser_compatible(None));
    }

    #[test]
    fn test_membership_is_exact_not_prefix() {
        assert!(!is_browser_compatible(Some("avc1x")));
        assert!(!is_browser_compatible(Some("avc")));
    }

    #[test]
    fn test_validate_passes_compatible_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&synthetic_mp4(b"avc1", MoovPlacement::Front))
            .unwrap();
        assert!(validate_codec(file.path()).is_ok());
    }

    #[test]
    fn test_validate_passes_unrecognized_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a container").unwrap();
        assert!(validate_codec(file.path()).is_ok());
    }

    #[test]
    fn test_validate_rejects_mjpeg_with_remediation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&synthetic_avi(b"MJPG")).unwrap();

        let error = validate_codec(file.path()).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("MJPG"));
        assert!(message.contains(&file.path().display().to_string()));
        assert!(message.contains("ffmpeg -i"));
        assert!(message.contains("-pix_fmt yuv420p"));
        assert!(message.contains("_h264.mp4"));
    }
}
