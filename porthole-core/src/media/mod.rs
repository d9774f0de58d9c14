//! Media inspection and browser-safe preparation.
//!
//! The sniffer identifies the primary video codec by walking container
//! structure directly, the policy decides whether a browser can decode it
//! natively, and the transcode cache re-encodes anything that fails the
//! policy into an H.264/MP4 artifact shared across invocations.

pub mod compat;
pub mod sniff;
pub mod transcode;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

use std::path::PathBuf;

pub use compat::{BROWSER_COMPATIBLE_CODECS, is_browser_compatible, validate_codec};
pub use sniff::{ContainerKind, VideoAsset, detect_codec};
pub use transcode::{TranscodeCache, TranscodeError};

/// Errors from media inspection and policy checks.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The detected codec is outside the browser-native set.
    #[error(
        "{} uses codec '{codec}', which browsers cannot decode natively. Re-encode it with: {remediation}",
        .path.display()
    )]
    IncompatibleCodec {
        path: PathBuf,
        codec: String,
        remediation: String,
    },
}
