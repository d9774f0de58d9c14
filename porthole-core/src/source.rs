//! Video source model shared with the discovery layer.
//!
//! Discovery — reading a session's data file and resolving which videos it
//! references — happens outside this crate. It hands over logical names
//! with local paths or remote URLs, plus optional explicit frame
//! timestamps for the viewer's playback sync.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One logical video supplied by the discovery layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSource {
    /// Logical stream name, e.g. "VideoLeftCamera"
    pub name: String,
    #[serde(flatten)]
    pub location: SourceLocation,
    /// Explicit frame timestamps in seconds, when the producer has them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<f64>>,
}

/// Where a video's bytes live.
///
/// Remote sources are handed to the viewer untouched; only local files go
/// through sniffing, transcoding, and the loopback origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLocation {
    Path(PathBuf),
    Url(String),
}

/// The full set of videos for one recording session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionManifest {
    pub videos: Vec<VideoSource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_with_local_path() {
        let manifest: SessionManifest = serde_json::from_str(
            r#"{ "videos": [ { "name": "VideoLeftCamera", "path": "/data/left.avi" } ] }"#,
        )
        .unwrap();

        assert_eq!(manifest.videos.len(), 1);
        let video = &manifest.videos[0];
        assert_eq!(video.name, "VideoLeftCamera");
        assert!(matches!(
            &video.location,
            SourceLocation::Path(path) if path == &PathBuf::from("/data/left.avi")
        ));
        assert_eq!(video.timestamps, None);
    }

    #[test]
    fn test_manifest_with_remote_url_and_timestamps() {
        let manifest: SessionManifest = serde_json::from_str(
            r#"{ "videos": [ {
                "name": "VideoBodyCamera",
                "url": "https://example.org/session/body.mp4",
                "timestamps": [0.0, 0.033, 0.066]
            } ] }"#,
        )
        .unwrap();

        let video = &manifest.videos[0];
        assert!(matches!(
            &video.location,
            SourceLocation::Url(url) if url == "https://example.org/session/body.mp4"
        ));
        assert_eq!(video.timestamps.as_deref(), Some(&[0.0, 0.033, 0.066][..]));
    }

    #[test]
    fn test_manifest_round_trip() {
        let manifest = SessionManifest {
            videos: vec![VideoSource {
                name: "cam".to_string(),
                location: SourceLocation::Path(PathBuf::from("/tmp/cam.mp4")),
                timestamps: None,
            }],
        };

        let text = serde_json::to_string(&manifest).unwrap();
        assert!(text.contains("\"path\""));
        assert!(!text.contains("timestamps"));
        let parsed: SessionManifest = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.videos.len(), 1);
    }
}
