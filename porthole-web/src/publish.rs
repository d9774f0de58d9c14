//! Publishing pipeline: from discovered sources to playable URLs.
//!
//! Local files are sniffed, re-encoded when the browser cannot play them,
//! and served from a per-directory loopback origin. Remote URLs pass
//! through untouched — a remote host already speaks HTTP and answers
//! range requests itself.

use std::path::Path;
use std::sync::Arc;

use porthole_core::config::MediaConfig;
use porthole_core::media::{MediaError, TranscodeCache, TranscodeError, validate_codec};
use porthole_core::source::{SourceLocation, VideoSource};
use serde::Serialize;

use crate::registry::{ServeError, ServerRegistry};

/// Errors from publishing a video source.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Serve(#[from] ServeError),

    #[error("cannot serve {path}: no parent directory or file name")]
    UnservablePath { path: String },

    #[error("transcode task failed: {reason}")]
    TranscodeTask { reason: String },
}

/// A video ready for the viewer.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedVideo {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<f64>>,
}

/// Turns [`VideoSource`]s into playable URLs through a shared transcode
/// cache and server registry.
pub struct VideoPublisher {
    registry: Arc<ServerRegistry>,
    cache: Arc<TranscodeCache>,
    media: MediaConfig,
}

impl VideoPublisher {
    pub fn new(
        registry: Arc<ServerRegistry>,
        cache: Arc<TranscodeCache>,
        media: MediaConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            media,
        }
    }

    /// Publish one source, returning its viewer-facing URL.
    ///
    /// May block (on a worker thread) for the duration of a transcode when
    /// the source needs re-encoding and is not cached yet.
    ///
    /// # Errors
    /// - `PublishError::Media` - Incompatible codec with transcoding off
    /// - `PublishError::Transcode` - Source unreadable or re-encode failed
    /// - `PublishError::Serve` - Origin could not be created
    pub async fn publish(&self, source: &VideoSource) -> Result<PublishedVideo, PublishError> {
        let url = match &source.location {
            SourceLocation::Url(url) => url.clone(),
            SourceLocation::Path(path) => self.publish_local(path).await?,
        };
        Ok(PublishedVideo {
            name: source.name.clone(),
            url,
            timestamps: source.timestamps.clone(),
        })
    }

    /// Publish a whole session's sources, preserving order.
    pub async fn publish_all(
        &self,
        sources: &[VideoSource],
    ) -> Result<Vec<PublishedVideo>, PublishError> {
        let mut published = Vec::with_capacity(sources.len());
        for source in sources {
            published.push(self.publish(source).await?);
        }
        Ok(published)
    }

    async fn publish_local(&self, path: &Path) -> Result<String, PublishError> {
        let playable = if self.media.transcode_incompatible {
            let cache = Arc::clone(&self.cache);
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || cache.ensure_browser_compatible(&path))
                .await
                .map_err(|error| PublishError::TranscodeTask {
                    reason: error.to_string(),
                })??
        } else {
            validate_codec(path)?;
            tokio::fs::canonicalize(path)
                .await
                .map_err(|source| TranscodeError::Io {
                    operation: format!("resolving {}", path.display()),
                    source,
                })?
        };

        let directory = playable
            .parent()
            .ok_or_else(|| PublishError::UnservablePath {
                path: playable.display().to_string(),
            })?;
        let port = self.registry.ensure_server_for(directory).await?;

        let filename = playable
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| PublishError::UnservablePath {
                path: playable.display().to_string(),
            })?;
        Ok(format!(
            "http://127.0.0.1:{port}/{}",
            urlencoding::encode(&filename)
        ))
    }
}

#[cfg(test)]
mod tests {
    use porthole_core::config::{CacheConfig, ServerConfig};
    use porthole_core::media::fixtures::{MoovPlacement, synthetic_avi, synthetic_mp4};

    use super::*;

    fn publisher(cache_dir: &Path, transcode: bool) -> VideoPublisher {
        VideoPublisher::new(
            Arc::new(ServerRegistry::new(ServerConfig::default())),
            Arc::new(TranscodeCache::at(
                cache_dir.to_path_buf(),
                CacheConfig::default().fingerprint_length,
            )),
            MediaConfig {
                transcode_incompatible: transcode,
            },
        )
    }

    fn source(name: &str, location: SourceLocation) -> VideoSource {
        VideoSource {
            name: name.to_string(),
            location,
            timestamps: None,
        }
    }

    #[tokio::test]
    async fn test_remote_url_passes_through_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path(), true);
        let remote = "https://example.org/data/body.mp4?versionId=abc";

        let published = publisher
            .publish(&source("body", SourceLocation::Url(remote.to_string())))
            .await
            .unwrap();
        assert_eq!(published.url, remote);
        assert_eq!(published.name, "body");
    }

    #[tokio::test]
    async fn test_compatible_local_file_gets_loopback_url() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("left.mp4");
        std::fs::write(&video, synthetic_mp4(b"avc1", MoovPlacement::Front)).unwrap();

        let publisher = publisher(dir.path(), true);
        let published = publisher
            .publish(&source("left", SourceLocation::Path(video)))
            .await
            .unwrap();

        assert!(published.url.starts_with("http://127.0.0.1:"));
        assert!(published.url.ends_with("/left.mp4"));
    }

    #[tokio::test]
    async fn test_filename_is_url_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("left camera.mp4");
        std::fs::write(&video, synthetic_mp4(b"avc1", MoovPlacement::Front)).unwrap();

        let publisher = publisher(dir.path(), true);
        let published = publisher
            .publish(&source("left", SourceLocation::Path(video)))
            .await
            .unwrap();
        assert!(published.url.ends_with("/left%20camera.mp4"));
    }

    #[tokio::test]
    async fn test_incompatible_file_without_transcoding_reports_remediation() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("old.avi");
        std::fs::write(&video, synthetic_avi(b"MJPG")).unwrap();

        let publisher = publisher(dir.path(), false);
        let error = publisher
            .publish(&source("old", SourceLocation::Path(video)))
            .await
            .unwrap_err();

        let message = error.to_string();
        assert!(message.contains("MJPG"));
        assert!(message.contains("old.avi"));
        assert!(message.contains("ffmpeg -i"));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path(), true);

        let result = publisher
            .publish(&source(
                "ghost",
                SourceLocation::Path(dir.path().join("missing.mp4")),
            ))
            .await;
        assert!(matches!(result, Err(PublishError::Transcode(_))));
    }

    #[tokio::test]
    async fn test_timestamps_ride_along() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path(), true);

        let mut video = source("cam", SourceLocation::Url("https://example.org/v.mp4".into()));
        video.timestamps = Some(vec![0.0, 0.5, 1.0]);
        let published = publisher.publish(&video).await.unwrap();
        assert_eq!(published.timestamps.as_deref(), Some(&[0.0, 0.5, 1.0][..]));
    }
}
