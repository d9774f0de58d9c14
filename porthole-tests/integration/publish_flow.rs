//! End-to-end publish flow: manifest in, playable URLs out.

use std::sync::Arc;

use porthole_core::config::PortholeConfig;
use porthole_core::media::TranscodeCache;
use porthole_core::media::fixtures::{MoovPlacement, synthetic_mp4};
use porthole_core::source::SessionManifest;
use porthole_web::{ServerRegistry, VideoPublisher};

fn publisher(config: &PortholeConfig, cache_dir: std::path::PathBuf) -> VideoPublisher {
    VideoPublisher::new(
        Arc::new(ServerRegistry::new(config.server.clone())),
        Arc::new(TranscodeCache::at(
            cache_dir,
            config.cache.fingerprint_length,
        )),
        config.media.clone(),
    )
}

#[tokio::test]
async fn test_manifest_to_fetchable_urls() {
    let dir = tempfile::tempdir().unwrap();
    let left = synthetic_mp4(b"avc1", MoovPlacement::Front);
    let body = synthetic_mp4(b"avc1", MoovPlacement::Front);
    std::fs::write(dir.path().join("left.mp4"), &left).unwrap();
    std::fs::write(dir.path().join("body.mp4"), &body).unwrap();

    let manifest: SessionManifest = serde_json::from_str(&format!(
        r#"{{ "videos": [
            {{ "name": "VideoLeftCamera", "path": "{left}", "timestamps": [0.0, 0.04] }},
            {{ "name": "VideoBodyCamera", "path": "{body}" }},
            {{ "name": "VideoRemote", "url": "https://example.org/session/remote.mp4" }}
        ] }}"#,
        left = dir.path().join("left.mp4").display(),
        body = dir.path().join("body.mp4").display(),
    ))
    .unwrap();

    let config = PortholeConfig::default();
    let publisher = publisher(&config, dir.path().join("cache"));
    let published = publisher.publish_all(&manifest.videos).await.unwrap();

    assert_eq!(published.len(), 3);
    assert_eq!(published[0].name, "VideoLeftCamera");
    assert_eq!(published[0].timestamps.as_deref(), Some(&[0.0, 0.04][..]));
    assert_eq!(published[2].url, "https://example.org/session/remote.mp4");

    // Both local videos live in one directory, so they share one origin.
    let port_of = |url: &str| {
        url.strip_prefix("http://127.0.0.1:")
            .and_then(|rest| rest.split('/').next())
            .map(|port| port.to_string())
            .unwrap()
    };
    assert_eq!(port_of(&published[0].url), port_of(&published[1].url));

    // The published URL serves the exact file bytes.
    let fetched = reqwest::get(&published[0].url).await.unwrap();
    assert_eq!(fetched.status(), reqwest::StatusCode::OK);
    assert_eq!(&fetched.bytes().await.unwrap()[..], &left[..]);
}

#[tokio::test]
async fn test_published_file_supports_seeking() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = synthetic_mp4(b"avc1", MoovPlacement::Front);
    std::fs::write(dir.path().join("cam.mp4"), &bytes).unwrap();

    let manifest: SessionManifest = serde_json::from_str(&format!(
        r#"{{ "videos": [ {{ "name": "cam", "path": "{}" }} ] }}"#,
        dir.path().join("cam.mp4").display(),
    ))
    .unwrap();

    let config = PortholeConfig::default();
    let publisher = publisher(&config, dir.path().join("cache"));
    let published = publisher.publish_all(&manifest.videos).await.unwrap();

    let response = reqwest::Client::new()
        .get(&published[0].url)
        .header("Range", "bytes=8-15")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()["Content-Range"],
        format!("bytes 8-15/{}", bytes.len())
    );
    assert_eq!(&response.bytes().await.unwrap()[..], &bytes[8..16]);
}
