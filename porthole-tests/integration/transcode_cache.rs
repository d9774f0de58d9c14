//! Transcode cache behavior across cache instances.
//!
//! Artifact paths are pure functions of the resolved source path, so a
//! fresh cache instance (a "new process") must agree with an old one and
//! must reuse artifacts it finds on disk without rewriting them.

use std::path::Path;

use porthole_core::config::CacheConfig;
use porthole_core::media::TranscodeCache;
use porthole_core::media::fixtures::{MoovPlacement, synthetic_mp4};

fn cache_at(dir: &Path) -> TranscodeCache {
    TranscodeCache::at(
        dir.join("cache"),
        CacheConfig::default().fingerprint_length,
    )
}

#[test]
fn test_artifact_paths_agree_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let source = Path::new("/data/session9/VideoBodyCamera.avi");

    let first = cache_at(dir.path()).artifact_path_for(source);
    let second = cache_at(dir.path()).artifact_path_for(source);
    assert_eq!(first, second);
}

#[test]
fn test_seeded_artifact_survives_cache_restart_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("clip.mp4");
    std::fs::write(&source, synthetic_mp4(b"mp4v", MoovPlacement::Front)).unwrap();
    let resolved = std::fs::canonicalize(&source).unwrap();

    // Seed the artifact as if an earlier process transcoded it.
    let artifact = cache_at(dir.path()).artifact_path_for(&resolved);
    std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
    std::fs::write(&artifact, b"transcoded bytes").unwrap();
    let mtime = std::fs::metadata(&artifact).unwrap().modified().unwrap();

    // A brand-new cache instance must find and return it, twice, without
    // touching the file.
    let cache = cache_at(dir.path());
    assert_eq!(cache.ensure_browser_compatible(&source).unwrap(), artifact);
    assert_eq!(cache.ensure_browser_compatible(&source).unwrap(), artifact);
    assert_eq!(
        std::fs::metadata(&artifact).unwrap().modified().unwrap(),
        mtime
    );
    assert_eq!(std::fs::read(&artifact).unwrap(), b"transcoded bytes");
}

#[test]
fn test_compatible_source_never_touches_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("good.mp4");
    std::fs::write(&source, synthetic_mp4(b"avc1", MoovPlacement::Front)).unwrap();

    let cache = cache_at(dir.path());
    let result = cache.ensure_browser_compatible(&source).unwrap();
    assert_eq!(result, std::fs::canonicalize(&source).unwrap());
    assert!(!dir.path().join("cache").exists());
}
