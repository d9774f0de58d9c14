//! Centralized configuration for Porthole.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

/// Central configuration for all Porthole components.
///
/// Groups related configuration settings into logical sections.
#[derive(Debug, Clone, Default)]
pub struct PortholeConfig {
    pub media: MediaConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
}

/// Media preparation configuration.
///
/// Controls how local video files are turned into browser-playable ones.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Re-encode incompatible bitstreams instead of failing with a
    /// remediation message
    pub transcode_incompatible: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            transcode_incompatible: true,
        }
    }
}

/// Transcode cache configuration.
///
/// Artifacts live in a fixed subdirectory of the platform temp directory
/// so separate invocations share the same cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Subdirectory of the platform temp directory holding artifacts
    pub cache_subdir: &'static str,
    /// Number of hex characters of the path digest used in artifact names
    pub fingerprint_length: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_subdir: "porthole_media",
            fingerprint_length: 8,
        }
    }
}

impl CacheConfig {
    /// Resolved cache directory under the platform temp directory.
    pub fn cache_dir(&self) -> PathBuf {
        std::env::temp_dir().join(self.cache_subdir)
    }
}

/// File origin server configuration.
///
/// Origins bind loopback-only; the viewer is always a browser running on
/// the same machine.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How long browsers may cache a CORS preflight response
    pub preflight_max_age: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            preflight_max_age: Duration::from_secs(86400), // 24 hours
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_sections() {
        let config = PortholeConfig::default();
        assert!(config.media.transcode_incompatible);
        assert_eq!(config.cache.fingerprint_length, 8);
        assert_eq!(config.server.preflight_max_age, Duration::from_secs(86400));
    }

    #[test]
    fn test_cache_dir_is_under_temp() {
        let config = CacheConfig::default();
        assert!(config.cache_dir().starts_with(std::env::temp_dir()));
        assert!(config.cache_dir().ends_with("porthole_media"));
    }
}
