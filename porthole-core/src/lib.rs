//! Porthole Core - Codec detection and browser-safe video preparation
//!
//! This crate provides the fundamental building blocks for serving session
//! videos to a browser viewer: structural codec sniffing for AVI and
//! MP4/MOV containers, the browser compatibility policy, the shared
//! transcode cache that re-encodes unplayable bitstreams to H.264/MP4, and
//! configuration management.

pub mod config;
pub mod media;
pub mod source;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::PortholeConfig;
pub use media::{MediaError, TranscodeCache, TranscodeError, detect_codec, is_browser_compatible};
pub use source::{SessionManifest, SourceLocation, VideoSource};

/// Core errors that can bubble up from any Porthole subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PortholeError {
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PortholeError>;
