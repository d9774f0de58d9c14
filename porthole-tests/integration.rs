//! Integration tests for Porthole
//!
//! These tests exercise the crates together the way the CLI wires them:
//! codec detection against crafted container files, the transcode cache's
//! idempotence guarantees, and live loopback origins driven by a real
//! HTTP client.

#[path = "integration/codec_detection.rs"]
mod codec_detection;

#[path = "integration/range_origin.rs"]
mod range_origin;

#[path = "integration/transcode_cache.rs"]
mod transcode_cache;

#[path = "integration/publish_flow.rs"]
mod publish_flow;
