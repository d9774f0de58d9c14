//! Shared on-disk cache of browser-safe transcodes.
//!
//! Sources that fail the compatibility policy are re-encoded once to
//! H.264/yuv420p in an MP4 container, into a fixed temp-dir cache keyed by
//! a digest of the resolved source path. Existence on disk is the entire
//! cache-hit check: artifacts are never rewritten and never evicted, and
//! the deterministic naming makes hits survive process restarts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ffmpeg_next as ffmpeg;
use parking_lot::Mutex;
use sha1::{Digest, Sha1};

use super::compat::is_browser_compatible;
use super::sniff::detect_codec;
use crate::config::CacheConfig;

/// Errors from the transcode pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("no video stream in {}", .path.display())]
    NoVideoStream { path: PathBuf },

    #[error("H.264 encoder not available in the linked FFmpeg build")]
    EncoderUnavailable,

    #[error("FFmpeg error while {operation}: {source}")]
    Ffmpeg {
        operation: &'static str,
        #[source]
        source: ffmpeg::Error,
    },

    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

/// Cache of H.264/MP4 artifacts for sources browsers cannot play.
///
/// Construct one per process and share it via `Arc`. Artifact paths are
/// derived purely from the resolved source path, so independent processes
/// pointed at the same cache directory reuse each other's work.
pub struct TranscodeCache {
    cache_dir: PathBuf,
    fingerprint_length: usize,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TranscodeCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::at(config.cache_dir(), config.fingerprint_length)
    }

    /// Cache rooted at an explicit directory, mainly for tests.
    pub fn at(cache_dir: PathBuf, fingerprint_length: usize) -> Self {
        Self {
            cache_dir,
            fingerprint_length,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a path the browser can play for `path`.
    ///
    /// Compatible sources come back unchanged (resolved absolute).
    /// Incompatible ones are served from the cache, transcoding first if
    /// the artifact does not exist yet. Blocks the calling thread for the
    /// duration of a transcode; async callers should wrap this in
    /// `spawn_blocking`.
    ///
    /// # Errors
    /// - `TranscodeError::Io` - Source unresolvable or cache not writable
    /// - `TranscodeError::NoVideoStream` - Source has no video track
    /// - `TranscodeError::Ffmpeg` - Decode or encode failure; no partial
    ///   artifact is left behind
    pub fn ensure_browser_compatible(&self, path: &Path) -> Result<PathBuf, TranscodeError> {
        let source = std::fs::canonicalize(path).map_err(|source| TranscodeError::Io {
            operation: format!("resolving {}", path.display()),
            source,
        })?;

        let codec = detect_codec(&source);
        if is_browser_compatible(codec.as_deref()) {
            return Ok(source);
        }

        let fingerprint = self.fingerprint(&source);
        let artifact = self.artifact_path(&source, &fingerprint);

        // Serialize first-time transcodes per fingerprint; requests for
        // distinct sources proceed in parallel. Races with other
        // processes remain last-writer-wins.
        let gate = {
            let mut in_flight = self.in_flight.lock();
            Arc::clone(in_flight.entry(fingerprint).or_default())
        };
        let _guard = gate.lock();

        if artifact.exists() {
            tracing::debug!(artifact = %artifact.display(), "transcode cache hit");
            return Ok(artifact);
        }

        std::fs::create_dir_all(&self.cache_dir).map_err(|source| TranscodeError::Io {
            operation: format!("creating cache directory {}", self.cache_dir.display()),
            source,
        })?;

        tracing::info!(
            source = %source.display(),
            codec = codec.as_deref().unwrap_or("unknown"),
            artifact = %artifact.display(),
            "transcoding to H.264"
        );

        // Encode into a scratch name and rename into place so a failure
        // never leaves a half-written artifact where the existence check
        // would find it.
        let scratch = artifact.with_extension("mp4.part");
        if let Err(error) = transcode_to_h264(&source, &scratch) {
            let _ = std::fs::remove_file(&scratch);
            return Err(error);
        }
        std::fs::rename(&scratch, &artifact).map_err(|source| TranscodeError::Io {
            operation: format!("publishing artifact {}", artifact.display()),
            source,
        })?;

        Ok(artifact)
    }

    /// Artifact path `path` would map to, whether or not it exists.
    pub fn artifact_path_for(&self, path: &Path) -> PathBuf {
        let fingerprint = self.fingerprint(path);
        self.artifact_path(path, &fingerprint)
    }

    fn fingerprint(&self, source: &Path) -> String {
        let digest = Sha1::digest(source.to_string_lossy().as_bytes());
        let hex = hex::encode(digest);
        hex[..self.fingerprint_length.min(hex.len())].to_string()
    }

    fn artifact_path(&self, source: &Path, fingerprint: &str) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        self.cache_dir.join(format!("{stem}_{fingerprint}_h264.mp4"))
    }
}

/// Full decode / re-encode pass from `input` to an H.264/yuv420p MP4 at
/// `output`, preserving the source's dimensions and average frame rate.
/// Frame timestamps are reassigned from a running counter so the encoder
/// owns pacing.
fn transcode_to_h264(input: &Path, output: &Path) -> Result<(), TranscodeError> {
    ffmpeg::init().map_err(|source| ff("initializing FFmpeg", source))?;

    let mut ictx =
        ffmpeg::format::input(input).map_err(|source| ff("opening source file", source))?;
    let input_stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| TranscodeError::NoVideoStream {
            path: input.to_path_buf(),
        })?;
    let stream_index = input_stream.index();

    let frame_rate = {
        let rate = input_stream.avg_frame_rate();
        if rate.numerator() > 0 {
            rate
        } else {
            tracing::debug!(path = %input.display(), "source frame rate unknown, assuming 30 fps");
            ffmpeg::Rational::new(30, 1)
        }
    };

    let decoder_context =
        ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .map_err(|source| ff("reading source codec parameters", source))?;
    let mut decoder = decoder_context
        .decoder()
        .video()
        .map_err(|source| ff("opening source decoder", source))?;

    // The scratch file carries a non-.mp4 suffix until the rename, so the
    // muxer is named explicitly rather than inferred from the extension.
    let mut octx = ffmpeg::format::output_as(output, "mp4")
        .map_err(|source| ff("creating MP4 container", source))?;
    let codec =
        ffmpeg::encoder::find(ffmpeg::codec::Id::H264).ok_or(TranscodeError::EncoderUnavailable)?;
    let global_header = octx
        .format()
        .flags()
        .contains(ffmpeg::format::flag::Flags::GLOBAL_HEADER);

    let mut output_stream = octx
        .add_stream(codec)
        .map_err(|source| ff("adding output stream", source))?;
    let ost_index = output_stream.index();

    let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .map_err(|source| ff("creating H.264 encoder", source))?;
    encoder.set_width(decoder.width());
    encoder.set_height(decoder.height());
    encoder.set_format(ffmpeg::format::Pixel::YUV420P);
    encoder.set_frame_rate(Some(frame_rate));
    encoder.set_time_base(frame_rate.invert());
    if global_header {
        encoder.set_flags(ffmpeg::codec::flag::Flags::GLOBAL_HEADER);
    }

    let encoder = encoder
        .open()
        .map_err(|source| ff("opening H.264 encoder", source))?;
    output_stream.set_parameters(&encoder);
    let encoder_time_base = frame_rate.invert();

    octx.write_header()
        .map_err(|source| ff("writing container header", source))?;
    let stream_time_base = octx
        .stream(ost_index)
        .map(|stream| stream.time_base())
        .unwrap_or(encoder_time_base);

    let scaler = ffmpeg::software::scaling::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg::format::Pixel::YUV420P,
        decoder.width(),
        decoder.height(),
        ffmpeg::software::scaling::Flags::BILINEAR,
    )
    .map_err(|source| ff("creating pixel format converter", source))?;

    let mut pipeline = FramePipeline {
        scaler,
        encoder,
        encoder_time_base,
        stream_time_base,
        ost_index,
        next_pts: 0,
    };

    for (stream, packet) in ictx.packets() {
        if stream.index() != stream_index {
            continue;
        }
        decoder
            .send_packet(&packet)
            .map_err(|source| ff("decoding source packet", source))?;
        pipeline.drain_decoder(&mut decoder, &mut octx)?;
    }

    decoder
        .send_eof()
        .map_err(|source| ff("flushing decoder", source))?;
    pipeline.drain_decoder(&mut decoder, &mut octx)?;

    pipeline
        .encoder
        .send_eof()
        .map_err(|source| ff("flushing encoder", source))?;
    pipeline.drain_encoder(&mut octx)?;

    octx.write_trailer()
        .map_err(|source| ff("finalizing container", source))?;
    Ok(())
}

/// Decoded-frame to muxed-packet stage of the transcode.
struct FramePipeline {
    scaler: ffmpeg::software::scaling::Context,
    encoder: ffmpeg::encoder::Video,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    ost_index: usize,
    next_pts: i64,
}

impl FramePipeline {
    fn drain_decoder(
        &mut self,
        decoder: &mut ffmpeg::decoder::Video,
        octx: &mut ffmpeg::format::context::Output,
    ) -> Result<(), TranscodeError> {
        let mut decoded = ffmpeg::frame::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let mut converted = ffmpeg::frame::Video::empty();
            self.scaler
                .run(&decoded, &mut converted)
                .map_err(|source| ff("converting frame to yuv420p", source))?;
            converted.set_pts(Some(self.next_pts));
            self.next_pts += 1;
            self.encoder
                .send_frame(&converted)
                .map_err(|source| ff("encoding frame", source))?;
            self.drain_encoder(octx)?;
        }
        Ok(())
    }

    fn drain_encoder(
        &mut self,
        octx: &mut ffmpeg::format::context::Output,
    ) -> Result<(), TranscodeError> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.ost_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(octx)
                .map_err(|source| ff("writing encoded packet", source))?;
        }
        Ok(())
    }
}

fn ff(operation: &'static str, source: ffmpeg::Error) -> TranscodeError {
    TranscodeError::Ffmpeg { operation, source }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::super::fixtures::{MoovPlacement, synthetic_mp4};
    use super::*;

    fn cache_in(dir: &tempfile::TempDir) -> TranscodeCache {
        TranscodeCache::at(dir.path().join("cache"), 8)
    }

    #[test]
    fn test_compatible_source_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, synthetic_mp4(b"avc1", MoovPlacement::Front)).unwrap();

        let cache = cache_in(&dir);
        let result = cache.ensure_browser_compatible(&source).unwrap();
        assert_eq!(result, std::fs::canonicalize(&source).unwrap());
        assert!(!cache.artifact_path_for(&source).exists());
    }

    #[test]
    fn test_unknown_container_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        std::fs::write(&source, b"plain text, not media").unwrap();

        let cache = cache_in(&dir);
        let result = cache.ensure_browser_compatible(&source).unwrap();
        assert_eq!(result, std::fs::canonicalize(&source).unwrap());
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        let error = cache
            .ensure_browser_compatible(&dir.path().join("absent.avi"))
            .unwrap_err();
        assert!(matches!(error, TranscodeError::Io { .. }));
    }

    #[test]
    fn test_existing_artifact_short_circuits_transcode() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        // mp4v is not browser playable, so the cache path is consulted.
        std::fs::write(&source, synthetic_mp4(b"mp4v", MoovPlacement::Front)).unwrap();

        let cache = cache_in(&dir);
        let artifact = cache.artifact_path_for(&std::fs::canonicalize(&source).unwrap());
        std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        let mut file = std::fs::File::create(&artifact).unwrap();
        file.write_all(b"pre-existing artifact").unwrap();
        drop(file);
        let mtime_before = std::fs::metadata(&artifact).unwrap().modified().unwrap();

        let first = cache.ensure_browser_compatible(&source).unwrap();
        let second = cache.ensure_browser_compatible(&source).unwrap();
        assert_eq!(first, artifact);
        assert_eq!(second, artifact);

        // Hitting the cache must not rewrite the artifact.
        let mtime_after = std::fs::metadata(&artifact).unwrap().modified().unwrap();
        assert_eq!(mtime_before, mtime_after);
        assert_eq!(
            std::fs::read(&artifact).unwrap(),
            b"pre-existing artifact".to_vec()
        );
    }

    #[test]
    fn test_artifact_naming() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        let artifact = cache.artifact_path_for(Path::new("/data/session1/VideoLeftCamera.avi"));

        let name = artifact.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("VideoLeftCamera_"));
        assert!(name.ends_with("_h264.mp4"));
        // stem + '_' + 8 hex chars + "_h264.mp4"
        let fingerprint = &name["VideoLeftCamera_".len()..name.len() - "_h264.mp4".len()];
        assert_eq!(fingerprint.len(), 8);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_is_stable_and_path_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);

        let a1 = cache.artifact_path_for(Path::new("/data/a/video.avi"));
        let a2 = cache.artifact_path_for(Path::new("/data/a/video.avi"));
        let b = cache.artifact_path_for(Path::new("/data/b/video.avi"));

        assert_eq!(a1, a2);
        assert_ne!(a1, b); // same stem, different directory
    }
}
