//! Container codec sniffing for AVI and MP4/MOV files.
//!
//! Identifies the codec FourCC of a file's primary video track by walking
//! container structure directly: RIFF chunk lists for AVI, box headers for
//! ISO base media files. Only a header window (and, for end-loaded
//! metadata, a tail window) is ever read; no demuxing library is involved.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Bytes read from the start of a file for detection.
pub const HEADER_WINDOW_BYTES: usize = 32 * 1024;

/// Tail window size as a multiple of the header window, for files whose
/// metadata box was written at the end.
pub const TAIL_WINDOW_MULTIPLIER: u64 = 8;

/// Container family recognized by the sniffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// RIFF/AVI chunk container
    Avi,
    /// ISO base media file (MP4, MOV, M4V)
    IsoBmff,
    /// Signature not recognized
    Unknown,
}

/// A sniffed local video file.
///
/// Identity is the resolved absolute path. The struct is a snapshot:
/// nothing tracks the file changing afterwards, so callers re-sniff when
/// they have reason to believe it did.
#[derive(Debug, Clone)]
pub struct VideoAsset {
    pub path: PathBuf,
    pub container: ContainerKind,
    pub codec: Option<String>,
    pub size: u64,
}

impl VideoAsset {
    /// Sniff `path`, resolving it to an absolute path first.
    ///
    /// # Errors
    /// I/O errors opening or statting the file. Unrecognized content is
    /// not an error: `container` comes back `Unknown` and `codec` `None`.
    pub fn sniff(path: &Path) -> std::io::Result<Self> {
        let path = std::fs::canonicalize(path)?;
        let size = std::fs::metadata(&path)?.len();
        let container = detect_container(&path)?;
        let codec = detect_codec(&path);
        Ok(Self {
            path,
            container,
            codec,
            size,
        })
    }
}

/// Classify the container family from the file's first bytes.
fn detect_container(path: &Path) -> std::io::Result<ContainerKind> {
    let file = File::open(path)?;
    let mut signature = Vec::with_capacity(12);
    file.take(12).read_to_end(&mut signature)?;
    let signature = signature.as_slice();

    if signature.len() >= 12 && &signature[0..4] == b"RIFF" && &signature[8..12] == b"AVI " {
        return Ok(ContainerKind::Avi);
    }
    if is_iso_bmff(signature) {
        return Ok(ContainerKind::IsoBmff);
    }
    Ok(ContainerKind::Unknown)
}

/// Codec FourCC of the primary video track, or `None` when the container
/// is unrecognized or the expected structure is missing.
///
/// `None` means "unknown, do not block": callers must not treat it as a
/// failure. I/O problems reading the file degrade to `None` as well.
pub fn detect_codec(path: &Path) -> Option<String> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(error) => {
            tracing::debug!(%error, path = %path.display(), "cannot open file for codec sniffing");
            return None;
        }
    };
    let file_size = file.metadata().ok()?.len();
    let window = HEADER_WINDOW_BYTES.min(file_size as usize);
    let header = read_window(&mut file, 0, window).ok()?;

    if let Some(codec) = avi_codec(&header) {
        return Some(codec);
    }

    if is_iso_bmff(&header) {
        if let Some(moov) = find_box(&header, b"moov") {
            return sample_entry_codec(moov);
        }
        if let Some(moov) = scan_for_moov(&header) {
            return sample_entry_codec(moov);
        }
        // Files written without front-loaded metadata keep moov at the
        // end; retry against a tail window.
        if file_size > header.len() as u64 {
            let tail_len = (HEADER_WINDOW_BYTES as u64 * TAIL_WINDOW_MULTIPLIER).min(file_size);
            let tail = read_window(&mut file, file_size - tail_len, tail_len as usize).ok()?;
            let moov = find_box(&tail, b"moov").or_else(|| scan_for_moov(&tail))?;
            return sample_entry_codec(moov);
        }
    }

    None
}

fn read_window(file: &mut File, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buffer = vec![0u8; len];
    file.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// A FourCC as a string, trimmed of NUL padding. Empty after trimming
/// means the field was blank, which is treated as absent.
fn fourcc(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_matches('\0');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---- RIFF/AVI ----

fn avi_codec(data: &[u8]) -> Option<String> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"AVI " {
        return None;
    }
    scan_riff(&data[12..])
}

/// Walks a sequence of RIFF chunks looking for the video stream header.
///
/// `LIST` chunks are containers and are descended into rather than
/// skipped. A `strh` chunk whose stream type is `vids` carries the codec
/// FourCC in the four bytes after the type tag. Chunk sizes are padded to
/// even byte boundaries per the RIFF spec.
fn scan_riff(data: &[u8]) -> Option<String> {
    let mut pos = 0usize;
    while pos + 8 <= data.len() {
        let id = &data[pos..pos + 4];
        let size = u32::from_le_bytes(data[pos + 4..pos + 8].try_into().ok()?) as usize;
        let body = pos + 8;
        let end = body.saturating_add(size).min(data.len());

        if id == b"LIST" {
            // Skip the 4-byte list type tag and scan the children.
            if body + 4 <= end
                && let Some(codec) = scan_riff(&data[body + 4..end])
            {
                return Some(codec);
            }
        } else if id == b"strh" && body + 8 <= end && &data[body..body + 4] == b"vids" {
            return fourcc(&data[body + 4..body + 8]);
        }

        pos = body + size + (size & 1);
    }
    None
}

// ---- ISO base media (MP4/MOV) ----

fn is_iso_bmff(data: &[u8]) -> bool {
    data.len() >= 8 && matches!(&data[4..8], b"ftyp" | b"moov")
}

/// Locate a box by type among the sibling boxes in `data`, returning its
/// body. Handles the 64-bit "largesize" extension (size field of 1) and a
/// size field of 0 meaning "runs to the end".
fn find_box<'a>(data: &'a [u8], box_type: &[u8; 4]) -> Option<&'a [u8]> {
    let mut pos = 0usize;
    while pos + 8 <= data.len() {
        let size32 = u32::from_be_bytes(data[pos..pos + 4].try_into().ok()?) as u64;
        let kind = &data[pos + 4..pos + 8];

        let (body_start, total) = match size32 {
            0 => (pos + 8, (data.len() - pos) as u64),
            1 => {
                if pos + 16 > data.len() {
                    return None;
                }
                let large = u64::from_be_bytes(data[pos + 8..pos + 16].try_into().ok()?);
                (pos + 16, large)
            }
            size => (pos + 8, size),
        };

        if total < (body_start - pos) as u64 {
            return None; // size smaller than its own header
        }
        let end = (pos as u64 + total).min(data.len() as u64) as usize;

        if kind == box_type {
            return Some(&data[body_start.min(end)..end]);
        }
        if size32 == 0 {
            break; // final box consumed the rest of the window
        }

        let next = pos as u64 + total;
        if next > data.len() as u64 {
            break; // box extends beyond the window, no more visible siblings
        }
        pos = next as usize;
    }
    None
}

/// Brute byte scan for a `moov` box that box-by-box walking missed, e.g.
/// when an earlier box carries a corrupt size. The four bytes before the
/// signature are its size; accept it only when that size stays inside the
/// scanned window.
fn scan_for_moov(data: &[u8]) -> Option<&[u8]> {
    let mut i = 4usize;
    while i + 4 <= data.len() {
        if &data[i..i + 4] == b"moov" {
            let start = i - 4;
            let size = u32::from_be_bytes(data[start..i].try_into().ok()?) as usize;
            if size >= 8 && start + size <= data.len() {
                return Some(&data[i + 4..start + size]);
            }
        }
        i += 1;
    }
    None
}

/// Codec FourCC of the first sample description reachable from a `moov`
/// body via `trak -> mdia -> minf -> stbl -> stsd`.
fn sample_entry_codec(moov: &[u8]) -> Option<String> {
    let trak = find_box(moov, b"trak")?;
    let mdia = find_box(trak, b"mdia")?;
    let minf = find_box(mdia, b"minf")?;
    let stbl = find_box(minf, b"stbl")?;
    let stsd = find_box(stbl, b"stsd")?;
    // stsd is a full box: 1 version byte, 3 flag bytes, 4-byte entry
    // count. The first sample description follows: 4-byte entry size,
    // then the codec FourCC.
    fourcc(stsd.get(12..16)?)
}
