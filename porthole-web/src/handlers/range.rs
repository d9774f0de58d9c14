//! HTTP Range header parsing for video seeking.
//!
//! Covers the subset of RFC 7233 a browser's `<video>` element emits: a
//! single `bytes=start-end` range where either bound may be omitted.

use axum::http::StatusCode;

/// An inclusive byte range resolved against a file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Parse a Range header value into raw `(start, end)` bounds.
///
/// An omitted start defaults to 0 and an omitted end to the last byte of
/// the file. Returns `None` for anything unparseable — callers fall back
/// to serving the full file rather than erroring.
pub fn parse_range_header(value: &str, total_size: u64) -> Option<(u64, u64)> {
    let spec = value.strip_prefix("bytes=")?;
    let (start_text, end_text) = spec.split_once('-')?;
    if start_text.is_empty() && end_text.is_empty() {
        return None;
    }

    let start = if start_text.is_empty() {
        0
    } else {
        start_text.trim().parse().ok()?
    };
    let end = if end_text.is_empty() {
        total_size.saturating_sub(1)
    } else {
        end_text.trim().parse().ok()?
    };
    Some((start, end))
}

/// Clamp parsed bounds against the file size.
///
/// The end is clamped to the last byte; a start at or past the end of the
/// file cannot be satisfied.
///
/// # Errors
/// `StatusCode::RANGE_NOT_SATISFIABLE` when no byte of the request can be
/// served.
pub fn validate_range_bounds(
    start: u64,
    end: u64,
    total_size: u64,
) -> Result<ByteRange, StatusCode> {
    if total_size == 0 || start >= total_size {
        return Err(StatusCode::RANGE_NOT_SATISFIABLE);
    }
    let end = end.min(total_size - 1);
    if start > end {
        return Err(StatusCode::RANGE_NOT_SATISFIABLE);
    }
    Ok(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_explicit_range() {
        assert_eq!(parse_range_header("bytes=100-199", 1000), Some((100, 199)));
    }

    #[test]
    fn test_parse_open_end_defaults_to_last_byte() {
        assert_eq!(parse_range_header("bytes=900-", 1000), Some((900, 999)));
    }

    #[test]
    fn test_parse_open_start_defaults_to_zero() {
        assert_eq!(parse_range_header("bytes=-499", 1000), Some((0, 499)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_range_header("bytes=abc-def", 1000), None);
        assert_eq!(parse_range_header("bytes=-", 1000), None);
        assert_eq!(parse_range_header("items=0-10", 1000), None);
        assert_eq!(parse_range_header("0-10", 1000), None);
    }

    #[test]
    fn test_validate_clamps_end_to_file_size() {
        let range = validate_range_bounds(0, 5000, 1000).unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 999 });
        assert_eq!(range.length(), 1000);
    }

    #[test]
    fn test_validate_passes_exact_range() {
        let range = validate_range_bounds(0, 99, 1000).unwrap();
        assert_eq!(range.length(), 100);
    }

    #[test]
    fn test_validate_rejects_start_past_end_of_file() {
        assert_eq!(
            validate_range_bounds(1000, 1999, 1000),
            Err(StatusCode::RANGE_NOT_SATISFIABLE)
        );
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        assert_eq!(
            validate_range_bounds(500, 100, 1000),
            Err(StatusCode::RANGE_NOT_SATISFIABLE)
        );
    }

    #[test]
    fn test_validate_rejects_empty_file() {
        assert_eq!(
            validate_range_bounds(0, 0, 0),
            Err(StatusCode::RANGE_NOT_SATISFIABLE)
        );
    }

    #[test]
    fn test_last_byte_range() {
        let range = validate_range_bounds(999, 999, 1000).unwrap();
        assert_eq!(range.length(), 1);
    }
}
