//! Static file serving with byte-range support.
//!
//! One router instance serves exactly one directory. Only bare filenames
//! are accepted; anything that would resolve outside the root is a 404.
//! Request traffic is deliberately quiet: nothing above trace level, and
//! clients hanging up mid-transfer are not an event worth recording.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use porthole_core::config::ServerConfig;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::cors;
use super::range::{ByteRange, parse_range_header, validate_range_bounds};

#[derive(Clone)]
struct FilesState {
    root: PathBuf,
    preflight_max_age: Duration,
}

/// Router serving the files directly inside `root`.
pub fn files_router(root: PathBuf, config: ServerConfig) -> Router {
    Router::new()
        .route("/{filename}", get(serve_file).options(preflight))
        .with_state(Arc::new(FilesState {
            root,
            preflight_max_age: config.preflight_max_age,
        }))
        .layer(middleware::map_response(cors::apply))
}

async fn serve_file(
    State(state): State<Arc<FilesState>>,
    UrlPath(filename): UrlPath<String>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let Some(path) = resolve_within_root(&state.root, &filename) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    let total_size = metadata.len();
    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    // Missing and malformed Range headers both get the whole file.
    let requested = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_range_header(value, total_size));

    let (status, range) = match requested {
        Some((start, end)) => match validate_range_bounds(start, end, total_size) {
            Ok(range) => (StatusCode::PARTIAL_CONTENT, range),
            Err(status) => {
                return unsatisfiable_response(status, total_size);
            }
        },
        None => (
            StatusCode::OK,
            ByteRange {
                start: 0,
                end: total_size.saturating_sub(1),
            },
        ),
    };

    tracing::trace!(
        file = %path.display(),
        %status,
        start = range.start,
        end = range.end,
        "serving file span"
    );

    let span = if total_size == 0 { 0 } else { range.length() };
    let body = if method == Method::HEAD || span == 0 {
        Body::empty()
    } else {
        match read_span(&path, range.start, span as usize).await {
            Ok(bytes) => Body::from(bytes),
            Err(error) => {
                tracing::debug!(%error, file = %path.display(), "failed reading file span");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, span.to_string());
    if status == StatusCode::PARTIAL_CONTENT {
        builder = builder.header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", range.start, range.end, total_size),
        );
    }
    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// CORS preflight: immediate 200; the CORS middleware supplies the header
/// set, this adds how long the browser may cache the verdict.
async fn preflight(State(state): State<Arc<FilesState>>) -> Response {
    let max_age = state.preflight_max_age.as_secs().to_string();
    ([(header::ACCESS_CONTROL_MAX_AGE, max_age)], StatusCode::OK).into_response()
}

fn unsatisfiable_response(status: StatusCode, total_size: u64) -> Response {
    (
        status,
        [(header::CONTENT_RANGE, format!("bytes */{total_size}"))],
    )
        .into_response()
}

/// Resolve a request path to a file directly inside `root`.
///
/// Only bare filenames are accepted: separators, parent components, or
/// anything else that could escape the served directory resolve to `None`.
fn resolve_within_root(root: &Path, filename: &str) -> Option<PathBuf> {
    if filename.is_empty() || filename.contains(['/', '\\']) {
        return None;
    }
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(root.join(filename)),
        _ => None,
    }
}

async fn read_span(path: &Path, start: u64, length: usize) -> std::io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(std::io::SeekFrom::Start(start)).await?;
    let mut buffer = vec![0u8; length];
    file.read_exact(&mut buffer).await?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filename_resolves_inside_root() {
        let root = Path::new("/videos/session1");
        assert_eq!(
            resolve_within_root(root, "clip.mp4"),
            Some(PathBuf::from("/videos/session1/clip.mp4"))
        );
    }

    #[test]
    fn test_parent_traversal_is_rejected() {
        let root = Path::new("/videos/session1");
        assert_eq!(resolve_within_root(root, ".."), None);
        assert_eq!(resolve_within_root(root, "../secret.txt"), None);
        assert_eq!(resolve_within_root(root, "a/../../secret.txt"), None);
    }

    #[test]
    fn test_separators_are_rejected() {
        let root = Path::new("/videos/session1");
        assert_eq!(resolve_within_root(root, "sub/clip.mp4"), None);
        assert_eq!(resolve_within_root(root, "sub\\clip.mp4"), None);
        assert_eq!(resolve_within_root(root, ""), None);
    }

    #[test]
    fn test_current_dir_component_is_rejected() {
        let root = Path::new("/videos/session1");
        assert_eq!(resolve_within_root(root, "."), None);
    }
}
