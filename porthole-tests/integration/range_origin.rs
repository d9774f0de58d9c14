//! Live loopback origin tests driven by a real HTTP client.

use std::path::Path;

use porthole_core::config::ServerConfig;
use porthole_web::ServerRegistry;
use reqwest::StatusCode;

fn test_payload() -> Vec<u8> {
    (0..1000u32).map(|i| (i % 251) as u8).collect()
}

async fn origin_with_file(dir: &Path, name: &str, payload: &[u8]) -> u16 {
    std::fs::write(dir.join(name), payload).unwrap();
    // The registry can go out of scope; the origin is a daemon task.
    let registry = ServerRegistry::new(ServerConfig::default());
    registry.ensure_server_for(dir).await.unwrap()
}

#[tokio::test]
async fn test_full_file_get() {
    let dir = tempfile::tempdir().unwrap();
    let payload = test_payload();
    let port = origin_with_file(dir.path(), "clip.bin", &payload).await;

    let response = reqwest::get(format!("http://127.0.0.1:{port}/clip.bin"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["Accept-Ranges"], "bytes");
    assert_eq!(response.headers()["Content-Length"], "1000");
    assert_eq!(&response.bytes().await.unwrap()[..], &payload[..]);
}

#[tokio::test]
async fn test_leading_range_request() {
    let dir = tempfile::tempdir().unwrap();
    let payload = test_payload();
    let port = origin_with_file(dir.path(), "clip.bin", &payload).await;

    let response = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{port}/clip.bin"))
        .header("Range", "bytes=0-99")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["Content-Range"], "bytes 0-99/1000");
    assert_eq!(response.headers()["Content-Length"], "100");
    assert_eq!(&response.bytes().await.unwrap()[..], &payload[..100]);
}

#[tokio::test]
async fn test_open_ended_range_runs_to_last_byte() {
    let dir = tempfile::tempdir().unwrap();
    let payload = test_payload();
    let port = origin_with_file(dir.path(), "clip.bin", &payload).await;

    let response = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{port}/clip.bin"))
        .header("Range", "bytes=900-")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["Content-Range"], "bytes 900-999/1000");
    assert_eq!(response.headers()["Content-Length"], "100");
    assert_eq!(&response.bytes().await.unwrap()[..], &payload[900..]);
}

#[tokio::test]
async fn test_overlong_range_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let port = origin_with_file(dir.path(), "clip.bin", &test_payload()).await;

    let response = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{port}/clip.bin"))
        .header("Range", "bytes=0-5000")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["Content-Range"], "bytes 0-999/1000");
    assert_eq!(response.headers()["Content-Length"], "1000");
}

#[tokio::test]
async fn test_malformed_range_falls_back_to_full_file() {
    let dir = tempfile::tempdir().unwrap();
    let port = origin_with_file(dir.path(), "clip.bin", &test_payload()).await;

    let response = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{port}/clip.bin"))
        .header("Range", "bytes=abc-def")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["Content-Length"], "1000");
}

#[tokio::test]
async fn test_range_past_end_of_file_is_unsatisfiable() {
    let dir = tempfile::tempdir().unwrap();
    let port = origin_with_file(dir.path(), "clip.bin", &test_payload()).await;

    let response = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{port}/clip.bin"))
        .header("Range", "bytes=2000-")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()["Content-Range"], "bytes */1000");
    // Even error responses carry the CORS set.
    assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
}

#[tokio::test]
async fn test_head_returns_headers_only() {
    let dir = tempfile::tempdir().unwrap();
    let port = origin_with_file(dir.path(), "clip.bin", &test_payload()).await;

    let response = reqwest::Client::new()
        .head(format!("http://127.0.0.1:{port}/clip.bin"))
        .header("Range", "bytes=0-99")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["Content-Range"], "bytes 0-99/1000");
    assert_eq!(response.headers()["Content-Length"], "100");
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cors_headers_on_success_and_preflight() {
    let dir = tempfile::tempdir().unwrap();
    let port = origin_with_file(dir.path(), "clip.bin", &test_payload()).await;
    let url = format!("http://127.0.0.1:{port}/clip.bin");
    let client = reqwest::Client::new();

    let get = client.get(&url).send().await.unwrap();
    for (name, expected) in [
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "GET, OPTIONS, HEAD"),
        ("Access-Control-Allow-Headers", "Range"),
        ("Access-Control-Expose-Headers", "Content-Range, Content-Length"),
        ("Accept-Ranges", "bytes"),
    ] {
        assert_eq!(get.headers()[name], expected, "header {name} on GET");
        assert_eq!(
            get.headers().get_all(name).iter().count(),
            1,
            "header {name} duplicated"
        );
    }

    let preflight = client
        .request(reqwest::Method::OPTIONS, &url)
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), StatusCode::OK);
    assert_eq!(preflight.headers()["Access-Control-Allow-Origin"], "*");
    assert_eq!(preflight.headers()["Access-Control-Max-Age"], "86400");
}

#[tokio::test]
async fn test_unknown_file_is_404_with_cors() {
    let dir = tempfile::tempdir().unwrap();
    let port = origin_with_file(dir.path(), "clip.bin", &test_payload()).await;

    let response = reqwest::get(format!("http://127.0.0.1:{port}/nope.bin"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
}

#[tokio::test]
async fn test_traversal_cannot_escape_root() {
    let outside = tempfile::tempdir().unwrap();
    let secret = outside.path().join("secret.txt");
    std::fs::write(&secret, b"do not serve").unwrap();

    let dir = tempfile::TempDir::new_in(outside.path()).unwrap();
    let port = origin_with_file(dir.path(), "clip.bin", &test_payload()).await;

    // Percent-encoded dot segments decode to "../secret.txt" server-side.
    let response = reqwest::get(format!("http://127.0.0.1:{port}/%2E%2E%2Fsecret.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = reqwest::get(format!("http://127.0.0.1:{port}/..%2Fsecret.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_ranges_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let payload = test_payload();
    let port = origin_with_file(dir.path(), "clip.bin", &payload).await;
    let client = reqwest::Client::new();

    let mut handles = Vec::new();
    for chunk in 0..10u64 {
        let client = client.clone();
        let payload = payload.clone();
        let url = format!("http://127.0.0.1:{port}/clip.bin");
        handles.push(tokio::spawn(async move {
            let start = chunk * 100;
            let end = start + 99;
            let response = client
                .get(url)
                .header("Range", format!("bytes={start}-{end}"))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
            let body = response.bytes().await.unwrap();
            assert_eq!(&body[..], &payload[start as usize..=end as usize]);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_registry_reuses_and_separates_origins() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    std::fs::write(dir_a.path().join("a.bin"), b"aaa").unwrap();
    std::fs::write(dir_b.path().join("b.bin"), b"bbb").unwrap();

    let registry = ServerRegistry::new(ServerConfig::default());
    let port_a1 = registry.ensure_server_for(dir_a.path()).await.unwrap();
    let port_a2 = registry.ensure_server_for(dir_a.path()).await.unwrap();
    let port_b = registry.ensure_server_for(dir_b.path()).await.unwrap();

    assert_eq!(port_a1, port_a2);
    assert_ne!(port_a1, port_b);

    // Each origin serves only its own directory.
    let cross = reqwest::get(format!("http://127.0.0.1:{port_a1}/b.bin"))
        .await
        .unwrap();
    assert_eq!(cross.status(), StatusCode::NOT_FOUND);
}
