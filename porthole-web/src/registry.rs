//! Process-wide registry of per-directory file origins.
//!
//! Each distinct directory gets exactly one loopback origin bound to an
//! OS-assigned ephemeral port, created on first request and reused for
//! every later one. Origins are daemon tasks: nothing ever tears them
//! down short of process exit, and a directory's port never changes once
//! assigned.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use porthole_core::config::ServerConfig;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::handlers::files_router;

/// Errors raised while creating a file origin.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("directory not found: {}", .path.display())]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("failed to bind loopback listener: {0}")]
    Bind(#[source] std::io::Error),
}

/// A running per-directory origin.
struct ServedDirectory {
    port: u16,
    // Held so the accept loop has an owner; it is never joined.
    _task: JoinHandle<()>,
}

/// Registry of running origins keyed by resolved directory path.
///
/// Construct one per process and share it via `Arc`. Tests build a fresh
/// instance each so served directories stay scoped to the test.
pub struct ServerRegistry {
    config: ServerConfig,
    servers: Mutex<HashMap<PathBuf, ServedDirectory>>,
}

impl ServerRegistry {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            servers: Mutex::new(HashMap::new()),
        }
    }

    /// Port of the origin serving `directory`, starting one if needed.
    ///
    /// Idempotent: repeated calls for the same directory return the same
    /// port. The whole lookup-or-create sequence runs under the registry
    /// lock, so concurrent first requests cannot double-bind a directory.
    ///
    /// # Errors
    /// - `ServeError::DirectoryNotFound` / `NotADirectory` - Bad root
    /// - `ServeError::Bind` - No loopback port available
    pub async fn ensure_server_for(&self, directory: &Path) -> Result<u16, ServeError> {
        let root = tokio::fs::canonicalize(directory).await.map_err(|source| {
            ServeError::DirectoryNotFound {
                path: directory.to_path_buf(),
                source,
            }
        })?;
        if !root.is_dir() {
            return Err(ServeError::NotADirectory { path: root });
        }

        let mut servers = self.servers.lock().await;
        if let Some(server) = servers.get(&root) {
            return Ok(server.port);
        }

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(ServeError::Bind)?;
        let port = listener.local_addr().map_err(ServeError::Bind)?.port();

        let app = files_router(root.clone(), self.config.clone());
        let task = tokio::spawn(async move {
            // Daemon accept loop. Connection-level failures, including
            // clients dropping mid-transfer while scrubbing the seek bar,
            // are absorbed per-connection and never reach here.
            if let Err(error) = axum::serve(listener, app).await {
                tracing::error!(%error, "file origin exited");
            }
        });

        tracing::info!(root = %root.display(), port, "started file origin");
        servers.insert(
            root,
            ServedDirectory {
                port,
                _task: task,
            },
        );
        Ok(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ServerRegistry {
        ServerRegistry::new(ServerConfig::default())
    }

    #[tokio::test]
    async fn test_same_directory_reuses_port() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();

        let first = registry.ensure_server_for(dir.path()).await.unwrap();
        let second = registry.ensure_server_for(dir.path()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_distinct_directories_get_distinct_ports() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let registry = registry();

        let port_a = registry.ensure_server_for(dir_a.path()).await.unwrap();
        let port_b = registry.ensure_server_for(dir_b.path()).await.unwrap();
        assert_ne!(port_a, port_b);
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_share_one_server() {
        let dir = tempfile::tempdir().unwrap();
        let registry = std::sync::Arc::new(registry());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = std::sync::Arc::clone(&registry);
            let path = dir.path().to_path_buf();
            handles.push(tokio::spawn(
                async move { registry.ensure_server_for(&path).await },
            ));
        }

        let mut ports = Vec::new();
        for handle in handles {
            ports.push(handle.await.unwrap().unwrap());
        }
        ports.dedup();
        assert_eq!(ports.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let registry = registry();
        let result = registry
            .ensure_server_for(Path::new("/no/such/directory"))
            .await;
        assert!(matches!(result, Err(ServeError::DirectoryNotFound { .. })));
    }

    #[tokio::test]
    async fn test_file_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("video.mp4");
        std::fs::write(&file, b"data").unwrap();

        let registry = registry();
        let result = registry.ensure_server_for(&file).await;
        assert!(matches!(result, Err(ServeError::NotADirectory { .. })));
    }
}
