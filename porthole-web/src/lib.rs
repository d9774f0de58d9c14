//! Porthole Web - Loopback HTTP origins for session video
//!
//! Serves prepared video files to the browser viewer with full byte-range
//! support, and composes the core preparation pipeline into published
//! `http://127.0.0.1:<port>/<file>` URLs.

pub mod handlers;
pub mod publish;
pub mod registry;

pub use publish::{PublishError, PublishedVideo, VideoPublisher};
pub use registry::{ServeError, ServerRegistry};
