//! HTTP request handlers for the file origins.

pub mod cors;
pub mod files;
pub mod range;

pub use files::files_router;
pub use range::{ByteRange, parse_range_header, validate_range_bounds};
