//! Utility functions and helpers.
//!
//! Common functionality used across multiple tangle crates.

pub mod path;

// Re-export commonly used utilities
pub use path::{get_extension, item_file_name, normalize_path};
