//! Core data models for cartbot.
//!
//! - Intents: typed decoding of the interpreter's output
//! - Catalog: products, carts and search filters as the catalog service sees them
//! - Results: resolver and dispatcher outcomes
//! - Config and error types

mod catalog;
mod config;
mod error;
mod intent;
mod result;

pub use catalog::*;
pub use config::*;
pub use error::*;
pub use intent::*;
pub use result::*;

/// Shorten text for logs and diagnostics.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}…")
    }
}
