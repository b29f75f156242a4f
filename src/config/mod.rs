//! Relocator configuration.
//!
//! Settings live in `.relocator.toml`, found by walking up from the
//! directory of the file being edited. Missing files and invalid values
//! fall back to defaults.

mod core;
mod loader;

pub use self::core::{IndentStyle, NamespaceStyle, RelocatorConfig, DEFAULT_RECEIVER_NAME};
pub use loader::{directory_ancestors, load_config, parse_config, CONFIG_FILE_NAME};
