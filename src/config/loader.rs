use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::core::{RawConfig, RelocatorConfig};
use crate::io::FileSystem;

pub const CONFIG_FILE_NAME: &str = ".relocator.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Parses and validates config file contents. Syntax errors fail; invalid
/// values fall back to their defaults.
pub fn parse_config(contents: &str) -> Result<RelocatorConfig, toml::de::Error> {
    let raw = toml::from_str::<RawConfig>(contents)?;
    Ok(raw.resolve())
}

/// Directories from `start` upwards, at most `max_depth` of them.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

fn try_load_config_from_path(fs: &dyn FileSystem, path: &Path) -> Option<RelocatorConfig> {
    if !fs.is_file(path) {
        return None;
    }
    let contents = match fs.read_text(path) {
        Ok(file) => file.text,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };
    match parse_config(&contents) {
        Ok(config) => {
            debug!("Loaded config from {}", path.display());
            Some(config)
        }
        Err(e) => {
            warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
            None
        }
    }
}

/// Finds the nearest `.relocator.toml` at or above `start`.
pub fn load_config(fs: &dyn FileSystem, start: &Path) -> RelocatorConfig {
    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(fs, &path))
        .unwrap_or_else(|| {
            debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            RelocatorConfig::default()
        })
}
