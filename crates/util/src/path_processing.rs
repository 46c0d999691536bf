use std::env;
use std::path::PathBuf;

use dirs_next::{config_dir, home_dir};

pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/").or_else(|| p.strip_prefix("~\\")) {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

/// Resolve a configuration file path.
///
/// A non-blank `env_var` wins (with `~` expanded); otherwise the file lives
/// under `<config_dir>/oembed/<file_name>`.
pub fn resolve_config_path(env_var: &str, file_name: &str) -> PathBuf {
    if let Ok(path) = env::var(env_var)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("oembed").join(file_name)
}
