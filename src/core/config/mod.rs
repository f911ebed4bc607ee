//! Configuration: TOML file → resolved [`Config`].
//!
//! - `raw`   — serde shape with defaults (private)
//! - `types` — resolved types used across the crate
//! - `load`  — file reading, `[meta] base` chains, env overrides

mod load;
mod raw;
mod types;

pub use load::{expand_home, load, load_from, normalize_extension};
pub use types::*;

#[cfg(test)]
impl Config {
    /// Built-in defaults rooted at `root`, for unit tests.
    pub(crate) fn test_default(root: &std::path::Path) -> Self {
        let mut cfg = load::defaults().expect("defaults resolve");
        cfg.project.root = root.to_path_buf();
        cfg
    }
}
