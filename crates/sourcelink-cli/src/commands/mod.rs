pub mod import;
pub mod init;
pub mod input;
pub mod mapping;
pub mod parse;
pub mod process;
pub mod repo;
pub mod user;

use anyhow::{Context, Result};
use sourcelink_core::config::ResolveConfig;
use sourcelink_store::SourceStore;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Open the data store, searching upward from `dir` or the working directory.
pub(crate) fn open_store(dir: Option<PathBuf>) -> Result<SourceStore> {
    let start = match dir {
        Some(dir) => dir,
        None => env::current_dir()?,
    };
    SourceStore::discover(&start).context("not a sourcelink data store (or any parent)")
}

/// Load the resolution config from a TOML file, or use the defaults.
pub(crate) fn load_config(path: Option<PathBuf>) -> Result<ResolveConfig> {
    match path {
        None => Ok(ResolveConfig::default()),
        Some(path) => {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))
        }
    }
}
