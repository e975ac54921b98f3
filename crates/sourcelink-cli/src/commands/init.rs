use anyhow::{Context, Result};
use sourcelink_store::SourceStore;
use std::env;
use std::path::PathBuf;

pub fn run(dir: Option<PathBuf>) -> Result<()> {
    let root = match dir {
        Some(dir) => dir,
        None => env::current_dir()?,
    };
    let store = SourceStore::init(&root).context("initializing data store")?;
    println!(
        "Initialized empty sourcelink data store in {}",
        store.data_dir().display()
    );
    Ok(())
}
