use super::{input, open_store};
use anyhow::Result;
use std::path::PathBuf;

pub fn run(dir: Option<PathBuf>, file: PathBuf, repo_name: String) -> Result<()> {
    let mut store = open_store(dir)?;
    let repo = store.repository_by_name(&repo_name)?;
    let mut changesets = input::load_batch(&file, repo.id)?;
    for cs in &mut changesets {
        store.save_changeset(cs)?;
    }
    println!("Imported {} changesets into '{}'", changesets.len(), repo.name);
    Ok(())
}
