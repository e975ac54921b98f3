use super::open_store;
use anyhow::Result;
use sourcelink_core::model::{BranchMapping, MappingStrategy};
use std::path::PathBuf;

#[allow(clippy::too_many_arguments)]
pub fn set(
    dir: Option<PathBuf>,
    repo_name: String,
    branch: String,
    strategy: MappingStrategy,
    version: String,
    pvm_version_id: i64,
    pattern: Option<String>,
) -> Result<()> {
    let mut store = open_store(dir)?;
    let repo = store.repository_by_name(&repo_name)?;

    let mut mapping = BranchMapping::new(repo.id, branch, strategy);
    mapping.version = version;
    mapping.pvm_version_id = pvm_version_id;
    mapping.pattern = pattern;
    store.save_mapping(&mapping)?;
    println!(
        "Mapped branch '{}' of '{}' ({})",
        mapping.branch, repo.name, mapping.strategy
    );
    Ok(())
}

pub fn list(dir: Option<PathBuf>, repo_name: String) -> Result<()> {
    let store = open_store(dir)?;
    let repo = store.repository_by_name(&repo_name)?;
    let mappings = store.mappings_by_repo(repo.id);
    if mappings.is_empty() {
        println!("No mappings for '{}'", repo.name);
        return Ok(());
    }
    for mapping in mappings.values() {
        let mut detail = mapping.strategy.to_string();
        if !mapping.version.is_empty() {
            detail.push_str(&format!(" version={}", mapping.version));
        }
        if mapping.pvm_version_id != 0 {
            detail.push_str(&format!(" pvm={}", mapping.pvm_version_id));
        }
        if let Some(pattern) = &mapping.pattern {
            detail.push_str(&format!(" filter={}", pattern));
        }
        println!("{:<20} {}", mapping.branch, detail);
    }
    Ok(())
}

pub fn rm(dir: Option<PathBuf>, repo_name: String, branch: String) -> Result<()> {
    let mut store = open_store(dir)?;
    let repo = store.repository_by_name(&repo_name)?;
    store.delete_mapping(repo.id, &branch)?;
    println!("Removed mapping for branch '{}' of '{}'", branch, repo.name);
    Ok(())
}
