use super::open_store;
use anyhow::Result;
use sourcelink_core::model::{MappingStrategy, Repository};
use std::path::PathBuf;

pub fn add(dir: Option<PathBuf>, name: String, vcs_type: String, url: String) -> Result<()> {
    let mut store = open_store(dir)?;
    let mut repo = Repository::new(vcs_type, name);
    repo.url = url;
    store.save_repository(&mut repo)?;
    println!("Created repository '{}' (id {})", repo.name, repo.id);
    Ok(())
}

pub fn list(dir: Option<PathBuf>) -> Result<()> {
    let store = open_store(dir)?;
    let repos = store.repositories();
    if repos.is_empty() {
        println!("No repositories");
        return Ok(());
    }
    for repo in repos {
        println!("{:>4}  {:<8} {}  {}", repo.id, repo.vcs_type, repo.name, repo.url);
    }
    Ok(())
}

pub fn show(dir: Option<PathBuf>, name: String) -> Result<()> {
    let store = open_store(dir)?;
    let mut repo = store.repository_by_name(&name)?;
    store.load_branches(&mut repo);
    store.load_mappings(&mut repo);

    println!("Repository: {} (id {})", repo.name, repo.id);
    println!("Type:       {}", repo.vcs_type);
    if !repo.url.is_empty() {
        println!("URL:        {}", repo.url);
    }
    println!("Changesets: {}", store.changesets_by_repo(repo.id).len());
    if repo.branches.is_empty() {
        println!("Branches:   none");
    } else {
        println!("Branches:   {}", repo.branches.join(", "));
    }
    if !repo.mappings.is_empty() {
        println!("Mappings:");
        for mapping in repo.mappings.values() {
            let target = match mapping.pattern.as_deref() {
                Some(pattern) => format!("{} (filter {})", mapping.strategy, pattern),
                None if mapping.strategy == MappingStrategy::Explicit => {
                    format!("explicit {}", mapping.version)
                }
                None => mapping.strategy.to_string(),
            };
            println!("  {} -> {}", mapping.branch, target);
        }
    }
    Ok(())
}

pub fn rm(dir: Option<PathBuf>, name: String) -> Result<()> {
    let mut store = open_store(dir)?;
    let repo = store.repository_by_name(&name)?;
    store.delete_repository(repo.id)?;
    println!("Deleted repository '{}' and its changesets", repo.name);
    Ok(())
}
