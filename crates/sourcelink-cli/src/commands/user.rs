use super::open_store;
use anyhow::Result;
use sourcelink_core::model::UserAssociation;
use std::path::PathBuf;

pub fn set(dir: Option<PathBuf>, user_id: i64, username: String) -> Result<()> {
    let mut store = open_store(dir)?;
    store.save_association(&UserAssociation::new(user_id, username.clone()))?;
    println!("Associated username '{}' with user {}", username, user_id);
    Ok(())
}

pub fn rm(dir: Option<PathBuf>, user_id: i64) -> Result<()> {
    let mut store = open_store(dir)?;
    store.save_association(&UserAssociation::new(user_id, ""))?;
    println!("Removed association for user {}", user_id);
    Ok(())
}

pub fn list(dir: Option<PathBuf>) -> Result<()> {
    let store = open_store(dir)?;
    let associations = store.associations();
    if associations.is_empty() {
        println!("No username associations");
        return Ok(());
    }
    for assoc in associations {
        println!("{:>6}  {}", assoc.user_id, assoc.username);
    }
    Ok(())
}
