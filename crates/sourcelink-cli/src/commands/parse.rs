use super::load_config;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(message: String, config: Option<PathBuf>) -> Result<()> {
    let compiled = load_config(config)?.compile()?;
    println!(
        "References: {}",
        join(compiled.extractor.extract_references(&message))
    );
    println!("Fixes: {}", join(compiled.extractor.extract_fixes(&message)));
    Ok(())
}

fn join(ids: Vec<i64>) -> String {
    if ids.is_empty() {
        "none".to_string()
    } else {
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
