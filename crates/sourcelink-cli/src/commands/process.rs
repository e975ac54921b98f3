use super::{input, load_config, open_store};
use anyhow::Result;
use sourcelink_core::engine::ResolutionEngine;
use sourcelink_core::model::{Changeset, IssueId};
use sourcelink_core::registry::VcsRegistry;
use sourcelink_core::tracker::EventSink;
use sourcelink_store::LocalTracker;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Forwards batch events to the log; other subsystems subscribe here in a
/// full deployment.
struct LogEvents;

impl EventSink for LogEvents {
    fn commits_processed(&mut self, changesets: &[Changeset]) {
        info!(count = changesets.len(), "commits processed");
    }

    fn issues_fixed(&mut self, _changesets: &[Changeset], fixed: &BTreeMap<IssueId, usize>) {
        info!(count = fixed.len(), "issues fixed");
    }
}

pub fn run(
    dir: Option<PathBuf>,
    file: PathBuf,
    repo_name: String,
    config: Option<PathBuf>,
) -> Result<()> {
    let mut store = open_store(dir)?;
    let repo = store.repository_by_name(&repo_name)?;
    let mut tracker = LocalTracker::open(store.data_dir())?;
    let config = load_config(config)?;
    let mut changesets = input::load_batch(&file, repo.id)?;

    let registry = VcsRegistry::new();
    let mut events = LogEvents;
    let mut engine =
        ResolutionEngine::new(config, &mut store, &mut tracker, &registry, &mut events)?;
    let outcome = engine.process_batch(&mut changesets, Some(repo))?;

    if outcome.fixed.is_empty() {
        println!("Processed {} changesets; no issues resolved", outcome.processed);
    } else {
        let ids: Vec<String> = outcome.fixed.iter().map(|id| format!("#{}", id)).collect();
        println!(
            "Processed {} changesets; resolved {}",
            outcome.processed,
            ids.join(", ")
        );
    }
    Ok(())
}
