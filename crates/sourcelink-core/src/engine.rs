//! Batch resolution pipeline: link commit authorship to user identities,
//! extract and validate issue links, persist changesets, and run the
//! per-issue resolution decision procedure.

use crate::config::{CompiledConfig, ResolveConfig, FIXED_STATUS_RESOLVE};
use crate::error::CoreError;
use crate::identity::{IdentityResolver, IdentityRole};
use crate::mapping::VersionResolver;
use crate::model::{BranchMapping, Changeset, IssueId, RepoId, Repository, UserId, VersionId};
use crate::registry::{VcsHandler, VcsRegistry};
use crate::tracker::{EventSink, HistoryKind, IssueTracker, Storage};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Summary of one processed batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub processed: usize,
    /// Issue ids the batch claimed to fix, ascending.
    pub fixed: Vec<IssueId>,
}

/// Drives one batch of changesets through the resolution pipeline.
///
/// All memoization (identity caches, version orderings, per-repo mapping
/// sets) and the acting-identity register live on the engine instance, so
/// independent invocations construct independent engines and can never
/// observe each other's state.
pub struct ResolutionEngine<'a> {
    storage: &'a mut dyn Storage,
    tracker: &'a mut dyn IssueTracker,
    registry: &'a VcsRegistry,
    events: &'a mut dyn EventSink,
    config: CompiledConfig,
    identities: IdentityResolver,
    versions: VersionResolver,
    mappings: HashMap<RepoId, BTreeMap<String, BranchMapping>>,
    /// The identity attributed to automated changes; swapped per decision
    /// and restored once after the decision loop.
    current_user_id: UserId,
}

impl<'a> ResolutionEngine<'a> {
    pub fn new(
        config: ResolveConfig,
        storage: &'a mut dyn Storage,
        tracker: &'a mut dyn IssueTracker,
        registry: &'a VcsRegistry,
        events: &'a mut dyn EventSink,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            storage,
            tracker,
            registry,
            events,
            config: config.compile()?,
            identities: IdentityResolver::new(),
            versions: VersionResolver::new(),
            mappings: HashMap::new(),
            current_user_id: 0,
        })
    }

    /// Set the identity active before the batch; decisions fall back to it
    /// when a changeset has no resolved author or committer.
    pub fn with_acting_user(mut self, user_id: UserId) -> Self {
        self.current_user_id = user_id;
        self
    }

    /// The currently attributed identity.
    pub fn acting_user(&self) -> UserId {
        self.current_user_id
    }

    /// Process a batch of changesets, optionally bound to one known
    /// repository. Order matters: identities, then reference links, then
    /// fix links, then persistence, then resolution decisions, then events.
    pub fn process_batch(
        &mut self,
        changesets: &mut [Changeset],
        repo: Option<Repository>,
    ) -> Result<BatchOutcome, CoreError> {
        if self.config.options.enable_product_matrix && self.tracker.version_matrix().is_none() {
            return Err(CoreError::MatrixUnavailable);
        }

        // 1. repositories referenced by the batch
        let repos: HashMap<RepoId, Repository> = match repo {
            Some(repo) => {
                let mut map = HashMap::new();
                for cs in changesets.iter_mut() {
                    cs.repo_id = repo.id;
                }
                map.insert(repo.id, repo);
                map
            }
            None => self.storage.repositories_for(changesets)?,
        };

        // 2. author and committer identities
        for cs in changesets.iter_mut() {
            self.identities
                .resolve(cs, IdentityRole::Author, &*self.storage, &*self.tracker)?;
            self.identities
                .resolve(cs, IdentityRole::Committer, &*self.storage, &*self.tracker)?;
        }

        // 3. reference links, dropping ids the tracker doesn't know
        for cs in changesets.iter_mut() {
            for id in self.config.extractor.extract_references(&cs.message) {
                if self.tracker.issue_exists(id) && !cs.issues.contains(&id) {
                    cs.issues.push(id);
                }
            }
        }

        // 4. fix links; a validated fix implies a reference. The last
        // changeset in batch order claiming an issue wins the decision.
        let mut fixed: BTreeMap<IssueId, usize> = BTreeMap::new();
        for (index, cs) in changesets.iter_mut().enumerate() {
            for id in self.config.extractor.extract_fixes(&cs.message) {
                if !self.tracker.issue_exists(id) {
                    continue;
                }
                fixed.insert(id, index);
                if !cs.issues.contains(&id) {
                    cs.issues.push(id);
                }
            }
        }

        // 5. persist, then audit the link diff
        for cs in changesets.iter_mut() {
            let diff = self.storage.save_changeset(cs)?;
            if diff.is_empty() {
                continue;
            }
            let repo = repos
                .get(&cs.repo_id)
                .ok_or(CoreError::RepositoryNotFound(cs.repo_id))?;
            let handler = self.registry.handler_for(repo);
            let rendered = format!("{} {}", repo.name, handler.format_changeset(repo, cs));
            let audit_user = cs.audit_user_id();
            for &issue_id in &diff.removed {
                self.tracker.append_history(
                    issue_id,
                    audit_user,
                    HistoryKind::ChangesetRemoved,
                    &rendered,
                    "",
                )?;
                self.tracker.touch_issue(issue_id)?;
            }
            for &issue_id in &diff.added {
                self.tracker.append_history(
                    issue_id,
                    audit_user,
                    HistoryKind::ChangesetAttached,
                    "",
                    &rendered,
                )?;
                self.tracker.touch_issue(issue_id)?;
            }
        }

        // 6. warm the tracker's cache for the decision loop
        let fixed_ids: Vec<IssueId> = fixed.keys().copied().collect();
        self.tracker.precache_issues(&fixed_ids)?;

        // 7. resolution decisions, restoring the acting identity exactly
        // once afterwards, error or not
        let prior_user = self.current_user_id;
        let decisions = self.run_decisions(changesets, &fixed, &repos, prior_user);
        self.current_user_id = prior_user;
        decisions?;

        // 8. notify other subsystems
        self.events.commits_processed(changesets);
        self.events.issues_fixed(changesets, &fixed);

        debug!(
            changesets = changesets.len(),
            fixed = fixed_ids.len(),
            "batch processed"
        );
        Ok(BatchOutcome {
            processed: changesets.len(),
            fixed: fixed_ids,
        })
    }

    fn run_decisions(
        &mut self,
        changesets: &[Changeset],
        fixed: &BTreeMap<IssueId, usize>,
        repos: &HashMap<RepoId, Repository>,
        prior_user: UserId,
    ) -> Result<(), CoreError> {
        for (&issue_id, &index) in fixed {
            self.resolve_issue(issue_id, &changesets[index], repos, prior_user)?;
        }
        Ok(())
    }

    /// The resolution decision procedure for one (issue, changeset) pair.
    fn resolve_issue(
        &mut self,
        issue_id: IssueId,
        cs: &Changeset,
        repos: &HashMap<RepoId, Repository>,
        prior_user: UserId,
    ) -> Result<(), CoreError> {
        let options = self.config.options.clone();

        // Handler candidate: author if they may handle the issue, else
        // committer if they may; otherwise the issue is left unhandled.
        let mut handler_candidate: UserId = 0;
        if cs.author_id > 0
            && self
                .tracker
                .has_access_level(options.handle_issue_threshold, issue_id, cs.author_id)
        {
            handler_candidate = cs.author_id;
        } else if cs.committer_id > 0
            && self
                .tracker
                .has_access_level(options.handle_issue_threshold, issue_id, cs.committer_id)
        {
            handler_candidate = cs.committer_id;
        }

        // Acting identity for audit attribution.
        self.current_user_id = if cs.author_id > 0 {
            cs.author_id
        } else if cs.committer_id > 0 {
            cs.committer_id
        } else {
            prior_user
        };

        // Target version through the branch mapping, when one exists.
        let mut version = String::new();
        let mut pvm_version_id: VersionId = 0;
        if options.enable_mapping {
            if !self.mappings.contains_key(&cs.repo_id) {
                let loaded = self.storage.branch_mappings(cs.repo_id)?;
                self.mappings.insert(cs.repo_id, loaded);
            }
            let mapping = self
                .mappings
                .get(&cs.repo_id)
                .and_then(|per_branch| per_branch.get(&cs.branch));
            if let Some(mapping) = mapping {
                if options.enable_product_matrix {
                    pvm_version_id = self.versions.resolve_product(mapping);
                } else {
                    version = self.versions.resolve(mapping, issue_id, &*self.tracker)?;
                }
            }
        }

        let message = if options.enable_message {
            let repo = repos
                .get(&cs.repo_id)
                .ok_or(CoreError::RepositoryNotFound(cs.repo_id))?;
            render_note(&options.message_template, cs, &repo.name)
        } else {
            String::new()
        };

        let mut dirty = false;
        if options.enable_product_matrix {
            // Product mode touches the version matrix and nothing else.
            if options.fixed_status_pvm > 0 && pvm_version_id > 0 {
                if let Some(matrix) = self.tracker.version_matrix() {
                    matrix.set_version_status(issue_id, pvm_version_id, options.fixed_status_pvm)?;
                }
            }
        } else if options.assign_handler && handler_candidate > 0 {
            let mut issue = self.tracker.issue_get(issue_id)?;

            if options.fixed_status > 0 && issue.status != options.fixed_status {
                issue.status = options.fixed_status;
                dirty = true;
            } else if options.enable_resolving
                && options.fixed_status == FIXED_STATUS_RESOLVE
                && issue.status < options.resolved_threshold
            {
                issue.status = options.resolved_threshold;
                dirty = true;
            }

            // "Reopened" sits between the fixed and not-fixed thresholds,
            // so it needs its own check.
            if issue.resolution < options.fixed_threshold
                || issue.resolution >= options.not_fixed_threshold
                || issue.resolution == options.reopened_resolution
            {
                issue.resolution = options.fixed_resolution;
                dirty = true;
            }

            if issue.fixed_in_version.is_empty() {
                issue.fixed_in_version = version.clone();
                dirty = true;
            }

            if issue.handler_id != handler_candidate {
                issue.handler_id = handler_candidate;
                dirty = true;
            }

            if dirty {
                if !message.is_empty() {
                    // The issue update sends its own notification; the note
                    // must not send another.
                    self.tracker.add_note(
                        issue_id,
                        self.current_user_id,
                        &message,
                        options.note_private,
                        false,
                    )?;
                }
                self.tracker.issue_update(&issue)?;
            }
        }

        if !dirty && !message.is_empty() {
            self.tracker.add_note(
                issue_id,
                self.current_user_id,
                &message,
                options.note_private,
                true,
            )?;
        }

        Ok(())
    }
}

/// Substitute `$1..$6` in the note template: branch, revision, ISO-8601
/// commit timestamp, commit message, repository name, changeset id.
/// Single pass, so substituted text is never re-scanned.
fn render_note(template: &str, cs: &Changeset, repo_name: &str) -> String {
    let mut out = String::with_capacity(template.len() + cs.message.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('1') => out.push_str(&cs.branch),
            Some('2') => out.push_str(&cs.revision),
            Some('3') => out.push_str(&cs.timestamp.to_rfc3339()),
            Some('4') => out.push_str(&cs.message),
            Some('5') => out.push_str(repo_name),
            Some('6') => out.push_str(&cs.id.to_string()),
            _ => {
                out.push('$');
                continue;
            }
        }
        chars.next();
    }
    out
}
