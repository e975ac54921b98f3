use crate::error::CoreError;
use crate::model::{Changeset, UserId};
use crate::tracker::{IssueTracker, Storage};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRole {
    Author,
    Committer,
}

/// Maps raw author/committer identities to tracker user ids.
///
/// Three layered caches, all scoped to one engine invocation: the explicit
/// username table (loaded from storage once per batch), successful email
/// lookups, and successful display-name lookups. Directory misses are not
/// cached.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    usernames: Option<HashMap<String, UserId>>,
    emails: HashMap<String, UserId>,
    names: HashMap<String, UserId>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill in the user id for one role of a changeset. Already-resolved
    /// identities are left alone; unresolvable ones stay 0.
    pub fn resolve(
        &mut self,
        changeset: &mut Changeset,
        role: IdentityRole,
        storage: &dyn Storage,
        tracker: &dyn IssueTracker,
    ) -> Result<(), CoreError> {
        let signature = match role {
            IdentityRole::Author => changeset.author.clone(),
            IdentityRole::Committer => changeset.committer.clone(),
        };
        let slot = match role {
            IdentityRole::Author => &mut changeset.author_id,
            IdentityRole::Committer => &mut changeset.committer_id,
        };
        if *slot != 0 {
            return Ok(());
        }

        if self.usernames.is_none() {
            self.usernames = Some(storage.vcs_user_map()?);
        }
        let username_hit = self
            .usernames
            .as_ref()
            .and_then(|map| map.get(&signature.name).copied());
        if let Some(id) = username_hit {
            *slot = id;
            return Ok(());
        }

        if !signature.email.is_empty() {
            if let Some(&id) = self.emails.get(&signature.email) {
                *slot = id;
                return Ok(());
            }
            if let Some(id) = tracker.user_id_by_email(&signature.email) {
                self.emails.insert(signature.email.clone(), id);
                *slot = id;
                return Ok(());
            }
        }

        if !signature.name.is_empty() {
            if let Some(&id) = self.names.get(&signature.name) {
                *slot = id;
                return Ok(());
            }
            let found = tracker
                .user_id_by_realname(&signature.name)
                .or_else(|| tracker.user_id_by_login(&signature.name));
            if let Some(id) = found {
                self.names.insert(signature.name.clone(), id);
                *slot = id;
            }
        }

        Ok(())
    }
}
