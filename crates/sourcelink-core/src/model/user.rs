use crate::model::UserId;
use serde::{Deserialize, Serialize};

/// An explicit association between a VCS username and a tracker user.
/// Saving an association with a blank username removes it entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAssociation {
    pub user_id: UserId,
    pub username: String,
}

impl UserAssociation {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}
