//! Users opted out of attendance tracking

use punch_util::UserId;
use std::collections::BTreeSet;

/// In-memory exclusion set; persistence goes through `ClockStore`.
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    users: BTreeSet<UserId>,
}

impl ExclusionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.users.contains(user_id)
    }

    /// Returns whether the user was newly added
    pub fn insert(&mut self, user_id: UserId) -> bool {
        self.users.insert(user_id)
    }

    /// Returns whether the user was present
    pub fn remove(&mut self, user_id: &UserId) -> bool {
        self.users.remove(user_id)
    }

    /// Members in id order
    pub fn to_vec(&self) -> Vec<UserId> {
        self.users.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl FromIterator<UserId> for ExclusionList {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self {
            users: iter.into_iter().collect(),
        }
    }
}
