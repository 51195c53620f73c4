//! Capability model derived from a role's menu/access tree.
//!
//! The menu display name is the authorization subject and the lower-cased
//! access name is the action. Only active accesses grant anything; there is
//! no wildcard and no parent-to-child inheritance.

pub mod context;

pub use context::AbilityContext;

use std::collections::HashSet;

use crate::models::RolePermission;

/// One granted `(action, subject)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capability {
    pub action: String,
    pub subject: String,
}

impl Capability {
    fn new(action: &str, subject: &str) -> Self {
        Self {
            action: action.to_lowercase(),
            subject: subject.to_string(),
        }
    }
}

/// Immutable capability set.
///
/// Actions compare case-insensitively, subjects compare exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ability {
    rules: HashSet<Capability>,
}

impl Ability {
    /// Deny-all ability
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn can(&self, action: &str, subject: &str) -> bool {
        self.rules.contains(&Capability::new(action, subject))
    }

    pub fn cannot(&self, action: &str, subject: &str) -> bool {
        !self.can(action, subject)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Granted pairs in a stable order, for display
    pub fn rules(&self) -> Vec<&Capability> {
        let mut rules: Vec<&Capability> = self.rules.iter().collect();
        rules.sort();
        rules
    }
}

impl FromIterator<Capability> for Ability {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Build the ability for a role. A missing permission payload produces the
/// deny-all ability rather than an error.
pub fn define_ability_for(permission: Option<&RolePermission>) -> Ability {
    let Some(permission) = permission else {
        return Ability::empty();
    };

    permission
        .menus
        .iter()
        .flat_map(|menu| {
            menu.accesses
                .iter()
                .filter(|access| access.granted())
                .map(move |access| Capability::new(&access.name, &menu.name))
        })
        .collect()
}
