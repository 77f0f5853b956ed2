//! Role-based permission policy for resources and metas.

use std::collections::HashMap;

/// Role granted to everybody.
pub const ANYONE: &str = "*";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PermissionMode {
    Create,
    Read,
    Update,
    Delete,
    /// Shorthand for all four modes when allowing or denying.
    Crud,
}

impl PermissionMode {
    fn expand(self) -> &'static [PermissionMode] {
        match self {
            PermissionMode::Crud => &[
                PermissionMode::Create,
                PermissionMode::Read,
                PermissionMode::Update,
                PermissionMode::Delete,
            ],
            PermissionMode::Create => &[PermissionMode::Create],
            PermissionMode::Read => &[PermissionMode::Read],
            PermissionMode::Update => &[PermissionMode::Update],
            PermissionMode::Delete => &[PermissionMode::Delete],
        }
    }
}

/// Allowed and denied roles per mode. Denials win; with nothing allowed at all, every
/// non-denied role passes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Permission {
    allowed: HashMap<PermissionMode, Vec<String>>,
    denied: HashMap<PermissionMode, Vec<String>>,
}

impl Permission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mode: PermissionMode, roles: &[&str]) -> Self {
        Self::new().and_allow(mode, roles)
    }

    pub fn deny(mode: PermissionMode, roles: &[&str]) -> Self {
        Self::new().and_deny(mode, roles)
    }

    pub fn and_allow(mut self, mode: PermissionMode, roles: &[&str]) -> Self {
        for m in mode.expand() {
            self.allowed
                .entry(*m)
                .or_default()
                .extend(roles.iter().map(|r| r.to_string()));
        }
        self
    }

    pub fn and_deny(mut self, mode: PermissionMode, roles: &[&str]) -> Self {
        for m in mode.expand() {
            self.denied
                .entry(*m)
                .or_default()
                .extend(roles.iter().map(|r| r.to_string()));
        }
        self
    }

    pub fn has_permission<S: AsRef<str>>(&self, mode: PermissionMode, roles: &[S]) -> bool {
        let matches = |list: Option<&Vec<String>>| {
            list.map(|list| {
                list.iter()
                    .any(|r| r == ANYONE || roles.iter().any(|role| role.as_ref() == r))
            })
            .unwrap_or(false)
        };
        for m in mode.expand() {
            if matches(self.denied.get(m)) {
                return false;
            }
        }
        if self.allowed.is_empty() {
            return true;
        }
        mode.expand().iter().all(|m| matches(self.allowed.get(m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_and_deny() {
        let permission = Permission::allow(PermissionMode::Read, &[ANYONE])
            .and_allow(PermissionMode::Crud, &["admin"])
            .and_deny(PermissionMode::Delete, &["intern"]);

        assert!(permission.has_permission(PermissionMode::Read, &["guest"]));
        assert!(!permission.has_permission(PermissionMode::Update, &["guest"]));
        assert!(permission.has_permission(PermissionMode::Update, &["admin"]));
        assert!(permission.has_permission(PermissionMode::Delete, &["admin"]));
        assert!(!permission.has_permission(PermissionMode::Delete, &["admin", "intern"]));
        assert!(!permission.has_permission(PermissionMode::Create, &[] as &[&str]));
    }

    #[test]
    fn deny_only_policy_allows_the_rest() {
        let permission = Permission::deny(PermissionMode::Delete, &["guest"]);
        assert!(permission.has_permission(PermissionMode::Delete, &["admin"]));
        assert!(!permission.has_permission(PermissionMode::Delete, &["guest"]));
        assert!(permission.has_permission(PermissionMode::Read, &["guest"]));
        assert!(Permission::new().has_permission(PermissionMode::Crud, &["anyone"]));
    }
}
