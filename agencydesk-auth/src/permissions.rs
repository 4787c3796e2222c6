//! Authorization Evaluator
//!
//! Pure, synchronous set-membership checks over a subject's roles and
//! permissions. Evaluation only reads; it never changes session state.

use crate::identity::{Permission, Role, Session, UserProfile};
use std::collections::BTreeSet;

static NO_ROLES: BTreeSet<Role> = BTreeSet::new();
static NO_PERMISSIONS: BTreeSet<Permission> = BTreeSet::new();

/// Anything that carries a role set and a permission set
pub trait Authorize {
    fn role_set(&self) -> &BTreeSet<Role>;

    fn permission_set(&self) -> &BTreeSet<Permission>;

    /// `role` is one of the subject's roles
    fn has_role(&self, role: &str) -> bool {
        self.role_set().contains(role)
    }

    /// At least one of `roles` is held. An empty list means no restriction.
    fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.is_empty() || roles.iter().any(|r| self.has_role(r.as_ref()))
    }

    /// `permission` is one of the subject's permissions
    fn can(&self, permission: &str) -> bool {
        self.permission_set().contains(permission)
    }

    /// At least one of `permissions` is held. An empty list is never satisfied;
    /// the guard layer treats an empty requirement as "no requirement" instead.
    fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions.iter().any(|p| self.can(p.as_ref()))
    }

    /// Every one of `permissions` is held
    fn has_all_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions.iter().all(|p| self.can(p.as_ref()))
    }
}

impl Authorize for UserProfile {
    fn role_set(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    fn permission_set(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }
}

impl Authorize for Session {
    fn role_set(&self) -> &BTreeSet<Role> {
        &self.user.roles
    }

    fn permission_set(&self) -> &BTreeSet<Permission> {
        &self.user.permissions
    }
}

impl<A: Authorize> Authorize for Option<A> {
    fn role_set(&self) -> &BTreeSet<Role> {
        self.as_ref().map(|a| a.role_set()).unwrap_or(&NO_ROLES)
    }

    fn permission_set(&self) -> &BTreeSet<Permission> {
        self.as_ref().map(|a| a.permission_set()).unwrap_or(&NO_PERMISSIONS)
    }
}

impl Authorize for crate::session::SessionSnapshot {
    fn role_set(&self) -> &BTreeSet<Role> {
        self.session()
            .map(|s| &s.user.roles)
            .unwrap_or(&NO_ROLES)
    }

    fn permission_set(&self) -> &BTreeSet<Permission> {
        self.session()
            .map(|s| &s.user.permissions)
            .unwrap_or(&NO_PERMISSIONS)
    }
}
