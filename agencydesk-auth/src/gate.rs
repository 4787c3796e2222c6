//! Component Gate
//!
//! Same evaluation as the route guard, without redirects and without a
//! loading placeholder: the fragment renders or the fallback does.

use crate::guard::{GuardRequirement, MatchMode};
use crate::identity::{Permission, Role};
use crate::permissions::Authorize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentGate {
    requirement: GuardRequirement,
}

impl ComponentGate {
    pub fn new(requirement: GuardRequirement) -> Self {
        Self { requirement }
    }

    /// Role-only gate (any of `roles`)
    pub fn roles<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        Self::new(GuardRequirement::new().roles(roles))
    }

    /// Permission-only gate
    pub fn permissions<I, P>(permissions: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        Self::new(
            GuardRequirement::new()
                .permissions(permissions)
                .match_mode(mode),
        )
    }

    pub fn requirement(&self) -> &GuardRequirement {
        &self.requirement
    }

    pub fn allows<A: Authorize + ?Sized>(&self, subject: &A) -> bool {
        self.requirement.is_satisfied_by(subject)
    }

    pub fn render<A, T>(
        &self,
        subject: &A,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> T
    where
        A: Authorize + ?Sized,
    {
        if self.allows(subject) {
            children()
        } else {
            fallback()
        }
    }

    /// Render `children` or nothing
    pub fn render_or_nothing<A, T>(&self, subject: &A, children: impl FnOnce() -> T) -> Option<T>
    where
        A: Authorize + ?Sized,
    {
        self.allows(subject).then(children)
    }
}
