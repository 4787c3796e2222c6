//! Route Guard
//!
//! Decides whether a protected view may render for the current session:
//! `Loading -> {Authorized, Unauthenticated, Forbidden}`. Authorization
//! failures are routing decisions, never errors.

use crate::identity::{Permission, Role};
use crate::permissions::Authorize;
use crate::session::SessionSnapshot;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;
use tracing::debug;

/// How a list of required permissions is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// At least one permission must be held
    #[default]
    Any,
    /// Every permission must be held
    All,
}

/// Declarative requirement attached to a protected view or fragment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GuardRequirement {
    pub required_roles: Vec<Role>,
    pub required_permissions: Vec<Permission>,
    pub match_mode: MatchMode,
    /// Overrides the forbidden route for this view
    pub redirect_target: Option<String>,
}

/// Why a requirement was not met
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    MissingRole,
    MissingPermission,
}

impl GuardRequirement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.required_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.required_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn redirect_to(mut self, target: impl Into<String>) -> Self {
        self.redirect_target = Some(target.into());
        self
    }

    /// Check roles first, then permissions. Empty lists impose nothing.
    pub fn check<A: Authorize + ?Sized>(&self, subject: &A) -> Result<(), DenialReason> {
        if !self.required_roles.is_empty() && !subject.has_any_role(&self.required_roles) {
            return Err(DenialReason::MissingRole);
        }

        if !self.required_permissions.is_empty() {
            let granted = match self.match_mode {
                MatchMode::Any => subject.has_any_permission(&self.required_permissions),
                MatchMode::All => subject.has_all_permissions(&self.required_permissions),
            };
            if !granted {
                return Err(DenialReason::MissingPermission);
            }
        }

        Ok(())
    }

    pub fn is_satisfied_by<A: Authorize + ?Sized>(&self, subject: &A) -> bool {
        self.check(subject).is_ok()
    }
}

/// Where the guard sends viewers it turns away
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardRoutes {
    /// Login route of the user class the guarded view belongs to
    pub login_route: String,
    /// Default target for role/permission failures
    pub forbidden_route: String,
}

impl GuardRoutes {
    pub fn new(login_route: impl Into<String>, forbidden_route: impl Into<String>) -> Self {
        Self {
            login_route: login_route.into(),
            forbidden_route: forbidden_route.into(),
        }
    }
}

impl Default for GuardRoutes {
    fn default() -> Self {
        Self::new("/login", "/403")
    }
}

/// Result of evaluating a requirement against a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is still being restored; no decision yet
    Loading,
    Authorized,
    Unauthenticated { login_route: String },
    Forbidden { target: String, reason: DenialReason },
}

impl GuardDecision {
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GuardDecision::Unauthenticated { login_route } => Some(login_route),
            GuardDecision::Forbidden { target, .. } => Some(target),
            GuardDecision::Loading | GuardDecision::Authorized => None,
        }
    }

    pub fn view(&self) -> GuardView {
        match self {
            GuardDecision::Loading => GuardView::Placeholder,
            GuardDecision::Authorized => GuardView::Children,
            GuardDecision::Unauthenticated { .. } | GuardDecision::Forbidden { .. } => {
                GuardView::Fallback
            }
        }
    }
}

/// What the host should render for the guarded subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardView {
    /// Spinner while the session rehydrates
    Placeholder,
    Children,
    Fallback,
}

/// Pure evaluation of a requirement against a session snapshot
pub fn evaluate(
    snapshot: &SessionSnapshot,
    requirement: &GuardRequirement,
    routes: &GuardRoutes,
) -> GuardDecision {
    if snapshot.is_loading() {
        return GuardDecision::Loading;
    }

    if !snapshot.is_authenticated() {
        return GuardDecision::Unauthenticated {
            login_route: routes.login_route.clone(),
        };
    }

    match requirement.check(snapshot) {
        Ok(()) => GuardDecision::Authorized,
        Err(reason) => GuardDecision::Forbidden {
            target: requirement
                .redirect_target
                .clone()
                .unwrap_or_else(|| routes.forbidden_route.clone()),
            reason,
        },
    }
}

/// Redirect side effect supplied by the host (router, CLI, test)
pub trait Navigator: Send + Sync {
    fn redirect(&self, target: &str);
}

/// Navigator that records redirects instead of performing them
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, target: &str) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.to_string());
    }
}

impl<N: Navigator + ?Sized> Navigator for std::sync::Arc<N> {
    fn redirect(&self, target: &str) {
        (**self).redirect(target)
    }
}

/// Stateful guard for one protected view.
///
/// A redirect fires when the decision changes into a failing one, or when a
/// newly committed session fails again. Re-evaluating the same session with
/// the same outcome does not fire again.
pub struct RouteGuard<N: Navigator> {
    requirement: GuardRequirement,
    routes: GuardRoutes,
    navigator: N,
    last: Option<GuardDecision>,
    last_snapshot: Option<SessionSnapshot>,
}

impl<N: Navigator> RouteGuard<N> {
    pub fn new(requirement: GuardRequirement, routes: GuardRoutes, navigator: N) -> Self {
        Self {
            requirement,
            routes,
            navigator,
            last: None,
            last_snapshot: None,
        }
    }

    pub fn requirement(&self) -> &GuardRequirement {
        &self.requirement
    }

    /// Swap the requirement; the next evaluation decides afresh
    pub fn set_requirement(&mut self, requirement: GuardRequirement) {
        if requirement != self.requirement {
            self.requirement = requirement;
            self.last = None;
        }
    }

    pub fn last_decision(&self) -> Option<&GuardDecision> {
        self.last.as_ref()
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Evaluate and fire the redirect side effect if the decision or the
    /// session changed
    pub fn evaluate(&mut self, snapshot: &SessionSnapshot) -> GuardView {
        let decision = evaluate(snapshot, &self.requirement, &self.routes);
        let view = decision.view();

        let same_session = self
            .last_snapshot
            .as_ref()
            .is_some_and(|last| last.same_session(snapshot));
        self.last_snapshot = Some(snapshot.clone());

        if !same_session || self.last.as_ref() != Some(&decision) {
            debug!(?decision, "Route guard decision changed");
            if let Some(target) = decision.redirect_target() {
                self.navigator.redirect(target);
            }
            self.last = Some(decision);
        }

        view
    }

    /// Re-evaluate on every snapshot published by a session store until the
    /// store goes away, handing each resulting view to `render`.
    pub async fn watch<F>(mut self, mut updates: watch::Receiver<SessionSnapshot>, mut render: F)
    where
        F: FnMut(GuardView),
    {
        loop {
            let snapshot = updates.borrow_and_update().clone();
            render(self.evaluate(&snapshot));

            if updates.changed().await.is_err() {
                break;
            }
        }
    }
}
