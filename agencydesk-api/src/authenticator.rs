//! Authenticator - turns credentials into a committed session

use crate::auth_api::{AuthApi, Credentials, LoginGrant};
use crate::error::AuthError;
use agencydesk_auth::{AuthContext, Permission, Role, Session, UserClass, UserId, UserProfile};
use agencydesk_core::{AgencyResult, DemoLoginConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Token handed out by the local demo login
pub const DEMO_TOKEN: &str = "demo-token";

const DEMO_PERMISSIONS: &[&str] = &[
    "view_clients",
    "view_contracts",
    "view_quotations",
    "view_tasks",
    "view_meetings",
    "view_marketing_documents",
];

/// Result of re-validating a restored token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Nothing to verify
    NoSession,
    /// Token accepted; the user profile was refreshed
    Confirmed,
    /// Token rejected; the session was cleared
    Rejected,
    /// Backend not reachable; the restored session was kept
    Unreachable,
    /// A login or logout overtook the check; its result was dropped
    Superseded,
}

pub struct Authenticator {
    api: Arc<dyn AuthApi>,
    context: AuthContext,
    demo_login: Option<DemoLoginConfig>,
}

impl Authenticator {
    pub fn new(api: Arc<dyn AuthApi>, context: AuthContext) -> Self {
        Self {
            api,
            context,
            demo_login: None,
        }
    }

    /// Enable the local demo shortcut for staff logins
    pub fn with_demo_login(mut self, demo_login: Option<DemoLoginConfig>) -> Self {
        if demo_login.is_some() {
            warn!("Demo login is enabled; matching staff credentials never reach the backend");
        }
        self.demo_login = demo_login;
        self
    }

    pub fn context(&self) -> &AuthContext {
        &self.context
    }

    /// Authenticate and commit the resulting session.
    ///
    /// On any failure the session store is left untouched. When a newer login
    /// or a logout for the same class happened while this request was in
    /// flight, the result is dropped with [`AuthError::Superseded`].
    pub async fn login(
        &self,
        class: UserClass,
        credentials: Credentials,
    ) -> Result<Session, AuthError> {
        credentials.validate()?;

        let store = self.context.store(class);
        let ticket = store.begin_request();
        debug!(class = %class, ticket = ticket.sequence(), "Login started");

        let grant = match self.demo_grant(class, &credentials) {
            Some((grant, latency)) => {
                tokio::time::sleep(latency).await;
                grant
            }
            None => self.api.login(class, &credentials).await.inspect_err(|e| {
                warn!(class = %class, error = %e, "Login failed");
            })?,
        };

        let session =
            Session::new(class, grant.user, grant.token).with_token_type(grant.token_type);

        if !store
            .commit_fenced(ticket, session.clone())
            .map_err(AuthError::Storage)?
        {
            return Err(AuthError::Superseded);
        }

        info!(
            class = %class,
            user = %session.user.display_string(),
            "Login succeeded"
        );
        Ok(session)
    }

    /// Drop the session immediately and notify the backend in the background.
    ///
    /// The notification is spawned on the current tokio runtime when there is
    /// one; its failures are logged and otherwise ignored.
    pub fn logout(&self, class: UserClass) -> AgencyResult<Option<JoinHandle<()>>> {
        let store = self.context.store(class);
        let authorization = store
            .snapshot()
            .session()
            .map(Session::authorization_header);

        let cleared = store.clear();

        let notification = match (authorization, tokio::runtime::Handle::try_current()) {
            (Some(authorization), Ok(runtime)) => {
                let api = Arc::clone(&self.api);
                Some(runtime.spawn(async move {
                    match api.logout(class, &authorization).await {
                        Ok(()) => debug!(class = %class, "Backend acknowledged logout"),
                        Err(e) => {
                            warn!(class = %class, error = %e, "Logout notification failed")
                        }
                    }
                }))
            }
            (Some(_), Err(_)) => {
                debug!(class = %class, "No runtime; skipping logout notification");
                None
            }
            (None, _) => None,
        };

        cleared.map(|_| notification)
    }

    /// Re-validate the current token against the backend
    pub async fn verify(&self, class: UserClass) -> Result<VerifyOutcome, AuthError> {
        let store = self.context.store(class);
        let Some(current) = store.snapshot().session().cloned() else {
            return Ok(VerifyOutcome::NoSession);
        };

        let ticket = store.begin_request();
        match self
            .api
            .profile(class, &current.authorization_header())
            .await
        {
            Ok(user) => {
                let refreshed = Session::new(class, user, current.token.clone())
                    .with_token_type(current.token_type.clone());
                let committed = store
                    .commit_fenced(ticket, refreshed)
                    .map_err(AuthError::Storage)?;
                Ok(if committed {
                    VerifyOutcome::Confirmed
                } else {
                    VerifyOutcome::Superseded
                })
            }
            Err(AuthError::InvalidCredentials) => {
                if !store.clear_fenced(ticket).map_err(AuthError::Storage)? {
                    return Ok(VerifyOutcome::Superseded);
                }
                info!(class = %class, "Restored token was rejected; session cleared");
                Ok(VerifyOutcome::Rejected)
            }
            Err(AuthError::Network { message }) => {
                warn!(class = %class, error = %message, "Could not verify restored session");
                Ok(VerifyOutcome::Unreachable)
            }
            Err(other) => Err(other),
        }
    }

    fn demo_grant(&self, class: UserClass, credentials: &Credentials) -> Option<(LoginGrant, Duration)> {
        let demo = self.demo_login.as_ref()?;
        if class != UserClass::Staff
            || credentials.email != demo.email
            || credentials.password != demo.password
        {
            return None;
        }

        debug!("Using demo login");
        let user = UserProfile {
            id: UserId::from("demo"),
            name: "Demo Employee".to_string(),
            email: demo.email.clone(),
            roles: [Role::from("employee")].into_iter().collect(),
            permissions: DEMO_PERMISSIONS.iter().map(|p| Permission::from(*p)).collect(),
        };

        Some((
            LoginGrant {
                token: DEMO_TOKEN.to_string(),
                token_type: "Bearer".to_string(),
                user,
            },
            Duration::from_millis(demo.latency_ms),
        ))
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("context", &self.context)
            .field("demo_login", &self.demo_login.is_some())
            .finish_non_exhaustive()
    }
}
