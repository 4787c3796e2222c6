//! Authenticator behaviour against an in-process fake backend

use agencydesk_api::{
    AuthApi, AuthError, Authenticator, Credentials, LoginGrant, VerifyOutcome, DEMO_TOKEN,
};
use agencydesk_auth::{
    AuthContext, Authorize, MemoryKeyValueStore, Permission, Role, Session, UserClass, UserId,
    UserProfile,
};
use agencydesk_core::DemoLoginConfig;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

fn profile(name: &str, roles: &[&str]) -> UserProfile {
    UserProfile {
        id: UserId::from(name),
        name: name.to_string(),
        email: format!("{}@agency.test", name),
        roles: roles.iter().map(|r| Role::from(*r)).collect(),
        permissions: [Permission::from("view_clients")].into_iter().collect(),
    }
}

#[derive(Clone, Copy)]
enum ProfileReply {
    Accept,
    Reject,
    Offline,
    /// Wait for `release`, then accept
    Held,
}

/// Fake backend: `slow@…` logins wait for `release`, `wrong@…` are rejected
struct FakeAuthApi {
    release: Notify,
    logins: AtomicUsize,
    profiles: AtomicUsize,
    logouts: Mutex<Vec<String>>,
    profile_reply: Mutex<ProfileReply>,
}

impl FakeAuthApi {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            release: Notify::new(),
            logins: AtomicUsize::new(0),
            profiles: AtomicUsize::new(0),
            logouts: Mutex::new(Vec::new()),
            profile_reply: Mutex::new(ProfileReply::Accept),
        })
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(
        &self,
        _class: UserClass,
        credentials: &Credentials,
    ) -> Result<LoginGrant, AuthError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        let name = credentials.email.split('@').next().unwrap_or_default().to_string();

        match name.as_str() {
            "wrong" => return Err(AuthError::InvalidCredentials),
            "slow" => self.release.notified().await,
            _ => {}
        }

        Ok(LoginGrant {
            token: format!("{}-token", name),
            token_type: "Bearer".to_string(),
            user: profile(&name, &["admin"]),
        })
    }

    async fn logout(&self, _class: UserClass, authorization: &str) -> Result<(), AuthError> {
        self.logouts.lock().unwrap().push(authorization.to_string());
        Err(AuthError::Network {
            message: "backend down".to_string(),
        })
    }

    async fn profile(
        &self,
        _class: UserClass,
        _authorization: &str,
    ) -> Result<UserProfile, AuthError> {
        self.profiles.fetch_add(1, Ordering::SeqCst);
        let reply = *self.profile_reply.lock().unwrap();
        match reply {
            ProfileReply::Accept => Ok(profile("fresh", &["super_admin"])),
            ProfileReply::Held => {
                self.release.notified().await;
                Ok(profile("fresh", &["super_admin"]))
            }
            ProfileReply::Reject => Err(AuthError::InvalidCredentials),
            ProfileReply::Offline => Err(AuthError::Network {
                message: "connection refused".to_string(),
            }),
        }
    }
}

fn authenticator(api: Arc<FakeAuthApi>) -> (Arc<Authenticator>, Arc<MemoryKeyValueStore>) {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let context = AuthContext::new(kv.clone());
    context.restore_all();
    (Arc::new(Authenticator::new(api, context)), kv)
}

#[tokio::test]
async fn test_successful_login_commits_session() {
    let api = FakeAuthApi::new();
    let (auth, kv) = authenticator(api.clone());

    let session = auth
        .login(UserClass::Admin, Credentials::new("robin@agency.test", "pw"))
        .await
        .unwrap();

    assert_eq!(session.token, "robin-token");
    let store = auth.context().admin();
    assert!(store.snapshot().has_role("admin"));
    assert_eq!(kv.write_count(), 1);
    assert!(!auth.context().staff().is_authenticated());
}

#[tokio::test]
async fn test_failed_login_leaves_state_untouched() {
    let api = FakeAuthApi::new();
    let (auth, kv) = authenticator(api);

    let error = auth
        .login(UserClass::Admin, Credentials::new("wrong@agency.test", "pw"))
        .await
        .unwrap_err();

    assert!(matches!(error, AuthError::InvalidCredentials));
    assert!(!auth.context().admin().is_authenticated());
    assert_eq!(kv.write_count(), 0);
}

#[tokio::test]
async fn test_empty_credentials_never_reach_backend() {
    let api = FakeAuthApi::new();
    let (auth, _) = authenticator(api.clone());

    let error = auth
        .login(UserClass::Staff, Credentials::new("", "pw"))
        .await
        .unwrap_err();
    assert!(matches!(error, AuthError::Validation { field: "email", .. }));
    assert_eq!(api.logins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_slow_login_cannot_overwrite_newer_one() {
    let api = FakeAuthApi::new();
    let (auth, _) = authenticator(api.clone());

    let slow = tokio::spawn({
        let auth = auth.clone();
        async move {
            auth.login(UserClass::Admin, Credentials::new("slow@agency.test", "pw"))
                .await
        }
    });
    while api.logins.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    auth.login(UserClass::Admin, Credentials::new("fast@agency.test", "pw"))
        .await
        .unwrap();
    api.release.notify_one();

    let stale = slow.await.unwrap();
    assert!(matches!(stale, Err(AuthError::Superseded)));
    assert_eq!(
        auth.context().admin().token().as_deref(),
        Some("fast-token")
    );
}

#[tokio::test]
async fn test_logout_wins_over_in_flight_login() {
    let api = FakeAuthApi::new();
    let (auth, _) = authenticator(api.clone());

    let pending = tokio::spawn({
        let auth = auth.clone();
        async move {
            auth.login(UserClass::Admin, Credentials::new("slow@agency.test", "pw"))
                .await
        }
    });
    while api.logins.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    auth.logout(UserClass::Admin).unwrap();
    api.release.notify_one();

    assert!(matches!(pending.await.unwrap(), Err(AuthError::Superseded)));
    assert!(!auth.context().admin().is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_before_notifying() {
    let api = FakeAuthApi::new();
    let (auth, kv) = authenticator(api.clone());
    auth.login(UserClass::Admin, Credentials::new("robin@agency.test", "pw"))
        .await
        .unwrap();

    let notification = auth.logout(UserClass::Admin).unwrap();
    assert!(!auth.context().admin().is_authenticated());
    assert!(!kv.contains("admin_token"));

    notification.expect("runtime is available").await.unwrap();
    assert_eq!(
        *api.logouts.lock().unwrap(),
        vec!["Bearer robin-token".to_string()]
    );
}

#[test]
fn test_logout_without_runtime_is_local_only() {
    let api = FakeAuthApi::new();
    let (auth, _) = authenticator(api.clone());
    let store = auth.context().staff();
    store
        .commit(Session::new(UserClass::Staff, profile("kim", &["employee"]), "t"))
        .unwrap();

    assert!(auth.logout(UserClass::Staff).unwrap().is_none());
    assert!(!store.is_authenticated());
    assert!(api.logouts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_demo_login_is_local_and_staff_only() {
    let api = FakeAuthApi::new();
    let kv = Arc::new(MemoryKeyValueStore::new());
    let auth = Authenticator::new(api.clone(), AuthContext::new(kv)).with_demo_login(Some(
        DemoLoginConfig {
            email: "demo@agency.test".to_string(),
            password: "demo1234".to_string(),
            latency_ms: 5,
        },
    ));

    let session = auth
        .login(UserClass::Staff, Credentials::new("demo@agency.test", "demo1234"))
        .await
        .unwrap();
    assert_eq!(session.token, DEMO_TOKEN);
    assert!(session.has_role("employee"));
    assert_eq!(api.logins.load(Ordering::SeqCst), 0);

    auth.login(UserClass::Admin, Credentials::new("demo@agency.test", "demo1234"))
        .await
        .unwrap();
    assert_eq!(api.logins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_verify_outcomes() {
    let api = FakeAuthApi::new();
    let (auth, _) = authenticator(api.clone());

    assert_eq!(
        auth.verify(UserClass::Admin).await.unwrap(),
        VerifyOutcome::NoSession
    );

    auth.login(UserClass::Admin, Credentials::new("robin@agency.test", "pw"))
        .await
        .unwrap();

    *api.profile_reply.lock().unwrap() = ProfileReply::Offline;
    assert_eq!(
        auth.verify(UserClass::Admin).await.unwrap(),
        VerifyOutcome::Unreachable
    );
    assert!(auth.context().admin().is_authenticated());

    *api.profile_reply.lock().unwrap() = ProfileReply::Accept;
    assert_eq!(
        auth.verify(UserClass::Admin).await.unwrap(),
        VerifyOutcome::Confirmed
    );
    let snapshot = auth.context().admin().snapshot();
    assert!(snapshot.has_role("super_admin"));
    assert_eq!(auth.context().admin().token().as_deref(), Some("robin-token"));

    *api.profile_reply.lock().unwrap() = ProfileReply::Reject;
    assert_eq!(
        auth.verify(UserClass::Admin).await.unwrap(),
        VerifyOutcome::Rejected
    );
    assert!(!auth.context().admin().is_authenticated());
}

#[tokio::test]
async fn test_verify_overtaken_by_logout_commits_nothing() {
    let api = FakeAuthApi::new();
    let (auth, kv) = authenticator(api.clone());
    auth.login(UserClass::Admin, Credentials::new("robin@agency.test", "pw"))
        .await
        .unwrap();
    *api.profile_reply.lock().unwrap() = ProfileReply::Held;

    let pending = tokio::spawn({
        let auth = auth.clone();
        async move { auth.verify(UserClass::Admin).await }
    });
    while api.profiles.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    auth.logout(UserClass::Admin).unwrap();
    api.release.notify_one();

    assert_eq!(pending.await.unwrap().unwrap(), VerifyOutcome::Superseded);
    assert!(!auth.context().admin().is_authenticated());
    assert!(!kv.contains("admin_token"));
}

#[tokio::test]
async fn test_rejected_verify_keeps_newer_login() {
    let api = FakeAuthApi::new();
    let (auth, _) = authenticator(api.clone());
    auth.login(UserClass::Admin, Credentials::new("robin@agency.test", "pw"))
        .await
        .unwrap();

    let store = auth.context().admin();
    let ticket = store.begin_request();
    auth.login(UserClass::Admin, Credentials::new("sam@agency.test", "pw"))
        .await
        .unwrap();

    assert!(!store.clear_fenced(ticket).unwrap());
    assert_eq!(store.token().as_deref(), Some("sam-token"));
}
