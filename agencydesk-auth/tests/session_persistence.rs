//! Session persistence across process restarts

use agencydesk_auth::{
    evaluate, AuthContext, Authorize, FileKeyValueStore, GuardDecision, GuardRequirement,
    GuardRoutes, Permission, RestoreOutcome, Role, Session, UserClass, UserId, UserProfile,
};
use std::sync::Arc;
use tempfile::TempDir;

fn admin_profile() -> UserProfile {
    UserProfile {
        id: UserId::from("12"),
        name: "Morgan".to_string(),
        email: "morgan@agency.test".to_string(),
        roles: [Role::from("admin")].into_iter().collect(),
        permissions: [Permission::from("view_clients"), Permission::from("edit_clients")]
            .into_iter()
            .collect(),
    }
}

fn open(dir: &TempDir) -> AuthContext {
    let storage = FileKeyValueStore::new(dir.path()).unwrap();
    AuthContext::new(Arc::new(storage))
}

#[test]
fn test_commit_survives_restart() {
    let dir = TempDir::new().unwrap();

    let first = open(&dir);
    first.restore_all();
    first
        .admin()
        .commit(Session::new(UserClass::Admin, admin_profile(), "tok-1"))
        .unwrap();
    drop(first);

    let second = open(&dir);
    let outcomes = second.restore_all();
    assert!(outcomes.contains(&(UserClass::Admin, RestoreOutcome::Restored)));
    assert!(outcomes.contains(&(UserClass::Staff, RestoreOutcome::Empty)));

    let snapshot = second.admin().snapshot();
    assert_eq!(second.admin().token().as_deref(), Some("tok-1"));
    assert!(snapshot.has_role("admin"));
    assert!(snapshot.has_all_permissions(&["view_clients", "edit_clients"]));
}

#[test]
fn test_logout_survives_restart() {
    let dir = TempDir::new().unwrap();

    let first = open(&dir);
    first
        .admin()
        .commit(Session::new(UserClass::Admin, admin_profile(), "tok-1"))
        .unwrap();
    first.admin().clear().unwrap();

    let second = open(&dir);
    second.restore_all();
    assert!(!second.admin().is_authenticated());
}

#[test]
fn test_corrupt_file_is_discarded_and_store_stays_usable() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("session.json"), "{not json").unwrap();

    let first = open(&dir);
    let outcomes = first.restore_all();
    assert!(outcomes.contains(&(UserClass::Admin, RestoreOutcome::Discarded)));
    assert!(!first.admin().is_authenticated());
    assert!(!first.admin().snapshot().is_loading());

    first
        .admin()
        .commit(Session::new(UserClass::Admin, admin_profile(), "tok-2"))
        .unwrap();
    drop(first);

    let second = open(&dir);
    let outcomes = second.restore_all();
    assert!(outcomes.contains(&(UserClass::Admin, RestoreOutcome::Restored)));
    assert!(outcomes.contains(&(UserClass::Staff, RestoreOutcome::Empty)));
    assert_eq!(second.admin().token().as_deref(), Some("tok-2"));
}

#[test]
fn test_guard_waits_for_restore() {
    let dir = TempDir::new().unwrap();
    let seeded = open(&dir);
    seeded
        .admin()
        .commit(Session::new(UserClass::Admin, admin_profile(), "tok-1"))
        .unwrap();

    let ctx = open(&dir);
    let requirement = GuardRequirement::new().roles(["admin"]);
    let routes = GuardRoutes::new("/login", "/403");

    assert_eq!(
        evaluate(&ctx.admin().snapshot(), &requirement, &routes),
        GuardDecision::Loading
    );

    ctx.restore_all();
    assert_eq!(
        evaluate(&ctx.admin().snapshot(), &requirement, &routes),
        GuardDecision::Authorized
    );
}

#[test]
fn test_route_guard_watch_follows_store() {
    use agencydesk_auth::{GuardView, RecordingNavigator, RouteGuard};
    use std::sync::Mutex;

    let dir = TempDir::new().unwrap();
    let ctx = open(&dir);
    let navigator = Arc::new(RecordingNavigator::new());
    let guard = RouteGuard::new(
        GuardRequirement::new().roles(["super_admin"]),
        GuardRoutes::new("/login", "/403"),
        navigator.clone(),
    );

    let views = Arc::new(Mutex::new(Vec::new()));
    let sink = views.clone();
    let rx = ctx.admin().subscribe();

    tokio_test::block_on(async move {
        let watcher = tokio::spawn(guard.watch(rx, move |view| sink.lock().unwrap().push(view)));
        tokio::task::yield_now().await;

        ctx.restore_all();
        tokio::task::yield_now().await;
        ctx.admin()
            .commit(Session::new(UserClass::Admin, admin_profile(), "tok-1"))
            .unwrap();
        tokio::task::yield_now().await;

        drop(ctx);
        let _ = watcher.await;
    });

    let views = views.lock().unwrap();
    assert_eq!(views.first(), Some(&GuardView::Placeholder));
    assert_eq!(views.last(), Some(&GuardView::Fallback));
    assert_eq!(navigator.redirects().first().map(String::as_str), Some("/login"));
}
