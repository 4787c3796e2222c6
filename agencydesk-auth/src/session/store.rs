//! Session Store - single source of truth for one user class
//!
//! The current state is published as an immutable [`SessionSnapshot`] through a
//! `tokio::sync::watch` channel. A commit or clear swaps the whole snapshot in
//! one send, so readers never observe a half-updated role or permission set.

use super::storage::KeyValueStore;
use crate::identity::{Session, UserClass, UserProfile};
use agencydesk_core::AgencyResult;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Whether persisted state has been rehydrated yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    /// `restore()` has not run; guards must not decide yet
    #[default]
    Pending,
    Ready,
}

/// Immutable view of a session store at one point in time
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    phase: LoadPhase,
    session: Option<Arc<Session>>,
}

impl SessionSnapshot {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn ready(session: Option<Session>) -> Self {
        Self {
            phase: LoadPhase::Ready,
            session: session.map(Arc::new),
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Pending
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.session().map(|s| &s.user)
    }

    /// Whether both snapshots carry the same committed session. Every commit
    /// produces a new session, even with identical contents.
    pub fn same_session(&self, other: &SessionSnapshot) -> bool {
        match (&self.session, &other.session) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Ticket handed to an in-flight login. Only the newest ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// What `restore()` found in persistent storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    Empty,
    /// Corrupt or partial state was found and erased
    Discarded,
}

struct Inner {
    class: UserClass,
    storage: Arc<dyn KeyValueStore>,
    state: watch::Sender<SessionSnapshot>,
    /// Sequence of the latest issued ticket; commits and clears advance it too
    fence: Mutex<u64>,
}

/// Session store for one user class. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("class", &self.inner.class)
            .field("snapshot", &*self.inner.state.borrow())
            .finish()
    }
}

impl SessionStore {
    /// Create a store in the [`LoadPhase::Pending`] phase
    pub fn new(class: UserClass, storage: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::pending());
        Self {
            inner: Arc::new(Inner {
                class,
                storage,
                state,
                fence: Mutex::new(0),
            }),
        }
    }

    pub fn class(&self) -> UserClass {
        self.inner.class
    }

    /// Current state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every subsequent snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Bearer token of the current session, if any
    pub fn token(&self) -> Option<String> {
        self.inner
            .state
            .borrow()
            .session()
            .map(|s| s.token.clone())
    }

    /// Rehydrate persisted state. No server round-trip happens here.
    ///
    /// Corrupt or half-present state is erased and the store ends up
    /// unauthenticated; the failure is logged, never surfaced.
    pub fn restore(&self) -> RestoreOutcome {
        let class = self.inner.class;
        let storage = &self.inner.storage;

        let token = storage.get(class.token_key());
        let user = storage.get(class.user_key());

        let outcome = match (token, user) {
            (Ok(Some(token)), Ok(Some(user_json))) => {
                match serde_json::from_str::<UserProfile>(&user_json) {
                    Ok(user) => {
                        let session = Session::new(class, user, token);
                        info!(
                            class = %class,
                            user_id = %session.user.id,
                            "Restored persisted session"
                        );
                        self.publish(SessionSnapshot::ready(Some(session)));
                        return RestoreOutcome::Restored;
                    }
                    Err(e) => {
                        warn!(class = %class, error = %e, "Persisted user blob is corrupt");
                        RestoreOutcome::Discarded
                    }
                }
            }
            (Ok(None), Ok(None)) => RestoreOutcome::Empty,
            (Ok(_), Ok(_)) => {
                warn!(class = %class, "Persisted session is incomplete");
                RestoreOutcome::Discarded
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(class = %class, error = %e, "Failed to read persisted session");
                RestoreOutcome::Discarded
            }
        };

        if outcome == RestoreOutcome::Discarded {
            if let Err(e) = self.erase() {
                warn!(class = %class, error = %e, "Failed to discard persisted session");
            }
        }

        self.publish(SessionSnapshot::ready(None));
        outcome
    }

    /// Issue a ticket for a new in-flight request, superseding older ones
    pub fn begin_request(&self) -> RequestTicket {
        let mut fence = self.lock_fence();
        *fence += 1;
        debug!(class = %self.inner.class, sequence = *fence, "Issued request ticket");
        RequestTicket(*fence)
    }

    /// Replace the session unconditionally and persist it.
    ///
    /// Invalidates any outstanding [`RequestTicket`].
    pub fn commit(&self, session: Session) -> AgencyResult<()> {
        let mut fence = self.lock_fence();
        *fence += 1;
        self.persist_and_publish(session)
    }

    /// Commit only if `ticket` is still the newest ticket and no commit or
    /// clear happened since it was issued. Returns `Ok(false)` when stale.
    pub fn commit_fenced(&self, ticket: RequestTicket, session: Session) -> AgencyResult<bool> {
        let fence = self.lock_fence();
        if ticket.0 != *fence {
            debug!(
                class = %self.inner.class,
                ticket = ticket.0,
                latest = *fence,
                "Discarding superseded session result"
            );
            return Ok(false);
        }
        self.persist_and_publish(session)?;
        Ok(true)
    }

    /// Drop the session and erase persisted state.
    ///
    /// The in-memory session is always cleared; a failed erase is returned
    /// after the store is already unauthenticated.
    pub fn clear(&self) -> AgencyResult<()> {
        let mut fence = self.lock_fence();
        *fence += 1;

        self.publish(SessionSnapshot::ready(None));
        info!(class = %self.inner.class, "Session cleared");

        self.erase()
    }

    /// Clear only if `ticket` is still the newest ticket. Returns `Ok(false)`
    /// when a commit or clear happened since it was issued.
    pub fn clear_fenced(&self, ticket: RequestTicket) -> AgencyResult<bool> {
        let mut fence = self.lock_fence();
        if ticket.0 != *fence {
            debug!(
                class = %self.inner.class,
                ticket = ticket.0,
                latest = *fence,
                "Discarding superseded clear"
            );
            return Ok(false);
        }
        *fence += 1;

        self.publish(SessionSnapshot::ready(None));
        info!(class = %self.inner.class, "Session cleared");
        self.erase()?;
        Ok(true)
    }

    fn persist_and_publish(&self, session: Session) -> AgencyResult<()> {
        let class = self.inner.class;
        if session.class != class {
            warn!(
                store = %class,
                session = %session.class,
                "Committing a session issued for another user class"
            );
        }

        let user_json = serde_json::to_string(&session.user)?;
        self.inner.storage.set_many(&[
            (class.token_key(), session.token.as_str()),
            (class.user_key(), user_json.as_str()),
        ])?;

        info!(
            class = %class,
            user_id = %session.user.id,
            roles = session.user.roles.len(),
            permissions = session.user.permissions.len(),
            "Session committed"
        );
        self.publish(SessionSnapshot::ready(Some(session)));
        Ok(())
    }

    fn erase(&self) -> AgencyResult<()> {
        let class = self.inner.class;
        self.inner
            .storage
            .remove_many(&[class.token_key(), class.user_key()])
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        self.inner.state.send_replace(snapshot);
    }

    fn lock_fence(&self) -> std::sync::MutexGuard<'_, u64> {
        self.inner.fence.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
