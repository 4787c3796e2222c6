//! Auth context shared by the whole client

use crate::identity::UserClass;
use crate::session::{KeyValueStore, RestoreOutcome, SessionStore};
use std::sync::Arc;

/// The two independent session stores, one per user class, over one backend
#[derive(Debug, Clone)]
pub struct AuthContext {
    staff: SessionStore,
    admin: SessionStore,
}

impl AuthContext {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            staff: SessionStore::new(UserClass::Staff, storage.clone()),
            admin: SessionStore::new(UserClass::Admin, storage),
        }
    }

    pub fn store(&self, class: UserClass) -> &SessionStore {
        match class {
            UserClass::Staff => &self.staff,
            UserClass::Admin => &self.admin,
        }
    }

    pub fn staff(&self) -> &SessionStore {
        &self.staff
    }

    pub fn admin(&self) -> &SessionStore {
        &self.admin
    }

    /// Rehydrate both stores
    pub fn restore_all(&self) -> Vec<(UserClass, RestoreOutcome)> {
        UserClass::ALL
            .iter()
            .map(|class| (*class, self.store(*class).restore()))
            .collect()
    }
}
