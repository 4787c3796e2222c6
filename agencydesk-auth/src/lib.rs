//! AgencyDesk Auth - who is acting and what may they see
//!
//! This crate owns the client-side authorization model of the dashboard:
//!
//! - **Session Store** ([`SessionStore`]): one per user class, persisted to a
//!   local key-value store and rehydrated on startup
//! - **Authorization Evaluator** ([`Authorize`]): pure role/permission checks
//! - **Route Guard** ([`RouteGuard`]): loading-aware gating with redirects
//! - **Component Gate** ([`ComponentGate`]): gating without redirects
//!
//! Enforcement lives on the backend; everything here only decides what the
//! client shows.

pub mod context;
pub mod gate;
pub mod guard;
pub mod identity;
pub mod permissions;
pub mod session;

pub use context::AuthContext;
pub use gate::ComponentGate;
pub use guard::{
    evaluate, DenialReason, GuardDecision, GuardRequirement, GuardRoutes, GuardView, MatchMode,
    Navigator, RecordingNavigator, RouteGuard,
};
pub use identity::{Permission, Role, Session, UserClass, UserId, UserProfile};
pub use permissions::Authorize;
pub use session::{
    FileKeyValueStore, KeyValueStore, LoadPhase, MemoryKeyValueStore, RequestTicket,
    RestoreOutcome, SessionSnapshot, SessionStore,
};
