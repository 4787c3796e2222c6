//! AgencyDesk API - backend calls made on behalf of a session
//!
//! - [`Authenticator`]: login (remote or local demo), logout, token verify
//! - [`ResourceClient`]: bearer-authenticated CRUD over typed entity records

pub mod auth_api;
pub mod authenticator;
pub mod error;
pub mod http;
pub mod resources;

pub use auth_api::{class_config, parse_login, AuthApi, Credentials, HttpAuthApi, LoginGrant};
pub use authenticator::{Authenticator, VerifyOutcome, DEMO_TOKEN};
pub use error::{ApiError, AuthError};
pub use http::{create_http_client, endpoint_url, Envelope, PageMeta};
pub use resources::{Draft, ListQuery, Page, RecordId, Resource, ResourceClient};
