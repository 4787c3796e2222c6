//! Remote auth endpoints
//!
//! [`AuthApi`] is the seam between the authenticator and the backend;
//! [`HttpAuthApi`] is the reqwest implementation.

use crate::error::AuthError;
use crate::http::{create_http_client, endpoint_url, Envelope};
use agencydesk_auth::{UserClass, UserProfile};
use agencydesk_core::{AgencyConfig, AgencyResult, ApiConfig, AuthConfig, ClassConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument};
use url::Url;

/// Email/password pair typed into a login form
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.email.trim().is_empty() {
            return Err(AuthError::Validation {
                message: "Email is required".to_string(),
                field: "email",
            });
        }
        if self.password.is_empty() {
            return Err(AuthError::Validation {
                message: "Password is required".to_string(),
                field: "password",
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What a successful login hands back
#[derive(Debug, Clone, PartialEq)]
pub struct LoginGrant {
    pub token: String,
    pub token_type: String,
    pub user: UserProfile,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, class: UserClass, credentials: &Credentials)
        -> Result<LoginGrant, AuthError>;

    async fn logout(&self, class: UserClass, authorization: &str) -> Result<(), AuthError>;

    /// Current user for `authorization`; a rejected token is `InvalidCredentials`
    async fn profile(&self, class: UserClass, authorization: &str)
        -> Result<UserProfile, AuthError>;
}

/// Endpoints and routes for `class`
pub fn class_config(config: &AuthConfig, class: UserClass) -> &ClassConfig {
    match class {
        UserClass::Staff => &config.staff,
        UserClass::Admin => &config.admin,
    }
}

#[derive(Debug, Clone)]
struct ClassEndpoints {
    login: Url,
    logout: Url,
    profile: Url,
}

impl ClassEndpoints {
    fn resolve(base_url: &str, class: &ClassConfig) -> AgencyResult<Self> {
        Ok(Self {
            login: endpoint_url(base_url, &class.login_path)?,
            logout: endpoint_url(base_url, &class.logout_path)?,
            profile: endpoint_url(base_url, &class.profile_path)?,
        })
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    user_type: &'a str,
}

#[derive(Deserialize)]
struct LoginData {
    token: Option<String>,
    token_type: Option<String>,
    user: Option<UserProfile>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileData {
    Wrapped { user: UserProfile },
    Bare(UserProfile),
}

/// Auth endpoints over HTTP
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    staff: ClassEndpoints,
    admin: ClassEndpoints,
}

impl HttpAuthApi {
    pub fn new(client: reqwest::Client, api: &ApiConfig, auth: &AuthConfig) -> AgencyResult<Self> {
        Ok(Self {
            client,
            staff: ClassEndpoints::resolve(&api.base_url, &auth.staff)?,
            admin: ClassEndpoints::resolve(&api.base_url, &auth.admin)?,
        })
    }

    pub fn from_config(config: &AgencyConfig) -> AgencyResult<Self> {
        let client = create_http_client(&config.api)?;
        Self::new(client, &config.api, &config.auth)
    }

    fn endpoints(&self, class: UserClass) -> &ClassEndpoints {
        match class {
            UserClass::Staff => &self.staff,
            UserClass::Admin => &self.admin,
        }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(
        &self,
        class: UserClass,
        credentials: &Credentials,
    ) -> Result<LoginGrant, AuthError> {
        let url = self.endpoints(class).login.clone();
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(&LoginRequest {
                email: &credentials.email,
                password: &credentials.password,
                user_type: class.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::from_status(status));
        }

        parse_login(&response.text().await?)
    }

    #[instrument(skip(self, authorization))]
    async fn logout(&self, class: UserClass, authorization: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoints(class).logout.clone())
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::from_status(status));
        }
        Ok(())
    }

    #[instrument(skip(self, authorization))]
    async fn profile(
        &self,
        class: UserClass,
        authorization: &str,
    ) -> Result<UserProfile, AuthError> {
        let response = self
            .client
            .get(self.endpoints(class).profile.clone())
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::from_status(status));
        }

        let envelope: Envelope<ProfileData> = serde_json::from_str(&response.text().await?)
            .map_err(|e| AuthError::malformed(format!("invalid profile payload: {}", e)))?;

        match envelope.data {
            Some(ProfileData::Wrapped { user }) | Some(ProfileData::Bare(user)) => Ok(user),
            None => Err(AuthError::malformed("profile response has no data")),
        }
    }
}

/// Parse a login response body into a grant
pub fn parse_login(body: &str) -> Result<LoginGrant, AuthError> {
    let envelope: Envelope<LoginData> = serde_json::from_str(body)
        .map_err(|e| AuthError::malformed(format!("invalid login payload: {}", e)))?;

    if !envelope.success {
        return Err(AuthError::malformed(
            envelope
                .message
                .unwrap_or_else(|| "success flag is false".to_string()),
        ));
    }

    let data = envelope
        .data
        .ok_or_else(|| AuthError::malformed("login response has no data"))?;

    let token = data
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::malformed("login response has no token"))?;
    let user = data
        .user
        .ok_or_else(|| AuthError::malformed("login response has no user"))?;

    Ok(LoginGrant {
        token,
        token_type: data.token_type.unwrap_or_else(|| "Bearer".to_string()),
        user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_login() {
        let grant = parse_login(
            r#"{
                "success": true,
                "data": {
                    "token": "abc",
                    "token_type": "Bearer",
                    "user": {"id": 4, "name": "Lee", "email": "lee@agency.test",
                             "roles": ["admin"], "permissions": ["view_clients"]}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(grant.token, "abc");
        assert_eq!(grant.user.id.as_str(), "4");
        assert_eq!(grant.user.roles.len(), 1);
    }

    #[test]
    fn test_parse_rejects_missing_pieces() {
        let no_token = r#"{"success": true, "data": {"user": {"id": 1, "name": "a", "email": "b"}}}"#;
        let no_user = r#"{"success": true, "data": {"token": "abc"}}"#;
        let failed = r#"{"success": false, "message": "Account locked"}"#;

        for body in [no_token, no_user, failed, "<html>", r#"{"success": true}"#] {
            assert!(
                matches!(parse_login(body), Err(AuthError::MalformedResponse { .. })),
                "{}",
                body
            );
        }
    }

    #[test]
    fn test_credentials_validation_and_redaction() {
        let creds = Credentials::new("  ", "secret");
        assert!(matches!(
            creds.validate(),
            Err(AuthError::Validation { field: "email", .. })
        ));
        assert!(Credentials::new("a@b.test", "").validate().is_err());
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_endpoints_follow_class_config() {
        let config = AgencyConfig::default();
        let api = HttpAuthApi::from_config(&config).unwrap();
        assert_eq!(
            api.endpoints(UserClass::Staff).login.path(),
            "/api/employee/login"
        );
        assert_eq!(api.endpoints(UserClass::Admin).profile.path(), "/api/me");
    }
}
