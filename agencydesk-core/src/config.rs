//! Configuration management

use crate::error::{AgencyError, AgencyResult, ErrorContext};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgencyConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub table: TableConfig,
}

/// Remote backend settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST API, e.g. `https://api.example.com/api`
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_seconds: 30,
            user_agent: format!("agencydesk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Local persisted state location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.agencydesk/data".to_string(),
        }
    }
}

impl StorageConfig {
    /// `data_dir` with a leading `~` expanded to the home directory
    pub fn resolved_data_dir(&self, home: Option<&Path>) -> std::path::PathBuf {
        match (self.data_dir.strip_prefix("~/"), home) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => std::path::PathBuf::from(&self.data_dir),
        }
    }
}

/// Endpoints and routes for one user class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassConfig {
    /// Backend login endpoint, relative to `api.base_url`
    pub login_path: String,
    /// Backend logout endpoint
    pub logout_path: String,
    /// Backend endpoint returning the current user
    pub profile_path: String,
    /// UI route unauthenticated viewers are sent to
    pub login_route: String,
}

impl ClassConfig {
    pub fn staff() -> Self {
        Self {
            login_path: "/employee/login".to_string(),
            logout_path: "/employee/logout".to_string(),
            profile_path: "/employee/me".to_string(),
            login_route: "/employee/login".to_string(),
        }
    }

    pub fn admin() -> Self {
        Self {
            login_path: "/login".to_string(),
            logout_path: "/logout".to_string(),
            profile_path: "/me".to_string(),
            login_route: "/login".to_string(),
        }
    }
}

/// Local development login that never reaches the backend.
///
/// Absent unless explicitly configured. Only the staff class accepts it, and
/// only for an exact email and password match; anything else goes to the
/// backend as usual.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemoLoginConfig {
    pub email: String,
    pub password: String,
    /// Simulated latency before the fabricated session is committed
    #[serde(default = "default_demo_latency_ms")]
    pub latency_ms: u64,
}

fn default_demo_latency_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Re-validate a restored token against the backend on startup
    pub verify_on_restore: bool,
    /// Default redirect target for role/permission failures
    pub forbidden_route: String,
    pub staff: ClassConfig,
    pub admin: ClassConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_login: Option<DemoLoginConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            verify_on_restore: false,
            forbidden_route: "/403".to_string(),
            staff: ClassConfig::staff(),
            admin: ClassConfig::admin(),
            demo_login: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableConfig {
    pub page_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

impl AgencyConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AgencyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AgencyError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AgencyResult<Self> {
        let config: AgencyConfig = toml::from_str(content).map_err(|e| AgencyError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> AgencyResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| AgencyError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content).map_err(|e| AgencyError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> AgencyResult<()> {
        if let Err(e) = url::Url::parse(&self.api.base_url) {
            return Err(AgencyError::Config {
                message: format!("api.base_url '{}' is not a valid URL", self.api.base_url),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set api.base_url to an absolute http(s) URL"),
            });
        }

        if self.api.timeout_seconds == 0 {
            return Err(invalid("api.timeout_seconds must be greater than 0"));
        }

        if self.table.page_size == 0 {
            return Err(invalid("table.page_size must be greater than 0"));
        }

        let routes = [
            ("auth.staff.login_path", &self.auth.staff.login_path),
            ("auth.staff.logout_path", &self.auth.staff.logout_path),
            ("auth.staff.profile_path", &self.auth.staff.profile_path),
            ("auth.staff.login_route", &self.auth.staff.login_route),
            ("auth.admin.login_path", &self.auth.admin.login_path),
            ("auth.admin.logout_path", &self.auth.admin.logout_path),
            ("auth.admin.profile_path", &self.auth.admin.profile_path),
            ("auth.admin.login_route", &self.auth.admin.login_route),
            ("auth.forbidden_route", &self.auth.forbidden_route),
        ];
        for (key, value) in routes {
            if !value.starts_with('/') {
                return Err(invalid(&format!("{} must start with '/'", key)));
            }
        }

        if let Some(demo) = &self.auth.demo_login {
            if demo.email.is_empty() || demo.password.is_empty() {
                return Err(invalid("auth.demo_login requires both email and password"));
            }
        }

        Ok(())
    }
}

fn invalid(message: &str) -> AgencyError {
    AgencyError::Config {
        message: message.to_string(),
        source: None,
        context: ErrorContext::new("config").with_operation("validate"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AgencyConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.auth.demo_login.is_none());
        assert!(!config.auth.verify_on_restore);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = AgencyConfig::from_toml_str(
            r#"
            [api]
            base_url = "https://backend.example.com/api"

            [auth.demo_login]
            email = "demo@example.com"
            password = "demo"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://backend.example.com/api");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.auth.forbidden_route, "/403");
        assert_eq!(config.auth.demo_login.as_ref().unwrap().latency_ms, 1000);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AgencyConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = AgencyConfig::default();
        config.table.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = AgencyConfig::default();
        config.auth.forbidden_route = "403".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolved_data_dir_expands_home() {
        let storage = StorageConfig::default();
        let resolved = storage.resolved_data_dir(Some(Path::new("/home/alex")));
        assert_eq!(resolved, Path::new("/home/alex/.agencydesk/data"));

        let absolute = StorageConfig {
            data_dir: "/var/lib/agencydesk".to_string(),
        };
        assert_eq!(
            absolute.resolved_data_dir(Some(Path::new("/home/alex"))),
            Path::new("/var/lib/agencydesk")
        );
    }
}
