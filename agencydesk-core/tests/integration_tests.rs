//! Integration tests for agencydesk-core infrastructure

use agencydesk_core::{
    config_error, init_logging, validation_error, AgencyConfig, AgencyError, DemoLoginConfig,
    LogFormat, LoggingConfig,
};

#[test]
fn test_config_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = AgencyConfig::default();
    config.api.base_url = "https://backend.example.com/api".to_string();
    config.auth.verify_on_restore = true;
    config.auth.demo_login = Some(DemoLoginConfig {
        email: "demo@agency.test".to_string(),
        password: "demo-pass".to_string(),
        latency_ms: 5,
    });

    config.save_to_file(&path).unwrap();
    let loaded = AgencyConfig::from_file(&path).unwrap();

    assert_eq!(loaded, config);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_missing_config_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AgencyConfig::from_file(dir.path().join("absent.toml"));

    match result {
        Err(AgencyError::Config { context, .. }) => {
            assert_eq!(context.operation.as_deref(), Some("read_file"));
        }
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_error_macros() {
    let error = config_error!("Invalid config", "test");
    assert!(!error.is_recoverable());
    assert_eq!(error.context().unwrap().recovery_suggestions.len(), 2);

    let error = validation_error!("email is required", "email", "employees");
    match &error {
        AgencyError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("email")),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_logging_initialization() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        format: LogFormat::Compact,
        include_location: false,
        include_thread: false,
        log_to_file: false,
        log_file_path: None,
        enable_span_timing: false,
        filter_directives: vec!["agencydesk_core=debug".to_string()],
    };

    // A global subscriber may already be installed by another test
    let _ = init_logging(&config);

    let missing_path = LoggingConfig {
        log_to_file: true,
        log_file_path: None,
        ..LoggingConfig::default()
    };
    assert!(init_logging(&missing_path).is_err());
}
