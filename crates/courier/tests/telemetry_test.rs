//! Global subscriber installation.
//!
//! Kept to a single test: the global subscriber can only be set once per
//! process.

#[test]
fn test_second_initialization_is_rejected() {
    assert!(courier::init_json_telemetry().is_ok());
    assert!(courier::init_console_telemetry().is_err());
    assert!(courier::init_json_telemetry().is_err());

    tracing::info!(provider = "test", "Logging after initialization");
}
