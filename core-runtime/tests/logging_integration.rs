//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{
    init_logging, redact_if_sensitive, sanitize_field, strip_path, LogFormat, LoggingConfig,
};

#[test]
fn test_logging_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_pii_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_pii);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}

#[test]
fn test_init_logging_only_once() {
    // One global subscriber per process: the second call must fail cleanly
    let first = init_logging(LoggingConfig::default().with_format(LogFormat::Json));
    assert!(first.is_ok());

    let second = init_logging(LoggingConfig::default());
    assert!(second.is_err());
}

#[test]
fn test_invalid_filter_is_config_error() {
    let result = init_logging(LoggingConfig::default().with_filter("core_upload=notalevel"));
    assert!(matches!(result, Err(core_runtime::Error::Config(_))));
}

#[test]
fn test_pii_redaction_user_identifiers() {
    assert_eq!(redact_if_sensitive("user_identifier", "google-oauth2|123"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("authorization", "Bearer abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("name", "Receipt March"), "Receipt March");
}

#[test]
fn test_pii_redaction_emails() {
    let redacted = redact_if_sensitive("owner", "ana@example.com");
    assert!(redacted.starts_with('a'));
    assert!(redacted.contains("[REDACTED]"));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_path_handling() {
    assert_eq!(strip_path("/var/cache/previews/1.jpg"), "1.jpg");
    assert_eq!(strip_path("D:\\scans\\doc.pdf"), "doc.pdf");
    assert_eq!(strip_path(""), "");
    assert_eq!(sanitize_field("database_path", "/data/scans.db"), "scans.db");
}
