//! Integration tests for the logging bootstrap.
//!
//! A global subscriber can only be installed once per process, so the
//! install/reinstall behaviour is exercised in a single test.

use bridge_traits::time::{ConsoleLogger, LogLevel};
use core_runtime::logging::{
    init_logging, redact_if_sensitive, redact_url_query, LogFormat, LoggingConfig,
};
use core_runtime::Error;
use std::sync::Arc;

#[test]
fn test_init_logging_only_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(Arc::new(ConsoleLogger::default()));

    init_logging(config.clone()).expect("first initialization succeeds");
    tracing::info!(target: "core_playback::session", video_id = "BV1", "Session opened");

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Warn)
        .with_filter("core_playback::danmaku=trace")
        .with_spans(true)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(config.filter.as_deref(), Some("core_playback::danmaku=trace"));
    assert!(config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
    assert!(format!("{:?}", config).contains("logger_sink: None"));
}

#[test]
fn test_stream_credentials_never_logged() {
    assert_eq!(redact_if_sensitive("access_key", "k"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("video_id", "BV1xx"), "BV1xx");
    assert_eq!(
        redact_url_query("https://upos.example/1080.m4s?e=ig8&uipk=5&sign=f00"),
        "https://upos.example/1080.m4s"
    );
}
