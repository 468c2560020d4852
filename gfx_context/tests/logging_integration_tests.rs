//! Integration tests for the logging system
//!
//! These tests verify that factory and context activity reaches a custom
//! logger. No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use gfx_context::gfx::log::{self, LogEntry, LogSeverity, Logger};
use gfx_context::gfx::mock::MockBackend;
use gfx_context::gfx::GraphicsContextFactory;
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn messages(entries: &Arc<Mutex<Vec<LogEntry>>>, source: &str) -> Vec<(LogSeverity, String)> {
    entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.source == source)
        .map(|e| (e.severity, e.message.clone()))
        .collect()
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_factory_logs_state_transitions() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    let factory = GraphicsContextFactory::new(MockBackend::with_default_gpus());
    factory.get_or_create_shared().unwrap().unwrap();
    factory.shutdown().unwrap();

    log::reset_logger();

    let logged = messages(&entries, "gfx::factory");
    let debug: Vec<&str> = logged
        .iter()
        .filter(|(s, _)| *s == LogSeverity::Debug)
        .map(|(_, m)| m.as_str())
        .collect();
    assert_eq!(
        debug,
        vec![
            "Uninitialized -> VulkanInstanceReady",
            "VulkanInstanceReady -> ContextCreated",
            "ContextCreated -> Disposed",
        ]
    );
    assert!(logged
        .iter()
        .any(|(s, m)| *s == LogSeverity::Info && m.contains("Mock Discrete GPU")));
}

#[test]
#[serial]
fn test_integration_initialization_failure_logged_as_error() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    let factory = GraphicsContextFactory::new(MockBackend::with_default_gpus().failing_initialize());
    assert!(factory.get_or_create_shared().unwrap().is_none());

    log::reset_logger();

    let captured = entries.lock().unwrap();
    let error = captured
        .iter()
        .find(|e| e.source == "gfx::factory" && e.severity == LogSeverity::Error)
        .expect("failure should be logged");
    assert!(error.message.contains("mock instance creation failed"));
    assert!(error.file.is_some());
    assert!(error.line.is_some());
}

#[test]
#[serial]
fn test_integration_wrong_thread_logged() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    let factory = Arc::new(GraphicsContextFactory::new(MockBackend::with_default_gpus()));
    let remote = factory.clone();
    std::thread::spawn(move || {
        assert!(remote.available_gpus().is_err());
    })
    .join()
    .unwrap();

    log::reset_logger();

    let logged = messages(&entries, "gfx::factory");
    assert!(logged
        .iter()
        .any(|(s, m)| *s == LogSeverity::Error && m.contains("available_gpus")));
}
