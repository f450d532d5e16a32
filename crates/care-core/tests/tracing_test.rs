//! Tests for tracing initialization.

use std::sync::Mutex;

use care_core::tracing::init_tracing;

static TRACING_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn init_with_filter_from_env() {
    let _lock = TRACING_MUTEX.lock().unwrap();
    std::env::set_var("CARE_LOG", "care_storage=debug,care_migrate=info");
    init_tracing();
    std::env::remove_var("CARE_LOG");
}

#[test]
fn init_is_idempotent() {
    let _lock = TRACING_MUTEX.lock().unwrap();
    init_tracing();
    init_tracing();
    tracing::info!("still alive");
}
