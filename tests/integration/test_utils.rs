//! Shared test utilities for integration tests.

use parking_lot::Mutex;

/// Serializes tests that pin the process-wide clock, so parallel test
/// threads never see each other's override.
static CLOCK_MUTEX: Mutex<()> = Mutex::new(());

/// Run `f` with the filesystem clock pinned to a fixed unix timestamp.
pub fn with_fixed_clock<T>(ts: i64, f: impl FnOnce() -> T) -> T {
    let _guard = CLOCK_MUTEX.lock();
    chronofs::types::set_timestamp_override(Some(ts));
    let out = f();
    chronofs::types::set_timestamp_override(None);
    out
}
