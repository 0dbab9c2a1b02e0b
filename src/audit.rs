//! Development-time leak auditor
//!
//! A process-wide counted registry keyed by call-site identity. Every stream
//! and subscription construction site increments its counter; disposal
//! decrements it. A report at test teardown flags any site whose counter is
//! still nonzero: a stream or subscription that was created there and never
//! disposed.
//!
//! Tracking is off by default and gated behind [`set_tracking`], so release
//! builds and uninterested callers pay a single atomic load per construction
//! and nothing else. The auditor is diagnostics only; stream semantics never
//! depend on it.

use std::collections::HashMap;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use lazy_static::lazy_static;

static TRACKING: AtomicBool = AtomicBool::new(false);

lazy_static! {
    /// Live-acquisition counts keyed by `file:line:column` of the call site.
    static ref REGISTRY: Mutex<HashMap<String, i64>> = Mutex::new(HashMap::new());
}

/// Raised by [`try_report`] when call sites still hold live streams or
/// subscriptions. Intended for test teardown, not production paths.
#[derive(Debug, Clone, thiserror::Error)]
#[error("leak audit failed: {leaked} call site(s) hold live streams or subscriptions")]
pub struct LeakError {
    /// Number of call sites with a nonzero counter.
    pub leaked: usize,
}

/// Turn construction/disposal tracking on or off, process-wide.
pub fn set_tracking(enabled: bool) {
    TRACKING.store(enabled, Ordering::Relaxed);
}

/// Whether tracking is currently enabled.
pub fn tracking_enabled() -> bool {
    TRACKING.load(Ordering::Relaxed)
}

fn registry() -> std::sync::MutexGuard<'static, HashMap<String, i64>> {
    // A poisoned registry only means some other test panicked mid-update;
    // the counts themselves are still usable diagnostics.
    REGISTRY.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Count one acquisition (stream or subscription construction) at `site`.
pub fn record_acquire(site: &'static Location<'static>) {
    *registry().entry(site.to_string()).or_insert(0) += 1;
}

/// Count one release (disposal) at `site`. Releasing a site that was never
/// acquired is a silent no-op.
pub fn record_release(site: &'static Location<'static>) {
    let mut counts = registry();
    if let Some(count) = counts.get_mut(&site.to_string()) {
        *count -= 1;
        if *count == 0 {
            counts.remove(&site.to_string());
        }
    }
}

/// Snapshot of every site with a nonzero counter, sorted by site.
pub fn outstanding() -> Vec<(String, i64)> {
    let mut leaks: Vec<(String, i64)> = registry()
        .iter()
        .filter(|(_, count)| **count != 0)
        .map(|(site, count)| (site.clone(), *count))
        .collect();
    leaks.sort();
    leaks
}

/// Log every leaked site at warn level and return `Err` if any exist.
pub fn try_report() -> Result<(), LeakError> {
    let leaks = outstanding();
    for (site, count) in &leaks {
        log::warn!("leak audit: {} outstanding acquisition(s) at {}", count, site);
    }
    if leaks.is_empty() {
        Ok(())
    } else {
        Err(LeakError {
            leaked: leaks.len(),
        })
    }
}

/// Report leaks, returning the number of call sites with a nonzero counter.
///
/// With `assert_on_leak` set, a nonzero result becomes a panic instead.
/// That panic is the one hard failure in this crate and is meant for test
/// teardown, not production paths.
pub fn report(assert_on_leak: bool) -> usize {
    match try_report() {
        Ok(()) => 0,
        Err(error) => {
            if assert_on_leak {
                panic!("{}", error);
            }
            error.leaked
        }
    }
}

/// Clear all counters. Call between test runs sharing the process.
pub fn reset() {
    registry().clear();
}
