//! Vendor-agnostic metrics collection via a pluggable sink.
//!
//! Only available with the `observability` feature. Implement [`MetricsSink`]
//! and install it with [`set_sink`]; until then events go to a no-op sink.
//!
//! ```ignore
//! use sanpolicy_core::metrics::{MetricsSink, EvaluationStats, ReloadStats};
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! struct DenyCounter(AtomicU64);
//!
//! impl MetricsSink for DenyCounter {
//!     fn on_evaluation(&self, stats: &EvaluationStats) {
//!         if !stats.allowed {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn on_reload(&self, stats: &ReloadStats) {
//!         eprintln!("policy generation {} active", stats.generation);
//!     }
//! }
//!
//! sanpolicy_core::metrics::set_sink(Arc::new(DenyCounter(AtomicU64::new(0))));
//! ```

use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::warn;

use crate::types::PolicyBranch;

/// One engine evaluation, passed to [`MetricsSink::on_evaluation`].
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationStats {
    /// Wall-clock time of the evaluation, including the snapshot lookup.
    pub duration: Duration,
    /// Whether the request (or single identifier) was allowed.
    pub allowed: bool,
    pub branch: PolicyBranch,
    /// Number of identifiers evaluated.
    pub identifiers: usize,
}

/// A snapshot swap, passed to [`MetricsSink::on_reload`].
#[derive(Debug, Clone, Serialize)]
pub struct ReloadStats {
    pub reload_time: SystemTime,
    /// Generation of the snapshot that became current.
    pub generation: u64,
}

/// Consumer of engine metrics.
///
/// Called synchronously from evaluating threads, so implementations must be
/// cheap and must not block.
pub trait MetricsSink: Send + Sync {
    fn on_evaluation(&self, stats: &EvaluationStats);

    fn on_reload(&self, stats: &ReloadStats);
}

struct NoOpSink;

impl MetricsSink for NoOpSink {
    fn on_evaluation(&self, _stats: &EvaluationStats) {}
    fn on_reload(&self, _stats: &ReloadStats) {}
}

static SINK: Lazy<RwLock<Arc<dyn MetricsSink>>> =
    Lazy::new(|| RwLock::new(Arc::new(NoOpSink) as Arc<dyn MetricsSink>));

fn sink() -> Arc<dyn MetricsSink> {
    match SINK.read() {
        Ok(guard) => Arc::clone(&guard),
        Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
}

/// Install the global sink, replacing the previous one.
///
/// Events already dispatched to the old sink are not replayed.
pub fn set_sink(sink: Arc<dyn MetricsSink>) {
    match SINK.write() {
        Ok(mut guard) => *guard = sink,
        Err(poisoned) => {
            warn!("Metrics sink lock was poisoned, replacing the sink anyway");
            *poisoned.into_inner() = sink;
        }
    }
}

pub(crate) fn record_evaluation(
    allowed: bool,
    duration: Duration,
    branch: PolicyBranch,
    identifiers: usize,
) {
    sink().on_evaluation(&EvaluationStats {
        duration,
        allowed,
        branch,
        identifiers,
    });
}

pub(crate) fn record_reload(generation: u64) {
    sink().on_reload(&ReloadStats {
        reload_time: SystemTime::now(),
        generation,
    });
}
