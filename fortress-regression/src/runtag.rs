//! Collision-free identifier generation.
//!
//! The shared lab environment has no isolation between concurrent runs;
//! unique generated names are the only thing keeping one run's tenants out
//! of another run's assertions. Every entity name and email this harness
//! creates routes through here.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

static RUN_TAG: OnceLock<String> = OnceLock::new();
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// The per-process run tag: start timestamp plus random suffix.
///
/// Stable for the lifetime of the process so everything one run creates is
/// greppable (and cleanable) by a single substring.
#[must_use]
pub fn run_tag() -> &'static str {
    RUN_TAG.get_or_init(|| {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{millis:x}{}", &suffix[..8])
    })
}

/// Produce a name unique within this environment with overwhelming
/// probability: `<prefix>-<run tag>-<counter>`.
///
/// The atomic counter makes concurrent calls within one process distinct;
/// the run tag separates processes.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{n}", run_tag())
}

/// A unique mailbox address routed at the capture server.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{n}@mail.fortress.test", run_tag())
}

/// A short unique code (tenant codes have a length cap in the product).
#[must_use]
pub fn unique_code(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tag = run_tag();
    let tail = &tag[tag.len().saturating_sub(6)..];
    format!("{prefix}{tail}{n}")
}
