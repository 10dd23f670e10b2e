use crate::domain::PlayerId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Returns a fresh opaque player id such as `p-3f9a0c1d5e7b2468`.
///
/// Ids are random rather than sequential so clients can't guess each other's.
pub fn player_id() -> PlayerId {
    format!("p-{:016x}", rand::random::<u64>())
}

/// Process-unique connection id for correlating logs.
pub fn conn_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
