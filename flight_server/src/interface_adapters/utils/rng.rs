use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

fn seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Returns an identifier unique within this process, used to tag WebSocket subscribers
/// and their log spans.
///
/// Seeded from the wall clock so ids from consecutive runs rarely collide in shared logs,
/// then strictly increasing.
pub fn rand_id() -> u64 {
    static NEXT: OnceLock<AtomicU64> = OnceLock::new();
    NEXT.get_or_init(|| AtomicU64::new(seed()))
        .fetch_add(1, Ordering::Relaxed)
}
