use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn now_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Ids stay unique even when several entries are created within the same
/// millisecond, so the timestamp alone is not enough.
pub(crate) fn new_entry_id() -> String {
  let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
  format!("d_{}_{}", now_ms(), seq)
}
