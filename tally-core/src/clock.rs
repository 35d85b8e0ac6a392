//! Strictly increasing wall-clock nanosecond timestamps.
//!
//! Claim contexts are matched by `(server_id, timestamp)` string equality, so
//! two requests on the same node must never observe the same timestamp. The
//! raw OS clock does not promise that on coarse tick sources; this helper
//! bumps past the last handed-out value when the clock stalls or steps back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static LAST: AtomicU64 = AtomicU64::new(0);

/// Nanoseconds since the Unix epoch, strictly increasing per process.
pub fn unix_nanos() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let mut last = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => last = observed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_strictly_increase() {
        let mut prev = 0;
        for _ in 0..10_000 {
            let ts = unix_nanos();
            assert!(ts > prev, "clock went backwards: {} <= {}", ts, prev);
            prev = ts;
        }
    }

    #[test]
    fn timestamps_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..1000).map(|_| unix_nanos()).collect::<Vec<_>>()))
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();
        let len = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), len, "duplicate timestamps handed out");
    }
}
