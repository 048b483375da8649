use once_cell::sync::Lazy;
use std::time::{Duration, Instant};

static CLOCK_ANCHOR: Lazy<Instant> = Lazy::new(Instant::now);

/// Stand-in for "never" when a timeout does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Monotonic clock in seconds, anchored at first use within this process.
///
/// Outlets stamp samples with this clock. Values are only comparable within
/// one process; no cross-host synchronisation is attempted.
pub fn local_clock() -> f64 {
    CLOCK_ANCHOR.elapsed().as_secs_f64()
}

/// `start + timeout`, saturating to a far-future instant instead of panicking
pub fn deadline_from(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// Deadline `timeout` from now; see [`deadline_from`]
pub fn deadline_after(timeout: Duration) -> Instant {
    deadline_from(Instant::now(), timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_clock_is_monotonic() {
        let a = local_clock();
        let b = local_clock();
        assert!(b >= a);
        assert!(a >= 0.0);
    }

    #[test]
    fn test_deadline_saturates_on_huge_timeout() {
        let start = Instant::now();
        let deadline = deadline_from(start, Duration::MAX);
        assert!(deadline > start + Duration::from_secs(24 * 60 * 60));

        let near = deadline_from(start, Duration::from_millis(10));
        assert_eq!(near, start + Duration::from_millis(10));
        assert!(deadline_after(Duration::from_secs(u64::MAX)) > Instant::now());
    }
}
