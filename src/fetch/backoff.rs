// Jittered exponential backoff.
//
// The jitter is multiplicative and uniform-ish in [0.5, 1.0) of the
// exponential base, so concurrent callers retrying after the same fault
// don't land on the API in lockstep. Sourced from the clock's nanosecond
// component rather than a `rand` dependency.

use std::time::Duration;

/// Compute the delay before retry number `attempt` (1-indexed).
///
/// The un-jittered base is `initial * 2^(attempt-1)`; the returned value
/// is that base scaled by a factor in [0.5, 1.0), clamped to `max`.
/// Always in `[0, max]` — there is no error case.
pub fn backoff_delay(attempt: u32, initial: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let base = initial.saturating_mul(1u32 << exponent);

    let jittered = Duration::from_secs_f64(base.as_secs_f64() * jitter_factor());

    jittered.min(max)
}

/// A factor in [0.5, 1.0), varied by the nanosecond component of the
/// current time. Not cryptographic, just desynchronizing.
fn jitter_factor() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    0.5 + (nanos % 500) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const INITIAL: Duration = Duration::from_millis(1000);
    const MAX: Duration = Duration::from_secs(3600);

    #[test]
    fn test_delay_within_bounds_for_all_attempts() {
        for attempt in 1..=40 {
            let d = backoff_delay(attempt, INITIAL, MAX);
            assert!(d <= MAX, "attempt {attempt} exceeded max: {d:?}");
        }
    }

    #[test]
    fn test_first_attempt_jitters_around_initial() {
        // Base for attempt 1 is exactly `initial`; jitter keeps the result
        // in [initial/2, initial).
        for _ in 0..50 {
            let d = backoff_delay(1, INITIAL, MAX);
            assert!(d >= INITIAL / 2, "below jitter floor: {d:?}");
            assert!(d < INITIAL, "at or above un-jittered base: {d:?}");
        }
    }

    #[test]
    fn test_base_doubles_per_attempt() {
        // Attempt 4's base is 8x initial. Even the minimum jitter of
        // attempt 4 (4x initial) clears the maximum jitter of attempt 2
        // (just under 2x initial).
        for _ in 0..50 {
            let early = backoff_delay(2, INITIAL, MAX);
            let late = backoff_delay(4, INITIAL, MAX);
            assert!(late > early, "expected growth: {early:?} vs {late:?}");
        }
    }

    #[test]
    fn test_clamped_to_max() {
        let max = Duration::from_secs(5);
        // 2^19 seconds of base dwarfs the cap — every draw must clamp.
        for _ in 0..20 {
            assert_eq!(backoff_delay(20, INITIAL, max), max);
        }
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let d = backoff_delay(u32::MAX, INITIAL, MAX);
        assert!(d <= MAX);
    }

    #[test]
    fn test_zero_initial_yields_zero() {
        assert_eq!(backoff_delay(3, Duration::ZERO, MAX), Duration::ZERO);
    }
}
