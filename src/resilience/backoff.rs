//! Exponential backoff with jitter for re-armed recovery probes.

use std::time::Duration;

use rand::Rng;

/// Delay before recovery attempt `attempt`.
///
/// Attempt 0 is the initial timer and is not delayed here. Attempt `n`
/// waits `base_ms * 2^(n-1)` capped at `max_ms`, plus up to 10% jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    let capped_ms = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_ms + jitter)
}
