//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay before `attempt` (1-based retry number); zero for the first call.
///
/// The delay doubles from `base_ms` up to `max_ms`, plus up to 10% jitter.
/// With `base_ms == max_ms` the spacing is constant.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
