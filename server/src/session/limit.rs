use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

/// How fast a single connection may submit input lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPolicy {
    /// Minimum spacing between accepted packets. Zero disables limiting.
    pub interval: Duration,
    /// Packets accepted back to back before spacing applies.
    pub burst: u32,
}

impl InputPolicy {
    pub fn new(interval_ms: u64, burst: u32) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            burst,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0, 1)
    }
}

/// Per-connection input limiter. Over-quota packets are rejected, not queued.
pub struct InputLimiter {
    limiter: DefaultDirectRateLimiter,
}

impl InputLimiter {
    /// `None` when the policy disables limiting.
    pub fn new(policy: &InputPolicy) -> Option<Self> {
        let burst = NonZeroU32::new(policy.burst.max(1))?;
        let quota = Quota::with_period(policy.interval)?.allow_burst(burst);
        Some(Self {
            limiter: RateLimiter::direct(quota),
        })
    }

    pub fn admit(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
