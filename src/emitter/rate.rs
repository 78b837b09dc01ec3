use std::time::{Duration, Instant};

/// Global packet budget, integer millitokens so the bound is exact.
///
/// Credit accrues at `max_pps` tokens per second. The bucket starts with one
/// tick's allowance so the first pass after start can emit, and leftover
/// credit after a pass is clamped below one whole token. With that clamp the
/// grant over any one-second window never exceeds `max_pps` packets.
#[derive(Debug)]
pub struct TokenBucket {
    max_pps: u32,
    carry_millitokens: u64,
    last_refill: Option<Instant>,
}

impl TokenBucket {
    pub fn new(max_pps: u32, tick: Duration) -> TokenBucket {
        TokenBucket {
            max_pps,
            carry_millitokens: max_pps as u64 * tick.as_millis() as u64,
            last_refill: None,
        }
    }

    /// Refills for the elapsed time and returns how many whole packets may
    /// go out this pass.
    pub fn begin_tick(&mut self, now: Instant) -> u64 {
        if let Some(last) = self.last_refill {
            let elapsed_ms = now.saturating_duration_since(last).as_millis() as u64;
            self.carry_millitokens += self.max_pps as u64 * elapsed_ms;
        }
        self.last_refill = Some(now);

        self.carry_millitokens / 1000
    }

    /// Consumes the packets actually sent and clamps the remainder.
    pub fn spend(&mut self, packets: u64) {
        self.carry_millitokens = self.carry_millitokens.saturating_sub(packets * 1000).min(999);
    }
}

#[cfg(test)]
mod test_token_bucket {
    use super::*;

    #[test]
    fn test_first_tick_grants_one_interval() {
        let mut bucket = TokenBucket::new(1000, Duration::from_millis(25));
        let now = Instant::now();

        assert_eq!(bucket.begin_tick(now), 25);
        bucket.spend(25);
        assert_eq!(bucket.begin_tick(now + Duration::from_millis(25)), 25);
    }

    #[test]
    fn test_fractional_accrual() {
        // 5 pps at a 25 ms tick: one packet every 8 ticks.
        let mut bucket = TokenBucket::new(5, Duration::from_millis(25));
        let start = Instant::now();

        let mut granted = 0u64;
        for tick in 0..40u64 {
            let now = start + Duration::from_millis(tick * 25);
            let sendable = bucket.begin_tick(now);
            granted += sendable;
            bucket.spend(sendable);
        }

        assert_eq!(granted, 5);
    }

    #[test]
    fn test_unspent_credit_does_not_burst() {
        let mut bucket = TokenBucket::new(1000, Duration::from_millis(25));
        let start = Instant::now();

        // A long idle stretch with nothing sent must not bank more than a
        // fraction of a token.
        let sendable = bucket.begin_tick(start);
        bucket.spend(0);
        assert!(sendable >= 25);

        let mut granted = 0u64;
        for tick in 1..=40u64 {
            let now = start + Duration::from_millis(tick * 25);
            let sendable = bucket.begin_tick(now);
            granted += sendable;
            bucket.spend(sendable);
        }

        // One second of credit plus less than one leftover token.
        assert!(granted <= 1000);
    }
}
