use rate_engine_core::rate_limiters::{TokenBucketConfig, TokenBucketCore};
use rate_engine_core::{ConfigError, RateLimitError, RequestTotals, Uint};

fn new_token_bucket(capacity: Uint, period: Uint, tokens_per_period: Uint) -> TokenBucketCore {
    TokenBucketCore::new(TokenBucketConfig::new(capacity, period, tokens_per_period)).unwrap()
}

#[test]
fn test_bucket_starts_full() {
    let mut bucket = new_token_bucket(3, 1000, 1);
    assert_eq!(bucket.tokens(), 3);

    for _ in 0..3 {
        assert!(bucket.decide_at(0).unwrap().allowed);
    }
    assert!(!bucket.decide_at(0).unwrap().allowed);
    assert_eq!(bucket.tokens(), 0);
}

#[test]
fn test_refill_after_whole_period() {
    let mut bucket = new_token_bucket(1, 1000, 1);
    assert!(bucket.decide_at(0).unwrap().allowed);

    // One millisecond short of a period: nothing refilled
    let decision = bucket.decide_at(999).unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.tokens_added, 0);

    let decision = bucket.decide_at(1000).unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.tokens_added, 1);
}

#[test]
fn test_anchor_keeps_leftover_time() {
    let mut bucket = new_token_bucket(5, 1000, 2);
    for _ in 0..5 {
        assert!(bucket.decide_at(0).unwrap().allowed);
    }

    // 1.5 periods elapsed: one period converted, anchor moves to 1000, not 1500
    let decision = bucket.decide_at(1500).unwrap();
    assert_eq!(decision.tokens_added, 2);
    assert!(decision.allowed);

    // The half period left over completes at 2000
    let decision = bucket.decide_at(2000).unwrap();
    assert_eq!(decision.tokens_added, 2);
    assert!(decision.allowed);
    assert_eq!(bucket.tokens(), 2);
}

#[test]
fn test_refill_capped_at_capacity() {
    let mut bucket = new_token_bucket(3, 100, 10);
    assert!(bucket.decide_at(0).unwrap().allowed);
    assert_eq!(bucket.tokens(), 2);

    // 10 periods * 10 tokens, but only 1 fits
    let decision = bucket.decide_at(1000).unwrap();
    assert_eq!(decision.tokens_added, 1);
    assert!(decision.allowed);
    assert_eq!(bucket.tokens(), 2);
}

#[test]
fn test_denial_does_not_consume() {
    let mut bucket = new_token_bucket(1, 1000, 1);
    assert!(bucket.decide_at(0).unwrap().allowed);
    assert!(!bucket.decide_at(1).unwrap().allowed);
    assert!(!bucket.decide_at(2).unwrap().allowed);
    assert_eq!(bucket.tokens(), 0);

    assert_eq!(
        bucket.totals(),
        RequestTotals {
            total: 3,
            allowed: 1,
            denied: 2
        }
    );
}

#[test]
fn test_status_does_not_refill() {
    let mut bucket = new_token_bucket(2, 1000, 1);
    assert!(bucket.decide_at(0).unwrap().allowed);

    let status = bucket.status_at(400).unwrap();
    assert_eq!(status.current_tokens, 1);
    assert_eq!(status.capacity, 2);
    assert_eq!(status.last_refill, 0);
    assert_eq!(status.last_refill_formatted, "00:00:00.000");
    assert_eq!(status.next_refill_in, Some(600));

    // Long after the period the level shown is still the consumed one
    let status = bucket.status_at(5000).unwrap();
    assert_eq!(status.current_tokens, 1);
    assert_eq!(status.next_refill_in, Some(0));
    assert_eq!(bucket.tokens(), 1);

    // An explicit refill pass brings it up
    assert_eq!(bucket.refill_at(5000).unwrap(), 1);
    let status = bucket.status_at(5000).unwrap();
    assert_eq!(status.current_tokens, 2);
    assert_eq!(status.last_refill, 5000);
}

#[test]
fn test_status_is_idempotent() {
    let mut bucket = new_token_bucket(4, 1000, 1);
    bucket.decide_at(10).unwrap();
    let first = bucket.status_at(20).unwrap();
    let second = bucket.status_at(20).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_expired_tick() {
    let mut bucket = new_token_bucket(5, 1000, 1);
    assert!(bucket.decide_at(100).unwrap().allowed);

    assert_eq!(
        bucket.decide_at(50),
        Err(RateLimitError::ExpiredTick {
            min_acceptable_tick: 100
        })
    );
    assert!(bucket.status_at(99).is_err());
    assert!(bucket.refill_at(0).is_err());

    // Rejected calls leave the bucket untouched
    assert_eq!(bucket.tokens(), 4);
    assert_eq!(bucket.totals().total, 1);
}

#[test]
fn test_zero_period_rejected() {
    let result = TokenBucketCore::new(TokenBucketConfig::new(5, 0, 1));
    assert!(matches!(result, Err(ConfigError::ZeroPeriod)));
}

#[test]
fn test_zero_capacity_denies_everything() {
    let mut bucket = new_token_bucket(0, 10, 5);
    for tick in [0, 10, 100, 10_000] {
        let decision = bucket.decide_at(tick).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.tokens_added, 0);
    }
}

#[test]
fn test_zero_tokens_per_period_never_refills() {
    let mut bucket = new_token_bucket(1, 1000, 0);
    assert!(bucket.decide_at(0).unwrap().allowed);
    assert!(!bucket.decide_at(1_000_000).unwrap().allowed);
    assert_eq!(bucket.status_at(1_000_000).unwrap().next_refill_in, None);
}

#[test]
fn test_reset_refills_and_reanchors() {
    let mut bucket = new_token_bucket(2, 1000, 1);
    bucket.decide_at(0).unwrap();
    bucket.decide_at(0).unwrap();
    bucket.decide_at(0).unwrap();

    bucket.reset_at(500);
    assert_eq!(bucket.tokens(), 2);
    assert_eq!(bucket.totals(), RequestTotals::default());
    assert_eq!(bucket.config(), &TokenBucketConfig::new(2, 1000, 1));

    bucket.decide_at(500).unwrap();
    bucket.decide_at(500).unwrap();
    // Anchored at 500, so 999 is still inside the first period
    let decision = bucket.decide_at(999).unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.tokens_added, 0);
    assert!(bucket.decide_at(1500).unwrap().allowed);
}

#[test]
fn test_starting_at_anchors_refill() {
    let mut bucket =
        TokenBucketCore::starting_at(TokenBucketConfig::new(1, 1000, 1), 10_000).unwrap();
    assert!(bucket.decide_at(10_000).unwrap().allowed);
    assert_eq!(bucket.decide_at(10_999).unwrap().tokens_added, 0);
    assert_eq!(bucket.decide_at(11_000).unwrap().tokens_added, 1);
}
