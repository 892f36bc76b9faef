use rate_engine_core::rate_limiters::{RefillStrategy, TokenBucketConfig, TokenBucketCore};
use rate_engine_core::{ConfigError, Uint};

fn new_bucket(
    capacity: Uint,
    period: Uint,
    tokens_per_period: Uint,
    strategy: RefillStrategy,
) -> TokenBucketCore {
    TokenBucketConfig::new(capacity, period, tokens_per_period)
        .with_strategy(strategy)
        .try_into()
        .unwrap()
}

fn drain(bucket: &mut TokenBucketCore, tick: Uint) {
    while bucket.decide_at(tick).unwrap().allowed {}
}

#[test]
fn strategies_agree_at_whole_periods() {
    for strategy in [RefillStrategy::Interval, RefillStrategy::Greedy] {
        let mut bucket = new_bucket(1, 1000, 1, strategy);
        assert!(bucket.decide_at(0).unwrap().allowed);

        let decision = bucket.decide_at(1000).unwrap();
        assert_eq!(decision.tokens_added, 1, "{:?}", strategy);
        assert!(decision.allowed, "{:?}", strategy);
    }
}

#[test]
fn greedy_refills_token_by_token() {
    // 4 tokens per second: one every 250 ms
    let mut greedy = new_bucket(10, 1000, 4, RefillStrategy::Greedy);
    let mut interval = new_bucket(10, 1000, 4, RefillStrategy::Interval);
    drain(&mut greedy, 0);
    drain(&mut interval, 0);

    let decision = greedy.decide_at(250).unwrap();
    assert_eq!(decision.tokens_added, 1);
    assert!(decision.allowed);
    assert!(!interval.decide_at(250).unwrap().allowed);

    assert!(!greedy.decide_at(499).unwrap().allowed);
    assert!(greedy.decide_at(500).unwrap().allowed);

    // Interval strategy releases the whole period at once
    let decision = interval.decide_at(1000).unwrap();
    assert_eq!(decision.tokens_added, 4);
}

#[test]
fn greedy_carries_fractional_time() {
    // 3 tokens per second: one every 333.33 ms
    let mut bucket = new_bucket(10, 1000, 3, RefillStrategy::Greedy);
    drain(&mut bucket, 0);

    // 400 ms buys one token; the anchor moves to 333.33, not 400
    let decision = bucket.decide_at(400).unwrap();
    assert_eq!(decision.tokens_added, 1);
    assert!(decision.allowed);

    assert!(!bucket.decide_at(666).unwrap().allowed);
    let decision = bucket.decide_at(667).unwrap();
    assert_eq!(decision.tokens_added, 1);
    assert!(decision.allowed);
}

#[test]
fn greedy_idle_time_beyond_capacity_is_spent() {
    let mut bucket = new_bucket(3, 1000, 1, RefillStrategy::Greedy);
    assert!(bucket.decide_at(0).unwrap().allowed);

    let decision = bucket.decide_at(10_000).unwrap();
    assert_eq!(decision.tokens_added, 1);
    assert_eq!(bucket.tokens(), 2);

    // The anchor caught up to 10_000 even though only one token fitted
    let decision = bucket.decide_at(10_999).unwrap();
    assert_eq!(decision.tokens_added, 0);
    assert_eq!(bucket.tokens(), 1);
}

#[test]
fn greedy_next_refill_in() {
    let mut bucket = new_bucket(4, 1000, 4, RefillStrategy::Greedy);
    bucket.decide_at(0).unwrap();
    let status = bucket.status_at(100).unwrap();
    assert_eq!(status.strategy, RefillStrategy::Greedy);
    assert_eq!(status.next_refill_in, Some(150));
}

#[test]
fn lowering_capacity_clamps_on_next_refill_pass() {
    let mut bucket = new_bucket(10, 1000, 1, RefillStrategy::Interval);
    assert!(bucket.decide_at(0).unwrap().allowed);
    assert_eq!(bucket.tokens(), 9);

    bucket
        .reconfigure(TokenBucketConfig::new(3, 1000, 1))
        .unwrap();
    // No retroactive recompute
    assert_eq!(bucket.tokens(), 9);
    assert_eq!(bucket.status_at(1).unwrap().capacity, 3);

    let decision = bucket.decide_at(1).unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.tokens_added, 0);
    assert_eq!(bucket.tokens(), 2);
}

#[test]
fn invalid_reconfigure_keeps_old_config() {
    let mut bucket = new_bucket(5, 1000, 1, RefillStrategy::Interval);
    assert_eq!(
        bucket.reconfigure(TokenBucketConfig::new(5, 0, 1)),
        Err(ConfigError::ZeroPeriod)
    );
    assert_eq!(bucket.config().period, 1000);
}

#[test]
fn switching_strategy_takes_effect_immediately() {
    let mut bucket = new_bucket(5, 1000, 2, RefillStrategy::Interval);
    drain(&mut bucket, 0);

    bucket
        .reconfigure(TokenBucketConfig::new(5, 1000, 2).with_strategy(RefillStrategy::Greedy))
        .unwrap();
    let decision = bucket.decide_at(500).unwrap();
    assert_eq!(decision.tokens_added, 1);
    assert!(decision.allowed);
}

#[test]
fn token_count_stays_within_bounds() {
    for strategy in [RefillStrategy::Interval, RefillStrategy::Greedy] {
        let mut bucket = new_bucket(4, 700, 3, strategy);
        let mut tick: Uint = 0;
        let mut seed: u32 = 12345;

        for _ in 0..2_000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            tick += Uint::from(seed >> 24) % 300;

            let before = bucket.tokens();
            let decision = bucket.decide_at(tick).unwrap();
            assert!(bucket.tokens() <= 4);
            if !decision.allowed {
                assert_eq!(bucket.tokens(), before.saturating_add(decision.tokens_added).min(4));
                assert_eq!(bucket.tokens(), 0);
            }
        }

        let totals = bucket.totals();
        assert_eq!(totals.total, 2_000);
        assert_eq!(totals.allowed + totals.denied, totals.total);
    }
}
