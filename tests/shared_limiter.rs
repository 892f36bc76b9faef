use std::sync::Arc;
use std::thread;

use rate_engine_core::rate_limiters::{
    FixedWindowConfig, FixedWindowCounterCore, TokenBucketConfig, TokenBucketCore,
};
use rate_engine_core::{ConfigError, LimiterConfig, RateLimitError, SharedLimiter, Uint};

fn shared_fixed_window(max_count: Uint) -> SharedLimiter<FixedWindowCounterCore> {
    FixedWindowCounterCore::new(FixedWindowConfig::new(max_count, 60_000))
        .unwrap()
        .into()
}

#[test]
fn test_busy_lock_reports_contention() {
    let limiter = shared_fixed_window(10);

    let inner = limiter.try_with(|_| limiter.try_decide_at(0)).unwrap();
    assert_eq!(inner, Err(RateLimitError::ContentionFailure));

    // The lock is free again afterwards
    assert!(limiter.try_decide_at(0).unwrap().is_allowed());
}

#[test]
fn test_concurrent_decisions_respect_limit() {
    let limiter = Arc::new(shared_fixed_window(100));
    let mut handles = vec![];

    for _ in 0..4 {
        let limiter = Arc::clone(&limiter);
        handles.push(thread::spawn(move || {
            let mut allowed: u32 = 0;
            let mut decided = 0;
            while decided < 50 {
                match limiter.try_decide_at(0) {
                    Ok(decision) => {
                        decided += 1;
                        if decision.is_allowed() {
                            allowed += 1;
                        }
                    }
                    Err(RateLimitError::ContentionFailure) => thread::yield_now(),
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            allowed
        }));
    }

    let allowed: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(allowed, 100);

    let totals = limiter.try_totals().unwrap();
    assert_eq!(totals.total, 200);
    assert_eq!(totals.denied, 100);
}

#[test]
fn test_poisoned_lock_is_not_contention() {
    let limiter = Arc::new(shared_fixed_window(1));

    let poisoner = Arc::clone(&limiter);
    let result = thread::spawn(move || {
        let _ = poisoner.try_with(|_| panic!("poison the lock"));
    })
    .join();
    assert!(result.is_err());

    // Retrying never helps once the lock is poisoned
    for _ in 0..3 {
        assert_eq!(limiter.try_decide_at(0).err(), Some(RateLimitError::Poisoned));
    }
    assert_eq!(limiter.try_totals().err(), Some(RateLimitError::Poisoned));

    let limiter = Arc::try_unwrap(limiter).unwrap();
    assert!(limiter.into_inner().is_err());
}

#[test]
fn test_reconfigure_through_lock() {
    let limiter = SharedLimiter::new(
        TokenBucketCore::new(TokenBucketConfig::new(1, 1000, 1)).unwrap(),
    );
    assert!(limiter.try_decide_at(0).unwrap().is_allowed());
    assert!(!limiter.try_decide_at(0).unwrap().is_allowed());

    limiter
        .try_with(|bucket| bucket.reconfigure(TokenBucketConfig::new(3, 100, 1)))
        .unwrap()
        .unwrap();

    // Faster period now in effect
    assert!(limiter.try_decide_at(100).unwrap().is_allowed());

    limiter.try_reset_at(200).unwrap();
    let bucket = limiter.into_inner().unwrap();
    assert_eq!(bucket.tokens(), 3);
    assert_eq!(bucket.totals().total, 0);
}

#[test]
fn test_boxed_limiter_behind_lock() {
    let boxed = LimiterConfig::from(FixedWindowConfig::new(1, 1000))
        .build()
        .unwrap();
    let limiter = SharedLimiter::new(boxed);

    assert!(limiter.try_decide_at(0).unwrap().is_allowed());
    assert!(!limiter.try_decide_at(500).unwrap().is_allowed());
    assert_eq!(
        limiter.try_status_at(400).err(),
        Some(RateLimitError::ExpiredTick {
            min_acceptable_tick: 500
        })
    );
}

#[test]
fn test_boxed_limiter_reconfigured_through_lock() {
    let boxed = LimiterConfig::from(TokenBucketConfig::new(1, 1000, 1))
        .build()
        .unwrap();
    let limiter = SharedLimiter::new(boxed);

    assert!(limiter.try_decide_at(0).unwrap().is_allowed());
    assert!(!limiter.try_decide_at(0).unwrap().is_allowed());

    limiter
        .try_reconfigure(TokenBucketConfig::new(5, 100, 5).into())
        .unwrap()
        .unwrap();
    limiter.try_advance_at(100).unwrap();

    for _ in 0..5 {
        assert!(limiter.try_decide_at(100).unwrap().is_allowed());
    }
    assert!(!limiter.try_decide_at(100).unwrap().is_allowed());

    let mismatch = limiter
        .try_reconfigure(FixedWindowConfig::new(5, 100).into())
        .unwrap();
    assert!(matches!(
        mismatch,
        Err(ConfigError::AlgorithmMismatch {
            expected: "token_bucket",
            found: "fixed_window"
        })
    ));
}
