//! Tests for the backoff calculator

use std::time::Duration;

use super::BackoffStrategy;

#[test]
fn test_backoff_first_attempt() {
    let backoff = BackoffStrategy::new(100, 30_000);
    assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
}

#[test]
fn test_backoff_exponential_growth() {
    let backoff = BackoffStrategy::new(100, 30_000);

    assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
    assert_eq!(backoff.delay_for(1), Duration::from_millis(200));
    assert_eq!(backoff.delay_for(2), Duration::from_millis(400));
    assert_eq!(backoff.delay_for(3), Duration::from_millis(800));
    assert_eq!(backoff.delay_for(4), Duration::from_millis(1600));
}

#[test]
fn test_backoff_max_limit() {
    let backoff = BackoffStrategy::new(100, 1000);

    assert_eq!(backoff.delay_for(10), Duration::from_millis(1000));
    assert_eq!(backoff.delay_for(20), Duration::from_millis(1000));
}

#[test]
fn test_backoff_custom_multiplier() {
    let backoff = BackoffStrategy::new(100, 30_000).with_multiplier(3.0);

    assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
    assert_eq!(backoff.delay_for(1), Duration::from_millis(300));
    assert_eq!(backoff.delay_for(2), Duration::from_millis(900));
}

#[test]
fn test_backoff_multiplier_clamped() {
    let backoff = BackoffStrategy::new(100, 30_000).with_multiplier(0.5);
    // Clamped to 1.0: delays never shrink below the initial value
    assert_eq!(backoff.delay_for(5), Duration::from_millis(100));
}

#[test]
fn test_backoff_with_jitter_stays_in_bounds() {
    let backoff = BackoffStrategy::new(1000, 30_000).with_jitter(true);

    for attempt in 0..5 {
        let delay = backoff.delay_for(0);
        assert!(
            delay >= Duration::from_millis(750) && delay <= Duration::from_millis(1250),
            "attempt {}: delay {:?} outside the ±25% jitter band",
            attempt,
            delay
        );
    }
}

#[test]
fn test_backoff_zero_initial_clamped() {
    let backoff = BackoffStrategy::new(0, 1000);
    assert_eq!(backoff.initial_delay(), Duration::from_millis(1));
}

#[test]
fn test_backoff_default() {
    let backoff = BackoffStrategy::default();
    assert_eq!(backoff.initial_delay(), Duration::from_millis(100));
    assert_eq!(backoff.max_delay(), Duration::from_millis(30_000));
}
