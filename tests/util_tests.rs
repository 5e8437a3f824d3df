//! Tests for utility modules (retry, cache, frequency tracking).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqman::error::ApiError;
use reqman::util::cache::TtlCache;
use reqman::util::frequency::{FrequencyConfig, FrequencyTracker};
use reqman::util::retry::RetryPolicy;

#[tokio::test(start_paused = true)]
async fn retry_policy_retries_retryable_errors_until_success() {
    let policy = RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(100),
        ..Default::default()
    };
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_task = attempts.clone();

    let task = tokio::spawn(async move {
        policy
            .execute(|| {
                let attempts = attempts_for_task.clone();
                async move {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(ApiError::api(503, "unavailable"))
                    } else {
                        Ok::<_, ApiError>("ok")
                    }
                }
            })
            .await
    });

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_secs(1)).await;
    let result = task.await.unwrap();

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_makes_max_retries_plus_one_attempts() {
    let policy = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(10),
        ..Default::default()
    };
    let attempts = Arc::new(AtomicUsize::new(0));

    let result = policy
        .execute(|| {
            let attempts = attempts.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ApiError::api(500, format!("failure {n}")))
            }
        })
        .await;

    match result {
        Err(ApiError::Api { message, .. }) => assert_eq!(message, "failure 2"),
        other => panic!("expected api error, got {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_policy_with_zero_retries_runs_once() {
    let policy = RetryPolicy {
        max_retries: 0,
        ..Default::default()
    };
    let attempts = Arc::new(AtomicUsize::new(0));

    let result = policy
        .execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ApiError::RateLimited {
                    retry_after_secs: Some(1),
                })
            }
        })
        .await;

    assert!(matches!(result, Err(ApiError::RateLimited { .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retry_policy_stops_immediately_for_configuration_errors() {
    let policy = RetryPolicy::default();
    let attempts = Arc::new(AtomicUsize::new(0));

    let result = policy
        .execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ApiError::Configuration("bad header".to_string()))
            }
        })
        .await;

    assert!(matches!(result, Err(ApiError::Configuration(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn ttl_cache_get_and_expiry() {
    let mut cache = TtlCache::new(Duration::from_secs(10), 100);

    cache.set("key-a".to_string(), "value-a".to_string());
    assert_eq!(cache.get("key-a"), Some("value-a".to_string()));

    tokio::time::advance(Duration::from_secs(10)).await;

    assert_eq!(cache.get("key-a"), None);
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn ttl_cache_set_overwrites_and_restarts_ttl() {
    let mut cache = TtlCache::new(Duration::from_secs(10), 100);

    cache.set("k", 1);
    tokio::time::advance(Duration::from_secs(8)).await;
    cache.set("k", 2);
    tokio::time::advance(Duration::from_secs(8)).await;

    assert_eq!(cache.get("k"), Some(2));
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn ttl_cache_sweeps_expired_entries_when_over_threshold() {
    let mut cache = TtlCache::new(Duration::from_secs(1), 4);

    for i in 0..3 {
        cache.set(i, i);
    }
    tokio::time::advance(Duration::from_secs(2)).await;
    cache.set(100, 100);
    assert_eq!(cache.len(), 4);

    cache.set(101, 101);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&100), Some(100));
    assert_eq!(cache.get(&101), Some(101));
}

#[tokio::test(start_paused = true)]
async fn ttl_cache_keeps_fresh_entries_when_sweeping() {
    let mut cache = TtlCache::new(Duration::from_secs(60), 2);

    cache.set("a", 1);
    cache.set_with_ttl("short", 2, Duration::from_secs(1));
    tokio::time::advance(Duration::from_secs(5)).await;
    cache.set("b", 3);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("a"), Some(1));
    assert_eq!(cache.get("short"), None);
}

#[test]
fn ttl_cache_invalidate_and_clear() {
    let mut cache = TtlCache::new(Duration::from_secs(60), 100);
    cache.set("/posts/1".to_string(), 1);
    cache.set("/posts/2".to_string(), 2);
    cache.set("/users/1".to_string(), 3);

    assert_eq!(cache.invalidate_where(|k| k.starts_with("/posts")), 2);
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn frequency_tracker_prunes_beyond_horizon() {
    let mut tracker = FrequencyTracker::new(FrequencyConfig::default());

    tracker.track("/feed");
    tokio::time::advance(Duration::from_secs(11 * 60)).await;
    tracker.track("/feed");

    assert_eq!(tracker.endpoint_count("/feed"), 1);
}

#[tokio::test(start_paused = true)]
async fn frequency_tracker_counts_windows_across_endpoints() {
    let mut tracker = FrequencyTracker::new(FrequencyConfig::default());

    tracker.track("/a");
    tokio::time::advance(Duration::from_secs(90)).await;
    tracker.track("/a");
    tracker.track("/b");

    assert_eq!(tracker.requests_within(Duration::from_secs(60)), 2);
    assert_eq!(tracker.requests_within(Duration::from_secs(300)), 3);
}

#[tokio::test(start_paused = true)]
async fn burst_counter_flags_threshold_and_resets_after_window() {
    let mut tracker = FrequencyTracker::new(FrequencyConfig {
        burst_threshold: 3,
        ..Default::default()
    });

    let flags: Vec<bool> = (0..4).map(|_| tracker.track("/poll")).collect();
    assert_eq!(flags, vec![false, false, false, true]);
    assert_eq!(tracker.burst_count(), 4);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(!tracker.track("/poll"));
    assert_eq!(tracker.burst_count(), 1);

    tracker.clear();
    assert_eq!(tracker.burst_count(), 0);
    assert_eq!(tracker.requests_within(Duration::from_secs(600)), 0);
}
