//! Integration tests for health stats module.
//!
//! These tests verify that the HealthStats structure correctly tracks
//! poll results per target and renders them for the /health endpoint.

use eureka_exporter::health_stats::HealthStats;
use eureka_exporter::Target;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn targets() -> Vec<Target> {
    vec![
        Target::new("prod", "http://eureka-1:8761", None, None),
        Target::new("prod", "http://eureka-2:8761", None, None),
    ]
}

#[test]
fn test_health_stats_initialize() {
    let stats = HealthStats::new();

    let (pd_cur, pd_avg, _, _, pd_count) = stats.poll_duration_ms.snapshot();
    assert_eq!(pd_count, 0);
    assert_eq!(pd_cur, 0.0);
    assert_eq!(pd_avg, 0.0);

    assert_eq!(stats.poll_success_count.load(Ordering::Relaxed), 0);
    assert_eq!(stats.reload_count.load(Ordering::Relaxed), 0);
    assert_eq!(stats.get_poll_success_rate(), 100.0);
    assert!(!stats.all_targets_failing(), "no targets means nothing is failing");
}

#[test]
fn test_poll_results_update_counters() {
    let stats = HealthStats::new();
    let t = targets();
    stats.track_targets(&t);

    stats.record_poll_success(&t[0].key(), 12, 40.0);
    stats.record_poll_success(&t[0].key(), 10, 20.0);
    stats.record_poll_failure(&t[1].key(), "connection refused", 5.0);

    assert_eq!(stats.poll_success_count.load(Ordering::Relaxed), 2);
    assert_eq!(stats.poll_failure_count.load(Ordering::Relaxed), 1);

    let (last, avg, max, min, count) = stats.instances_per_poll.snapshot();
    assert_eq!((last, avg, max, min, count), (10.0, 11.0, 12.0, 10.0, 2));

    let rate = stats.get_poll_success_rate();
    assert!((rate - 66.666).abs() < 0.01, "rate was {}", rate);
}

#[test]
fn test_all_targets_failing() {
    let stats = HealthStats::new();
    let t = targets();
    stats.track_targets(&t);

    // Never-polled targets are not failing.
    assert!(!stats.all_targets_failing());

    stats.record_poll_failure(&t[0].key(), "timeout", 1.0);
    assert!(!stats.all_targets_failing());

    stats.record_poll_failure(&t[1].key(), "timeout", 1.0);
    assert!(stats.all_targets_failing());

    stats.record_poll_success(&t[1].key(), 3, 1.0);
    assert!(!stats.all_targets_failing());
}

#[test]
fn test_unknown_target_is_ignored() {
    let stats = HealthStats::new();
    stats.track_targets(&targets());

    stats.record_poll_failure("gone_http://old:8761", "timeout", 1.0);

    assert!(stats.target("gone_http://old:8761").is_none());
    assert_eq!(stats.poll_failure_count.load(Ordering::Relaxed), 1);
    assert!(!stats.all_targets_failing());
}

#[test]
fn test_render_table_lists_targets() {
    let stats = HealthStats::new();
    let t = targets();
    stats.track_targets(&t);
    stats.record_poll_success(&t[0].key(), 7, 12.5);
    stats.record_poll_failure(&t[1].key(), "registry answered with status 503", 3.0);
    stats.record_reload();

    let table = stats.render_table();

    assert!(table.contains("HEALTH ENDPOINT - EXPORTER INTERNAL STATS"));
    assert!(table.contains("poll_duration (ms)"));
    assert!(table.contains("prod http://eureka-1:8761 | instances: 7"));
    assert!(table.contains("last success: never"));
    assert!(table.contains("last error: registry answered with status 503"));
    assert!(table.contains("reloads: 1"));
}

#[test]
fn test_concurrent_recording() {
    let stats = Arc::new(HealthStats::new());
    let t = targets();
    stats.track_targets(&t);
    let key = t[0].key();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let stats = Arc::clone(&stats);
            let key = key.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    stats.record_poll_success(&key, 1, 1.0);
                    stats.record_http_request();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(stats.poll_success_count.load(Ordering::Relaxed), 800);
    assert_eq!(stats.http_request_timestamps.count_last_minute(), 800);
}
