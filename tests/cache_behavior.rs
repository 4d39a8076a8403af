//! TTL, fail-soft, and dedup contracts of the cache layer, verified with
//! call-counting stub adapters so no test touches the network.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{daily_series, StubAdapter};
use macro_dashboard::core::cache::CacheLayer;
use macro_dashboard::core::orchestrator::Orchestrator;
use macro_dashboard::models::FetchStatus;

fn layer_with(stub: Arc<StubAdapter>) -> CacheLayer {
    let mut orchestrator = Orchestrator::new();
    orchestrator.register(stub);
    CacheLayer::new(orchestrator)
}

#[tokio::test]
async fn cache_hit_within_ttl_issues_no_network_call() {
    let stub = Arc::new(StubAdapter::new(
        "stub_prices",
        Duration::from_secs(3600),
        daily_series("stub_prices", &[100.0, 101.0]),
    ));
    let cache = layer_with(stub.clone());

    let first = cache.get("stub_prices", "spx").await;
    assert_eq!(first.status, FetchStatus::Fresh);
    assert_eq!(stub.call_count(), 1);

    let second = cache.get("stub_prices", "spx").await;
    assert_eq!(second.status, FetchStatus::Fresh);
    assert_eq!(stub.call_count(), 1, "hit within TTL must not refetch");
    assert_eq!(second.series().unwrap().values(), vec![100.0, 101.0]);
}

#[tokio::test]
async fn distinct_params_are_distinct_cache_keys() {
    let stub = Arc::new(StubAdapter::new(
        "stub_prices",
        Duration::from_secs(3600),
        daily_series("stub_prices", &[100.0]),
    ));
    let cache = layer_with(stub.clone());

    cache.get("stub_prices", "spx").await;
    cache.get("stub_prices", "ndx").await;
    assert_eq!(stub.call_count(), 2);
}

#[tokio::test]
async fn expired_entry_with_failing_refetch_is_served_stale() {
    // Zero TTL: every access is a refresh attempt
    let stub = Arc::new(StubAdapter::new(
        "stub_prices",
        Duration::ZERO,
        daily_series("stub_prices", &[100.0, 101.0]),
    ));
    let cache = layer_with(stub.clone());

    let first = cache.get("stub_prices", "spx").await;
    assert_eq!(first.status, FetchStatus::Fresh);

    stub.set_failing(true);
    let second = cache.get("stub_prices", "spx").await;
    assert_eq!(second.status, FetchStatus::Stale);
    assert_eq!(
        second.series().unwrap().values(),
        vec![100.0, 101.0],
        "stale result must carry the previous data"
    );
    assert_eq!(second.fetched_at, first.fetched_at, "stale data keeps its original age");
    assert_eq!(stub.call_count(), 2);
}

#[tokio::test]
async fn recovery_after_stale_replaces_the_entry() {
    let stub = Arc::new(StubAdapter::new(
        "stub_prices",
        Duration::ZERO,
        daily_series("stub_prices", &[100.0]),
    ));
    let cache = layer_with(stub.clone());

    cache.get("stub_prices", "spx").await;
    stub.set_failing(true);
    assert_eq!(cache.get("stub_prices", "spx").await.status, FetchStatus::Stale);

    stub.set_failing(false);
    let recovered = cache.get("stub_prices", "spx").await;
    assert_eq!(recovered.status, FetchStatus::Fresh);
}

#[tokio::test]
async fn failing_fetch_without_prior_entry_is_unavailable() {
    let stub = Arc::new(StubAdapter::new(
        "stub_prices",
        Duration::from_secs(3600),
        daily_series("stub_prices", &[100.0]),
    ));
    stub.set_failing(true);
    let cache = layer_with(stub.clone());

    let result = cache.get("stub_prices", "spx").await;
    assert_eq!(result.status, FetchStatus::Unavailable);
    assert!(result.data.is_none());
    assert!(result.error.is_some());
}

#[tokio::test]
async fn unknown_source_is_unavailable() {
    let cache = CacheLayer::new(Orchestrator::new());
    let result = cache.get("nope", "").await;
    assert_eq!(result.status, FetchStatus::Unavailable);
    assert!(result.error.unwrap().contains("unknown source"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_key_requests_issue_one_network_call() {
    let stub = Arc::new(
        StubAdapter::new(
            "stub_prices",
            Duration::from_secs(3600),
            daily_series("stub_prices", &[100.0]),
        )
        .with_delay(Duration::from_millis(200)),
    );
    let cache = Arc::new(layer_with(stub.clone()));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.get("stub_prices", "spx").await }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.status, FetchStatus::Fresh);
    }

    assert_eq!(stub.call_count(), 1, "same-key requests must share one in-flight fetch");
}

#[tokio::test]
async fn orchestrator_walks_candidates_until_first_success() {
    let stub = Arc::new(
        StubAdapter::new(
            "stub_margin",
            Duration::from_secs(3600),
            daily_series("stub_margin", &[1.0]),
        )
        .with_endpoints(3, 2),
    );
    let mut orchestrator = Orchestrator::new();
    orchestrator.register(stub.clone());

    let result = orchestrator.resolve("stub_margin", "").await.unwrap();
    assert_eq!(result.status, FetchStatus::Fresh);
    assert_eq!(stub.call_count(), 3, "two failing candidates then the success");
}

#[tokio::test]
async fn orchestrator_attempts_are_bounded_by_candidate_count() {
    let stub = Arc::new(
        StubAdapter::new(
            "stub_margin",
            Duration::from_secs(3600),
            daily_series("stub_margin", &[1.0]),
        )
        .with_endpoints(3, 3),
    );
    let mut orchestrator = Orchestrator::new();
    orchestrator.register(stub.clone());

    assert!(orchestrator.resolve("stub_margin", "").await.is_err());
    assert_eq!(stub.call_count(), 3);
}

#[tokio::test]
async fn empty_table_counts_as_a_failed_candidate() {
    let stub = Arc::new(StubAdapter::new(
        "stub_prices",
        Duration::from_secs(3600),
        daily_series("stub_prices", &[]),
    ));
    let mut orchestrator = Orchestrator::new();
    orchestrator.register(stub);

    let err = orchestrator.resolve("stub_prices", "spx").await.unwrap_err();
    assert!(err.to_string().contains("empty table"));
}
