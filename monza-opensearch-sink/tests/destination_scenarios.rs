mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::{InMemoryStore, PingBehavior};
use monza_opensearch_shared::collection_name;
use monza_opensearch_sink::{
    CancellationToken, DeliveryFailure, Destination, DropReason, Event, OpenSearchDestination,
    ServiceId, SinkConfig, SinkError, WorkerState,
};
use serde_json::json;
use tokio::sync::mpsc;

fn config() -> SinkConfig {
    SinkConfig::default().with_flush_interval(Duration::from_millis(20))
}

async fn started(store: Arc<InMemoryStore>, config: SinkConfig) -> OpenSearchDestination {
    let destination = OpenSearchDestination::with_client(config, store);
    destination.setup(&CancellationToken::new()).await.unwrap();
    destination
}

/// Collection names for `service` today, taken on both sides of the test so a
/// run spanning midnight still matches.
fn todays_collections(service: &str, prefix: &str, before: String) -> HashSet<String> {
    HashSet::from([before, collection_name(&ServiceId::from(service), prefix)])
}

#[tokio::test]
async fn test_setup_fails_when_store_is_down() {
    let store = Arc::new(InMemoryStore::with_ping(PingBehavior::Down));
    let (tx, mut failures) = mpsc::unbounded_channel();
    let destination =
        OpenSearchDestination::with_client(config(), store.clone()).with_observer(Arc::new(tx));
    let ctx = CancellationToken::new();

    let result = destination.setup(&ctx).await;

    assert!(matches!(result, Err(SinkError::ConnectivityError(_))));
    assert_eq!(destination.worker_state(), WorkerState::Idle);

    destination
        .record(&ctx, Event::new("svc-a", json!({"n": 1})))
        .await;
    destination.teardown(&ctx).await;

    assert_eq!(store.total_documents(), 0);
    assert!(matches!(
        failures.try_recv().unwrap(),
        DeliveryFailure::Dropped {
            reason: DropReason::NotStarted,
            ..
        }
    ));
}

#[tokio::test]
async fn test_setup_fails_against_unreachable_address() {
    let config = config()
        .with_addresses(["http://127.0.0.1:1"])
        .with_request_timeout(Duration::from_secs(2));
    let destination = OpenSearchDestination::new(config);

    let result = destination.setup(&CancellationToken::new()).await;

    assert!(matches!(result, Err(SinkError::ConnectivityError(_))));
}

#[tokio::test]
async fn test_setup_fails_for_invalid_address() {
    let destination = OpenSearchDestination::new(config().with_addresses(["not a url"]));

    let result = destination.setup(&CancellationToken::new()).await;

    assert!(matches!(result, Err(SinkError::ConnectivityError(_))));
}

#[tokio::test]
async fn test_setup_fails_for_missing_or_blank_addresses() {
    let cases = [
        config().with_addresses(Vec::<String>::new()),
        config().with_addresses([""]),
        config().with_addresses(["   "]),
    ];

    for config in cases {
        let destination = OpenSearchDestination::new(config);

        let result = destination.setup(&CancellationToken::new()).await;

        assert!(matches!(result, Err(SinkError::ConnectivityError(_))));
    }
}

#[tokio::test]
async fn test_record_with_cancelled_token_is_kept_while_there_is_room() {
    let store = Arc::new(InMemoryStore::new());
    let destination = started(store.clone(), config()).await;
    let cancelled = CancellationToken::new();
    cancelled.cancel();

    destination
        .record(&cancelled, Event::new("svc-a", json!({})).with_id(1))
        .await;
    destination.drain(&CancellationToken::new()).await.unwrap();

    let collections = store.collections();
    assert_eq!(collections.len(), 1);
    assert!(store.document(&collections[0], "doc-1").is_some());
    assert_eq!(destination.stats().recorded, 1);
    assert_eq!(destination.stats().dropped, 0);
}

#[tokio::test]
async fn test_ten_events_land_in_todays_collection() {
    let store = Arc::new(InMemoryStore::new());
    let destination = started(store.clone(), config()).await;
    let ctx = CancellationToken::new();
    let before = collection_name(&ServiceId::from("svc-a"), "monza");

    for n in 0..10 {
        destination
            .record(&ctx, Event::new("svc-a", json!({"n": n})))
            .await;
    }
    let report = destination.drain(&ctx).await.unwrap();

    let expected = todays_collections("svc-a", "monza", before);
    let collections = store.collections();
    assert_eq!(collections.len(), 1);
    assert!(expected.contains(&collections[0]));

    let ids = store.document_ids(&collections[0]);
    assert_eq!(ids.len(), 10);
    assert!(ids.iter().all(|id| id.starts_with("doc-") && id != "doc-0"));
    assert_eq!(report.processed, 10);
    assert_eq!(report.indexer.num_indexed, 10);
    assert_eq!(destination.stats().ids_synthesized, 10);
}

#[tokio::test]
async fn test_teardown_right_after_setup() {
    let store = Arc::new(InMemoryStore::new());
    let destination = started(store.clone(), config()).await;

    let report = destination.drain(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(destination.worker_state(), WorkerState::Terminal);
    assert_eq!(store.total_documents(), 0);
}

#[tokio::test]
async fn test_single_event_is_flushed_by_teardown() {
    let store = Arc::new(InMemoryStore::new());
    let config = config().with_flush_interval(Duration::from_secs(3600));
    let destination = started(store.clone(), config).await;
    let ctx = CancellationToken::new();

    destination
        .record(&ctx, Event::new("svc-a", json!({"user": "ada"})).with_id(5))
        .await;
    destination.teardown(&ctx).await;

    let collections = store.collections();
    assert_eq!(collections.len(), 1);
    let document = store.document(&collections[0], "doc-5").unwrap();
    assert_eq!(document["payload"]["user"], "ada");
    assert_eq!(document["service_id"], "svc-a");
}

#[tokio::test]
async fn test_parallel_records_receive_distinct_ids() {
    let store = Arc::new(InMemoryStore::new());
    let destination = Arc::new(started(store.clone(), config().with_channel_capacity(8)).await);
    let ctx = CancellationToken::new();

    let producers = (0..200)
        .map(|n| {
            let destination = destination.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                destination
                    .record(&ctx, Event::new("svc-a", json!({"n": n})))
                    .await;
            })
        })
        .collect::<Vec<_>>();
    for producer in producers {
        producer.await.unwrap();
    }
    destination.drain(&ctx).await.unwrap();

    let ids: HashSet<String> = store
        .collections()
        .iter()
        .flat_map(|collection| store.document_ids(collection))
        .collect();
    assert_eq!(ids.len(), 200);
    assert!(!ids.contains("doc-0"));
    assert_eq!(destination.stats().recorded, 200);
}

#[tokio::test]
async fn test_explicit_ids_are_kept() {
    let store = Arc::new(InMemoryStore::new());
    let destination = started(store.clone(), config()).await;
    let ctx = CancellationToken::new();

    destination
        .record(&ctx, Event::new("svc-b", json!({})).with_id(42))
        .await;
    destination.drain(&ctx).await.unwrap();

    let collections = store.collections();
    assert_eq!(store.document_ids(&collections[0]), vec!["doc-42".to_string()]);
    assert_eq!(destination.stats().ids_synthesized, 0);
}

#[tokio::test]
async fn test_custom_collection_prefix() {
    let store = Arc::new(InMemoryStore::new());
    let destination = started(store.clone(), config().with_collection_prefix("audit")).await;
    let ctx = CancellationToken::new();
    let before = collection_name(&ServiceId::from("svc-a"), "audit");

    destination
        .record(&ctx, Event::new("svc-a", json!({})))
        .await;
    destination.drain(&ctx).await.unwrap();

    let expected = todays_collections("svc-a", "audit", before);
    assert!(expected.contains(&store.collections()[0]));
}

#[tokio::test]
async fn test_second_teardown_and_late_record() {
    let store = Arc::new(InMemoryStore::new());
    let (tx, mut failures) = mpsc::unbounded_channel();
    let destination = OpenSearchDestination::with_client(config(), store.clone())
        .with_observer(Arc::new(tx));
    let ctx = CancellationToken::new();
    destination.setup(&ctx).await.unwrap();

    destination.teardown(&ctx).await;
    destination.teardown(&ctx).await;
    assert_eq!(
        destination.drain(&ctx).await,
        Err(SinkError::ShutdownRaceError)
    );

    destination
        .record(&ctx, Event::new("svc-a", json!({})).with_id(9))
        .await;

    match failures.try_recv().unwrap() {
        DeliveryFailure::Dropped {
            event_id, reason, ..
        } => {
            assert_eq!(event_id.get(), 9);
            assert_eq!(reason, DropReason::ShutDown);
        }
        other => panic!("unexpected failure {:?}", other),
    }
    assert_eq!(store.total_documents(), 0);
    assert_eq!(destination.stats().dropped, 1);
}

#[tokio::test]
async fn test_setup_observes_cancellation() {
    let store = Arc::new(InMemoryStore::with_ping(PingBehavior::Hang));
    let destination = OpenSearchDestination::with_client(config(), store);
    let ctx = CancellationToken::new();

    let canceller = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ctx.cancel();
        })
    };
    let result = destination.setup(&ctx).await;
    canceller.await.unwrap();

    assert_eq!(result, Err(SinkError::Cancelled));
    assert_eq!(destination.worker_state(), WorkerState::Idle);
}

#[tokio::test]
async fn test_rejected_documents_reach_observer() {
    let store = Arc::new(InMemoryStore::new());
    store.reject("doc-7");
    let (tx, mut failures) = mpsc::unbounded_channel();
    let destination = OpenSearchDestination::with_client(config(), store.clone())
        .with_observer(Arc::new(tx));
    let ctx = CancellationToken::new();
    destination.setup(&ctx).await.unwrap();

    destination
        .record(&ctx, Event::new("svc-a", json!({})).with_id(7))
        .await;
    destination
        .record(&ctx, Event::new("svc-a", json!({})).with_id(8))
        .await;
    let report = destination.drain(&ctx).await.unwrap();

    match failures.try_recv().unwrap() {
        DeliveryFailure::Rejected(failure) => {
            assert_eq!(failure.document_id, "doc-7");
            assert_eq!(failure.status, Some(400));
        }
        other => panic!("unexpected failure {:?}", other),
    }
    assert_eq!(report.indexer.num_indexed, 1);
    assert_eq!(report.indexer.num_failed, 1);
    assert_eq!(store.total_documents(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drain_gives_up_after_timeout() {
    let store = Arc::new(InMemoryStore::new().hang_writes());
    let config = config().with_drain_timeout(Duration::from_secs(5));
    let destination = started(store.clone(), config).await;
    let ctx = CancellationToken::new();

    destination
        .record(&ctx, Event::new("svc-a", json!({})))
        .await;
    let result = destination.drain(&ctx).await;

    assert_eq!(result, Err(SinkError::DrainTimeout(Duration::from_secs(5))));
    assert_eq!(destination.worker_state(), WorkerState::Terminal);
}

#[tokio::test]
async fn test_cancelled_teardown_returns_early() {
    let store = Arc::new(InMemoryStore::new());
    let destination = started(store, config()).await;
    let ctx = CancellationToken::new();
    ctx.cancel();

    let result = destination.drain(&ctx).await;

    assert_eq!(result, Err(SinkError::Cancelled));
    assert_eq!(destination.worker_state(), WorkerState::Terminal);
}
