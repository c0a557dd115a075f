// crates/hcp-store/tests/contract.rs
//
// Repository contract tests.
//
// Every scenario is written once against `TelemetryStore` and run twice:
// against a RocksDB store in a fresh temp directory and against the
// in-memory store. Both must behave identically.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::Span;
use uuid::Uuid;

use hcp_core::{
    Anomaly, AnomalyFilter, AnomalyStatus, AnomalyUpdate, Benchmark, BenchmarkMetricQuery,
    BlockRef, Confirmation, HcpError, Metric, Node, NodeFilter, NodeMetricQuery, NodeRegistry,
    NodeRole, PageRequest, Severity, TelemetryStore, Transaction, TransactionFilter,
    TransactionStats, TransactionStatus,
};
use hcp_store::{InMemoryStore, RocksStore, StoreConfig};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const TEST_BATCH_LIMIT: usize = 8;

fn test_config() -> StoreConfig {
    StoreConfig {
        max_metric_batch: TEST_BATCH_LIMIT,
    }
}

/// Create a temporary directory path using UUID to avoid conflicts.
fn temp_db_path(label: &str) -> String {
    let path = std::env::temp_dir().join(format!("hcp_test_{}_{}", label, Uuid::now_v7()));
    path.to_string_lossy().to_string()
}

/// A RocksDB store whose directory is removed on drop.
struct TempRocks {
    store: Arc<RocksStore>,
    path: String,
}

impl TempRocks {
    fn open(label: &str) -> Self {
        let path = temp_db_path(label);
        let store = RocksStore::open_with_span(&path, test_config(), Span::none()).unwrap();
        Self {
            store: Arc::new(store),
            path,
        }
    }
}

impl Drop for TempRocks {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

async fn new_benchmark<S: TelemetryStore>(store: &S) -> Benchmark {
    store
        .create_benchmark(Benchmark::new("baseline", "tPBFT", 4))
        .await
        .unwrap()
}

async fn new_node<S: TelemetryStore>(store: &S, id: &str, role: NodeRole) -> Node {
    let mut node = Node::new(id, id);
    node.role = role;
    store.create_node(&node).await.unwrap();
    node
}

fn tx_at(benchmark: &Benchmark, submitted_at: DateTime<Utc>) -> Transaction {
    let mut tx = Transaction::pending(benchmark.id, "0xfrom", "0xto", 1_000);
    tx.submitted_at = submitted_at;
    tx.created_at = submitted_at;
    tx
}

fn sample(node: &str, name: &str, value: f64, benchmark: &Benchmark, ts: DateTime<Utc>) -> Metric {
    let mut m = Metric::new(node, name, value, benchmark.id);
    m.timestamp = ts;
    m
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

async fn list_nodes_counts_every_match<S: TelemetryStore>(store: Arc<S>) {
    for id in ["v1", "v2", "v3"] {
        new_node(&*store, id, NodeRole::Validator).await;
    }
    new_node(&*store, "l1", NodeRole::Leader).await;

    let filter = NodeFilter {
        role: Some(NodeRole::Validator),
        ..Default::default()
    };
    let first = store.list_nodes(&filter, PageRequest::new(1, 2)).await.unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.total_items, 3);
    assert_eq!(first.total_pages(), 2);
    assert_eq!(
        first.items.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(),
        vec!["v1", "v2"]
    );

    let second = store.list_nodes(&filter, PageRequest::new(2, 2)).await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].id, "v3");

    let beyond = store.list_nodes(&filter, PageRequest::new(9, 2)).await.unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total_items, 3);

    let all = store
        .list_nodes(&NodeFilter::default(), PageRequest::new(0, 0))
        .await
        .unwrap();
    assert_eq!(all.total_items, 4);
    assert_eq!(all.page_size, 10);
}

async fn reregistration_preserves_registered_at<S: TelemetryStore + 'static>(store: Arc<S>) {
    let registry = NodeRegistry::new(store.clone(), Span::none());

    let mut first = Node::new("10.0.0.7:26656", "10.0.0.7:26656");
    first.cpu_usage = 10.0;
    first.region = "eu-west".into();
    let created = registry.register(first).await.unwrap();

    let mut second = Node::new("10.0.0.7:26656", "10.0.0.7:26656");
    second.registered_at = created.registered_at + Duration::hours(5);
    second.cpu_usage = 85.5;
    second.region = "us-east".into();
    second.peers_count = 12;
    let updated = registry.register(second).await.unwrap();

    assert_eq!(updated.registered_at, created.registered_at);
    let stored = store.get_node("10.0.0.7:26656").await.unwrap().unwrap();
    assert_eq!(stored.registered_at, created.registered_at);
    assert_eq!(stored.cpu_usage, 85.5);
    assert_eq!(stored.region, "us-east");
    assert_eq!(stored.peers_count, 12);
}

async fn duplicate_node_create_conflicts<S: TelemetryStore>(store: Arc<S>) {
    new_node(&*store, "n1", NodeRole::Validator).await;
    let err = store.create_node(&Node::new("n1", "x")).await.unwrap_err();
    assert!(err.is_conflict());

    let err = store
        .update_node_status("ghost", hcp_core::NodeStatus::Online)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(store.get_node("ghost").await.unwrap().is_none());
}

async fn duplicate_hash_conflicts_without_mutation<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    let original = tx_at(&bench, at(2026, 3, 4, 10));
    store.create_transaction(&original).await.unwrap();

    let mut clash = original.clone();
    clash.amount = 999_999;
    clash.from_address = "0xsomeone-else".into();
    let err = store.create_transaction(&clash).await.unwrap_err();
    assert!(err.is_conflict(), "expected conflict, got {:?}", err);

    let stored = store.get_transaction(&original.hash).await.unwrap().unwrap();
    assert_eq!(stored, original);
}

async fn transaction_requires_existing_benchmark<S: TelemetryStore>(store: Arc<S>) {
    let mut orphan = Transaction::pending(Uuid::now_v7(), "0xa", "0xb", 1);
    orphan.submitted_at = at(2026, 1, 1, 0);
    let err = store.create_transaction(&orphan).await.unwrap_err();
    assert!(matches!(err, HcpError::Validation(_)));
    assert!(store.get_transaction(&orphan.hash).await.unwrap().is_none());
}

async fn empty_benchmark_stats_are_zero<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    let stats = store.transaction_stats(&bench.id).await.unwrap();
    assert_eq!(stats, TransactionStats::default());
    assert_eq!(stats.avg_latency_ms, 0.0);
}

async fn stats_over_ten_transactions<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    let other = new_benchmark(&*store).await;
    let base = at(2026, 6, 30, 20);

    for i in 0..10i64 {
        let mut tx = tx_at(&bench, base + Duration::hours(i));
        match i {
            0..=6 => {
                tx.status = TransactionStatus::Confirmed;
                tx.latency_ms = Some((i + 1) as f64 * 10.0);
            }
            7 | 8 => tx.status = TransactionStatus::Pending,
            _ => tx.status = TransactionStatus::Failed,
        }
        store.create_transaction(&tx).await.unwrap();
    }
    let mut noise = tx_at(&other, base);
    noise.latency_ms = Some(5_000.0);
    store.create_transaction(&noise).await.unwrap();

    let stats = store.transaction_stats(&bench.id).await.unwrap();
    assert_eq!(stats.total, 10);
    assert_eq!(stats.pending_count, 2);
    assert_eq!(stats.confirmed_count, 7);
    assert_eq!(stats.failed_count, 1);
    assert!((stats.avg_latency_ms - 40.0).abs() < 1e-9);
}

async fn ledger_lists_newest_first_across_months<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    let dec = tx_at(&bench, at(2025, 12, 31, 23));
    let jan = tx_at(&bench, at(2026, 1, 15, 8));
    let feb = tx_at(&bench, at(2026, 2, 1, 0));
    for tx in [&jan, &dec, &feb] {
        store.create_transaction(tx).await.unwrap();
    }

    let filter = TransactionFilter {
        benchmark_id: Some(bench.id),
        ..Default::default()
    };
    let page = store.list_transactions(&filter, PageRequest::default()).await.unwrap();
    let hashes: Vec<&str> = page.items.iter().map(|t| t.hash.as_str()).collect();
    assert_eq!(hashes, vec![feb.hash.as_str(), jan.hash.as_str(), dec.hash.as_str()]);
    assert_eq!(page.total_items, 3);

    for tx in [&dec, &jan, &feb] {
        assert_eq!(store.get_transaction(&tx.hash).await.unwrap().as_ref(), Some(tx));
    }
}

async fn submission_past_year_9999_rejected<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    let far = tx_at(&bench, Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap());
    let err = store.create_transaction(&far).await.unwrap_err();
    assert!(matches!(err, HcpError::Validation(_)), "got {:?}", err);
    assert!(store.get_transaction(&far.hash).await.unwrap().is_none());
    assert_eq!(store.transaction_stats(&bench.id).await.unwrap().total, 0);
}

async fn same_microsecond_ties_break_on_hash<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    let base = at(2026, 5, 5, 5);
    let mut low = tx_at(&bench, base + Duration::nanoseconds(900));
    low.hash = "0xaaa".into();
    let mut high = tx_at(&bench, base + Duration::nanoseconds(100));
    high.hash = "0xbbb".into();
    store.create_transaction(&low).await.unwrap();
    store.create_transaction(&high).await.unwrap();

    let stored = store.get_transaction("0xaaa").await.unwrap().unwrap();
    assert_eq!(stored.submitted_at, base);

    for filter in [
        TransactionFilter::default(),
        TransactionFilter {
            benchmark_id: Some(bench.id),
            ..Default::default()
        },
    ] {
        let page = store.list_transactions(&filter, PageRequest::default()).await.unwrap();
        let hashes: Vec<&str> = page.items.iter().map(|t| t.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xbbb", "0xaaa"]);
    }
}

async fn benchmark_listing_pages_skip_other_runs<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    let other = new_benchmark(&*store).await;
    let base = at(2026, 7, 30, 0);

    let mut mine = Vec::new();
    for i in 0..5i64 {
        let tx = tx_at(&bench, base + Duration::days(i));
        store.create_transaction(&tx).await.unwrap();
        store
            .create_transaction(&tx_at(&other, base + Duration::days(i) + Duration::minutes(1)))
            .await
            .unwrap();
        mine.push(tx);
    }

    let filter = TransactionFilter {
        benchmark_id: Some(bench.id),
        ..Default::default()
    };
    let page = store.list_transactions(&filter, PageRequest::new(2, 2)).await.unwrap();
    assert_eq!(page.total_items, 5);
    assert_eq!(page.total_pages(), 3);
    let hashes: Vec<&str> = page.items.iter().map(|t| t.hash.as_str()).collect();
    assert_eq!(hashes, vec![mine[2].hash.as_str(), mine[1].hash.as_str()]);

    let everything = store
        .list_transactions(&TransactionFilter::default(), PageRequest::new(1, 100))
        .await
        .unwrap();
    assert_eq!(everything.total_items, 10);
}

async fn transaction_filter_narrows_listing<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    let mut a = tx_at(&bench, at(2026, 4, 1, 1));
    a.to_address = "0xalice".into();
    let mut b = tx_at(&bench, at(2026, 4, 1, 2));
    b.to_address = "0xbob".into();
    b.status = TransactionStatus::Failed;
    store.create_transaction(&a).await.unwrap();
    store.create_transaction(&b).await.unwrap();

    let by_status = TransactionFilter {
        status: Some(TransactionStatus::Failed),
        ..Default::default()
    };
    let page = store.list_transactions(&by_status, PageRequest::default()).await.unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].hash, b.hash);

    let by_recipient = TransactionFilter {
        to_address: Some("0xalice".into()),
        ..Default::default()
    };
    let page = store.list_transactions(&by_recipient, PageRequest::default()).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].hash, a.hash);
}

async fn confirmation_is_single_shot<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    let tx = tx_at(&bench, at(2026, 8, 8, 8));
    store.create_transaction(&tx).await.unwrap();

    let confirmation = Confirmation {
        status: TransactionStatus::Confirmed,
        confirmed_at: tx.submitted_at + Duration::milliseconds(250),
        latency_ms: None,
        block: Some(BlockRef {
            number: 42,
            hash: "0xblock".into(),
            index: 3,
        }),
        gas_used: Some(21_000),
        error_message: None,
    };
    let confirmed = store.confirm_transaction(&tx.hash, &confirmation).await.unwrap();
    assert_eq!(confirmed.status, TransactionStatus::Confirmed);
    assert_eq!(confirmed.latency_ms, Some(250.0));
    assert_eq!(confirmed.block_number, 42);

    let stored = store.get_transaction(&tx.hash).await.unwrap().unwrap();
    assert_eq!(stored, confirmed);

    let again = store.confirm_transaction(&tx.hash, &confirmation).await.unwrap_err();
    assert!(matches!(again, HcpError::Validation(_)));

    let missing = store.confirm_transaction("0xnope", &confirmation).await.unwrap_err();
    assert!(missing.is_not_found());
}

async fn duplicate_metric_keeps_first_value<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    new_node(&*store, "n1", NodeRole::Validator).await;
    let ts = at(2026, 5, 1, 12);

    store
        .create_metric(&sample("n1", "cpu_usage", 12.5, &bench, ts))
        .await
        .unwrap();
    let err = store
        .create_metric(&sample("n1", "cpu_usage", 99.0, &bench, ts))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let page = store
        .node_metrics(&NodeMetricQuery::for_node("n1"), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].value, 12.5);
}

async fn metric_batch_is_all_or_nothing<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    new_node(&*store, "n1", NodeRole::Validator).await;
    let ts = at(2026, 5, 2, 0);

    let in_batch_dup = vec![
        sample("n1", "cpu_usage", 1.0, &bench, ts),
        sample("n1", "memory_usage", 2.0, &bench, ts),
        sample("n1", "cpu_usage", 3.0, &bench, ts),
    ];
    assert!(store.create_metrics(&in_batch_dup).await.unwrap_err().is_conflict());

    store
        .create_metric(&sample("n1", "disk_usage", 4.0, &bench, ts))
        .await
        .unwrap();
    let clashes_with_stored = vec![
        sample("n1", "net_in", 5.0, &bench, ts),
        sample("n1", "disk_usage", 6.0, &bench, ts),
    ];
    assert!(store.create_metrics(&clashes_with_stored).await.unwrap_err().is_conflict());

    let unknown_node = vec![
        sample("n1", "net_out", 7.0, &bench, ts),
        sample("ghost", "net_out", 7.0, &bench, ts),
    ];
    assert!(matches!(
        store.create_metrics(&unknown_node).await.unwrap_err(),
        HcpError::Validation(_)
    ));

    let page = store
        .node_metrics(&NodeMetricQuery::for_node("n1"), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].metric_name, "disk_usage");
}

async fn oversized_metric_batch_rejected<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    new_node(&*store, "n1", NodeRole::Validator).await;
    let base = at(2026, 5, 3, 0);
    let batch: Vec<Metric> = (0..=TEST_BATCH_LIMIT as i64)
        .map(|i| sample("n1", "tps", i as f64, &bench, base + Duration::seconds(i)))
        .collect();

    let err = store.create_metrics(&batch).await.unwrap_err();
    assert!(matches!(err, HcpError::Validation(_)));

    store.create_metrics(&batch[..TEST_BATCH_LIMIT]).await.unwrap();
}

async fn node_metrics_newest_first_within_range<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    new_node(&*store, "n1", NodeRole::Validator).await;
    new_node(&*store, "n10", NodeRole::Validator).await;
    let base = at(2026, 7, 1, 0);

    let mut batch = Vec::new();
    for i in 0..5i64 {
        batch.push(sample("n1", "cpu_usage", i as f64, &bench, base + Duration::minutes(i)));
        batch.push(sample("n1", "memory_usage", i as f64, &bench, base + Duration::minutes(i)));
    }
    batch.push(sample("n10", "cpu_usage", 50.0, &bench, base + Duration::minutes(2)));
    store.create_metrics(&batch).await.unwrap();

    let query = NodeMetricQuery {
        node_id: "n1".into(),
        metric_name: Some("cpu_usage".into()),
        start_time: Some(base + Duration::minutes(1)),
        end_time: Some(base + Duration::minutes(3)),
    };
    let page = store.node_metrics(&query, PageRequest::default()).await.unwrap();
    let values: Vec<f64> = page.items.iter().map(|m| m.value).collect();
    assert_eq!(values, vec![3.0, 2.0, 1.0]);
    assert_eq!(page.total_items, 3);

    let everything = store
        .node_metrics(&NodeMetricQuery::for_node("n1"), PageRequest::new(1, 4))
        .await
        .unwrap();
    assert_eq!(everything.total_items, 10);
    assert_eq!(everything.items.len(), 4);
    assert_eq!(everything.items[0].timestamp, base + Duration::minutes(4));
    assert!(everything.items.iter().all(|m| m.node_id == "n1"));
}

async fn benchmark_metrics_filter_by_name<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    let other = new_benchmark(&*store).await;
    new_node(&*store, "a", NodeRole::Leader).await;
    new_node(&*store, "b", NodeRole::Validator).await;
    let base = at(2026, 9, 9, 9);

    store
        .create_metrics(&[
            sample("a", "tps", 100.0, &bench, base),
            sample("b", "tps", 110.0, &bench, base + Duration::seconds(1)),
            sample("a", "latency", 9.0, &bench, base + Duration::seconds(2)),
            sample("a", "tps", 1.0, &other, base + Duration::seconds(3)),
        ])
        .await
        .unwrap();

    let query = BenchmarkMetricQuery {
        benchmark_id: bench.id,
        metric_name: Some("tps".into()),
    };
    let page = store.benchmark_metrics(&query, PageRequest::default()).await.unwrap();
    let values: Vec<f64> = page.items.iter().map(|m| m.value).collect();
    assert_eq!(values, vec![110.0, 100.0]);

    let all = BenchmarkMetricQuery {
        benchmark_id: bench.id,
        metric_name: None,
    };
    assert_eq!(
        store.benchmark_metrics(&all, PageRequest::default()).await.unwrap().total_items,
        3
    );
}

async fn benchmark_update_and_listing<S: TelemetryStore>(store: Arc<S>) {
    let first = new_benchmark(&*store).await;
    let second = new_benchmark(&*store).await;

    let listed = store.list_benchmarks(PageRequest::default()).await.unwrap();
    assert_eq!(listed.total_items, 2);
    assert_eq!(listed.items[0].id, second.id);

    let mut changed = first.clone();
    changed.status = hcp_core::BenchmarkStatus::Completed;
    changed.results.actual_tps = 1234.5;
    changed.created_at = first.created_at + Duration::days(1);
    let updated = store.update_benchmark(&changed).await.unwrap();
    assert_eq!(updated.created_at, first.created_at);
    assert!(updated.updated_at >= first.updated_at);

    let stored = store.get_benchmark(&first.id).await.unwrap().unwrap();
    assert_eq!(stored.status, hcp_core::BenchmarkStatus::Completed);
    assert_eq!(stored.results.actual_tps, 1234.5);

    let mut ghost = Benchmark::new("ghost", "Raft", 3);
    ghost.id = Uuid::now_v7();
    assert!(store.update_benchmark(&ghost).await.unwrap_err().is_not_found());
}

async fn benchmark_delete_cascades<S: TelemetryStore>(store: Arc<S>) {
    let doomed = new_benchmark(&*store).await;
    let kept = new_benchmark(&*store).await;
    new_node(&*store, "n1", NodeRole::Validator).await;
    let ts = at(2026, 10, 1, 0);

    let doomed_tx = tx_at(&doomed, ts);
    let kept_tx = tx_at(&kept, ts);
    store.create_transaction(&doomed_tx).await.unwrap();
    store.create_transaction(&kept_tx).await.unwrap();
    store
        .create_metrics(&[
            sample("n1", "cpu_usage", 1.0, &doomed, ts),
            sample("n1", "cpu_usage", 2.0, &kept, ts + Duration::seconds(1)),
        ])
        .await
        .unwrap();
    let anomaly = store
        .create_anomaly(Anomaly::new(doomed.id, "double_spend", Severity::High, 0.9))
        .await
        .unwrap();

    assert!(store.delete_benchmark(&doomed.id).await.unwrap());
    assert!(!store.delete_benchmark(&doomed.id).await.unwrap());

    assert!(store.get_benchmark(&doomed.id).await.unwrap().is_none());
    assert!(store.get_transaction(&doomed_tx.hash).await.unwrap().is_none());
    assert!(store.get_transaction(&kept_tx.hash).await.unwrap().is_some());
    assert_eq!(store.transaction_stats(&doomed.id).await.unwrap().total, 0);

    let metrics = store
        .node_metrics(&NodeMetricQuery::for_node("n1"), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(metrics.total_items, 1);
    assert_eq!(metrics.items[0].benchmark_id, kept.id);

    // Anomalies outlive the run they were raised against.
    assert!(store.get_anomaly(&anomaly.id).await.unwrap().is_some());

    // The hash is free again once its row is gone.
    store.create_benchmark({
        let mut b = Benchmark::new("again", "tPBFT", 4);
        b.id = doomed.id;
        b
    })
    .await
    .unwrap();
    store.create_transaction(&doomed_tx).await.unwrap();
}

async fn anomaly_resolution_workflow<S: TelemetryStore>(store: Arc<S>) {
    let bench = new_benchmark(&*store).await;
    let mut raised = Anomaly::new(bench.id, "latency_spike", Severity::Medium, 0.75);
    raised.node_id = Some("n1".into());
    let created = store.create_anomaly(raised).await.unwrap();
    assert!(!created.id.is_nil());
    assert_eq!(created.status, AnomalyStatus::New);

    let skip = AnomalyUpdate {
        status: AnomalyStatus::Resolved,
        assigned_to: None,
        resolution_notes: None,
    };
    assert!(matches!(
        store.update_anomaly_status(&created.id, &skip).await.unwrap_err(),
        HcpError::Validation(_)
    ));

    let investigating = store
        .update_anomaly_status(
            &created.id,
            &AnomalyUpdate {
                status: AnomalyStatus::Investigating,
                assigned_to: Some("oncall".into()),
                resolution_notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(investigating.assigned_to.as_deref(), Some("oncall"));
    assert!(investigating.resolved_at.is_none());

    let resolved = store
        .update_anomaly_status(
            &created.id,
            &AnomalyUpdate {
                status: AnomalyStatus::Resolved,
                assigned_to: None,
                resolution_notes: Some("network partition healed".into()),
            },
        )
        .await
        .unwrap();
    assert!(resolved.resolved_at.is_some());
    assert_eq!(resolved.assigned_to.as_deref(), Some("oncall"));

    let filter = AnomalyFilter {
        status: Some(AnomalyStatus::Resolved),
        node_id: Some("n1".into()),
        ..Default::default()
    };
    let page = store.list_anomalies(&filter, PageRequest::default()).await.unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].id, created.id);

    assert!(store
        .update_anomaly_status(&Uuid::now_v7(), &skip)
        .await
        .unwrap_err()
        .is_not_found());

    let out_of_range = Anomaly::new(bench.id, "x", Severity::Low, 1.5);
    assert!(matches!(
        store.create_anomaly(out_of_range).await.unwrap_err(),
        HcpError::Validation(_)
    ));
}

async fn ping_succeeds<S: TelemetryStore>(store: Arc<S>) {
    store.ping().await.unwrap();
}

// ---------------------------------------------------------------------------
// Instantiation
// ---------------------------------------------------------------------------

macro_rules! contract_tests {
    ($($scenario:ident),* $(,)?) => {
        mod rocks {
            use super::*;
            $(
                #[tokio::test]
                async fn $scenario() {
                    let db = TempRocks::open(stringify!($scenario));
                    super::$scenario(db.store.clone()).await;
                }
            )*
        }

        mod memory {
            use super::*;
            $(
                #[tokio::test]
                async fn $scenario() {
                    let store = InMemoryStore::with_config(test_config(), Span::none());
                    super::$scenario(Arc::new(store)).await;
                }
            )*
        }
    };
}

contract_tests!(
    list_nodes_counts_every_match,
    reregistration_preserves_registered_at,
    duplicate_node_create_conflicts,
    duplicate_hash_conflicts_without_mutation,
    transaction_requires_existing_benchmark,
    empty_benchmark_stats_are_zero,
    stats_over_ten_transactions,
    ledger_lists_newest_first_across_months,
    submission_past_year_9999_rejected,
    same_microsecond_ties_break_on_hash,
    benchmark_listing_pages_skip_other_runs,
    transaction_filter_narrows_listing,
    confirmation_is_single_shot,
    duplicate_metric_keeps_first_value,
    metric_batch_is_all_or_nothing,
    oversized_metric_batch_rejected,
    node_metrics_newest_first_within_range,
    benchmark_metrics_filter_by_name,
    benchmark_update_and_listing,
    benchmark_delete_cascades,
    anomaly_resolution_workflow,
    ping_succeeds,
);

// ---------------------------------------------------------------------------
// RocksDB-only behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rocks_provisions_one_partition_per_month() {
    let db = TempRocks::open("partitions");
    let store = db.store.clone();
    let bench = new_benchmark(&*store).await;

    for ts in [
        at(2026, 1, 3, 0),
        at(2026, 1, 28, 0),
        at(2026, 3, 1, 0),
        at(2025, 12, 31, 23),
    ] {
        store.create_transaction(&tx_at(&bench, ts)).await.unwrap();
    }

    assert_eq!(
        store.partitions().unwrap(),
        vec!["transactions_2025_12", "transactions_2026_01", "transactions_2026_03"]
    );
}

#[tokio::test]
async fn rocks_data_survives_reopen() {
    let path = temp_db_path("reopen");
    let (bench, tx) = {
        let store = RocksStore::open(&path).unwrap();
        let bench = new_benchmark(&store).await;
        let tx = tx_at(&bench, at(2026, 2, 14, 12));
        store.create_transaction(&tx).await.unwrap();
        (bench, tx)
    };

    let reopened = RocksStore::open(&path).unwrap();
    assert_eq!(reopened.get_transaction(&tx.hash).await.unwrap(), Some(tx));
    assert_eq!(reopened.transaction_stats(&bench.id).await.unwrap().total, 1);
    assert_eq!(reopened.partitions().unwrap(), vec!["transactions_2026_02"]);
    drop(reopened);
    let _ = std::fs::remove_dir_all(&path);
}

#[tokio::test]
async fn rocks_reopens_alongside_foreign_column_family() {
    let path = temp_db_path("foreign_cf");
    let (bench, tx) = {
        let store = RocksStore::open(&path).unwrap();
        let bench = new_benchmark(&store).await;
        let tx = tx_at(&bench, at(2026, 8, 1, 9));
        store.create_transaction(&tx).await.unwrap();
        (bench, tx)
    };

    // A family whose name does not parse as a ledger month.
    {
        let opts = rocksdb::Options::default();
        let families = rocksdb::DB::list_cf(&opts, &path).unwrap();
        let mut raw = rocksdb::DB::open_cf(&opts, &path, &families).unwrap();
        raw.create_cf("transactions_10000_01", &opts).unwrap();
    }

    let reopened = RocksStore::open(&path).unwrap();
    assert_eq!(reopened.partitions().unwrap(), vec!["transactions_2026_08"]);
    assert_eq!(reopened.get_transaction(&tx.hash).await.unwrap(), Some(tx));
    assert_eq!(reopened.transaction_stats(&bench.id).await.unwrap().total, 1);
    drop(reopened);
    let _ = std::fs::remove_dir_all(&path);
}
