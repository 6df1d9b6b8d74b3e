//! End-to-end ingestion runs against a SQLite file sink

mod common;

use common::{gzip, init_test_tracing, log_lines, noise_lines, tar_gz, TestBundle, TSERVER_LOG};
use ybl_ingest::{IngestConfig, IngestError, IngestOrchestrator, SelectionConfig, SinkConfig};

fn config(bundle: &TestBundle) -> IngestConfig {
    IngestConfig::new(bundle.path(), SinkConfig::new(bundle.sqlite_url()))
}

#[tokio::test]
async fn test_nested_bundle_loads_in_two_batches() {
    init_test_tracing();
    let bundle = TestBundle::new();

    let mut content = noise_lines(10);
    content.push_str(&log_lines(0, 1500));
    let log_gz = gzip(content.as_bytes());
    let master_log = log_lines(0, 5);

    let tserver_entry = format!("node1/yb-data/tserver/logs/{TSERVER_LOG}.gz");
    let swap_entry = format!("node1/yb-data/tserver/logs/.{TSERVER_LOG}.swp");

    let archive = tar_gz(&[
        (tserver_entry.as_str(), &log_gz[..]),
        (
            "node1/yb-data/master/logs/yb-master-0.node1.log.INFO.20240609-061653.1",
            master_log.as_bytes(),
        ),
        (swap_entry.as_str(), master_log.as_bytes()),
    ]);
    bundle.write("support_bundle.tar.gz", archive);

    let summary = IngestOrchestrator::new(config(&bundle))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.archives_expanded, 2);
    assert_eq!(summary.archives_failed, 0);
    assert_eq!(summary.files_selected, 1);
    assert_eq!(summary.files_processed, 1);
    assert_eq!(summary.lines_read, 1510);
    assert_eq!(summary.records_parsed, 1500);
    assert_eq!(summary.records_written, 1500);
    assert_eq!(summary.batches_flushed, 2);
    assert_eq!(bundle.count_rows("logs").await, 1500);

    let pool = bundle.pool().await;
    let first: (String, String, String, String, String, String, String, String, String, String, String, String) =
        sqlx::query_as(
            "SELECT server_name, log_level, month, day, hour, minute, second, microseconds, \
             thread_id, file, line, message FROM logs ORDER BY rowid LIMIT 1",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(
        first,
        (
            "yb-tserver-0.node1.log".to_string(),
            "I".to_string(),
            "06".to_string(),
            "09".to_string(),
            "06".to_string(),
            "16".to_string(),
            "53".to_string(),
            "000000".to_string(),
            "0".to_string(),
            "raft_consensus.cc".to_string(),
            "123".to_string(),
            "Leader stepdown request 0".to_string(),
        )
    );
    pool.close().await;
}

#[tokio::test]
async fn test_bad_file_name_does_not_abort_siblings() {
    init_test_tracing();
    let bundle = TestBundle::new();
    bundle.write("logs/yb-tserver.INFO", log_lines(0, 20));
    bundle.write(&format!("logs/{TSERVER_LOG}"), log_lines(0, 30));
    bundle.write("logs/yb-tserver-1.node2.log.INFO.20240609-061653.2", log_lines(100, 40));

    let summary = IngestOrchestrator::new(config(&bundle))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.files_selected, 3);
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(summary.files_processed, 2);
    assert_eq!(bundle.count_rows("logs").await, 70);

    let pool = bundle.pool().await;
    let servers: Vec<(String, i64)> =
        sqlx::query_as("SELECT server_name, COUNT(*) FROM logs GROUP BY server_name ORDER BY server_name")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(
        servers,
        vec![
            ("yb-tserver-0.node1.log".to_string(), 30),
            ("yb-tserver-1.node2.log".to_string(), 40),
        ]
    );
    pool.close().await;
}

#[tokio::test]
async fn test_second_run_leaves_expanded_tree_untouched() {
    init_test_tracing();
    let bundle = TestBundle::new();
    let log_gz = gzip(log_lines(0, 10).as_bytes());
    let entry = format!("node1/logs/{TSERVER_LOG}.gz");
    bundle.write("bundle.tgz", tar_gz(&[(entry.as_str(), &log_gz[..])]));

    let first = IngestOrchestrator::new(config(&bundle))
        .unwrap()
        .run()
        .await
        .unwrap();
    let tree_after_first = bundle.tree();

    let second = IngestOrchestrator::new(config(&bundle))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(first.archives_expanded, 2);
    assert_eq!(second.archives_expanded, 0);
    assert_eq!(bundle.tree(), tree_after_first);
    assert_eq!(
        tree_after_first,
        vec![
            "bundle".to_string(),
            "bundle/node1".to_string(),
            "bundle/node1/logs".to_string(),
            format!("bundle/node1/logs/{TSERVER_LOG}"),
        ]
    );
    // The table is append-only, so a rerun loads the same rows again
    assert_eq!(bundle.count_rows("logs").await, 20);
}

#[tokio::test]
async fn test_corrupt_archive_is_skipped() {
    init_test_tracing();
    let bundle = TestBundle::new();
    bundle.write("broken.tar.gz", b"not a tarball");
    bundle.write(&format!("{TSERVER_LOG}.gz"), gzip(log_lines(0, 3).as_bytes()));

    let summary = IngestOrchestrator::new(config(&bundle))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.archives_expanded, 1);
    assert_eq!(summary.archives_failed, 1);
    assert_eq!(summary.records_written, 3);
    assert!(bundle.path().join("broken.tar.gz").exists());
}

#[tokio::test]
async fn test_concurrent_files_commit_independently() {
    init_test_tracing();
    let bundle = TestBundle::new();
    for node in 0..3 {
        let log = log_lines(node * 1000, 250);
        let entry = format!("logs/yb-tserver-{node}.node{node}.log.INFO.20240609-061653.{node}");
        bundle.write(
            &format!("node{node}.tar.gz"),
            tar_gz(&[(entry.as_str(), log.as_bytes())]),
        );
    }

    let summary = IngestOrchestrator::new(config(&bundle).with_batch_size(100).with_concurrency(4))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.files_processed, 3);
    assert_eq!(summary.records_written, 750);
    // 100 + 100 + 50 per file
    assert_eq!(summary.batches_flushed, 9);
    assert_eq!(bundle.count_rows("logs").await, 750);
}

#[tokio::test]
async fn test_custom_table_and_markers() {
    init_test_tracing();
    let bundle = TestBundle::new();
    bundle.write(&format!("logs/{TSERVER_LOG}"), log_lines(0, 4));
    bundle.write(
        "logs/yb-master-0.node1.log.INFO.20240609-061653.9",
        log_lines(0, 6),
    );

    let selection = SelectionConfig {
        server_marker: "yb-master".to_string(),
        ..SelectionConfig::default()
    };
    let config = config(&bundle)
        .with_table_name("master_logs")
        .with_selection(selection);

    let summary = IngestOrchestrator::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.records_written, 6);
    assert_eq!(bundle.count_rows("master_logs").await, 6);
}

#[tokio::test]
async fn test_unsupported_sink_url_is_fatal() {
    let bundle = TestBundle::new();
    let config = IngestConfig::new(bundle.path(), SinkConfig::new("mysql://root@localhost/logs"));

    let err = IngestOrchestrator::new(config).unwrap().run().await.unwrap_err();

    assert!(matches!(err, IngestError::SinkConnection(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn test_invalid_table_name_is_rejected_up_front() {
    let bundle = TestBundle::new();
    let config = config(&bundle).with_table_name("logs; DROP TABLE logs");

    assert!(matches!(
        IngestOrchestrator::new(config),
        Err(IngestError::Config(_))
    ));
}

#[tokio::test]
async fn test_missing_root_fails_before_touching_the_sink() {
    let bundle = TestBundle::new();
    let config = IngestConfig::new(
        bundle.path().join("not-there"),
        SinkConfig::new(bundle.sqlite_url()),
    );

    let err = IngestOrchestrator::new(config).unwrap().run().await.unwrap_err();

    assert!(matches!(err, IngestError::Config(_)));
    assert!(!bundle.sqlite_path().exists());
}
