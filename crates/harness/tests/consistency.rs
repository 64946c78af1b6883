//! Seeded end-to-end consistency runs.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use blobrange_harness::{Harness, HarnessConfig, KeyMode};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[tokio::test]
async fn test_sequential_run_stays_consistent() {
    init_tracing();
    let report = Harness::new(HarnessConfig::builder().ops(300).seed(1).build())
        .run()
        .await
        .expect("run");
    assert!(report.created > 0, "workload created nothing: {report:?}");
    assert!(report.scenarios > 0, "workload ran no scenarios: {report:?}");
    assert!(report.audits > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_clients_stay_consistent() {
    init_tracing();
    let config = HarnessConfig::builder().ops(400).seed(5).clients(6).build();
    let report = Harness::new(config).run().await.expect("run");
    assert!(report.created > 0, "workload created nothing: {report:?}");
    assert!(report.scenarios > 0, "workload ran no scenarios: {report:?}");
}

#[tokio::test]
async fn test_tenant_scoped_run_stays_consistent() {
    init_tracing();
    let config =
        HarnessConfig::builder().ops(250).seed(6).tenant("acme".to_string()).build();
    let report = Harness::new(config).run().await.expect("run");
    assert!(report.created > 0, "workload created nothing: {report:?}");
    assert!(report.audits > 0);
}

#[tokio::test]
async fn test_random_key_mode_stays_consistent() {
    init_tracing();
    let config = HarnessConfig::builder().ops(300).seed(2).key_mode(KeyMode::Random).build();
    let report = Harness::new(config).run().await.expect("run");
    assert!(report.created > 0, "workload created nothing: {report:?}");
}

#[tokio::test]
async fn test_reblobify_enabled_run() {
    init_tracing();
    let config = HarnessConfig::builder()
        .ops(300)
        .seed(3)
        .enable_reblobify(true)
        .scenario_probability(0.5)
        .build();
    let report = Harness::new(config).run().await.expect("run");
    assert!(report.scenarios > 0);
}

#[tokio::test]
async fn test_run_survives_injected_store_faults() {
    // Transient faults must be retried invisibly; the audit outcome is
    // identical to a clean run's.
    let config = HarnessConfig::builder().ops(200).seed(4).fault_probability(0.05).build();
    let report = Harness::new(config).run().await.expect("run");
    assert!(report.audits > 0);
}

#[tokio::test]
async fn test_distinct_seeds_all_pass() {
    for seed in 10..14 {
        let config = HarnessConfig::builder().ops(150).seed(seed).build();
        Harness::new(config).run().await.expect("run");
    }
}
