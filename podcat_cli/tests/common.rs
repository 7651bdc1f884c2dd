#![allow(dead_code)]

use std::sync::Once;

use podcat::{EnvVar, MemoryGateway, Port, PortProtocol, PullPolicy, Reconciler, SqliteStore, WorkloadInfo};

static START: Once = Once::new();

/// Shared test initialisation
///
/// Logging stays off unless PODCAT_TEST_LOG is set.
pub fn setup() {
    START.call_once(|| {
        if std::env::var("PODCAT_TEST_LOG").is_ok() {
            loggerv::Logger::new()
                .verbosity(3)
                .module_path(true)
                .line_numbers(true)
                .init()
                .unwrap();
        }
    });
}

/// A reconciler over a fake cluster and a fresh in-memory sqlite store
pub async fn reconciler() -> Reconciler<MemoryGateway, SqliteStore> {
    setup();
    let store = SqliteStore::in_memory().await.unwrap();
    Reconciler::new(MemoryGateway::new(), store)
}

/// The canonical test workload: one port and one env var so every owned table has rows
pub fn svc1() -> WorkloadInfo {
    let mut info = WorkloadInfo::named("svc1", "default");
    info.image = Some("x:1".into());
    info.replicas = Some(2);
    info.cpu_max = Some(0.5);
    info.memory_max = Some(536870912.0);
    info.pull_policy = Some(PullPolicy::IfNotPresent);
    info.ports = Some(vec![Port::new(8080, PortProtocol::Tcp)]);
    info.env = Some(vec![EnvVar::new("MODE", "production")]);
    info
}

/// Sparse update request against an existing id
pub fn update_of(id: i64) -> WorkloadInfo {
    let mut info = WorkloadInfo::named("svc1", "default");
    info.id = Some(id);
    info
}
