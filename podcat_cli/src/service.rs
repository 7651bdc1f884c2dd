use podcat_definitions::ErrorKind as DefErrorKind;

use crate::kubeapi::Gateway;
use crate::store::RecordStore;
use crate::{ErrorKind, Result, Workload, WorkloadInfo};

/// Sequencer for workload lifecycle operations
///
/// Every operation is a fixed two step protocol: kubernetes first, record store second.
/// There is no shared transaction and no compensation. When the second step fails
/// the first stays committed, and the caller gets the error of the failing step:
///
/// - add: a deployment runs without a record
/// - update: the deployment is newer than its record
/// - delete: gone from kubernetes, still recorded
///
/// These windows are logged, not repaired.
///
/// Nothing is serialized across calls. Two concurrent adds of one name can both pass
/// the existence check; kubernetes rejects the loser, which surfaces as `AlreadyExists`.
pub struct Reconciler<G, S> {
    gateway: G,
    store: S,
}

impl<G: Gateway, S: RecordStore> Reconciler<G, S> {
    pub fn new(gateway: G, store: S) -> Self {
        Reconciler { gateway, store }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a workload in kubernetes, then record it
    ///
    /// Never touches an existing deployment. Returns the new record identity.
    pub async fn add(&self, info: WorkloadInfo) -> Result<i64> {
        let wl = info.into_workload()?;
        let spec = wl.to_deployment();

        if self.gateway.get(&wl.namespace, &wl.name).await?.is_some() {
            warn!("Deployment {}/{} already exists - not creating", wl.namespace, wl.name);
            bail!(ErrorKind::AlreadyExists(wl.namespace, wl.name));
        }
        self.gateway.create(&spec).await?;

        let id = self.store.create(&wl).await.map_err(|e| {
            error!("Deployment {}/{} is running without a record: {}", wl.namespace, wl.name, e);
            e
        })?;
        info!("Added {}/{} as workload {}", wl.namespace, wl.name, id);
        Ok(id)
    }

    /// Replace a workload in kubernetes, then update its record
    ///
    /// The request is merged onto the stored record first (see `Workload::merge`),
    /// and the merged result is what both sides receive.
    /// Never creates a deployment that is not there.
    pub async fn update(&self, info: WorkloadInfo) -> Result<()> {
        let id = match info.id {
            Some(id) => id,
            None => bail!(ErrorKind::Def(DefErrorKind::InvalidWorkload(format!(
                "update of {} needs an id",
                info.name
            )))),
        };
        let mut wl = self.store.find_by_id(id).await?;
        wl.merge(info)?;
        wl.verify()?;
        let spec = wl.to_deployment();

        if self.gateway.get(&wl.namespace, &wl.name).await?.is_none() {
            warn!("Deployment {}/{} does not exist - create it first", wl.namespace, wl.name);
            bail!(ErrorKind::NotFound(format!("deployment {}/{}", wl.namespace, wl.name)));
        }
        self.gateway.update(&spec).await?;

        self.store.update(&wl).await.map_err(|e| {
            error!("Deployment {}/{} updated but workload {} is stale: {}", wl.namespace, wl.name, id, e);
            e
        })?;
        info!("Updated {}/{} (workload {})", wl.namespace, wl.name, id);
        Ok(())
    }

    /// Remove a workload from kubernetes, then delete its records
    ///
    /// Records are left intact when the kubernetes delete fails.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let wl = self.store.find_by_id(id).await?;

        self.gateway.delete(&wl.namespace, &wl.name).await?;

        self.store.delete_by_id(id).await.map_err(|e| {
            error!("Deployment {}/{} deleted but workload {} is still recorded: {}", wl.namespace, wl.name, id, e);
            e
        })?;
        info!("Deleted {}/{} (workload {})", wl.namespace, wl.name, id);
        Ok(())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Workload> {
        self.store.find_by_id(id).await
    }

    pub async fn find_all(&self) -> Result<Vec<Workload>> {
        self.store.find_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::Reconciler;
    use crate::kubeapi::{GatewayOp, MemoryGateway};
    use crate::store::{MemoryStore, RecordStore, StoreOp};
    use crate::{Error, ErrorKind, Port, PortProtocol, WorkloadInfo};

    type Rec = Reconciler<MemoryGateway, MemoryStore>;

    fn rec() -> Rec {
        Reconciler::new(MemoryGateway::new(), MemoryStore::new())
    }

    fn svc1() -> WorkloadInfo {
        let mut info = WorkloadInfo::named("svc1", "default");
        info.image = Some("x:1".into());
        info.replicas = Some(2);
        info.ports = Some(vec![Port::new(8080, PortProtocol::Tcp)]);
        info
    }

    fn is_already_exists(e: &Error) -> bool {
        match e.kind() {
            ErrorKind::AlreadyExists(..) => true,
            _ => false,
        }
    }
    fn is_not_found(e: &Error) -> bool {
        match e.kind() {
            ErrorKind::NotFound(_) => true,
            _ => false,
        }
    }
    fn is_orchestrator(e: &Error) -> bool {
        match e.kind() {
            ErrorKind::OrchestratorError(_) => true,
            _ => false,
        }
    }
    fn is_store(e: &Error) -> bool {
        match e.kind() {
            ErrorKind::StoreError(_) => true,
            _ => false,
        }
    }

    #[tokio::test]
    async fn add_checks_existence_first() {
        let r = rec();
        r.add(svc1()).await.unwrap();
        let err = r.add(svc1()).await.unwrap_err();
        assert!(is_already_exists(&err));
        assert_eq!(r.store().len().unwrap(), 1);
        // second add stopped at the existence check
        let calls = r.gateway().calls().unwrap();
        assert_eq!(calls, vec![GatewayOp::Get, GatewayOp::Create, GatewayOp::Get]);
    }

    #[tokio::test]
    async fn add_same_name_other_namespace() {
        let r = rec();
        let a = r.add(svc1()).await.unwrap();
        let mut other = svc1();
        other.namespace = "staging".into();
        let b = r.add(other).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(r.gateway().len().unwrap(), 2);
    }

    #[tokio::test]
    async fn add_lost_race_is_already_exists() {
        let r = rec();
        let mut competitor = svc1();
        competitor.image = Some("competitor:1".into());
        let dep = competitor.into_workload().unwrap().to_deployment();
        r.gateway().race_next_create(dep).unwrap();

        let err = r.add(svc1()).await.unwrap_err();
        assert!(is_already_exists(&err));
        assert!(r.store().is_empty().unwrap());
        // the winner is untouched
        let dep = r.gateway().deployment("default", "svc1").unwrap().unwrap();
        let c = &dep.spec.unwrap().template.spec.unwrap().containers[0];
        assert_eq!(c.image.as_ref().unwrap(), "competitor:1");
    }

    #[tokio::test]
    async fn add_gateway_failure_skips_store() {
        let r = rec();
        r.gateway().fail_on(GatewayOp::Create).unwrap();
        let err = r.add(svc1()).await.unwrap_err();
        assert!(is_orchestrator(&err));
        assert!(r.store().calls().unwrap().is_empty());

        let r = rec();
        r.gateway().fail_on(GatewayOp::Get).unwrap();
        assert!(is_orchestrator(&r.add(svc1()).await.unwrap_err()));
        assert!(r.store().calls().unwrap().is_empty());
        assert!(r.gateway().is_empty().unwrap());
    }

    #[tokio::test]
    async fn add_store_failure_leaves_deployment() {
        let r = rec();
        r.store().fail_on(StoreOp::Create).unwrap();
        let err = r.add(svc1()).await.unwrap_err();
        assert!(is_store(&err));
        // no compensation: kubernetes keeps running it
        assert!(r.gateway().deployment("default", "svc1").unwrap().is_some());
        assert!(r.store().is_empty().unwrap());
    }

    #[tokio::test]
    async fn add_invalid_request_touches_nothing() {
        let r = rec();
        let mut info = svc1();
        info.image = None;
        assert!(r.add(info).await.is_err());
        assert!(r.gateway().calls().unwrap().is_empty());
        assert!(r.store().calls().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_merges_onto_record() {
        let r = rec();
        let id = r.add(svc1()).await.unwrap();
        let mut info = WorkloadInfo::named("svc1", "default");
        info.id = Some(id);
        info.image = Some("x:2".into());
        info.replicas = Some(3);
        r.update(info).await.unwrap();

        let wl = r.find_by_id(id).await.unwrap();
        assert_eq!(wl.image, "x:2");
        assert_eq!(wl.replicas, 3);
        assert_eq!(wl.ports, vec![Port::new(8080, PortProtocol::Tcp)]);

        // kubernetes got the merged workload, not the sparse request
        let dep = r.gateway().deployment("default", "svc1").unwrap().unwrap();
        let spec = dep.spec.unwrap();
        assert_eq!(spec.replicas, Some(3));
        let c = &spec.template.spec.unwrap().containers[0];
        assert_eq!(c.image.as_ref().unwrap(), "x:2");
        assert_eq!(c.ports.as_ref().unwrap()[0].name.as_ref().unwrap(), "port-8080");
    }

    #[tokio::test]
    async fn update_requires_deployment() {
        let r = rec();
        let id = r.store().create(&svc1().into_workload().unwrap()).await.unwrap();
        let mut info = WorkloadInfo::named("svc1", "default");
        info.id = Some(id);
        info.image = Some("x:2".into());
        let err = r.update(info).await.unwrap_err();
        assert!(is_not_found(&err));
        assert!(r.gateway().is_empty().unwrap()); // never created
        assert_eq!(r.find_by_id(id).await.unwrap().image, "x:1");
    }

    #[tokio::test]
    async fn update_requires_id_and_record() {
        let r = rec();
        r.add(svc1()).await.unwrap();
        assert!(r.update(WorkloadInfo::named("svc1", "default")).await.is_err());

        let mut info = WorkloadInfo::named("svc1", "default");
        info.id = Some(99);
        assert!(is_not_found(&r.update(info).await.unwrap_err()));
        assert_eq!(r.gateway().calls().unwrap(), vec![GatewayOp::Get, GatewayOp::Create]);
    }

    #[tokio::test]
    async fn update_of_unknown_id_leaves_deployment() {
        let r = rec();
        let dep = svc1().into_workload().unwrap().to_deployment();
        r.gateway().insert(dep.clone()).unwrap();

        let mut info = WorkloadInfo::named("svc1", "default");
        info.id = Some(42);
        info.image = Some("x:2".into());
        assert!(is_not_found(&r.update(info).await.unwrap_err()));
        // the record lookup failed before kubernetes was asked anything
        assert!(r.gateway().calls().unwrap().is_empty());
        assert_eq!(r.gateway().deployment("default", "svc1").unwrap(), Some(dep));
    }

    #[tokio::test]
    async fn update_rename_rejected() {
        let r = rec();
        let id = r.add(svc1()).await.unwrap();
        let mut info = WorkloadInfo::named("svc2", "default");
        info.id = Some(id);
        assert!(r.update(info).await.is_err());
        assert!(r.gateway().deployment("default", "svc2").unwrap().is_none());
    }

    #[tokio::test]
    async fn update_store_failure_leaves_stale_record() {
        let r = rec();
        let id = r.add(svc1()).await.unwrap();
        r.store().fail_on(StoreOp::Update).unwrap();
        let mut info = WorkloadInfo::named("svc1", "default");
        info.id = Some(id);
        info.replicas = Some(5);
        assert!(is_store(&r.update(info).await.unwrap_err()));

        let dep = r.gateway().deployment("default", "svc1").unwrap().unwrap();
        assert_eq!(dep.spec.unwrap().replicas, Some(5));
        assert_eq!(r.find_by_id(id).await.unwrap().replicas, 2);
    }

    #[tokio::test]
    async fn delete_removes_both_sides() {
        let r = rec();
        let id = r.add(svc1()).await.unwrap();
        r.delete(id).await.unwrap();
        assert!(r.gateway().is_empty().unwrap());
        assert!(r.store().is_empty().unwrap());
        assert!(is_not_found(&r.delete(id).await.unwrap_err()));
    }

    #[tokio::test]
    async fn delete_gateway_failure_keeps_record() {
        let r = rec();
        let id = r.add(svc1()).await.unwrap();
        r.gateway().fail_on(GatewayOp::Delete).unwrap();
        assert!(is_orchestrator(&r.delete(id).await.unwrap_err()));
        assert_eq!(r.find_by_id(id).await.unwrap().name, "svc1");
        assert!(!r.store().calls().unwrap().contains(&StoreOp::Delete));
    }

    #[tokio::test]
    async fn delete_store_failure_leaves_record_only() {
        let r = rec();
        let id = r.add(svc1()).await.unwrap();
        r.store().fail_on(StoreOp::Delete).unwrap();
        assert!(is_store(&r.delete(id).await.unwrap_err()));
        assert!(r.gateway().is_empty().unwrap());
        assert!(r.find_by_id(id).await.is_ok());
    }

    #[tokio::test]
    async fn reads_never_touch_kubernetes() {
        let r = rec();
        let id = r.add(svc1()).await.unwrap();
        let before = r.gateway().calls().unwrap();
        r.find_by_id(id).await.unwrap();
        assert_eq!(r.find_all().await.unwrap().len(), 1);
        assert_eq!(r.gateway().calls().unwrap(), before);
    }
}
