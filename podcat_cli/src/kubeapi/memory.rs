//! In-memory gateway for testing.
//!
//! Behaves like the apiserver for the four calls podcat makes, with
//! injectable faults per operation. Not for production use.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

use super::{deployment_key, Gateway, GatewayOp};
use crate::{Error, ErrorKind, Result};

type Key = (String, String);

fn poisoned<T>(_: PoisonError<T>) -> Error {
    ErrorKind::OrchestratorError("memory gateway lock poisoned".into()).into()
}

/// Deployments keyed by (namespace, name)
#[derive(Default)]
pub struct MemoryGateway {
    deployments: Mutex<BTreeMap<Key, Deployment>>,
    faults: Mutex<BTreeSet<GatewayOp>>,
    calls: Mutex<Vec<GatewayOp>>,
    // lands right before the next create, as if a concurrent create won
    racer: Mutex<Option<Deployment>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of this kind fail with an `OrchestratorError`
    pub fn fail_on(&self, op: GatewayOp) -> Result<()> {
        self.faults.lock().map_err(poisoned)?.insert(op);
        Ok(())
    }

    pub fn heal(&self, op: GatewayOp) -> Result<()> {
        self.faults.lock().map_err(poisoned)?.remove(&op);
        Ok(())
    }

    /// Have a competing deployment appear between the existence check and the create
    pub fn race_next_create(&self, dep: Deployment) -> Result<()> {
        *self.racer.lock().map_err(poisoned)? = Some(dep);
        Ok(())
    }

    /// Seed a deployment directly, bypassing faults and call tracking
    pub fn insert(&self, dep: Deployment) -> Result<()> {
        let key = deployment_key(&dep)?;
        self.deployments.lock().map_err(poisoned)?.insert(key, dep);
        Ok(())
    }

    /// Remove a deployment directly, as if deleted out of band
    pub fn remove(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        let key = (namespace.to_string(), name.to_string());
        Ok(self.deployments.lock().map_err(poisoned)?.remove(&key))
    }

    pub fn deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        let key = (namespace.to_string(), name.to_string());
        Ok(self.deployments.lock().map_err(poisoned)?.get(&key).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.deployments.lock().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Result<Vec<GatewayOp>> {
        Ok(self.calls.lock().map_err(poisoned)?.clone())
    }

    // track the call and trip any injected fault for it
    fn enter(&self, op: GatewayOp, what: &str) -> Result<()> {
        self.calls.lock().map_err(poisoned)?.push(op);
        if self.faults.lock().map_err(poisoned)?.contains(&op) {
            warn!("Injected {:?} fault for {}", op, what);
            bail!(ErrorKind::OrchestratorError(format!("{:?} {}: simulated fault", op, what)));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        self.enter(GatewayOp::Get, &format!("{}/{}", namespace, name))?;
        self.deployment(namespace, name)
    }

    async fn create(&self, dep: &Deployment) -> Result<()> {
        let (namespace, name) = deployment_key(dep)?;
        self.enter(GatewayOp::Create, &format!("{}/{}", namespace, name))?;
        if let Some(winner) = self.racer.lock().map_err(poisoned)?.take() {
            self.insert(winner)?;
        }
        let mut deps = self.deployments.lock().map_err(poisoned)?;
        let key = (namespace, name);
        if deps.contains_key(&key) {
            bail!(ErrorKind::AlreadyExists(key.0, key.1));
        }
        deps.insert(key, dep.clone());
        Ok(())
    }

    async fn update(&self, dep: &Deployment) -> Result<()> {
        let (namespace, name) = deployment_key(dep)?;
        self.enter(GatewayOp::Update, &format!("{}/{}", namespace, name))?;
        let mut deps = self.deployments.lock().map_err(poisoned)?;
        match deps.get_mut(&(namespace.clone(), name.clone())) {
            Some(existing) => {
                *existing = dep.clone();
                Ok(())
            }
            None => bail!(ErrorKind::NotFound(format!("deployment {}/{}", namespace, name))),
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        self.enter(GatewayOp::Delete, &format!("{}/{}", namespace, name))?;
        let key = (namespace.to_string(), name.to_string());
        match self.deployments.lock().map_err(poisoned)?.remove(&key) {
            Some(_) => Ok(()),
            None => bail!(ErrorKind::NotFound(format!("deployment {}/{}", namespace, name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryGateway;
    use crate::kubeapi::{Gateway, GatewayOp};
    use crate::{ErrorKind, WorkloadInfo};

    fn dep(name: &str) -> k8s_openapi::api::apps::v1::Deployment {
        let mut info = WorkloadInfo::named(name, "default");
        info.image = Some("x:1".into());
        info.into_workload().unwrap().to_deployment()
    }

    #[tokio::test]
    async fn create_never_overwrites() {
        let gw = MemoryGateway::new();
        gw.create(&dep("a")).await.unwrap();
        let err = gw.create(&dep("a")).await.unwrap_err();
        match err.kind() {
            ErrorKind::AlreadyExists(ns, name) => {
                assert_eq!(ns, "default");
                assert_eq!(name, "a");
            }
            k => panic!("unexpected error {:?}", k),
        }
        assert_eq!(gw.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_need_existing() {
        let gw = MemoryGateway::new();
        assert!(gw.get("default", "a").await.unwrap().is_none());
        match gw.update(&dep("a")).await.unwrap_err().kind() {
            ErrorKind::NotFound(_) => {}
            k => panic!("unexpected error {:?}", k),
        }
        match gw.delete("default", "a").await.unwrap_err().kind() {
            ErrorKind::NotFound(_) => {}
            k => panic!("unexpected error {:?}", k),
        }
        assert!(gw.is_empty().unwrap());
    }

    #[tokio::test]
    async fn faults_are_injectable() {
        let gw = MemoryGateway::new();
        gw.fail_on(GatewayOp::Create).unwrap();
        match gw.create(&dep("a")).await.unwrap_err().kind() {
            ErrorKind::OrchestratorError(_) => {}
            k => panic!("unexpected error {:?}", k),
        }
        gw.heal(GatewayOp::Create).unwrap();
        gw.create(&dep("a")).await.unwrap();
        assert_eq!(gw.calls().unwrap(), vec![GatewayOp::Create, GatewayOp::Create]);
    }
}
