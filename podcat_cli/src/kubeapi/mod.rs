use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::{Api, DeleteParams, PostParams},
    client::APIClient,
};
use std::{future::Future, time::Duration};

use crate::{Config, ErrorKind, Result, ResultExt};

mod memory;
pub use self::memory::MemoryGateway;

/// Operations a gateway performs, for fault injection and call tracking
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GatewayOp {
    Get,
    Create,
    Update,
    Delete,
}

/// Interface to the `Deployment` objects kubernetes runs workloads with
///
/// Deployments are keyed by namespace and name only.
/// A missing deployment on `get` is an expected outcome and comes back as `None`.
/// Every other failure is an `OrchestratorError` with the cause chained,
/// except for the two outcomes kubernetes reports distinctly:
/// - `create` on an existing deployment is `AlreadyExists`
/// - `update` or `delete` on a missing deployment is `NotFound`
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Deployment>>;

    /// Create a deployment, never overwriting
    async fn create(&self, dep: &Deployment) -> Result<()>;

    /// Fully replace an existing deployment, never creating
    async fn update(&self, dep: &Deployment) -> Result<()>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Namespace and name of a deployment
pub(crate) fn deployment_key(dep: &Deployment) -> Result<(String, String)> {
    let md = dep.metadata.as_ref();
    let ns = md.and_then(|m| m.namespace.clone());
    let name = md.and_then(|m| m.name.clone());
    match (ns, name) {
        (Some(ns), Some(name)) => Ok((ns, name)),
        _ => bail!(ErrorKind::OrchestratorError("deployment has no namespace or name".into())),
    }
}

/// Client creator
///
/// In-cluster config when running in a pod, otherwise the local kube config.
async fn make_client() -> Result<APIClient> {
    let config = if let Ok(cfg) = kube::config::incluster_config() {
        cfg
    } else {
        kube::config::load_kube_config()
            .await
            .chain_err(|| ErrorKind::OrchestratorError("load kube config".into()))?
    };
    Ok(kube::client::APIClient::new(config))
}

/// Gateway to a real cluster via `kube::Api<Deployment>`
///
/// Each call is bounded by the configured timeout.
#[derive(Clone)]
pub struct KubeGateway {
    client: APIClient,
    timeout: Duration,
}

impl KubeGateway {
    pub async fn new(conf: &Config) -> Result<Self> {
        let client = make_client().await?;
        Ok(Self::with_client(client, conf.timeout()))
    }

    pub fn with_client(client: APIClient, timeout: Duration) -> Self {
        KubeGateway { client, timeout }
    }

    fn api(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    // a timeout becomes an OrchestratorError, kube errors are left to the caller to classify
    async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<std::result::Result<T, kube::Error>>
    where
        F: Future<Output = std::result::Result<T, kube::Error>>,
    {
        let secs = self.timeout.as_secs();
        tokio::time::timeout(self.timeout, fut)
            .await
            .chain_err(|| ErrorKind::OrchestratorError(format!("{} timed out after {}s", op, secs)))
    }
}

#[async_trait]
impl Gateway for KubeGateway {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        let op = format!("get deployment {}/{}", namespace, name);
        let api = self.api(namespace);
        match self.bounded(&op, api.get(name)).await? {
            Ok(dep) => Ok(Some(dep)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!("Deployment {}/{} does not exist", namespace, name);
                Ok(None)
            }
            Err(e) => Err(e).chain_err(|| ErrorKind::OrchestratorError(op)),
        }
    }

    async fn create(&self, dep: &Deployment) -> Result<()> {
        let (namespace, name) = deployment_key(dep)?;
        let op = format!("create deployment {}/{}", namespace, name);
        let api = self.api(&namespace);
        let pp = PostParams::default();
        match self.bounded(&op, api.create(&pp, dep)).await? {
            Ok(_) => {
                info!("Created deployment {}/{}", namespace, name);
                Ok(())
            }
            // lost a race against a concurrent create
            Err(kube::Error::Api(ae)) if ae.code == 409 => bail!(ErrorKind::AlreadyExists(namespace, name)),
            Err(e) => Err(e).chain_err(|| ErrorKind::OrchestratorError(op)),
        }
    }

    async fn update(&self, dep: &Deployment) -> Result<()> {
        let (namespace, name) = deployment_key(dep)?;
        let op = format!("replace deployment {}/{}", namespace, name);
        let api = self.api(&namespace);
        let pp = PostParams::default();
        match self.bounded(&op, api.replace(&name, &pp, dep)).await? {
            Ok(_) => {
                info!("Replaced deployment {}/{}", namespace, name);
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                bail!(ErrorKind::NotFound(format!("deployment {}/{}", namespace, name)))
            }
            Err(e) => Err(e).chain_err(|| ErrorKind::OrchestratorError(op)),
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        let op = format!("delete deployment {}/{}", namespace, name);
        let api = self.api(namespace);
        let dp = DeleteParams::default();
        match self.bounded(&op, api.delete(name, &dp)).await? {
            Ok(_) => {
                info!("Deleted deployment {}/{}", namespace, name);
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                bail!(ErrorKind::NotFound(format!("deployment {}/{}", namespace, name)))
            }
            Err(e) => Err(e).chain_err(|| ErrorKind::OrchestratorError(op)),
        }
    }
}
