use std::collections::BTreeSet;

use super::structs::{EnvVar, Port, PullPolicy, Resources};
use super::{ErrorKind, Result, WorkloadInfo};

/// The durable workload record
///
/// This is what the record store persists. The kubernetes `Deployment` is
/// derived from it on every create and update, and never read back into it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    /// Identity assigned by the record store
    ///
    /// Zero until the record has been created.
    #[serde(default)]
    pub id: i64,

    /// Name of the workload
    ///
    /// Doubles as the `Deployment` name and must be unique within its namespace.
    /// Kubernetes enforces that uniqueness, the record store does not.
    pub name: String,

    /// Namespace of the `Deployment`
    pub namespace: String,

    /// Container image reference
    ///
    /// ```yaml
    /// image: quay.io/babylonhealth/webapp:1.2.3
    /// ```
    pub image: String,

    /// Desired replica count
    #[serde(default)]
    pub replicas: i32,

    /// Cores used for both the request and the limit
    #[serde(default)]
    pub cpu_max: f32,

    /// Memory used for both the request and the limit
    #[serde(default)]
    pub memory_max: f32,

    #[serde(default)]
    pub pull_policy: PullPolicy,

    /// Ports to open, in order
    #[serde(default)]
    pub ports: Vec<Port>,

    /// Environment variables, in order
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

impl Workload {
    pub fn resources(&self) -> Resources {
        Resources::new(self.cpu_max, self.memory_max)
    }

    /// Sanity check a workload before anything is sent anywhere
    pub fn verify(&self) -> Result<()> {
        if self.name.is_empty() {
            bail!(ErrorKind::InvalidWorkload("name must be set".into()));
        }
        if self.namespace.is_empty() {
            bail!(ErrorKind::InvalidWorkload(format!("{} has no namespace", self.name)));
        }
        if self.image.is_empty() {
            bail!(ErrorKind::InvalidWorkload(format!("{} has no image", self.name)));
        }
        if self.replicas < 0 {
            bail!(ErrorKind::InvalidWorkload(format!("{} has negative replicas", self.name)));
        }
        self.resources().verify()?;

        // derived port names must be unique within the container
        let mut seen = BTreeSet::new();
        for p in &self.ports {
            if p.container_port < 1 || p.container_port > 65535 {
                bail!(ErrorKind::InvalidWorkload(format!("{} has invalid port {}", self.name, p.container_port)));
            }
            if !seen.insert(p.container_port) {
                bail!(ErrorKind::InvalidWorkload(format!("{} opens port {} twice", self.name, p.container_port)));
            }
        }
        for e in &self.env {
            if e.key.is_empty() {
                bail!(ErrorKind::InvalidWorkload(format!("{} has an env var without a key", self.name)));
            }
        }
        Ok(())
    }

    /// Merge an update request onto this record
    ///
    /// Fields present in the request replace the stored ones, absent fields are kept.
    /// Ports and env vars are replaced as whole lists when present.
    /// Identity, name and namespace never change here; a request that tries to
    /// move the workload is rejected.
    pub fn merge(&mut self, info: WorkloadInfo) -> Result<()> {
        if info.name != self.name || info.namespace != self.namespace {
            bail!(ErrorKind::InvalidWorkload(format!(
                "workload {} is {}/{}, cannot move it to {}/{}",
                self.id, self.namespace, self.name, info.namespace, info.name
            )));
        }
        if let Some(image) = info.image {
            self.image = image;
        }
        if let Some(replicas) = info.replicas {
            self.replicas = replicas;
        }
        if let Some(cpu) = info.cpu_max {
            self.cpu_max = cpu;
        }
        if let Some(mem) = info.memory_max {
            self.memory_max = mem;
        }
        if let Some(pp) = info.pull_policy {
            self.pull_policy = pp;
        }
        if let Some(ports) = info.ports {
            self.ports = ports;
        }
        if let Some(env) = info.env {
            self.env = env;
        }
        Ok(())
    }
}
