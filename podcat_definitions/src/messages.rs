use super::structs::{EnvVar, Port, PullPolicy};
use super::{Result, Workload};

/// A workload as it arrives from, or is returned to, a caller
///
/// Everything except the key is optional so the same message can carry a full
/// create request and a partial update.
///
/// ```yaml
/// name: svc1
/// namespace: default
/// image: x:1
/// replicas: 2
/// cpuMax: 0.5
/// memoryMax: 536870912
/// pullPolicy: IfNotPresent
/// ports:
/// - containerPort: 8080
///   protocol: TCP
/// env:
/// - key: MODE
///   value: production
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadInfo {
    /// Record identity, required for updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    /// Namespace, filled in from config by the cli when left empty
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_max: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_max: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_policy: Option<PullPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<Port>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvVar>>,
}

impl WorkloadInfo {
    /// Bare request for a named workload
    pub fn named(name: &str, namespace: &str) -> Self {
        WorkloadInfo {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Build a fresh record for creation
    ///
    /// Missing fields take their defaults. Any id on the request is ignored;
    /// the record store assigns identity.
    pub fn into_workload(self) -> Result<Workload> {
        if let Some(id) = self.id {
            debug!("Ignoring id {} on create request for {}", id, self.name);
        }
        let wl = Workload {
            id: 0,
            name: self.name,
            namespace: self.namespace,
            image: self.image.unwrap_or_default(),
            replicas: self.replicas.unwrap_or_default(),
            cpu_max: self.cpu_max.unwrap_or_default(),
            memory_max: self.memory_max.unwrap_or_default(),
            pull_policy: self.pull_policy.unwrap_or_default(),
            ports: self.ports.unwrap_or_default(),
            env: self.env.unwrap_or_default(),
        };
        wl.verify()?;
        Ok(wl)
    }
}

impl From<Workload> for WorkloadInfo {
    fn from(wl: Workload) -> Self {
        WorkloadInfo {
            id: Some(wl.id),
            name: wl.name,
            namespace: wl.namespace,
            image: Some(wl.image),
            replicas: Some(wl.replicas),
            cpu_max: Some(wl.cpu_max),
            memory_max: Some(wl.memory_max),
            pull_policy: Some(wl.pull_policy),
            ports: Some(wl.ports),
            env: Some(wl.env),
        }
    }
}

/// Identity of a stored workload
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct WorkloadId {
    pub id: i64,
}

/// Result of a mutating call
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Response {
    pub msg: String,
    /// Identity assigned on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Result of a listing
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AllWorkload {
    pub workloads: Vec<WorkloadInfo>,
}
