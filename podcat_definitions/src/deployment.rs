use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

use super::structs::{EnvVar as WorkloadEnv, Port};
use super::Workload;

/// Label used to select the pods of a workload
pub static APP_LABEL: &str = "app-name";
/// Label marking resources created through podcat
pub static MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

fn selector_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(APP_LABEL.to_string(), name.to_string());
    labels
}

fn container_port(p: &Port) -> ContainerPort {
    ContainerPort {
        name: Some(p.name()),
        container_port: p.container_port,
        protocol: Some(p.protocol.as_str().to_string()),
        ..Default::default()
    }
}

fn env_var(e: &WorkloadEnv) -> EnvVar {
    EnvVar {
        name: e.key.clone(),
        value: Some(e.value.clone()),
        value_from: None,
    }
}

impl Workload {
    /// The desired state of this workload in kubernetes
    ///
    /// A single container deployment named after the workload.
    /// This is a pure projection; nothing is ever read back from it.
    pub fn to_deployment(&self) -> Deployment {
        let mut labels = selector_labels(&self.name);
        labels.insert(MANAGED_BY_LABEL.to_string(), "podcat".to_string());

        let container = Container {
            name: self.name.clone(),
            image: Some(self.image.clone()),
            image_pull_policy: Some(self.pull_policy.as_str().to_string()),
            ports: Some(self.ports.iter().map(container_port).collect()),
            env: Some(self.env.iter().map(env_var).collect()),
            resources: Some(self.resources().requirements()),
            ..Default::default()
        };
        trace!("Translated {}/{} into container {:?}", self.namespace, self.name, container);

        Deployment {
            metadata: Some(ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels),
                ..Default::default()
            }),
            spec: Some(DeploymentSpec {
                replicas: Some(self.replicas),
                selector: LabelSelector {
                    match_labels: Some(selector_labels(&self.name)),
                    match_expressions: None,
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(selector_labels(&self.name)),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![container],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            status: None,
        }
    }
}
