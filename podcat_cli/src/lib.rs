#![recursion_limit = "1024"]
#![allow(renamed_and_removed_lints)]
#![warn(rust_2018_idioms)]

#[macro_use]
extern crate log;

#[macro_use]
extern crate error_chain;
error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }
    links {
        Def(podcat_definitions::Error, podcat_definitions::ErrorKind);
    }
    foreign_links {
        Fmt(::std::fmt::Error);
        Io(::std::io::Error) #[cfg(unix)];
        SerdeY(serde_yaml::Error);
        SerdeJ(serde_json::Error);
    }
    errors {
        AlreadyExists(namespace: String, name: String) {
            description("workload already exists in kubernetes")
            display("workload {} already exists in namespace {}", &name, &namespace)
        }
        NotFound(what: String) {
            description("workload not found")
            display("{} not found", &what)
        }
        OrchestratorError(op: String) {
            description("kubernetes call failed")
            display("kubernetes call failed: {}", &op)
        }
        StoreError(op: String) {
            description("record store call failed")
            display("record store call failed: {}", &op)
        }
    }
}

pub use podcat_definitions::{
    AllWorkload, Config, EnvVar, Port, PortProtocol, PullPolicy, Response, Workload, WorkloadId, WorkloadInfo,
};

/// The kubernetes side: a gateway to `Deployment` objects
pub mod kubeapi;
pub use crate::kubeapi::{Gateway, GatewayOp, KubeGateway, MemoryGateway};

/// The relational side: durable workload records
pub mod store;
pub use crate::store::{MemoryStore, RecordStore, SqliteStore, StoreOp};

/// Sequencing of lifecycle operations across both sides
pub mod service;
pub use crate::service::Reconciler;

/// Boundary adapter from request messages to the reconciler
pub mod handler;
pub use crate::handler::WorkloadHandler;

/// Cli helpers for reading requests and printing results
pub mod show;
