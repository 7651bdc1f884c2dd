#![recursion_limit = "1024"]
#![allow(renamed_and_removed_lints)]

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate log;

#[macro_use]
extern crate error_chain;
error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }
    links {}
    foreign_links {
        Fmt(::std::fmt::Error);
        Io(::std::io::Error) #[cfg(unix)];
        SerdeY(serde_yaml::Error);
        SerdeJ(serde_json::Error);
    }
    errors {
        InvalidWorkload(reason: String) {
            description("workload request does not validate")
            display("invalid workload: {}", &reason)
        }
        InvalidConfig(reason: String) {
            description("config does not validate")
            display("invalid config: {}", &reason)
        }
    }
}

/// Config for the record store and the kube client
pub mod config;
pub use crate::config::Config;

/// Structs that make up a workload
pub mod structs;
pub use crate::structs::{EnvVar, Port, PortProtocol, PullPolicy, Resources};

/// The durable workload record
pub mod workload;
pub use crate::workload::Workload;

/// Transport shaped requests and responses
pub mod messages;
pub use crate::messages::{AllWorkload, Response, WorkloadId, WorkloadInfo};

/// Translation of a workload into a kubernetes `Deployment`
pub mod deployment;
