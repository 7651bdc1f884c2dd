/// Allow normal error handling from structs
pub use super::{ErrorKind, Result, ResultExt};

// Structs owned by a workload.
// These have no identity of their own and live and die with their workload.

/// Container ports
pub mod port;
pub use self::port::{Port, PortProtocol};

mod env;
pub use self::env::EnvVar;

/// Image pull policies
pub mod image;
pub use self::image::PullPolicy;

// translations - these end up straight in the container spec

/// Kubernetes resource structs
pub mod resources;
pub use self::resources::Resources;
