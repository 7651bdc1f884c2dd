use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

use super::{ErrorKind, Result};

/// Kubernetes resources for the workload container
///
/// A single maximum per resource is tracked. It is used for both the request
/// and the limit, so every workload lands in the guaranteed QoS class.
/// There is no separate minimum to burst from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    /// Number of cores
    pub cpu_max: f32,
    /// Memory as a raw quantity
    pub memory_max: f32,
}

impl Resources {
    pub fn new(cpu_max: f32, memory_max: f32) -> Self {
        Resources { cpu_max, memory_max }
    }

    pub fn verify(&self) -> Result<()> {
        if !self.cpu_max.is_finite() || self.cpu_max < 0.0 {
            bail!(ErrorKind::InvalidWorkload(format!("cpu maximum {} is not a valid quantity", self.cpu_max)));
        }
        if !self.memory_max.is_finite() || self.memory_max < 0.0 {
            bail!(ErrorKind::InvalidWorkload(format!("memory maximum {} is not a valid quantity", self.memory_max)));
        }
        Ok(())
    }

    /// The resource list used for both requests and limits
    pub fn quantities(&self) -> BTreeMap<String, Quantity> {
        let mut res = BTreeMap::new();
        res.insert("cpu".to_string(), quantity(self.cpu_max));
        res.insert("memory".to_string(), quantity(self.memory_max));
        res
    }

    /// Container resource requirements where requests == limits
    pub fn requirements(&self) -> ResourceRequirements {
        ResourceRequirements {
            limits: Some(self.quantities()),
            requests: Some(self.quantities()),
        }
    }
}

/// Fixed six decimal rendering of a float quantity
///
/// Widened to f64 before formatting so the output is stable for a given f32.
pub fn quantity(x: f32) -> Quantity {
    Quantity(format!("{:.6}", f64::from(x)))
}

#[cfg(test)]
mod tests {
    use super::{quantity, Resources};

    #[test]
    fn quantity_format() {
        assert_eq!(quantity(0.5).0, "0.500000");
        assert_eq!(quantity(2.0).0, "2.000000");
        assert_eq!(quantity(0.1).0, "0.100000");
        assert_eq!(quantity(1024.0).0, "1024.000000");
    }

    #[test]
    fn requests_equal_limits() {
        let r = Resources::new(0.25, 536870912.0).requirements();
        assert_eq!(r.requests, r.limits);
        let req = r.requests.unwrap();
        assert_eq!(req["cpu"].0, "0.250000");
        assert_eq!(req["memory"].0, "536870912.000000");
    }

    #[test]
    fn verify_rejects_negative() {
        assert!(Resources::new(1.0, 1.0).verify().is_ok());
        assert!(Resources::new(0.0, 0.0).verify().is_ok());
        assert!(Resources::new(-1.0, 1.0).verify().is_err());
        assert!(Resources::new(1.0, std::f32::NAN).verify().is_err());
    }
}
