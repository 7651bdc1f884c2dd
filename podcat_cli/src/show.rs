use serde::Serialize;
use std::fs;
use std::path::Path;

use super::{Config, ErrorKind, Result, ResultExt, WorkloadInfo};

/// Parse a request body
///
/// JSON when `json` is set, yaml otherwise. An empty namespace is filled from config.
pub fn parse_request(data: &str, json: bool, conf: &Config) -> Result<WorkloadInfo> {
    let mut info: WorkloadInfo = if json {
        serde_json::from_str(data)?
    } else {
        serde_yaml::from_str(data)?
    };
    if info.namespace.is_empty() {
        debug!("Using default namespace {} for {}", conf.default_namespace, info.name);
        info.namespace = conf.default_namespace.clone();
    }
    Ok(info)
}

/// Read a request file
///
/// Files ending in `.json` are JSON, anything else is yaml.
pub fn read_request(pth: &Path, conf: &Config) -> Result<WorkloadInfo> {
    let data = fs::read_to_string(pth).chain_err(|| ErrorKind::Msg(format!("failed to read {}", pth.display())))?;
    let json = pth.extension().map_or(false, |ext| ext == "json");
    parse_request(&data, json, conf).chain_err(|| format!("failed to parse {}", pth.display()))
}

pub fn print_yaml<T: Serialize>(x: &T) -> Result<()> {
    println!("{}", serde_yaml::to_string(x)?);
    Ok(())
}

/// Print the deployment a request translates to
///
/// Touches neither kubernetes nor the record store.
pub fn translate(pth: &Path, conf: &Config) -> Result<()> {
    let wl = read_request(pth, conf)?.into_workload()?;
    print_yaml(&wl.to_deployment())
}

/// Print the resolved config
pub fn config(conf: &Config) -> Result<()> {
    conf.print()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_request;
    use crate::{Config, PortProtocol};

    #[test]
    fn yaml_request_gets_default_namespace() {
        let mut conf = Config::default();
        conf.default_namespace = "apps".into();
        let raw = "name: svc1\nimage: x:1\nports:\n- containerPort: 8080\n";
        let info = parse_request(raw, false, &conf).unwrap();
        assert_eq!(info.namespace, "apps");
        let ports = info.ports.unwrap();
        assert_eq!(ports[0].container_port, 8080);
        assert_eq!(ports[0].protocol, PortProtocol::Tcp);
    }

    #[test]
    fn json_request_keeps_namespace() {
        let conf = Config::default();
        let raw = r#"{"id": 4, "name": "svc1", "namespace": "staging", "replicas": 3}"#;
        let info = parse_request(raw, true, &conf).unwrap();
        assert_eq!(info.id, Some(4));
        assert_eq!(info.namespace, "staging");
        assert_eq!(info.replicas, Some(3));
        assert!(info.image.is_none());
    }

    #[test]
    fn malformed_request_is_an_error() {
        let conf = Config::default();
        assert!(parse_request("image: x:1\n", false, &conf).is_err()); // no name
        assert!(parse_request("{", true, &conf).is_err());
    }
}
