use std::fmt;

/// Transport protocol of a container port
///
/// Any string parses: unrecognised ones become `TCP`.
/// A protocol that is not a string at all is still a deserialization error.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum PortProtocol {
    Tcp,
    Udp,
    Sctp,
}

impl Default for PortProtocol {
    fn default() -> Self { PortProtocol::Tcp }
}

impl PortProtocol {
    /// Total parser for protocol strings
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "TCP" => PortProtocol::Tcp,
            "UDP" => PortProtocol::Udp,
            "SCTP" => PortProtocol::Sctp,
            _ => {
                debug!("Unrecognised port protocol '{}' - using TCP", s);
                PortProtocol::Tcp
            }
        }
    }

    /// The string kubernetes expects in a `ContainerPort`
    pub fn as_str(&self) -> &'static str {
        match self {
            PortProtocol::Tcp => "TCP",
            PortProtocol::Udp => "UDP",
            PortProtocol::Sctp => "SCTP",
        }
    }
}

impl From<String> for PortProtocol {
    fn from(s: String) -> Self { PortProtocol::from_str_lossy(&s) }
}

impl fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Port to open on a container
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Port to open
    pub container_port: i32,
    /// Port protocol
    #[serde(default)]
    pub protocol: PortProtocol,
}

impl Port {
    pub fn new(container_port: i32, protocol: PortProtocol) -> Self {
        Port { container_port, protocol }
    }

    /// Name of the port in the container spec
    ///
    /// Kubernetes requires port names to be unique within a container,
    /// so it is derived from the port number.
    pub fn name(&self) -> String {
        format!("port-{}", self.container_port)
    }
}
