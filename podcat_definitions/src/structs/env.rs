/// Plain environment variable to inject into the container
///
/// ```yaml
/// env:
/// - key: DATABASE_HOST
///   value: postgres.default
/// ```
///
/// Values are passed straight through; there is no secret indirection.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct EnvVar {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl EnvVar {
    pub fn new(key: &str, value: &str) -> Self {
        EnvVar { key: key.into(), value: value.into() }
    }
}
