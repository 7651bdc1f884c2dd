use std::fmt;

/// Image pull policy for the workload container
///
/// Any string parses: unrecognised ones become `Always`.
/// A value that is not a string is still a deserialization error.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(from = "String")]
pub enum PullPolicy {
    Always,
    Never,
    IfNotPresent,
}

impl Default for PullPolicy {
    fn default() -> Self { PullPolicy::Always }
}

impl PullPolicy {
    /// Total parser for pull policy strings
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "Always" => PullPolicy::Always,
            "Never" => PullPolicy::Never,
            "IfNotPresent" => PullPolicy::IfNotPresent,
            _ => {
                debug!("Unrecognised pull policy '{}' - using Always", s);
                PullPolicy::Always
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Always => "Always",
            PullPolicy::Never => "Never",
            PullPolicy::IfNotPresent => "IfNotPresent",
        }
    }
}

impl From<String> for PullPolicy {
    fn from(s: String) -> Self { PullPolicy::from_str_lossy(&s) }
}

impl fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::PullPolicy;

    #[test]
    fn pull_policy_parse_is_total() {
        assert_eq!(PullPolicy::from_str_lossy("Never"), PullPolicy::Never);
        assert_eq!(PullPolicy::from_str_lossy("IfNotPresent"), PullPolicy::IfNotPresent);
        assert_eq!(PullPolicy::from_str_lossy("Always"), PullPolicy::Always);
        assert_eq!(PullPolicy::from_str_lossy("sometimes"), PullPolicy::Always);
        assert_eq!(PullPolicy::from_str_lossy("never"), PullPolicy::Always);

        let pp: PullPolicy = serde_yaml::from_str("IfNotPresent").unwrap();
        assert_eq!(pp, PullPolicy::IfNotPresent);
        let pp: PullPolicy = serde_yaml::from_str("latest").unwrap();
        assert_eq!(pp, PullPolicy::Always);
    }

    #[test]
    fn non_string_pull_policy_is_rejected() {
        assert!(serde_json::from_str::<PullPolicy>("true").is_err());
        assert_eq!(serde_json::from_str::<PullPolicy>(r#""true""#).unwrap(), PullPolicy::Always);
    }
}
