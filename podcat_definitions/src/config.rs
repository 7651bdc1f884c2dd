use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{ErrorKind, Result};

/// Main config for podcat
///
/// Read from a `podcat.conf` yaml file:
///
/// ```yaml
/// database: /var/lib/podcat/workloads.db
/// timeout: 10
/// defaultNamespace: apps
/// ```
///
/// Every key is optional. `PODCAT_DATABASE` overrides the database path.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Path of the sqlite record store
    pub database: String,

    /// Seconds each outbound call may take
    ///
    /// Applies separately to every kube api call and to sqlite lock waits.
    pub timeout: u64,

    /// Namespace used when a request does not specify one
    pub default_namespace: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: "podcat.db".into(),
            timeout: 30,
            default_namespace: "default".into(),
        }
    }
}

impl Config {
    pub fn verify(&self) -> Result<()> {
        if self.database.is_empty() {
            bail!(ErrorKind::InvalidConfig("database path cannot be empty".into()));
        }
        if self.timeout == 0 {
            bail!(ErrorKind::InvalidConfig("timeout must be at least one second".into()));
        }
        if self.default_namespace.is_empty() {
            bail!(ErrorKind::InvalidConfig("defaultNamespace cannot be empty".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Read a config file in an arbitrary path
    pub fn read_from(pth: &Path) -> Result<Config> {
        use std::fs::File;
        use std::io::prelude::*;
        trace!("Using config in {}", pth.display());
        if !pth.exists() {
            bail!("Config file {} does not exist", pth.display())
        }
        let mut f = File::open(pth)?;
        let mut data = String::new();
        f.read_to_string(&mut data)?;
        let conf: Config = serde_yaml::from_str(&data)?;
        Ok(conf)
    }

    /// Resolve the config for the cli
    ///
    /// Uses `PODCAT_CONFIG` if set, otherwise `podcat.conf` in pwd if it exists,
    /// otherwise defaults. Environment overrides are applied last.
    pub fn read() -> Result<Config> {
        let mut conf = if let Ok(pth) = env::var("PODCAT_CONFIG") {
            Config::read_from(&PathBuf::from(pth))?
        } else {
            let local = Path::new(".").join("podcat.conf");
            if local.exists() {
                Config::read_from(&local)?
            } else {
                debug!("No podcat.conf found - using defaults");
                Config::default()
            }
        };
        if let Ok(db) = env::var("PODCAT_DATABASE") {
            debug!("Using database {} from PODCAT_DATABASE", db);
            conf.database = db;
        }
        conf.verify()?;
        Ok(conf)
    }

    pub fn print(&self) -> Result<()> {
        print!("{}", serde_yaml::to_string(self)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn partial_config_gets_defaults() {
        let conf: Config = serde_yaml::from_str("timeout: 5").unwrap();
        assert_eq!(conf.timeout, 5);
        assert_eq!(conf.database, "podcat.db");
        assert_eq!(conf.default_namespace, "default");
        assert!(conf.verify().is_ok());
    }

    #[test]
    fn config_verify() {
        let mut conf = Config::default();
        assert!(conf.verify().is_ok());
        conf.timeout = 0;
        assert!(conf.verify().is_err());
        let conf = Config { database: "".into(), ..Config::default() };
        assert!(conf.verify().is_err());
    }

    #[test]
    fn unknown_keys_rejected() {
        let res: Result<Config, _> = serde_yaml::from_str("databse: typo.db");
        assert!(res.is_err());
    }
}
