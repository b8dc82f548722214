//! Configuration file handling.
//!
//! The config carries the server location and client credentials, in HCL:
//!
//! ```hcl
//! base_url      = "https://irida.example.net/api/"
//! client_id     = "amrctl"
//! client_secret = "..."
//! ```
//!

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration file found in {0}")]
    NotFound(String),
    #[error("Bad configuration file: {0}")]
    Malformed(String),
}

/// Server location and client credentials for one IRIDA instance.
///
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Config {
    /// Load and decode the file; a missing file and a missing key are both
    /// fatal configuration errors.
    ///
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read_to_string(path)
            .map_err(|_| ConfigError::NotFound(path.display().to_string()))?;
        debug!("config data = {data}");

        hcl::from_str(&data).map_err(|e| ConfigError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const GOOD: &str = r##"
base_url      = "https://irida.example.net/api/"
client_id     = "amrctl"
client_secret = "s3cret"
"##;

    #[test]
    fn test_config_parse() {
        let cfg: Config = hcl::from_str(GOOD).unwrap();
        assert_eq!("https://irida.example.net/api/", cfg.base_url);
        assert_eq!("amrctl", cfg.client_id);
        assert_eq!("s3cret", cfg.client_secret);
    }

    #[test]
    fn test_config_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.hcl");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(GOOD.as_bytes()).unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!("amrctl", cfg.client_id);
    }

    #[test]
    fn test_config_missing_file() {
        let res = Config::load(Path::new("/nonexistent/config.hcl"));
        assert!(matches!(res, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_config_missing_key() {
        let res: Result<Config, _> = hcl::from_str(r##"base_url = "https://x/""##);
        assert!(res.is_err());
    }
}
