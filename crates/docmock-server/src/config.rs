//! Server configuration file.
//!
//! ```yaml
//! spec: api/petstore.yaml        # or spec_url: https://...
//! host: 0.0.0.0
//! port: 8080
//! responses: mocks/responses.json
//! files_root: mocks/bodies
//! response_dir: mocks/canned
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Specification file (RAML or Swagger/OpenAPI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<PathBuf>,

    /// Specification fetched over HTTP(S)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_url: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    /// Listening port; 0 picks a free one
    #[serde(default = "default_port")]
    pub port: u16,

    /// Response override file loaded after the stubs are created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<PathBuf>,

    /// Root `bodyFileName`s are resolved against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_root: Option<PathBuf>,

    /// Directory of `<path>/response.<ext>` files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_dir: Option<PathBuf>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            spec: None,
            spec_url: None,
            host: default_host(),
            port: default_port(),
            responses: None,
            files_root: None,
            response_dir: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match (&self.spec, &self.spec_url) {
            (None, None) => anyhow::bail!("Either 'spec' or 'spec_url' must be configured"),
            (Some(_), Some(_)) => {
                anyhow::bail!("'spec' and 'spec_url' are mutually exclusive, configure only one")
            }
            _ => {}
        }

        if let Some(url) = &self.spec_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("Unsupported spec_url '{}'. Only http and https are supported", url);
            }
        }

        if self.host.trim().is_empty() {
            anyhow::bail!("'host' must not be empty");
        }

        for (name, dir) in [("files_root", &self.files_root), ("response_dir", &self.response_dir)] {
            if let Some(dir) = dir {
                if !dir.is_dir() {
                    anyhow::bail!("'{}' is not a directory: {}", name, dir.display());
                }
            }
        }

        Ok(())
    }
}
