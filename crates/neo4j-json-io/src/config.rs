//! Configuration types for neo4j-json-io.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Main export configuration.
///
/// Every field can come from a YAML file; command-line flags override it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Graph endpoint (`bolt://`, `neo4j://`, `http://`, `https://`, ...).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Username; absent or empty means an unauthenticated connection.
    #[serde(default)]
    pub username: Option<String>,
    /// Password for basic auth.
    #[serde(default)]
    pub password: Option<String>,
    /// Database name on the server.
    #[serde(default = "default_database")]
    pub database: String,
    /// Destination of the gzip-compressed JSON document.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Export options.
    #[serde(default)]
    pub options: ExportOptions,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            username: None,
            password: None,
            database: default_database(),
            output: None,
            options: ExportOptions::default(),
        }
    }
}

/// Tuning knobs of the streaming exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Number of rows pulled per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Gzip level, 0 (store) to 9 (best).
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    /// Show a progress spinner on stderr.
    #[serde(default)]
    pub show_progress: bool,
    /// Look for a newer release on startup.
    #[serde(default = "default_true")]
    pub check_for_updates: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            compression_level: default_compression_level(),
            show_progress: false,
            check_for_updates: true,
        }
    }
}

/// Basic-auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    /// Applies the auth rule: no username (or an empty one) means no
    /// authentication at all.
    #[must_use]
    pub fn from_parts(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match username {
            Some(user) if !user.is_empty() => Some(Self {
                username: user.to_string(),
                password: password.unwrap_or_default().to_string(),
            }),
            _ => None,
        }
    }
}

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_page_size() -> usize {
    1000
}

fn default_compression_level() -> u32 {
    6
}

fn default_true() -> bool {
    true
}

impl ExportConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Credentials derived from `username`/`password`.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(self.username.as_deref(), self.password.as_deref())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Usage` when the endpoint or output path is missing and
    /// `Error::Config` for out-of-range options.
    pub fn validate(&self) -> Result<()> {
        let has_endpoint = self.endpoint.as_deref().is_some_and(|e| !e.trim().is_empty());
        let has_output = self
            .output
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty());

        if !has_endpoint || !has_output {
            return Err(Error::Usage(
                "export and endpoint arguments must be specified".to_string(),
            ));
        }
        if self.database.is_empty() {
            return Err(Error::Config("database name cannot be empty".to_string()));
        }
        if self.options.page_size == 0 {
            return Err(Error::Config(
                "page_size must be greater than 0".to_string(),
            ));
        }
        if self.options.compression_level > 9 {
            return Err(Error::Config(format!(
                "compression_level must be between 0 and 9, got {}",
                self.options.compression_level
            )));
        }
        Ok(())
    }
}
