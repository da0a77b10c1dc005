//! Project configuration for contract test runs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenAPI document carrying the `x-api-tests` extensions
    pub spec: PathBuf,

    /// Base URL of the server under test
    pub base_url: String,

    /// Name reported for the test suite
    #[serde(default = "default_suite_name")]
    pub suite_name: String,

    /// Base directory for files referenced by multipart bodies
    /// (default: directory of the OpenAPI document)
    #[serde(default)]
    pub external_base_path: Option<PathBuf>,

    /// Headers added to every request (auth, API keys); spec values win on conflict
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Colorize terminal reports
    #[serde(default = "default_color")]
    pub color: bool,

    /// Run string `setUp`/`tearDown` hooks as shell commands
    #[serde(default)]
    pub run_hooks: bool,
}

fn default_suite_name() -> String {
    "API Tests".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_color() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spec: PathBuf::from("openapi.yaml"),
            base_url: "http://localhost:8080".to_string(),
            suite_name: default_suite_name(),
            external_base_path: None,
            headers: HashMap::new(),
            timeout_secs: default_timeout_secs(),
            color: default_color(),
            run_hooks: false,
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from the first default location that exists, or fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".apicontract.toml", ".apicontract.json", "apicontract.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                tracing::debug!(config = name, "loading config");
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Example config file written by `apicontract init`
    #[must_use]
    pub fn example() -> &'static str {
        r#"# apicontract configuration

# OpenAPI document with x-api-tests extensions
spec = "docs/api/v1/api.yaml"

# Server to test
base_url = "http://localhost:8080"

# Suite name shown in reports
# suite_name = "API Tests"

# Base directory for files uploaded by multipart tests (default: spec directory)
# external_base_path = "tests/fixtures"

# Headers sent with every request (auth, api keys)
[headers]
# Authorization = "Bearer your-token-here"

# Per-request timeout in seconds
# timeout_secs = 10

# Colorized reports
# color = true

# Run string setUp/tearDown hooks as shell commands
# run_hooks = false
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}
