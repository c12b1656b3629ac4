use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ErrorCode;

/// How the interior of a component is resolved for each entry/exit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPolicy {
    /// Recurse into the interior subgraph. Exact.
    #[default]
    Exact,
    /// Ask the estimator and install its answer as-is.
    Estimated,
    /// Odd requests resolve to zero; even requests ask the estimator and
    /// recurse exactly when it reports any path. Output depends on the order
    /// in which pairs are visited.
    Alternating,
}

impl ResolutionPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Estimated => "estimated",
            Self::Alternating => "alternating",
        }
    }
}

impl fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionPolicy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "estimated" | "estimate" => Ok(Self::Estimated),
            "alternating" => Ok(Self::Alternating),
            other => bail!("unknown resolution policy `{other}` (expected exact, estimated or alternating)"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AplConfig {
    #[serde(default)]
    pub decompose: DecomposeConfig,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub dump: DumpConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecomposeConfig {
    #[serde(default)]
    pub policy: ResolutionPolicy,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            policy: ResolutionPolicy::default(),
            max_depth: default_max_depth(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    #[serde(default = "default_request_path")]
    pub request_path: PathBuf,
    #[serde(default = "default_response_path")]
    pub response_path: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Unset means wait for the estimator indefinitely.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            request_path: default_request_path(),
            response_path: default_response_path(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: None,
        }
    }
}

impl EstimatorConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpConfig {
    /// Where to write the diagnostic dump of the input graph, if anywhere.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

const fn default_max_depth() -> usize {
    256
}

fn default_request_path() -> PathBuf {
    PathBuf::from("subgraph.txt")
}

fn default_response_path() -> PathBuf {
    PathBuf::from("results.txt")
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = "apl.toml";

pub fn load_config(path: &Path) -> Result<AplConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<AplConfig>(&content).with_context(|| {
        format!(
            "{}: failed to parse {}",
            ErrorCode::ConfigParseError.code(),
            path.display()
        )
    })
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("apl/config.toml"))
}

/// Resolve the effective configuration.
///
/// Precedence (highest wins):
/// 1. `APL_POLICY` env var for the resolution policy
/// 2. `explicit` path (must exist)
/// 3. `apl.toml` in `cwd`
/// 4. `<config dir>/apl/config.toml`
/// 5. built-in defaults
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<AplConfig> {
    let config = match explicit {
        Some(path) => load_config(path)?,
        None => {
            let local = cwd.join(LOCAL_CONFIG_FILE);
            if local.exists() {
                load_config(&local)?
            } else {
                match user_config_path().filter(|p| p.exists()) {
                    Some(user) => load_config(&user)?,
                    None => AplConfig::default(),
                }
            }
        }
    };

    apply_env(config, env::var("APL_POLICY").ok())
}

fn apply_env(mut config: AplConfig, env_policy: Option<String>) -> Result<AplConfig> {
    if let Some(raw) = env_policy {
        config.decompose.policy = raw
            .parse()
            .context("Invalid APL_POLICY value")?;
    }
    Ok(config)
}
