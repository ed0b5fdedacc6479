use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "centrum.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CentrumConfig {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub centrality: CentralityConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Grid size used to snap line endpoints into node identities, in source
    /// CRS units.
    #[serde(default = "default_snap_tolerance")]
    pub snap_tolerance: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: default_snap_tolerance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentralityConfig {
    /// Run per-source shortest-path expansions on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Divide betweenness by the number of node pairs.
    #[serde(default)]
    pub normalize_betweenness: bool,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            parallel: default_true(),
            normalize_betweenness: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,
    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            nominatim_url: default_nominatim_url(),
            overpass_url: default_overpass_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Read a config file. A missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid config.
pub fn load_config_file(path: &Path) -> Result<CentrumConfig> {
    let layer = read_layer(path)?;
    Ok(toml::Value::Table(layer).try_into()?)
}

/// Location of the per-user config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("centrum/config.toml"))
}

/// Resolve the effective config.
///
/// Layers, later ones overriding individual keys of earlier ones:
/// 1. built-in defaults
/// 2. the user config file
/// 3. `explicit` path (an error if it does not exist), or else
///    `centrum.toml` in `project_root`
///
/// # Errors
///
/// Returns an error if `explicit` does not exist or any layer fails to
/// parse. The message names the offending file.
pub fn resolve_config(project_root: &Path, explicit: Option<&Path>) -> Result<CentrumConfig> {
    resolve_layers(user_config_path().as_deref(), project_root, explicit)
}

fn resolve_layers(
    user: Option<&Path>,
    project_root: &Path,
    explicit: Option<&Path>,
) -> Result<CentrumConfig> {
    let mut merged = toml::Table::new();
    if let Some(path) = user {
        merge_tables(&mut merged, read_layer(path)?);
    }

    if let Some(path) = explicit {
        anyhow::ensure!(path.exists(), "Config file {} does not exist", path.display());
    }
    let project =
        explicit.map_or_else(|| project_root.join(PROJECT_CONFIG_FILE), Path::to_path_buf);
    merge_tables(&mut merged, read_layer(&project)?);

    Ok(toml::Value::Table(merged).try_into()?)
}

/// Parse one config file as a raw table, checked against the config schema
/// so errors carry the file name. A missing file is an empty layer.
fn read_layer(path: &Path) -> Result<toml::Table> {
    if !path.exists() {
        return Ok(toml::Table::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<CentrumConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    content
        .parse::<toml::Table>()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(section)) => {
                merge_tables(existing, section);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_snap_tolerance() -> f64 {
    1e-9
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_user_agent() -> String {
    concat!("centrum/", env!("CARGO_PKG_VERSION")).to_string()
}

const fn default_timeout_secs() -> u64 {
    180
}
