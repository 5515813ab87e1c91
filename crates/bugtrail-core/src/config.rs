use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fields::DEFAULT_FLAG_ALIAS;
use crate::model::BugId;
use crate::row::InputFormat;

/// File name looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "bugtrail.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub replay: ReplayOptions,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Knobs of the reconstruction itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayOptions {
    /// Rows with a bug id at or above this value terminate the stream.
    /// `0` disables the sentinel.
    #[serde(default = "default_sentinel")]
    pub sentinel_bug_id: Option<BugId>,
    /// Field name the activity table uses for flag changes.
    #[serde(default = "default_flag_alias")]
    pub flag_field_alias: String,
    /// Retry failed `dependson`/`blocked` removals without a leading `"? "`.
    #[serde(default = "default_true")]
    pub trim_uncertain_dependencies: bool,
    /// Sort the CC list of every emitted snapshot.
    #[serde(default = "default_true")]
    pub stabilize: bool,
    /// Annotate snapshots with status-history measurements.
    #[serde(default = "default_true")]
    pub measure: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            sentinel_bug_id: default_sentinel(),
            flag_field_alias: default_flag_alias(),
            trim_uncertain_dependencies: default_true(),
            stabilize: default_true(),
            measure: default_true(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub format: InputFormat,
}

/// Shape of the emitted snapshot stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    /// `{"bug_id":…,"_id":…,"body":{…}}` per line.
    #[default]
    Jsonl,
    /// The snapshot body alone per line.
    Bodies,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: SnapshotFormat,
    /// Pretty-print each document (no longer one line per snapshot).
    #[serde(default)]
    pub pretty: bool,
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum ConfigSource {
    Explicit(PathBuf),
    Project(PathBuf),
    User(PathBuf),
    Defaults,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    pub config: Config,
    pub source: ConfigSource,
}

/// Parse one config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML for
/// [`Config`].
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// User-level config path (`<config dir>/bugtrail/config.toml`), if the
/// platform has a config directory.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bugtrail/config.toml"))
}

/// Resolve the effective configuration.
///
/// Precedence (first hit wins, files are not merged):
/// 1. `explicit` path (must exist)
/// 2. `bugtrail.toml` in `project_root`
/// 3. user config file
/// 4. built-in defaults
///
/// # Errors
///
/// Returns an error if the selected file cannot be read or parsed.
pub fn resolve_config(project_root: &Path, explicit: Option<&Path>) -> Result<EffectiveConfig> {
    resolve_config_with(project_root, explicit, user_config_path().as_deref())
}

fn resolve_config_with(
    project_root: &Path,
    explicit: Option<&Path>,
    user_path: Option<&Path>,
) -> Result<EffectiveConfig> {
    if let Some(path) = explicit {
        return Ok(EffectiveConfig {
            config: load_config_file(path)?,
            source: ConfigSource::Explicit(path.to_path_buf()),
        });
    }

    let project = project_root.join(PROJECT_CONFIG_FILE);
    if project.exists() {
        return Ok(EffectiveConfig {
            config: load_config_file(&project)?,
            source: ConfigSource::Project(project),
        });
    }

    if let Some(path) = user_path.filter(|p| p.exists()) {
        return Ok(EffectiveConfig {
            config: load_config_file(path)?,
            source: ConfigSource::User(path.to_path_buf()),
        });
    }

    Ok(EffectiveConfig {
        config: Config::default(),
        source: ConfigSource::Defaults,
    })
}

impl ReplayOptions {
    /// The sentinel id, or `None` when disabled.
    #[must_use]
    pub fn sentinel(&self) -> Option<BugId> {
        self.sentinel_bug_id.filter(|&id| id > 0)
    }
}

const fn default_true() -> bool {
    true
}

#[allow(clippy::unnecessary_wraps)]
const fn default_sentinel() -> Option<BugId> {
    Some(999_999_999)
}

fn default_flag_alias() -> String {
    DEFAULT_FLAG_ALIAS.to_string()
}
