/// Config file loading and creation for the tierpick CLI.
///
/// Config lives at $XDG_CONFIG_HOME/tierpick/config.toml, falling back to
/// ~/.config/tierpick/config.toml.
/// All fields are optional. CLI args override config values, and config
/// values override whatever settings a state file was saved with.
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use tierpick_core::{AlgorithmConfig, WeightSet};

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TierpickConfig {
    /// State file name used when --state is not given.
    pub state_file: Option<String>,
    pub seed: Option<u64>,
    pub algorithm: Option<AlgorithmConfig>,
    pub left_weights: Option<WeightSet>,
    pub right_weights: Option<WeightSet>,
}

pub const DEFAULT_STATE_FILE: &str = ".tierpick.json";

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# tierpick configuration
# All values here can be overridden by CLI flags.

# State file name, relative to the image folder for `vote`
# and to the current directory for `stats` and `export`.
# state_file = \".tierpick.json\"

# Fixed RNG seed for reproducible pair selection
# seed = 42

# [algorithm]
# tier_spread = 1.5              # sigma of the target tier distribution
# vote_saturation = 20.0         # votes at which confidence stops growing with volume
# overflow_threshold = 1.0       # actual/expected ratio that marks a tier as crowded
# min_overflow_items = 2
# overflow_focus = 0.8           # share of rounds spent inside the most crowded tier
# overflow_neighbor_radius = 0
# anchor_policy = \"split_halves\" # or \"extremes\"
# min_selection_weight = 0.01
# max_redraw_attempts = 8

# [algorithm.bounds]
# enabled = true
# multiplier = 3.0
# min_confidence_to_exceed = 0.8
# min_votes_to_exceed = 10
# adaptive = true

# Left side favours items that need data, right side crowded or stale ones.
# [left_weights]
# recency = 0.2
# low_votes = 0.35
# instability = 0.3
# tier_size = 0.15
# prefer_stable = false
# prefer_high_votes = false

# [right_weights]
# recency = 0.3
# low_votes = 0.15
# instability = 0.15
# tier_size = 0.4
";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("neither XDG_CONFIG_HOME nor HOME is set")]
    NoConfigDir,
    #[error("failed to read config at {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("config file already exists at {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("failed to write config to {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    let base = match std::env::var_os("XDG_CONFIG_HOME").filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(std::env::var_os("HOME").ok_or(ConfigError::NoConfigDir)?).join(".config"),
    };
    Ok(base.join("tierpick").join("config.toml"))
}

/// Parses config text read from `path`; the path only labels errors.
pub fn parse_config(path: &Path, content: &str) -> Result<TierpickConfig, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

/// A missing file is an empty config.
pub fn load_config(path: &Path) -> Result<TierpickConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(path, &content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(TierpickConfig::default()),
        Err(source) => Err(ConfigError::Read { path: path.to_path_buf(), source }),
    }
}

/// Writes the commented template to `path`, creating parent directories.
/// Never overwrites an existing file.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    let write_err = |source| ConfigError::Write { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(write_err)
}
