use fs_err::read_to_string;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::{Result, TimingPlanError};

pub const CONFIG_FILE_NAME: &str = "timing_plan.toml";

/// Which type codes a schedule cell may reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleCodeRule {
    /// Exactly two decimal digits, as published plans number their programs.
    #[default]
    Numeric,
    /// Any two letters or digits, the same alphabet as definition codes.
    Alphanumeric,
}

/// Labels that anchor the timing tables inside a plan document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// First cell of the row holding schedule times and the definition columns.
    pub time_label: String,
    /// First cell of the row holding the schedule's timing types.
    pub type_label: String,
    /// Caption printed next to every phase diagram.
    pub phase_marker: String,
    pub schedule_codes: ScheduleCodeRule,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            time_label: "時間".to_string(),
            type_label: "時制".to_string(),
            phase_marker: "分相".to_string(),
            schedule_codes: ScheduleCodeRule::Numeric,
        }
    }
}

/// Loads `timing_plan.toml` from the config directory, falling back to the
/// defaults when the file does not exist.
pub fn read_config(config_path: impl AsRef<Path>) -> Result<ParserConfig> {
    let path: PathBuf = config_path.as_ref().join(CONFIG_FILE_NAME);
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using default labels");
        return Ok(ParserConfig::default());
    }
    let file = read_to_string(&path).map_err(|source| TimingPlanError::ConfigIo {
        path: path.clone(),
        source,
    })?;
    let config: ParserConfig =
        toml::from_str(&file).map_err(|source| TimingPlanError::Config {
            path: path.clone(),
            source,
        })?;
    info!(path = %path.display(), ?config, "Loaded parser config");
    Ok(config)
}
