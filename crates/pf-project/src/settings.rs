//! Process-wide settings.
//!
//! A `Settings` value is built once (defaults, then YAML, then call-site
//! overrides) and handed to every component by reference.

use std::path::{Path, PathBuf};

use pf_core::OverwritePolicies;
use serde::{Deserialize, Serialize};

use crate::layout::{InputLayout, OutputLayout};
use crate::{ProjectError, ProjectResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Weather cache and country tables.
    pub static_inputs: PathBuf,
    /// `pv_setup.csv` and other preparation inputs.
    pub user_inputs: PathBuf,
    /// Engine input directory containing `csv_elements/`.
    pub mvs_inputs: PathBuf,
    pub outputs: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            static_inputs: PathBuf::from("data/static_inputs"),
            user_inputs: PathBuf::from("data/user_inputs/pvcompare_inputs"),
            mvs_inputs: PathBuf::from("data/user_inputs/mvs_inputs"),
            outputs: PathBuf::from("data/outputs"),
        }
    }
}

/// Fallback location used when neither the caller nor the project metadata has one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: Option<String>,
    pub year: Option<i32>,
}

/// An external program and its leading arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub default_location: DefaultLocation,
    pub storeys: u32,
    pub overwrite: OverwritePolicies,
    pub weather_provider: Option<CommandSpec>,
    pub engine: Option<CommandSpec>,
    /// Worker threads for sweeps; 1 runs steps sequentially.
    pub max_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathSettings::default(),
            default_location: DefaultLocation::default(),
            storeys: 5,
            overwrite: OverwritePolicies::default(),
            weather_provider: None,
            engine: None,
            max_workers: 1,
        }
    }
}

/// Call-site overrides; every `Some` wins over the loaded value.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub static_inputs: Option<PathBuf>,
    pub user_inputs: Option<PathBuf>,
    pub mvs_inputs: Option<PathBuf>,
    pub outputs: Option<PathBuf>,
    pub storeys: Option<u32>,
    pub overwrite: Option<OverwritePolicies>,
    pub max_workers: Option<usize>,
}

impl Settings {
    /// Load settings from YAML; relative paths resolve against the file's directory.
    pub fn load(path: &Path) -> ProjectResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ProjectError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Settings = serde_yaml::from_str(&content)?;
        if let Some(base) = path.parent() {
            settings.paths = settings.paths.rebased(base);
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_str(content: &str) -> ProjectResult<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        if let Some(p) = overrides.static_inputs {
            self.paths.static_inputs = p;
        }
        if let Some(p) = overrides.user_inputs {
            self.paths.user_inputs = p;
        }
        if let Some(p) = overrides.mvs_inputs {
            self.paths.mvs_inputs = p;
        }
        if let Some(p) = overrides.outputs {
            self.paths.outputs = p;
        }
        if let Some(s) = overrides.storeys {
            self.storeys = s;
        }
        if let Some(o) = overrides.overwrite {
            self.overwrite = o;
        }
        if let Some(w) = overrides.max_workers {
            self.max_workers = w;
        }
        self
    }

    pub fn validate(&self) -> ProjectResult<()> {
        if self.max_workers == 0 {
            return Err(ProjectError::Invalid {
                what: "max_workers must be at least 1".to_string(),
            });
        }
        if self.storeys == 0 {
            return Err(ProjectError::Invalid {
                what: "storeys must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn input_layout(&self) -> InputLayout {
        InputLayout::new(self.paths.mvs_inputs.clone())
    }

    pub fn output_layout(&self) -> OutputLayout {
        OutputLayout::new(self.paths.outputs.clone())
    }
}

impl PathSettings {
    fn rebased(self, base: &Path) -> Self {
        let rebase = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        Self {
            static_inputs: rebase(self.static_inputs),
            user_inputs: rebase(self.user_inputs),
            mvs_inputs: rebase(self.mvs_inputs),
            outputs: rebase(self.outputs),
        }
    }
}
