//! Boundary to the external weather source.

use std::path::PathBuf;
use std::process::Command;

use pf_core::format_coordinate;
use pf_project::CommandSpec;
use tracing::{info, warn};

use crate::series::{WeatherKey, WeatherSeries};
use crate::{WeatherError, WeatherResult};

/// Source of weather series for cache misses.
///
/// Implementations are called at most once per key by [`crate::WeatherCache`].
pub trait WeatherProvider: Send + Sync {
    fn fetch(&self, key: &WeatherKey) -> WeatherResult<WeatherSeries>;
}

/// Runs an external download tool.
///
/// Invocation: `<program> <args..> --lat <lat> --lon <lon> --year <year> --output <file>`.
/// The tool must write a weather CSV to `<file>` and exit with status 0.
pub struct CommandWeatherProvider {
    command: CommandSpec,
    scratch_dir: PathBuf,
}

impl CommandWeatherProvider {
    pub fn new(command: CommandSpec, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            scratch_dir: scratch_dir.into(),
        }
    }
}

impl WeatherProvider for CommandWeatherProvider {
    fn fetch(&self, key: &WeatherKey) -> WeatherResult<WeatherSeries> {
        std::fs::create_dir_all(&self.scratch_dir).map_err(WeatherError::io(&self.scratch_dir))?;
        let output = self.scratch_dir.join(format!(".download_{}", key.file_name()));

        info!(program = %self.command.program, %key, "downloading weather data");
        let status = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg("--lat")
            .arg(format_coordinate(key.latitude))
            .arg("--lon")
            .arg(format_coordinate(key.longitude))
            .arg("--year")
            .arg(key.year.to_string())
            .arg("--output")
            .arg(&output)
            .status()
            .map_err(|e| WeatherError::Provider {
                key: *key,
                message: format!("failed to start '{}': {e}", self.command.program),
            })?;

        if !status.success() {
            return Err(WeatherError::Provider {
                key: *key,
                message: format!("'{}' exited with {status}", self.command.program),
            });
        }

        let series = WeatherSeries::read_csv(&output, *key);
        if let Err(e) = std::fs::remove_file(&output) {
            warn!(path = %output.display(), error = %e, "could not remove downloaded weather file");
        }
        series
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn download_file_is_removed_after_reading() {
        let dir = std::env::temp_dir().join("pf_weather_command_provider");
        let _ = std::fs::remove_dir_all(&dir);
        // Positional args after the script: --lat v --lon v --year v --output <file>.
        let script = "printf 'time,ghi,dni,dhi,temp_air,wind_speed,precipitable_water\\n\
                      2017-01-01 00:00:00,0,0,0,1.5,2,1\\n' > \"$8\"";
        let provider = CommandWeatherProvider::new(
            CommandSpec {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            },
            &dir,
        );
        let key = WeatherKey::new(52.52437, 13.41053, 2017);

        let series = provider.fetch(&key).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.records()[0].temp_air, 1.5);
        assert!(!dir.join(format!(".download_{}", key.file_name())).exists());
    }
}
