//! Application-level configuration loading, including the cycle
//! thresholds and scheduling constants.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use time::{OffsetDateTime, UtcOffset};
use tracing::{info, warn};

use crate::{
    services::{schedule::BreakRule, winner::UnderdogBoost},
    state::{cycle::parse_clock_time, state_machine::AdvanceThresholds},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MOVIE_NIGHT_BACK_CONFIG_PATH";
/// Finish-by applied to freshly created cycles when none is configured.
const DEFAULT_FINISH_BY: &str = "21:30";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    advance: AdvanceThresholds,
    max_nominations: usize,
    underdog: UnderdogBoost,
    breaks: BreakRule,
    reveal_dwell: Duration,
    day_boundary_hour: u8,
    utc_offset: UtcOffset,
    default_finish_by: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to
    /// baked-in defaults for anything missing or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Thresholds gating the decision phase.
    pub fn advance_thresholds(&self) -> &AdvanceThresholds {
        &self.advance
    }

    /// Maximum number of movies one user may nominate per cycle.
    pub fn max_nominations(&self) -> usize {
        self.max_nominations
    }

    /// Underdog bonus parameters for the winner calculation.
    pub fn underdog_boost(&self) -> UnderdogBoost {
        self.underdog
    }

    /// Break insertion rule for the schedule calculation.
    pub fn break_rule(&self) -> BreakRule {
        self.breaks
    }

    /// How long the reveal phase stays on screen before the dashboard.
    pub fn reveal_dwell(&self) -> Duration {
        self.reveal_dwell
    }

    /// Hour of day below which times belong to the previous cycle.
    pub fn day_boundary_hour(&self) -> u8 {
        self.day_boundary_hour
    }

    /// Finish-by applied to freshly created cycles.
    pub fn default_finish_by(&self) -> &str {
        &self.default_finish_by
    }

    /// Current wall-clock time in the group's configured timezone.
    pub fn local_now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.utc_offset)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            advance: AdvanceThresholds::default(),
            max_nominations: default_max_nominations(),
            underdog: UnderdogBoost::default(),
            breaks: BreakRule::default(),
            reveal_dwell: Duration::from_secs(default_reveal_dwell_seconds()),
            day_boundary_hour: default_day_boundary_hour(),
            utc_offset: UtcOffset::UTC,
            default_finish_by: DEFAULT_FINISH_BY.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default = "default_min_interested")]
    min_interested: usize,
    #[serde(default = "default_decision_quorum")]
    decision_quorum: usize,
    #[serde(default = "default_max_nominations")]
    max_nominations: usize,
    #[serde(default = "default_underdog_streak_threshold")]
    underdog_streak_threshold: u32,
    #[serde(default = "default_underdog_bonus_per_vote")]
    underdog_bonus_per_vote: u32,
    #[serde(default = "default_break_interval_minutes")]
    break_interval_minutes: u32,
    #[serde(default = "default_break_duration_minutes")]
    break_duration_minutes: u32,
    #[serde(default = "default_reveal_dwell_seconds")]
    reveal_dwell_seconds: u64,
    #[serde(default = "default_day_boundary_hour")]
    day_boundary_hour: u8,
    #[serde(default)]
    utc_offset_hours: i8,
    #[serde(default = "default_finish_by")]
    default_finish_by: String,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let utc_offset = match UtcOffset::from_hms(value.utc_offset_hours, 0, 0) {
            Ok(offset) => offset,
            Err(err) => {
                warn!(
                    offset = value.utc_offset_hours,
                    error = %err,
                    "invalid utc_offset_hours; using UTC"
                );
                UtcOffset::UTC
            }
        };

        let day_boundary_hour = if value.day_boundary_hour < 24 {
            value.day_boundary_hour
        } else {
            warn!(
                hour = value.day_boundary_hour,
                "day_boundary_hour out of range; using default"
            );
            default_day_boundary_hour()
        };

        let default_finish_by = if parse_clock_time(&value.default_finish_by).is_ok() {
            value.default_finish_by
        } else {
            warn!(
                value = %value.default_finish_by,
                "default_finish_by is not a valid HH:MM time; using built-in default"
            );
            DEFAULT_FINISH_BY.into()
        };

        Self {
            advance: AdvanceThresholds {
                min_interested: value.min_interested,
                decision_quorum: value.decision_quorum,
            },
            max_nominations: value.max_nominations,
            underdog: UnderdogBoost {
                streak_threshold: value.underdog_streak_threshold,
                bonus_per_vote: value.underdog_bonus_per_vote,
            },
            breaks: BreakRule {
                interval_minutes: value.break_interval_minutes,
                duration_minutes: value.break_duration_minutes,
            },
            reveal_dwell: Duration::from_secs(value.reveal_dwell_seconds),
            day_boundary_hour,
            utc_offset,
            default_finish_by,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_min_interested() -> usize {
    AdvanceThresholds::default().min_interested
}

fn default_decision_quorum() -> usize {
    AdvanceThresholds::default().decision_quorum
}

fn default_max_nominations() -> usize {
    3
}

fn default_underdog_streak_threshold() -> u32 {
    UnderdogBoost::default().streak_threshold
}

fn default_underdog_bonus_per_vote() -> u32 {
    UnderdogBoost::default().bonus_per_vote
}

fn default_break_interval_minutes() -> u32 {
    BreakRule::default().interval_minutes
}

fn default_break_duration_minutes() -> u32 {
    BreakRule::default().duration_minutes
}

fn default_reveal_dwell_seconds() -> u64 {
    10
}

fn default_day_boundary_hour() -> u8 {
    4
}

fn default_finish_by() -> String {
    DEFAULT_FINISH_BY.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() {
        let raw: RawConfig = serde_json::from_str(r#"{"min_interested": 4}"#).unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.advance_thresholds().min_interested, 4);
        assert_eq!(config.advance_thresholds().decision_quorum, 3);
        assert_eq!(config.max_nominations(), 3);
        assert_eq!(config.break_rule().interval_minutes, 40);
        assert_eq!(config.reveal_dwell(), Duration::from_secs(10));
    }

    #[test]
    fn invalid_finish_by_falls_back() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"default_finish_by": "soonish"}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.default_finish_by(), DEFAULT_FINISH_BY);
    }
}
