//! TOML-based application settings.
//!
//! Stores user preferences that apply to every alarm unless the alarm
//! overrides them: theme, snooze defaults, fade-in and volume behaviour,
//! and how often the ringing screen rotates quotes.
//!
//! Settings are stored at `<data_dir>/config.toml` through a
//! [`Repository`](super::Repository).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};

/// Colour theme of the ringing screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Sunrise,
    Ocean,
    Forest,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Default, Theme::Sunrise, Theme::Ocean, Theme::Forest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Sunrise => "sunrise",
            Theme::Ocean => "ocean",
            Theme::Forest => "forest",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "theme".into(),
                message: format!("'{s}' is not one of default, sunrise, ocean, forest"),
            })
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub snooze_enabled: bool,
    #[serde(default = "default_snooze_duration")]
    pub snooze_duration_min: u32,
    #[serde(default = "default_fade_in")]
    pub fade_in_secs: u32,
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
    #[serde(default = "default_true")]
    pub gradual_volume_increase: bool,
    /// Seconds between quote rotations while ringing.
    #[serde(default = "default_quote_interval")]
    pub quote_interval_secs: u32,
    #[serde(default)]
    pub night_mode: bool,
    #[serde(default = "default_volume")]
    pub sound_volume: f64,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_snooze_duration() -> u32 {
    9
}
fn default_fade_in() -> u32 {
    30
}
fn default_quote_interval() -> u32 {
    5
}
fn default_volume() -> f64 {
    0.8
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Default,
            snooze_enabled: false,
            snooze_duration_min: default_snooze_duration(),
            fade_in_secs: default_fade_in(),
            vibration_enabled: true,
            gradual_volume_increase: true,
            quote_interval_secs: default_quote_interval(),
            night_mode: false,
            sound_volume: default_volume(),
        }
    }
}

impl Settings {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::EmptyKey);
        }
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current
                    .get_mut(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                continue;
            }

            let obj = current
                .as_object_mut()
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
            let existing = obj
                .get(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.to_lowercase()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Get a setting as a string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a setting by key, parsing `value` as the type the key already
    /// holds. Does not persist; go through the repository for that.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Settings = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// All keys with their current values, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let Ok(serde_json::Value::Object(map)) = serde_json::to_value(self) else {
            return Vec::new();
        };
        map.into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.sound_volume) {
            return Err(ConfigError::InvalidValue {
                key: "sound_volume".into(),
                message: "must be between 0 and 1".into(),
            });
        }
        if self.quote_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "quote_interval_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.snooze_duration_min == 0 {
            return Err(ConfigError::InvalidValue {
                key: "snooze_duration_min".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_roundtrip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn missing_keys_use_defaults() {
        let parsed: Settings = toml::from_str("theme = \"ocean\"\nnight_mode = true\n").unwrap();
        assert_eq!(parsed.theme, Theme::Ocean);
        assert!(parsed.night_mode);
        assert_eq!(parsed.snooze_duration_min, 9);
        assert!(parsed.vibration_enabled);
    }

    #[test]
    fn get_returns_string_values() {
        let settings = Settings::default();
        assert_eq!(settings.get("theme").as_deref(), Some("default"));
        assert_eq!(settings.get("fade_in_secs").as_deref(), Some("30"));
        assert_eq!(settings.get("night_mode").as_deref(), Some("false"));
        assert!(settings.get("missing").is_none());
        assert!(settings.get("").is_none());
    }

    #[test]
    fn set_preserves_types() {
        let mut settings = Settings::default();
        settings.set("snooze_enabled", "true").unwrap();
        settings.set("snooze_duration_min", "5").unwrap();
        settings.set("sound_volume", "0.5").unwrap();
        settings.set("theme", "Sunrise").unwrap();
        assert!(settings.snooze_enabled);
        assert_eq!(settings.snooze_duration_min, 5);
        assert!((settings.sound_volume - 0.5).abs() < f64::EPSILON);
        assert_eq!(settings.theme, Theme::Sunrise);
    }

    #[test]
    fn set_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set("nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(settings.set("", "1"), Err(ConfigError::EmptyKey)));
        assert!(matches!(
            settings.set("night_mode", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            settings.set("theme", "neon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            settings.set("sound_volume", "1.5"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            settings.set("snooze_duration_min", "-3"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn entries_lists_every_key() {
        let entries = Settings::default().entries();
        assert_eq!(entries.len(), 9);
        assert!(entries.contains(&("theme".to_string(), "default".to_string())));
    }

    #[test]
    fn theme_from_str() {
        assert_eq!("forest".parse::<Theme>().unwrap(), Theme::Forest);
        assert!("plaid".parse::<Theme>().is_err());
    }
}
