//! Kinetic configuration file handling

use anyhow::{Context, Result};
use kinetic_animation::{Easing, SpringOptions, TweenOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "kinetic.toml";

/// Top-level Kinetic configuration (kinetic.toml)
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct KineticConfig {
    #[serde(default)]
    pub spring: SpringConfig,
    #[serde(default)]
    pub tween: TweenConfig,
}

/// Spring defaults
#[derive(Debug, Deserialize, Serialize)]
pub struct SpringConfig {
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default = "default_precision")]
    pub precision: f64,
}

fn default_stiffness() -> f64 {
    SpringOptions::default().stiffness
}

fn default_damping() -> f64 {
    SpringOptions::default().damping
}

fn default_precision() -> f64 {
    SpringOptions::default().precision
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: default_stiffness(),
            damping: default_damping(),
            precision: default_precision(),
        }
    }
}

impl SpringConfig {
    pub fn options(&self) -> SpringOptions {
        SpringOptions::new(self.stiffness, self.damping).with_precision(self.precision)
    }
}

/// Tween defaults
#[derive(Debug, Deserialize, Serialize)]
pub struct TweenConfig {
    /// Milliseconds
    #[serde(default = "default_duration")]
    pub duration: f64,
    /// Milliseconds
    #[serde(default)]
    pub delay: f64,
    /// Kebab-case easing name, e.g. `ease-out-cubic`
    #[serde(default = "default_easing")]
    pub easing: String,
}

fn default_duration() -> f64 {
    400.0
}

fn default_easing() -> String {
    "linear".to_string()
}

impl Default for TweenConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            delay: 0.0,
            easing: default_easing(),
        }
    }
}

impl TweenConfig {
    pub fn options(&self) -> Result<TweenOptions> {
        Ok(TweenOptions::default()
            .with_duration(self.duration)
            .with_delay(self.delay)
            .with_easing(parse_easing(&self.easing)?))
    }
}

/// Resolve an easing name, failing with the name in the message
pub fn parse_easing(name: &str) -> Result<Easing> {
    Easing::from_name(name).with_context(|| format!("Unknown easing `{name}`"))
}

impl KineticConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: KineticConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `explicit` if given, else `kinetic.toml` from `dir` if present,
    /// else the built-in defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: KineticConfig = toml::from_str(
            r#"
            [spring]
            stiffness = 0.3

            [tween]
            easing = "ease-out-cubic"
            "#,
        )
        .unwrap();

        assert_eq!(config.spring.stiffness, 0.3);
        assert_eq!(config.spring.damping, 0.8);
        assert_eq!(config.tween.duration, 400.0);
        assert!(matches!(
            config.tween.options().unwrap().easing,
            Easing::EaseOutCubic
        ));
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: KineticConfig = toml::from_str("").unwrap();
        assert_eq!(config.spring.options(), SpringOptions::default());
        assert_eq!(config.tween.delay, 0.0);
    }

    #[test]
    fn test_unknown_easing_is_rejected() {
        let config = KineticConfig {
            tween: TweenConfig {
                easing: "wobble".to_string(),
                ..TweenConfig::default()
            },
            ..KineticConfig::default()
        };
        let err = config.tween.options().unwrap_err();
        assert!(err.to_string().contains("wobble"));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let path = Path::new("definitely/not/here/kinetic.toml");
        let err = KineticConfig::discover(Some(path), Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_missing_default_file_falls_back() {
        let config = KineticConfig::discover(None, Path::new("definitely/not/here")).unwrap();
        assert_eq!(config.tween.duration, 400.0);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let text = KineticConfig::default().to_toml().unwrap();
        assert!(text.contains("[spring]"));
        assert!(text.contains("[tween]"));
    }
}
