/// User preferences
///
/// A single JSON file of scalar settings. Every change is written to disk
/// and then published on a watch channel, so the canvas and the exporter
/// pick up new defaults without polling.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use super::data::{ArrowStyle, DistanceUnit, MarkingStyle};
use crate::color;
use crate::error::{Error, Result};

/// Language preference values
pub const LANGUAGE_AUTO: &str = "auto";
pub const LANGUAGE_CODES: [&str; 3] = [LANGUAGE_AUTO, "en", "zh"];

/// Application-wide preferences
///
/// Missing keys in the settings file fall back to their defaults, so older
/// files keep loading as fields are added.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub arrow_style: ArrowStyle,
    pub default_distance_unit: DistanceUnit,
    /// "auto", "en" or "zh"; stored only, never interpreted here
    pub language_code: String,
    pub default_line_color: u32,
    pub default_line_width_dp: f32,
    pub default_text_color: u32,
    pub default_text_size_sp: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            arrow_style: ArrowStyle::Arrow,
            default_distance_unit: DistanceUnit::Cm,
            language_code: LANGUAGE_AUTO.to_string(),
            default_line_color: color::RED,
            default_line_width_dp: 3.0,
            default_text_color: color::WHITE,
            default_text_size_sp: 14.0,
        }
    }
}

impl AppSettings {
    /// Style seeded into newly committed markings
    pub fn marking_style(&self) -> MarkingStyle {
        MarkingStyle {
            line_color: self.default_line_color,
            line_width_dp: self.default_line_width_dp,
            text_color: self.default_text_color,
            text_size_sp: self.default_text_size_sp,
        }
    }
}

/// Owner of the current settings
///
/// Readers call `subscribe()` and hold the receiver; writers go through the
/// store so the file and the channel never disagree.
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    tx: watch::Sender<AppSettings>,
}

impl SettingsStore {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let settings = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                AppSettings::default()
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let (tx, _) = watch::channel(settings);
        Ok(Self { path: Some(path), tx })
    }

    /// Settings that are never written to disk
    pub fn in_memory() -> Self {
        let (tx, _) = watch::channel(AppSettings::default());
        Self { path: None, tx }
    }

    /// Settings file under the platform config directory
    pub fn default_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or(Error::NoDataDirectory)?;
        path.push("dimension-cam");
        path.push("settings.json");
        Ok(path)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot of the current settings
    pub fn current(&self) -> AppSettings {
        self.tx.borrow().clone()
    }

    /// Receiver that always holds the latest settings
    pub fn subscribe(&self) -> watch::Receiver<AppSettings> {
        self.tx.subscribe()
    }

    /// Apply a change, persist it and notify subscribers.
    /// Nothing is published if writing the file fails.
    pub fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut AppSettings),
    {
        let mut settings = self.current();
        change(&mut settings);
        if settings == *self.tx.borrow() {
            return Ok(());
        }
        self.persist(&settings)?;
        self.tx.send_replace(settings);
        Ok(())
    }

    pub fn set_arrow_style(&self, style: ArrowStyle) -> Result<()> {
        self.update(|s| s.arrow_style = style)
    }

    pub fn set_default_distance_unit(&self, unit: DistanceUnit) -> Result<()> {
        self.update(|s| s.default_distance_unit = unit)
    }

    /// Unknown codes fall back to "auto"
    pub fn set_language_code(&self, code: &str) -> Result<()> {
        let code = if LANGUAGE_CODES.contains(&code) { code } else { LANGUAGE_AUTO };
        self.update(|s| s.language_code = code.to_string())
    }

    pub fn set_default_line_color(&self, argb: u32) -> Result<()> {
        self.update(|s| s.default_line_color = argb)
    }

    pub fn set_default_line_width_dp(&self, width: f32) -> Result<()> {
        self.update(|s| s.default_line_width_dp = width)
    }

    pub fn set_default_text_color(&self, argb: u32) -> Result<()> {
        self.update(|s| s.default_text_color = argb)
    }

    pub fn set_default_text_size_sp(&self, size: f32) -> Result<()> {
        self.update(|s| s.default_text_size_sp = size)
    }

    fn persist(&self, settings: &AppSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(path, json)?;
        log::debug!("Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dimension-cam-settings-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("settings.json")
    }

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.arrow_style, ArrowStyle::Arrow);
        assert_eq!(settings.default_distance_unit, DistanceUnit::Cm);
        assert_eq!(settings.language_code, "auto");
        assert_eq!(settings.default_line_color, 0xFFFF0000);
        assert_eq!(settings.default_text_color, 0xFFFFFFFF);
        assert_eq!(settings.default_line_width_dp, 3.0);
        assert_eq!(settings.default_text_size_sp, 14.0);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{"arrow_style":"Circle"}"#).unwrap();
        assert_eq!(settings.arrow_style, ArrowStyle::Circle);
        assert_eq!(settings.default_text_size_sp, 14.0);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = temp_settings_path("missing");
        let store = SettingsStore::load(&path).unwrap();
        assert_eq!(store.current(), AppSettings::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_updates_persist_and_reload() {
        let path = temp_settings_path("reload");
        let store = SettingsStore::load(&path).unwrap();
        store.set_arrow_style(ArrowStyle::TCap).unwrap();
        store.set_default_line_width_dp(5.0).unwrap();

        let reloaded = SettingsStore::load(&path).unwrap();
        assert_eq!(reloaded.current().arrow_style, ArrowStyle::TCap);
        assert_eq!(reloaded.current().default_line_width_dp, 5.0);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_subscribers_see_updates() {
        let store = SettingsStore::in_memory();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.set_default_distance_unit(DistanceUnit::Mm).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().default_distance_unit, DistanceUnit::Mm);

        // Writing the same value again is not a change
        store.set_default_distance_unit(DistanceUnit::Mm).unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_unknown_language_falls_back_to_auto() {
        let store = SettingsStore::in_memory();
        store.set_language_code("zh").unwrap();
        assert_eq!(store.current().language_code, "zh");
        store.set_language_code("klingon").unwrap();
        assert_eq!(store.current().language_code, "auto");
    }

    #[test]
    fn test_marking_style_follows_defaults() {
        let store = SettingsStore::in_memory();
        store.set_default_text_color(color::YELLOW).unwrap();
        let style = store.current().marking_style();
        assert_eq!(style.text_color, color::YELLOW);
        assert_eq!(style.line_color, color::RED);
    }
}
