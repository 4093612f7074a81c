// SPDX-License-Identifier: GPL-3.0-only

//! Scan settings
//!
//! Settings are plain values. The controller validates a complete
//! [`ScanSettings`] and swaps it in between two frames; a value that fails
//! validation is rejected as a whole and the previous settings stay active.

use crate::constants::{
    CONFIG_DIR_NAME, DEFAULT_HOT_SPOT, DEFAULT_MAX_CODES_PER_FRAME, SETTINGS_FILE_NAME,
    clamp_max_codes_per_frame,
};
use crate::errors::ConfigError;
use crate::session::{CachingPolicy, DuplicatePolicy, SessionConfig, Symbology};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Distance at which codes are expected
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkingRange {
    /// Codes close to the camera
    #[default]
    Standard,
    /// Codes further away; degrades very close codes
    Long,
}

/// Preferred camera direction
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CameraFacing {
    /// Facing away from the user
    #[default]
    Back,
    /// Facing towards the user
    Front,
}

/// Additional checksums a symbology may be verified with
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Checksum {
    Mod10,
    Mod11,
    Mod47,
    Mod43,
    Mod103,
    Mod1010,
    Mod1110,
}

/// Symbology specific decoder extensions
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Extension {
    /// Optimizations for small Data Matrix codes
    Tiny,
    /// Full-ASCII Code 39
    FullAscii,
    /// Strip the leading zero of UPC-A codes
    RemoveLeadingZero,
}

/// Decode settings of a single symbology
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct SymbologySettings {
    pub enabled: bool,
    /// Bright codes on dark background
    pub color_inverted_enabled: bool,
    pub extensions: Vec<Extension>,
    pub checksums: Vec<Checksum>,
    /// Accepted code lengths, ignored for fixed-length symbologies
    pub active_symbol_counts: Vec<u16>,
}

impl Default for SymbologySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            color_inverted_enabled: false,
            extensions: Vec::new(),
            checksums: Vec::new(),
            active_symbol_counts: Vec::new(),
        }
    }
}

impl SymbologySettings {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Fixed mapping from every decodable symbology to its settings
///
/// The table is immutable. Updates produce a new table that replaces the
/// old one wholesale, so a frame never sees a half-updated mapping.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(
    from = "BTreeMap<Symbology, SymbologySettings>",
    into = "BTreeMap<Symbology, SymbologySettings>"
)]
pub struct SymbologyTable {
    settings: Arc<[SymbologySettings; Symbology::COUNT]>,
}

impl Default for SymbologyTable {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl SymbologyTable {
    pub fn all_enabled() -> Self {
        Self {
            settings: Arc::new(std::array::from_fn(|_| SymbologySettings::default())),
        }
    }

    pub fn all_disabled() -> Self {
        Self {
            settings: Arc::new(std::array::from_fn(|_| SymbologySettings::disabled())),
        }
    }

    /// Settings for `symbology`, `None` for the unknown sentinel
    pub fn get(&self, symbology: Symbology) -> Option<&SymbologySettings> {
        symbology.table_index().map(|i| &self.settings[i])
    }

    pub fn is_enabled(&self, symbology: Symbology) -> bool {
        self.get(symbology).is_some_and(|s| s.enabled)
    }

    /// New table with `symbology` replaced by `settings`
    ///
    /// The unknown sentinel has no entry; the table is returned unchanged.
    pub fn with_settings(&self, symbology: Symbology, settings: SymbologySettings) -> Self {
        let Some(index) = symbology.table_index() else {
            return self.clone();
        };
        let mut table = (*self.settings).clone();
        table[index] = settings;
        Self {
            settings: Arc::new(table),
        }
    }

    /// New table with `symbology` enabled or disabled
    pub fn with_enabled(&self, symbology: Symbology, enabled: bool) -> Self {
        match self.get(symbology) {
            Some(current) => self.with_settings(
                symbology,
                SymbologySettings {
                    enabled,
                    ..current.clone()
                },
            ),
            None => self.clone(),
        }
    }

    pub fn enabled_symbologies(&self) -> Vec<Symbology> {
        Symbology::ALL
            .into_iter()
            .filter(|s| self.is_enabled(*s))
            .collect()
    }
}

impl From<BTreeMap<Symbology, SymbologySettings>> for SymbologyTable {
    fn from(map: BTreeMap<Symbology, SymbologySettings>) -> Self {
        let mut table: [SymbologySettings; Symbology::COUNT] =
            std::array::from_fn(|_| SymbologySettings::default());
        for (symbology, settings) in map {
            if let Some(index) = symbology.table_index() {
                table[index] = settings;
            }
        }
        Self {
            settings: Arc::new(table),
        }
    }
}

impl From<SymbologyTable> for BTreeMap<Symbology, SymbologySettings> {
    fn from(table: SymbologyTable) -> Self {
        Symbology::ALL
            .into_iter()
            .zip(table.settings.iter().cloned())
            .collect()
    }
}

/// Normalized rectangle; every coordinate runs from 0.0 to 1.0
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScanArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ScanArea {
    fn default() -> Self {
        Self::FULL
    }
}

impl ScanArea {
    /// The whole frame
    pub const FULL: ScanArea = ScanArea {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self, ConfigError> {
        let area = Self {
            x,
            y,
            width,
            height,
        };
        area.validate()?;
        Ok(area)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        let valid = unit(self.x)
            && unit(self.y)
            && unit(self.width)
            && unit(self.height)
            && self.x + self.width <= 1.0
            && self.y + self.height <= 1.0;
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidScanArea {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Normalized point where codes are decoded with the highest priority
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct HotSpot {
    pub x: f64,
    pub y: f64,
}

impl Default for HotSpot {
    fn default() -> Self {
        Self {
            x: DEFAULT_HOT_SPOT.0,
            y: DEFAULT_HOT_SPOT.1,
        }
    }
}

impl HotSpot {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y) {
            Ok(())
        } else {
            Err(ConfigError::InvalidHotSpot {
                x: self.x,
                y: self.y,
            })
        }
    }
}

/// Complete scan configuration
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ScanSettings {
    /// -1 keeps codes for the session, 0 discards them every frame
    pub code_caching_duration_ms: CachingPolicy,
    /// -1 filters for the session, 0 disables the filter
    pub code_duplicate_filter_ms: DuplicatePolicy,
    /// Raw configured value; use [`ScanSettings::max_codes_per_frame`]
    pub max_number_of_codes_per_frame: i64,
    pub symbologies: SymbologyTable,
    pub working_range: WorkingRange,
    pub camera_facing_preference: CameraFacing,
    pub high_density_mode_enabled: bool,
    pub active_scanning_area_portrait: ScanArea,
    pub active_scanning_area_landscape: ScanArea,
    pub scanning_hot_spot: HotSpot,
    /// Fraction of the maximum zoom
    pub relative_zoom: f64,
    pub device_name: Option<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            code_caching_duration_ms: CachingPolicy::default(),
            code_duplicate_filter_ms: DuplicatePolicy::default(),
            max_number_of_codes_per_frame: DEFAULT_MAX_CODES_PER_FRAME,
            symbologies: SymbologyTable::default(),
            working_range: WorkingRange::default(),
            camera_facing_preference: CameraFacing::default(),
            high_density_mode_enabled: false,
            active_scanning_area_portrait: ScanArea::FULL,
            active_scanning_area_landscape: ScanArea::FULL,
            scanning_hot_spot: HotSpot::default(),
            relative_zoom: 0.0,
            device_name: None,
        }
    }
}

impl ScanSettings {
    /// Check every range-restricted value
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.active_scanning_area_portrait.validate()?;
        self.active_scanning_area_landscape.validate()?;
        self.scanning_hot_spot.validate()?;
        if !(0.0..=1.0).contains(&self.relative_zoom) {
            return Err(ConfigError::InvalidZoom(self.relative_zoom));
        }
        Ok(())
    }

    /// Per-frame code limit clamped to 1-6
    pub fn max_codes_per_frame(&self) -> usize {
        clamp_max_codes_per_frame(self.max_number_of_codes_per_frame)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            caching: self.code_caching_duration_ms,
            duplicates: self.code_duplicate_filter_ms,
            max_codes_per_frame: self.max_codes_per_frame(),
        }
    }

    pub fn set_code_caching_duration_ms(&mut self, ms: i64) -> Result<(), ConfigError> {
        self.code_caching_duration_ms = CachingPolicy::try_from(ms)?;
        Ok(())
    }

    pub fn set_code_duplicate_filter_ms(&mut self, ms: i64) -> Result<(), ConfigError> {
        self.code_duplicate_filter_ms = DuplicatePolicy::try_from(ms)?;
        Ok(())
    }

    /// Replace the portrait scan area; invalid areas leave it unchanged
    pub fn set_active_scanning_area_portrait(&mut self, area: ScanArea) -> Result<(), ConfigError> {
        area.validate()?;
        self.active_scanning_area_portrait = area;
        Ok(())
    }

    /// Replace the landscape scan area; invalid areas leave it unchanged
    pub fn set_active_scanning_area_landscape(&mut self, area: ScanArea) -> Result<(), ConfigError> {
        area.validate()?;
        self.active_scanning_area_landscape = area;
        Ok(())
    }

    pub fn set_scanning_hot_spot(&mut self, hot_spot: HotSpot) -> Result<(), ConfigError> {
        hot_spot.validate()?;
        self.scanning_hot_spot = hot_spot;
        Ok(())
    }

    pub fn set_relative_zoom(&mut self, zoom: f64) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&zoom) {
            return Err(ConfigError::InvalidZoom(zoom));
        }
        self.relative_zoom = zoom;
        Ok(())
    }

    pub fn set_symbology_enabled(&mut self, symbology: Symbology, enabled: bool) {
        self.symbologies = self.symbologies.with_enabled(symbology, enabled);
    }

    /// Default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Read and validate settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let settings: ScanSettings = serde_json::from_str(&contents)?;
        settings.validate()?;
        debug!(path = %path.display(), "Loaded scan settings");
        Ok(settings)
    }

    /// Read settings, falling back to defaults when missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid settings file");
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Saved scan settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ScanSettings::default();
        assert_eq!(settings.code_caching_duration_ms, CachingPolicy::Session);
        assert_eq!(settings.code_duplicate_filter_ms, DuplicatePolicy::Window(500));
        assert_eq!(settings.max_codes_per_frame(), 6);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_scan_area_leaves_previous() {
        let mut settings = ScanSettings::default();
        let area = ScanArea::new(0.1, 0.1, 0.5, 0.5).unwrap();
        settings.set_active_scanning_area_portrait(area).unwrap();

        let bad = ScanArea {
            x: 0.8,
            y: 0.0,
            width: 0.5,
            height: 0.5,
        };
        assert!(settings.set_active_scanning_area_portrait(bad).is_err());
        let negative = ScanArea {
            x: 0.1,
            y: 0.1,
            width: -0.1,
            height: 0.5,
        };
        assert!(settings.set_active_scanning_area_portrait(negative).is_err());
        assert_eq!(settings.active_scanning_area_portrait, area);
    }

    #[test]
    fn test_invalid_duration_leaves_previous() {
        let mut settings = ScanSettings::default();
        assert!(settings.set_code_duplicate_filter_ms(-7).is_err());
        assert_eq!(settings.code_duplicate_filter_ms, DuplicatePolicy::Window(500));
    }

    #[test]
    fn test_symbology_table_replaced_wholesale() {
        let table = SymbologyTable::all_enabled();
        let updated = table.with_enabled(Symbology::Qr, false);
        assert!(table.is_enabled(Symbology::Qr));
        assert!(!updated.is_enabled(Symbology::Qr));
        assert!(!updated.is_enabled(Symbology::Unknown));
        assert_eq!(updated.enabled_symbologies().len(), Symbology::COUNT - 1);
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "code_caching_duration_ms": 1000,
            "code_duplicate_filter_ms": -1,
            "max_number_of_codes_per_frame": 10,
            "symbologies": { "QR": { "enabled": false } }
        }"#;
        let settings: ScanSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.code_caching_duration_ms, CachingPolicy::Window(1000));
        assert_eq!(settings.code_duplicate_filter_ms, DuplicatePolicy::Session);
        assert_eq!(settings.max_codes_per_frame(), 6);
        assert!(!settings.symbologies.is_enabled(Symbology::Qr));
        assert!(settings.symbologies.is_enabled(Symbology::Ean13));
    }

    #[test]
    fn test_json_rejects_bad_duration() {
        let json = r#"{ "code_caching_duration_ms": -5 }"#;
        assert!(serde_json::from_str::<ScanSettings>(json).is_err());
    }
}
