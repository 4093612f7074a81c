// SPDX-License-Identifier: GPL-3.0-only

//! Engine-wide constants

/// Default code caching duration: keep codes for the whole session
pub const DEFAULT_CODE_CACHING_DURATION_MS: i64 = -1;

/// Default duplicate filter window
pub const DEFAULT_CODE_DUPLICATE_FILTER_MS: i64 = 500;

/// Lower bound for the number of codes processed per frame
pub const MAX_CODES_PER_FRAME_LOWER: usize = 1;

/// Upper bound for the number of codes processed per frame
pub const MAX_CODES_PER_FRAME_UPPER: usize = 6;

/// Default number of codes processed per frame
pub const DEFAULT_MAX_CODES_PER_FRAME: i64 = MAX_CODES_PER_FRAME_UPPER as i64;

/// Frames allowed to wait for the worker before new ones are dropped
pub const MAX_PENDING_FRAMES: usize = 4;

/// Default scanning hot spot (center of the frame)
pub const DEFAULT_HOT_SPOT: (f64, f64) = (0.5, 0.5);

/// Frames are downscaled to this size before QR detection
pub const QR_MAX_DIMENSION: u32 = 640;

/// Name of the directory holding the settings file
pub const CONFIG_DIR_NAME: &str = "scan-engine";

/// Name of the settings file
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Clamp a configured per-frame code count into the supported range
///
/// Anything below 1 behaves like 1 and anything above 6 like 6.
pub fn clamp_max_codes_per_frame(value: i64) -> usize {
    value.clamp(
        MAX_CODES_PER_FRAME_LOWER as i64,
        MAX_CODES_PER_FRAME_UPPER as i64,
    ) as usize
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_max_codes() {
        assert_eq!(clamp_max_codes_per_frame(10), 6);
        assert_eq!(clamp_max_codes_per_frame(0), 1);
        assert_eq!(clamp_max_codes_per_frame(-3), 1);
        assert_eq!(clamp_max_codes_per_frame(4), 4);
    }
}
