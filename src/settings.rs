//! Player preferences
//!
//! Kept in memory for the one playthrough. The page URL can override the
//! defaults (`?mute&debug&reduced_motion&volume=0.5`).

use serde::{Deserialize, Serialize};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Visual Effects ===
    /// Screen shake when the runner takes a hit
    pub screen_shake: bool,
    /// Ambient and pickup particles
    pub particles: bool,

    // === HUD ===
    /// Show FPS counter and verbose logging
    pub debug: bool,

    // === Audio ===
    pub muted: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,

    // === Accessibility ===
    /// Reduced motion (no shake, no flashing)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            screen_shake: true,
            particles: true,

            debug: false,

            muted: false,
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.3,

            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Defaults with overrides from a URL query string
    pub fn from_query(query: &str) -> Self {
        let mut settings = Self::default();
        for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "mute" => settings.muted = value != "0",
                "debug" => settings.debug = value != "0",
                "reduced_motion" => settings.reduced_motion = value != "0",
                "no_shake" => settings.screen_shake = false,
                "no_particles" => settings.particles = false,
                "volume" => match value.parse::<f32>() {
                    Ok(v) => settings.master_volume = v.clamp(0.0, 1.0),
                    Err(_) => log::warn!("Ignoring bad volume {value:?}"),
                },
                other => log::debug!("Unknown setting {other:?}"),
            }
        }
        settings
    }

    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Whether hit flashes should blink
    pub fn effective_flash(&self) -> bool {
        !self.reduced_motion
    }

    pub fn sfx_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    pub fn music_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.music_volume
        }
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        log::info!("Audio {}", if self.muted { "muted" } else { "unmuted" });
        self.muted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_overrides() {
        let s = Settings::from_query("?mute&debug=1&reduced_motion&volume=0.5");
        assert!(s.muted);
        assert!(s.debug);
        assert!(s.reduced_motion);
        assert_eq!(s.master_volume, 0.5);
        assert!(!s.effective_screen_shake());
        assert_eq!(s.sfx_gain(), 0.0);
    }

    #[test]
    fn test_query_ignores_junk() {
        let s = Settings::from_query("volume=loud&what&debug=0");
        assert_eq!(s, Settings {
            debug: false,
            ..Settings::default()
        });
        assert_eq!(Settings::from_query(""), Settings::default());
    }

    #[test]
    fn test_volume_clamped() {
        assert_eq!(Settings::from_query("volume=7").master_volume, 1.0);
    }

    #[test]
    fn test_toggle_mute() {
        let mut s = Settings::default();
        assert!(s.sfx_gain() > 0.0);
        assert!(s.toggle_mute());
        assert_eq!(s.music_gain(), 0.0);
        assert!(!s.toggle_mute());
    }
}
