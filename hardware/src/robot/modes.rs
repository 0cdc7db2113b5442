//! Operation mode profiles.
//!
//! A mode bundles a display name, a color, three scalar multipliers and
//! a description. Switching modes rescales the current motor speeds by
//! the profile's speed factor and pushes them to the robot; the turn and
//! search factors ride along as profile data for the dashboard and for
//! recorded sessions.

use std::path::Path;

use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use trackbot::command::MAX_SPEED;

use super::link::{LinkError, RobotLink};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lower")]
pub enum ModeKind {
    Race,
    #[default]
    Precision,
    PowerSave,
    Learning,
}

impl std::fmt::Display for ModeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeKind::Race => write!(f, "race"),
            ModeKind::Precision => write!(f, "precision"),
            ModeKind::PowerSave => write!(f, "powersave"),
            ModeKind::Learning => write!(f, "learning"),
        }
    }
}

/// One operation mode record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeProfile {
    pub kind: ModeKind,
    pub name: String,
    /// Accent color as `#RRGGBB`.
    pub color: String,
    pub speed_factor: f64,
    pub turn_factor: f64,
    pub search_factor: f64,
    pub description: String,
}

impl ModeProfile {
    /// The built-in profile for a mode.
    pub fn builtin(kind: ModeKind) -> Self {
        let (name, color, speed, turn, search, description) = match kind {
            ModeKind::Race => (
                "RACE MODE",
                "#FF3030",
                1.2,
                1.4,
                1.5,
                "Maximum speed, aggressive turns",
            ),
            ModeKind::Precision => (
                "PRECISION",
                "#1E64FF",
                0.7,
                0.9,
                1.0,
                "Slower, smoother tracking",
            ),
            ModeKind::PowerSave => (
                "POWER SAVER",
                "#FFD700",
                0.5,
                0.8,
                0.9,
                "Optimized for battery life",
            ),
            ModeKind::Learning => (
                "LEARNING",
                "#00FF00",
                0.6,
                1.0,
                1.1,
                "Logs data for analysis",
            ),
        };

        Self {
            kind,
            name: name.to_string(),
            color: color.to_string(),
            speed_factor: speed,
            turn_factor: turn,
            search_factor: search,
            description: description.to_string(),
        }
    }

    /// Rescale a speed percentage through this profile's speed factor.
    pub fn scale_speed(&self, percent: u8) -> SpeedUpdate {
        let scaled = (percent as f64 * self.speed_factor).round();
        if scaled > MAX_SPEED as f64 {
            SpeedUpdate::Clamped(MAX_SPEED)
        } else if scaled < 0.0 {
            SpeedUpdate::Clamped(0)
        } else {
            SpeedUpdate::Applied(scaled as u8)
        }
    }
}

/// All four built-in profiles.
pub fn builtin_profiles() -> Vec<ModeProfile> {
    [
        ModeKind::Race,
        ModeKind::Precision,
        ModeKind::PowerSave,
        ModeKind::Learning,
    ]
    .into_iter()
    .map(ModeProfile::builtin)
    .collect()
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("failed to read profile file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse profile file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load profile overrides from a JSON file.
///
/// The file holds an array of [`ModeProfile`] records; modes it does not
/// mention keep their built-in values.
pub fn load_profiles(path: &Path) -> Result<Vec<ModeProfile>, ProfileError> {
    let text = std::fs::read_to_string(path)?;
    let profiles: Vec<ModeProfile> = serde_json::from_str(&text)?;
    Ok(profiles)
}

/// Result of rescaling a speed through a mode profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedUpdate {
    /// Scaled value fit in 0-100.
    Applied(u8),
    /// Scaled value fell outside 0-100 and was clamped.
    Clamped(u8),
}

impl SpeedUpdate {
    pub fn value(&self) -> u8 {
        match self {
            SpeedUpdate::Applied(v) | SpeedUpdate::Clamped(v) => *v,
        }
    }

    pub fn was_clamped(&self) -> bool {
        matches!(self, SpeedUpdate::Clamped(_))
    }
}

/// Tracks the active mode and applies switches to the robot.
#[derive(Debug)]
pub struct ModeController {
    active: ModeKind,
    profiles: Vec<ModeProfile>,
}

impl ModeController {
    pub fn new() -> Self {
        Self {
            active: ModeKind::default(),
            profiles: builtin_profiles(),
        }
    }

    /// Built-ins with any overrides applied on top, matched by kind.
    pub fn with_overrides(overrides: Vec<ModeProfile>) -> Self {
        let mut profiles = builtin_profiles();
        for over in overrides {
            if let Some(slot) = profiles.iter_mut().find(|p| p.kind == over.kind) {
                *slot = over;
            }
        }
        Self {
            active: ModeKind::default(),
            profiles,
        }
    }

    pub fn active(&self) -> ModeKind {
        self.active
    }

    pub fn profile(&self, kind: ModeKind) -> &ModeProfile {
        // Construction guarantees one profile per kind.
        self.profiles
            .iter()
            .find(|p| p.kind == kind)
            .unwrap_or(&self.profiles[0])
    }

    pub fn active_profile(&self) -> &ModeProfile {
        self.profile(self.active)
    }

    /// Switch modes, rescaling the current speeds through the new
    /// profile and pushing them to the robot when a link is given.
    ///
    /// Returns the new (left, right) speed pair.
    pub fn switch(
        &mut self,
        kind: ModeKind,
        link: Option<&mut RobotLink>,
        left: u8,
        right: u8,
    ) -> Result<(u8, u8), LinkError> {
        let profile = self.profile(kind);
        let new_left = profile.scale_speed(left);
        let new_right = profile.scale_speed(right);
        let name = profile.name.clone();

        if let Some(link) = link {
            link.set_speeds(new_left.value(), new_right.value())?;
        }
        self.active = kind;

        info!(
            "Mode {} active: speeds {}% / {}%{}",
            name,
            new_left.value(),
            new_right.value(),
            if new_left.was_clamped() || new_right.was_clamped() {
                " (clamped)"
            } else {
                ""
            }
        );
        Ok((new_left.value(), new_right.value()))
    }
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let race = ModeProfile::builtin(ModeKind::Race);
        assert_eq!(race.name, "RACE MODE");
        assert_eq!(race.color, "#FF3030");
        assert_eq!(race.speed_factor, 1.2);
        assert_eq!(race.turn_factor, 1.4);
        assert_eq!(race.search_factor, 1.5);

        let saver = ModeProfile::builtin(ModeKind::PowerSave);
        assert_eq!(saver.name, "POWER SAVER");
        assert_eq!(saver.speed_factor, 0.5);
    }

    #[test]
    fn test_default_mode_is_precision() {
        assert_eq!(ModeKind::default(), ModeKind::Precision);
        assert_eq!(ModeController::new().active(), ModeKind::Precision);
    }

    #[test]
    fn test_scale_speed_applied() {
        let saver = ModeProfile::builtin(ModeKind::PowerSave);
        assert_eq!(saver.scale_speed(10), SpeedUpdate::Applied(5));
        assert_eq!(saver.scale_speed(0), SpeedUpdate::Applied(0));
    }

    #[test]
    fn test_scale_speed_clamps_high() {
        let race = ModeProfile::builtin(ModeKind::Race);
        assert_eq!(race.scale_speed(90), SpeedUpdate::Clamped(100));
        assert!(race.scale_speed(90).was_clamped());
        assert_eq!(race.scale_speed(80), SpeedUpdate::Applied(96));
    }

    #[test]
    fn test_switch_without_link_updates_active() {
        let mut modes = ModeController::new();
        let (left, right) = modes.switch(ModeKind::Race, None, 60, 70).unwrap();
        assert_eq!(modes.active(), ModeKind::Race);
        assert_eq!((left, right), (72, 84));
    }

    #[test]
    fn test_overrides_replace_matching_kind() {
        let mut custom = ModeProfile::builtin(ModeKind::Race);
        custom.speed_factor = 2.0;
        let modes = ModeController::with_overrides(vec![custom]);

        assert_eq!(modes.profile(ModeKind::Race).speed_factor, 2.0);
        // Untouched modes keep built-in values.
        assert_eq!(modes.profile(ModeKind::Precision).speed_factor, 0.7);
    }

    #[test]
    fn test_profile_serde_round_trip() {
        let profile = ModeProfile::builtin(ModeKind::Learning);
        let json = serde_json::to_string(&profile).unwrap();
        let back: ModeProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&ModeKind::PowerSave).unwrap(),
            "\"powersave\""
        );
    }

    #[test]
    fn test_load_profiles_from_file() {
        use std::time::{SystemTime, UNIX_EPOCH};

        let path = std::env::temp_dir().join(format!(
            "trackbot_profiles_test_{}.json",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));

        let mut custom = ModeProfile::builtin(ModeKind::Race);
        custom.speed_factor = 1.1;
        std::fs::write(&path, serde_json::to_string(&vec![custom]).unwrap()).unwrap();

        let loaded = load_profiles(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].kind, ModeKind::Race);
        assert_eq!(loaded[0].speed_factor, 1.1);
    }

    #[test]
    fn test_load_profiles_missing_file() {
        use std::time::{SystemTime, UNIX_EPOCH};

        let missing = std::env::temp_dir().join(format!(
            "trackbot_profiles_missing_{}.json",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        assert!(matches!(load_profiles(&missing), Err(ProfileError::Io(_))));
    }
}
