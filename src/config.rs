use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::{Deserialize, Deserializer};
use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::PathBuf,
};
use thiserror::Error;

use crate::direction::{Direction, DirectionSemantics};
use crate::input;

/// Rejected profile values. Never clamped: the caller gets the error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("no action bound to swipe.{0}")]
    UnboundDirection(Direction),
    #[error("binding '{key}' has unknown action '{action}'")]
    UnknownAction { key: String, action: String },
    #[error("action '{0}' is bound to more than one direction")]
    DuplicateAction(String),
    #[error("unknown binding key '{0}'")]
    UnknownBinding(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeckSettings {
    pub max_visible_cards: usize,
    pub swipe_threshold_px: f32,
    /// px/s
    pub velocity_threshold: f32,
    pub rotation_factor: f32,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            max_visible_cards: 3,
            swipe_threshold_px: 100.0,
            velocity_threshold: 1000.0,
            rotation_factor: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    pub max_rotation_deg: f32,
    pub drag_lift: f32,
    pub dismiss_scale: f32,
    pub dismiss_ms: u64,
    pub reset_ms: u64,
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub tap_slop_px: f32,
    pub smooth_ema: f32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            max_rotation_deg: 30.0,
            drag_lift: 0.05,
            dismiss_scale: 0.8,
            dismiss_ms: 300,
            reset_ms: 250,
            viewport_width: 400.0,
            viewport_height: 700.0,
            tap_slop_px: 10.0,
            smooth_ema: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub min_px: f32,
    /// Falls back to the swipe threshold.
    pub full_px: Option<f32>,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            min_px: 20.0,
            full_px: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub meta: Meta,
    #[serde(default)]
    pub deck: DeckSettings,
    #[serde(default)]
    pub motion: MotionSettings,
    #[serde(default)]
    pub overlay: OverlaySettings,

    // `swipe.right = ...` arrives as a nested table; flatten it to "swipe.right"
    #[serde(deserialize_with = "deserialize_bindings_flat")]
    pub bindings: HashMap<String, String>,
}

impl Default for Profile {
    fn default() -> Self {
        let bindings = [
            ("swipe.right", "going_private"),
            ("swipe.up", "going_shared"),
            ("swipe.down", "maybe_later"),
            ("swipe.left", "not_interested"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            meta: Meta {
                name: Some("default".into()),
            },
            deck: DeckSettings::default(),
            motion: MotionSettings::default(),
            overlay: OverlaySettings::default(),
            bindings,
        }
    }
}

impl Profile {
    /// Parse and validate a profile document.
    pub fn from_toml_str(txt: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(txt)?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(default_profile_text())
    }

    pub fn semantics(&self) -> Result<DirectionSemantics, ConfigError> {
        DirectionSemantics::from_bindings(&self.bindings)
    }

    pub fn overlay_full_px(&self) -> f32 {
        self.overlay.full_px.unwrap_or(self.deck.swipe_threshold_px)
    }
}

// --------- custom bindings deserializer (tolerant) ----------
fn deserialize_bindings_flat<'de, D>(
    de: D,
) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = toml::Value::deserialize(de)?;
    let table = match val {
        toml::Value::Table(t) => t,
        other => {
            return Err(serde::de::Error::custom(format!(
                "bindings must be a table, got {:?}",
                other.type_str()
            )));
        }
    };

    let mut out = HashMap::new();
    flatten_table("", &table, &mut out).map_err(serde::de::Error::custom)?;
    Ok(out)
}

fn flatten_table(
    prefix: &str,
    table: &toml::value::Table,
    out: &mut HashMap<String, String>,
) -> std::result::Result<(), String> {
    for (k, v) in table {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(sub) => {
                flatten_table(&key, sub, out)?;
            }
            other => {
                return Err(format!(
                    "binding '{}' value must be a string, got {}",
                    key,
                    other.type_str()
                ));
            }
        }
    }
    Ok(())
}
// ------------------------------------------------------------

pub fn validate_profile(p: &Profile) -> Result<(), ConfigError> {
    let d = &p.deck;
    if d.max_visible_cards < 1 {
        return Err(invalid("deck.max_visible_cards", "must be at least 1"));
    }
    if !(d.swipe_threshold_px > 0.0) {
        return Err(invalid("deck.swipe_threshold_px", "must be positive"));
    }
    if !(d.velocity_threshold > 0.0) {
        return Err(invalid("deck.velocity_threshold", "must be positive"));
    }
    if !(d.rotation_factor > 0.0 && d.rotation_factor < 1.0) {
        return Err(invalid("deck.rotation_factor", "must be in (0,1)"));
    }

    let m = &p.motion;
    if !(m.max_rotation_deg > 0.0 && m.max_rotation_deg <= 90.0) {
        return Err(invalid("motion.max_rotation_deg", "must be in (0,90]"));
    }
    if !(0.0..1.0).contains(&m.drag_lift) {
        return Err(invalid("motion.drag_lift", "must be in [0,1)"));
    }
    if !(m.dismiss_scale > 0.0 && m.dismiss_scale <= 1.0) {
        return Err(invalid("motion.dismiss_scale", "must be in (0,1]"));
    }
    if m.dismiss_ms == 0 || m.reset_ms == 0 {
        return Err(invalid("motion", "animation durations must be positive"));
    }
    if !(m.viewport_width > 0.0 && m.viewport_height > 0.0) {
        return Err(invalid("motion", "viewport must have a positive size"));
    }
    if !(m.tap_slop_px >= 0.0 && m.tap_slop_px < d.swipe_threshold_px) {
        return Err(invalid(
            "motion.tap_slop_px",
            "must be non-negative and below the swipe threshold",
        ));
    }
    if !(m.smooth_ema > 0.0 && m.smooth_ema <= 1.0) {
        return Err(invalid("motion.smooth_ema", "must be in (0,1]"));
    }

    let full = p.overlay_full_px();
    if !(p.overlay.min_px >= 0.0 && p.overlay.min_px < full) {
        return Err(invalid(
            "overlay.min_px",
            "must be non-negative and below overlay.full_px",
        ));
    }

    p.semantics()?;
    Ok(())
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct DeckConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(dirs.home_dir().join(".config").join("swipedeck"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl DeckConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        let cfgdir = config_dir()?;
        let profdir = cfgdir.join("profiles");
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = load_profile(&profdir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        // validate before moving the pointer
        let profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let devices: Vec<String> = input::discover_touch_devices()
            .into_iter()
            .map(|d| format!("{} ({})", d.name, d.path))
            .collect();
        serde_json::json!({
            "config_dir": self.config_dir,
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "deck": {
                "max_visible_cards": self.profile.deck.max_visible_cards,
                "swipe_threshold_px": self.profile.deck.swipe_threshold_px,
                "velocity_threshold": self.profile.deck.velocity_threshold,
                "rotation_factor": self.profile.deck.rotation_factor,
            },
            "touch_devices": devices,
            "hints": {
                "add_user_to_input_group": "sudo usermod -aG input $USER && newgrp input"
            }
        })
    }
}

fn load_profile(dir: &std::path::Path, name: &str) -> Result<Profile> {
    let path = dir.join(format!("{name}.toml"));
    let txt = fs::read_to_string(&path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    Profile::from_toml_str(&txt).map_err(|e| anyhow!("failed to load {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profile_parses_with_documented_defaults() {
        let p = Profile::builtin().unwrap();
        assert_eq!(p.deck.max_visible_cards, 3);
        assert_eq!(p.deck.swipe_threshold_px, 100.0);
        assert_eq!(p.deck.velocity_threshold, 1000.0);
        assert_eq!(p.deck.rotation_factor, 0.1);
        assert_eq!(p.overlay_full_px(), 100.0);
        assert_eq!(p.bindings.get("swipe.up").map(String::as_str), Some("going_shared"));
    }

    #[test]
    fn zero_visible_cards_is_fatal_not_clamped() {
        let mut p = Profile::default();
        p.deck.max_visible_cards = 0;
        let err = validate_profile(&p).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "deck.max_visible_cards",
                ..
            }
        ));
    }

    #[test]
    fn rotation_factor_must_stay_below_one() {
        let mut p = Profile::default();
        p.deck.rotation_factor = 1.5;
        assert!(validate_profile(&p).is_err());
    }

    #[test]
    fn partial_profile_uses_section_defaults() {
        let txt = r#"
            [meta]
            name = "fast"

            [deck]
            velocity_threshold = 600.0

            [bindings]
            swipe.right = "going_private"
            swipe.up = "going_shared"
            swipe.down = "maybe_later"
            swipe.left = "not_interested"
        "#;
        let p = Profile::from_toml_str(txt).unwrap();
        assert_eq!(p.deck.velocity_threshold, 600.0);
        assert_eq!(p.deck.max_visible_cards, 3);
        assert_eq!(p.motion.dismiss_ms, 300);
    }

    #[test]
    fn non_string_binding_is_a_parse_error() {
        let txt = r#"
            [meta]
            [bindings]
            swipe.right = 3
        "#;
        assert!(Profile::from_toml_str(txt).is_err());
    }
}
