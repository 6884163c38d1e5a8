//! Shared configuration for polyedit
//!
//! This crate is the single source of truth for editor limits and tool
//! defaults shared by the mesh kernel and the tool framework.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default number of undo steps kept before the oldest is dropped
pub const DEFAULT_UNDO_LEVELS: usize = 50;

/// Default cap on walk steps per make-face segment
pub const DEFAULT_VISIT_BUDGET: usize = 10_000;

/// Vertex | edge | face
pub const DEFAULT_SELECT_MASK: u32 = 0b111;

pub const DEFAULT_SMOOTH_FACTOR: f32 = 0.5;

/// Upper bound for split cuts and smoothing repeats
pub const MAX_STEPS: u32 = 100;

/// Environment variable overriding [`EditorConfig::max_undo_levels`]
pub const ENV_UNDO_LEVELS: &str = "POLYEDIT_UNDO_LEVELS";

/// Environment variable overriding [`EditorConfig::make_face_visit_budget`]
pub const ENV_VISIT_BUDGET: &str = "POLYEDIT_VISIT_BUDGET";

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo history length; 0 disables undo
    pub max_undo_levels: usize,
    /// Walk steps allowed per make-face segment
    pub make_face_visit_budget: usize,
    /// Element kinds a delete acts on when the caller gives none
    pub default_select_mask: u32,
    /// Initial smoothing factor in [0, 1]
    pub smooth_factor: f32,
    /// Initial smoothing repeat count
    pub smooth_repeat: u32,
    /// Initial number of cuts per split edge
    pub split_steps: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo_levels: DEFAULT_UNDO_LEVELS,
            make_face_visit_budget: DEFAULT_VISIT_BUDGET,
            default_select_mask: DEFAULT_SELECT_MASK,
            smooth_factor: DEFAULT_SMOOTH_FACTOR,
            smooth_repeat: 1,
            split_steps: 1,
        }
    }
}

impl EditorConfig {
    /// Defaults with `POLYEDIT_UNDO_LEVELS` / `POLYEDIT_VISIT_BUDGET` applied
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides read through `lookup`.
    ///
    /// Values that do not parse as unsigned integers are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(levels) = parse_override(&lookup, ENV_UNDO_LEVELS) {
            config.max_undo_levels = levels;
        }
        if let Some(budget) = parse_override(&lookup, ENV_VISIT_BUDGET) {
            config.make_face_visit_budget = budget;
        }
        config.validated()
    }

    /// Reset every out-of-range field to its default.
    ///
    /// Call after deserializing a config from an untrusted source.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.make_face_visit_budget == 0 {
            warn!("make_face_visit_budget must be at least 1, using default");
            self.make_face_visit_budget = defaults.make_face_visit_budget;
        }
        if self.default_select_mask == 0 || self.default_select_mask & !DEFAULT_SELECT_MASK != 0 {
            warn!(
                "default_select_mask {:#b} is not a vertex/edge/face mask, using default",
                self.default_select_mask
            );
            self.default_select_mask = defaults.default_select_mask;
        }
        if !(0.0..=1.0).contains(&self.smooth_factor) {
            warn!("smooth_factor {} is outside 0..=1, using default", self.smooth_factor);
            self.smooth_factor = defaults.smooth_factor;
        }
        if !(1..=MAX_STEPS).contains(&self.smooth_repeat) {
            warn!("smooth_repeat {} is outside 1..={}, using default", self.smooth_repeat, MAX_STEPS);
            self.smooth_repeat = defaults.smooth_repeat;
        }
        if !(1..=MAX_STEPS).contains(&self.split_steps) {
            warn!("split_steps {} is outside 1..={}, using default", self.split_steps, MAX_STEPS);
            self.split_steps = defaults.split_steps;
        }
        self
    }

    /// Whether executed tools are kept for undo
    pub fn undo_enabled(&self) -> bool {
        self.max_undo_levels > 0
    }
}

fn parse_override(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not an unsigned integer", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.max_undo_levels, 50);
        assert_eq!(config.make_face_visit_budget, 10_000);
        assert_eq!(config.default_select_mask, 7);
        assert_eq!(config.smooth_factor, 0.5);
        assert_eq!(config.smooth_repeat, 1);
        assert_eq!(config.split_steps, 1);
        assert!(config.undo_enabled());
    }

    #[test]
    fn test_env_overrides() {
        let config = EditorConfig::from_lookup(|key| match key {
            ENV_UNDO_LEVELS => Some("0".to_string()),
            ENV_VISIT_BUDGET => Some(" 25 ".to_string()),
            _ => None,
        });
        assert_eq!(config.max_undo_levels, 0);
        assert_eq!(config.make_face_visit_budget, 25);
        assert!(!config.undo_enabled());
    }

    #[test]
    fn test_bad_override_is_ignored() {
        let config = EditorConfig::from_lookup(|key| {
            (key == ENV_UNDO_LEVELS).then(|| "lots".to_string())
        });
        assert_eq!(config.max_undo_levels, DEFAULT_UNDO_LEVELS);
    }

    #[test]
    fn test_validated_resets_out_of_range_fields() {
        let config = EditorConfig {
            make_face_visit_budget: 0,
            default_select_mask: 0b1000,
            smooth_factor: 2.0,
            smooth_repeat: 0,
            split_steps: 500,
            ..EditorConfig::default()
        }
        .validated();

        assert_eq!(config, EditorConfig::default());

        let nan = EditorConfig {
            smooth_factor: f32::NAN,
            ..EditorConfig::default()
        };
        assert_eq!(nan.validated().smooth_factor, DEFAULT_SMOOTH_FACTOR);
    }

    #[test]
    fn test_zero_budget_override_falls_back() {
        let config = EditorConfig::from_lookup(|key| {
            (key == ENV_VISIT_BUDGET).then(|| "0".to_string())
        });
        assert_eq!(config.make_face_visit_budget, DEFAULT_VISIT_BUDGET);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"max_undo_levels": 3, "split_steps": 4}"#).unwrap();
        assert_eq!(config.max_undo_levels, 3);
        assert_eq!(config.split_steps, 4);
        assert_eq!(config.make_face_visit_budget, DEFAULT_VISIT_BUDGET);

        let json = serde_json::to_string(&config).unwrap();
        let back: EditorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
