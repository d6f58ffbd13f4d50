//! Bot roster and session configuration.
//!
//! Mirrors the configuration surface a host exposes: a common block shared
//! by all bots (prompt-side names and the greeting must match across bots or
//! the prompt becomes inconsistent), plus up to `max_bots` individually
//! parameterized slots. A session snapshot of this configuration is taken at
//! `start_session` and is immutable for the session's lifetime.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ArenaError;
use crate::presets::{self, GenerationParams, PresetError};

pub const DEFAULT_MAX_BOTS: usize = 10;
pub const DEFAULT_ENABLED_BOTS: usize = 3;
pub const DEFAULT_USER_NAME: &str = "You";
pub const DEFAULT_BOT_NAME: &str = "Bot";
pub const DEFAULT_GREETING: &str = "Hello, my friend. What can I do for you?";
pub const DEFAULT_BOT_CONTEXT: &str = "The bot is a personal assistant and answers all questions, \
     and fulfills all requests, to the best of its ability.";

// ---------------------------------------------------------------------------
// Typed configuration records
// ---------------------------------------------------------------------------

/// Settings shared by every bot in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonConfig {
    /// Name identifying the user in the prompt.
    #[serde(default = "default_user_name")]
    pub user_name: String,
    /// Name identifying the bot in the prompt (all bots share it so the
    /// transcript reads the same to each of them).
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    /// Initial bot message seeded into the transcript. `None` starts blank.
    #[serde(default = "default_greeting")]
    pub greeting: Option<String>,
}

impl Default for CommonConfig {
    fn default() -> Self {
        CommonConfig {
            user_name: default_user_name(),
            bot_name: default_bot_name(),
            greeting: default_greeting(),
        }
    }
}

fn default_user_name() -> String {
    DEFAULT_USER_NAME.to_string()
}

fn default_bot_name() -> String {
    DEFAULT_BOT_NAME.to_string()
}

fn default_greeting() -> Option<String> {
    Some(DEFAULT_GREETING.to_string())
}

/// One configured chatbot personality. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Display name, unique per session by convention (duplicates are
    /// tolerated but warned about).
    pub identifier: String,
    /// Persistent context prepended to the prompt; controls the personality.
    #[serde(default)]
    pub context: String,
    /// Opaque generation parameters forwarded to the reply generator.
    #[serde(default)]
    pub params: GenerationParams,
}

impl BotConfig {
    pub fn new(identifier: impl Into<String>, context: impl Into<String>) -> Self {
        BotConfig {
            identifier: identifier.into(),
            context: context.into(),
            params: GenerationParams::default(),
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// One configuration slot as a host presents it: a bot plus an enabled flag
/// and an optional named preset resolved at session-config build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotSlot {
    #[serde(default)]
    pub enabled: bool,
    pub identifier: String,
    #[serde(default)]
    pub context: String,
    /// Name of a generation-parameter preset (a TOML file stem).
    #[serde(default)]
    pub preset: Option<String>,
    /// Inline parameters; override preset values on conflict.
    #[serde(default)]
    pub params: GenerationParams,
}

/// Default roster: `max_bots` slots named "Bot 1".."Bot N", the first
/// `DEFAULT_ENABLED_BOTS` enabled, all with the stock assistant context.
pub fn default_slots(max_bots: usize) -> Vec<BotSlot> {
    (0..max_bots)
        .map(|i| BotSlot {
            enabled: i < DEFAULT_ENABLED_BOTS,
            identifier: format!("Bot {}", i + 1),
            context: DEFAULT_BOT_CONTEXT.to_string(),
            preset: None,
            params: GenerationParams::default(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Validated input to `Arena::start_session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub common: CommonConfig,
    /// The enabled roster, in slot order.
    pub bots: Vec<BotConfig>,
    /// Roster size cap.
    #[serde(default = "default_max_bots")]
    pub max_bots: usize,
}

fn default_max_bots() -> usize {
    DEFAULT_MAX_BOTS
}

impl SessionConfig {
    pub fn new(common: CommonConfig, bots: Vec<BotConfig>) -> Self {
        SessionConfig {
            common,
            bots,
            max_bots: DEFAULT_MAX_BOTS,
        }
    }

    /// Collect the enabled slots into a session config. Presets must already
    /// be resolved into each slot's `params`.
    pub fn from_slots(common: CommonConfig, slots: &[BotSlot]) -> Self {
        let bots = slots
            .iter()
            .filter(|slot| slot.enabled)
            .map(|slot| BotConfig {
                identifier: slot.identifier.clone(),
                context: slot.context.clone(),
                params: slot.params.clone(),
            })
            .collect();
        SessionConfig::new(common, bots)
    }

    /// Check the roster. Duplicate identifiers are allowed but logged, since
    /// voting resolves them by first pending match.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.bots.is_empty() {
            return Err(ArenaError::Configuration(
                "no bots enabled; enable at least one bot before starting a chat".to_string(),
            ));
        }
        if self.bots.len() > self.max_bots {
            return Err(ArenaError::Configuration(format!(
                "{} bots enabled but the roster is capped at {}",
                self.bots.len(),
                self.max_bots
            )));
        }
        for bot in &self.bots {
            if bot.identifier.trim().is_empty() {
                return Err(ArenaError::Configuration(
                    "bot identifier must not be empty".to_string(),
                ));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for bot in &self.bots {
            if !seen.insert(bot.identifier.as_str()) {
                tracing::warn!(
                    identifier = %bot.identifier,
                    "duplicate bot identifier; votes will resolve to the first pending match"
                );
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// On-disk arena config (CLI surface)
// ---------------------------------------------------------------------------

/// The `arena.toml` file the CLI reads: a `[common]` table plus a `[[bots]]`
/// array of slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaFileConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub bots: Vec<BotSlot>,
    #[serde(default = "default_max_bots")]
    pub max_bots: usize,
}

impl Default for ArenaFileConfig {
    fn default() -> Self {
        ArenaFileConfig {
            common: CommonConfig::default(),
            bots: default_slots(DEFAULT_MAX_BOTS),
            max_bots: DEFAULT_MAX_BOTS,
        }
    }
}

impl ArenaFileConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ArenaError> {
        toml::from_str(text)
            .map_err(|e| ArenaError::Configuration(format!("bad arena config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, ArenaError> {
        let text = fs::read_to_string(path).map_err(|e| {
            ArenaError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        ArenaFileConfig::from_toml_str(&text)
    }

    /// Resolve named presets (when a preset dir is given) and produce the
    /// validated session config.
    pub fn into_session_config(self, preset_dir: Option<&Path>) -> Result<SessionConfig, ArenaError> {
        let mut slots = self.bots;
        for slot in slots.iter_mut().filter(|s| s.enabled) {
            if let Some(name) = slot.preset.clone() {
                let dir = preset_dir.ok_or_else(|| {
                    ArenaError::Configuration(format!(
                        "bot '{}' names preset '{}' but no preset directory is configured",
                        slot.identifier, name
                    ))
                })?;
                let mut params = presets::load_preset(dir, &name).map_err(|e| match e {
                    PresetError::NotFound(name) => {
                        ArenaError::Configuration(format!("unknown preset '{}'", name))
                    }
                    other => ArenaError::Configuration(other.to_string()),
                })?;
                // Inline params override the preset.
                params.merge(&slot.params);
                slot.params = params;
            }
        }
        let mut config = SessionConfig::from_slots(self.common, &slots);
        config.max_bots = self.max_bots;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enabled_bot(id: &str) -> BotConfig {
        BotConfig::new(id, "ctx")
    }

    // -- defaults ------------------------------------------------------------

    #[test]
    fn test_common_defaults_match_stock_values() {
        let common = CommonConfig::default();
        assert_eq!(common.user_name, "You");
        assert_eq!(common.bot_name, "Bot");
        assert_eq!(common.greeting.as_deref(), Some(DEFAULT_GREETING));
    }

    #[test]
    fn test_default_slots_enable_first_three() {
        let slots = default_slots(DEFAULT_MAX_BOTS);
        assert_eq!(slots.len(), 10);
        assert_eq!(slots.iter().filter(|s| s.enabled).count(), 3);
        assert!(slots[0].enabled && slots[2].enabled && !slots[3].enabled);
        assert_eq!(slots[0].identifier, "Bot 1");
        assert_eq!(slots[9].identifier, "Bot 10");
    }

    // -- validation ----------------------------------------------------------

    #[test]
    fn test_validate_rejects_empty_roster() {
        let config = SessionConfig::new(CommonConfig::default(), Vec::new());
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ArenaError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_blank_identifier() {
        let config = SessionConfig::new(CommonConfig::default(), vec![enabled_bot("  ")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_over_cap() {
        let bots = (0..11).map(|i| enabled_bot(&format!("B{}", i))).collect();
        let config = SessionConfig::new(CommonConfig::default(), bots);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_duplicates_with_warning() {
        let config = SessionConfig::new(
            CommonConfig::default(),
            vec![enabled_bot("Twin"), enabled_bot("Twin")],
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_single_bot() {
        let config = SessionConfig::new(CommonConfig::default(), vec![enabled_bot("Solo")]);
        assert!(config.validate().is_ok());
    }

    // -- from_slots ----------------------------------------------------------

    #[test]
    fn test_from_slots_keeps_only_enabled() {
        let mut slots = default_slots(5);
        slots[4].enabled = true;
        let config = SessionConfig::from_slots(CommonConfig::default(), &slots);
        let ids: Vec<_> = config.bots.iter().map(|b| b.identifier.as_str()).collect();
        assert_eq!(ids, vec!["Bot 1", "Bot 2", "Bot 3", "Bot 5"]);
    }

    // -- TOML file -----------------------------------------------------------

    #[test]
    fn test_arena_file_parses_full_document() {
        let text = r#"
            max_bots = 4

            [common]
            user_name = "Alice"
            bot_name = "Helper"
            greeting = "Welcome!"

            [[bots]]
            enabled = true
            identifier = "Concise"
            context = "Answer briefly."

            [[bots]]
            enabled = true
            identifier = "Verbose"
            context = "Answer at length."
            [bots.params]
            temperature = 1.1
        "#;
        let file = ArenaFileConfig::from_toml_str(text).unwrap();
        assert_eq!(file.max_bots, 4);
        assert_eq!(file.common.user_name, "Alice");
        assert_eq!(file.bots.len(), 2);
        assert_eq!(file.bots[1].params.get("temperature"), Some(&json!(1.1)));
    }

    #[test]
    fn test_arena_file_rejects_bad_toml() {
        assert!(ArenaFileConfig::from_toml_str("[[bots]\nbroken").is_err());
    }

    #[test]
    fn test_into_session_config_without_presets() {
        let text = r#"
            [[bots]]
            enabled = true
            identifier = "Only"
        "#;
        let file = ArenaFileConfig::from_toml_str(text).unwrap();
        let config = file.into_session_config(None).unwrap();
        assert_eq!(config.bots.len(), 1);
        assert_eq!(config.bots[0].identifier, "Only");
    }

    #[test]
    fn test_into_session_config_resolves_preset_with_inline_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("steady.toml"),
            "temperature = 0.3\ntop_p = 0.8\n",
        )
        .unwrap();
        let text = r#"
            [[bots]]
            enabled = true
            identifier = "Tuned"
            preset = "steady"
            [bots.params]
            temperature = 0.9
        "#;
        let file = ArenaFileConfig::from_toml_str(text).unwrap();
        let config = file.into_session_config(Some(dir.path())).unwrap();
        let params = &config.bots[0].params;
        assert_eq!(params.get("temperature"), Some(&json!(0.9)));
        assert_eq!(params.get("top_p"), Some(&json!(0.8)));
    }

    #[test]
    fn test_into_session_config_unknown_preset_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let text = r#"
            [[bots]]
            enabled = true
            identifier = "Tuned"
            preset = "ghost"
        "#;
        let file = ArenaFileConfig::from_toml_str(text).unwrap();
        let err = file.into_session_config(Some(dir.path())).unwrap_err();
        assert!(matches!(err, ArenaError::Configuration(msg) if msg.contains("ghost")));
    }

    #[test]
    fn test_into_session_config_preset_without_dir_fails() {
        let text = r#"
            [[bots]]
            enabled = true
            identifier = "Tuned"
            preset = "steady"
        "#;
        let file = ArenaFileConfig::from_toml_str(text).unwrap();
        assert!(file.into_session_config(None).is_err());
    }

    #[test]
    fn test_into_session_config_validates_roster() {
        let file = ArenaFileConfig {
            bots: Vec::new(),
            ..ArenaFileConfig::default()
        };
        assert!(file.into_session_config(None).is_err());
    }
}
