//! Static bot configuration.
//!
//! The whole configuration is one YAML file read at process start. Channel
//! and role identifiers are validated up front so a misconfigured deployment
//! fails at startup instead of degrading per-action; message templates carry
//! defaults so a missing entry never fails an action.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::moderation::ActionKind;

/// Default configuration file location
pub const CONFIG_FILE: &str = "config/warden.yaml";

/// Errors raised while loading or validating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read configuration from {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A required identifier is absent or zero
    #[error("missing required configuration key: {0}")]
    MissingKey(&'static str),
}

/// Bot configuration structure, one deployment serves one guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    // The ID of the guild this deployment serves
    pub guild_id: u64,
    // Prefix for the legacy text commands
    #[serde(default = "defaults::prefix")]
    pub prefix: String,
    // Activity string shown on the bot's presence
    #[serde(default = "defaults::game_activity")]
    pub game_activity: String,
    // Contact handle substituted into direct notifications
    #[serde(default)]
    pub contact: String,
    // Role that marks moderators for the legacy admin command
    pub admin_role_id: u64,
    // Role applied by mute and tempmute
    pub mute_role_id: u64,
    // Role granted by the verification flow
    #[serde(default)]
    pub verify_role_id: Option<u64>,
    // Channel greeted members are welcomed in
    #[serde(default)]
    pub welcome_channel_id: Option<u64>,
    // Channel the verification prompt is posted to
    #[serde(default)]
    pub verify_channel_id: Option<u64>,
    // Name of the general-purpose log channel, looked up per guild
    #[serde(default)]
    pub logs_channel_name: Option<String>,
    // Roles members may grant themselves (and addroleall may grant)
    #[serde(default)]
    pub self_assign_role_ids: Vec<u64>,
    #[serde(default)]
    pub log_channels: LogChannels,
    #[serde(default)]
    pub embed_colors: EmbedColors,
    #[serde(default)]
    pub messages: MessageTemplates,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            guild_id: 0,
            prefix: defaults::prefix(),
            game_activity: defaults::game_activity(),
            contact: String::new(),
            admin_role_id: 0,
            mute_role_id: 0,
            verify_role_id: None,
            welcome_channel_id: None,
            verify_channel_id: None,
            logs_channel_name: None,
            self_assign_role_ids: Vec::new(),
            log_channels: LogChannels::default(),
            embed_colors: EmbedColors::default(),
            messages: MessageTemplates::default(),
        }
    }
}

impl BotConfig {
    /// Load and validate the configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if a
    /// required identifier is missing.
    pub async fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every identifier the pipeline depends on is present.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingKey` naming the first absent key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guild_id == 0 {
            return Err(ConfigError::MissingKey("guild_id"));
        }
        if self.admin_role_id == 0 {
            return Err(ConfigError::MissingKey("admin_role_id"));
        }
        if self.mute_role_id == 0 {
            return Err(ConfigError::MissingKey("mute_role_id"));
        }
        if self.verify_channel_id.is_some() && self.verify_role_id.is_none() {
            return Err(ConfigError::MissingKey("verify_role_id"));
        }
        Ok(())
    }
}

/// Audit-log channel ids keyed by action or event kind. A missing entry
/// means the corresponding log entry is skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogChannels {
    #[serde(default)]
    pub ban: Option<u64>,
    #[serde(default)]
    pub kick: Option<u64>,
    #[serde(default)]
    pub warn: Option<u64>,
    #[serde(default)]
    pub mute: Option<u64>,
    #[serde(default)]
    pub tempmute: Option<u64>,
    #[serde(default)]
    pub unmute: Option<u64>,
    #[serde(default)]
    pub message_delete: Option<u64>,
    #[serde(default)]
    pub message_edit: Option<u64>,
    #[serde(default)]
    pub voice: Option<u64>,
}

impl LogChannels {
    /// Audit destination for a moderation action, if one is configured
    #[must_use]
    pub fn for_action(&self, kind: ActionKind) -> Option<u64> {
        match kind {
            ActionKind::Ban => self.ban,
            ActionKind::Kick => self.kick,
            ActionKind::Warn => self.warn,
            ActionKind::Mute => self.mute,
            ActionKind::TempMute => self.tempmute,
            ActionKind::Unmute => self.unmute,
            ActionKind::BulkRoleGrant => None,
        }
    }
}

/// Embed accent colors keyed by action or event kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedColors {
    #[serde(default = "defaults::color_welcome")]
    pub welcome: u32,
    #[serde(default = "defaults::color_verify")]
    pub verify: u32,
    #[serde(default = "defaults::color_ban")]
    pub ban: u32,
    #[serde(default = "defaults::color_kick")]
    pub kick: u32,
    #[serde(default = "defaults::color_warn")]
    pub warn: u32,
    #[serde(default = "defaults::color_mute")]
    pub mute: u32,
    #[serde(default = "defaults::color_tempmute")]
    pub tempmute: u32,
    #[serde(default = "defaults::color_unmute")]
    pub unmute: u32,
    #[serde(default = "defaults::color_message_delete")]
    pub message_delete: u32,
    #[serde(default = "defaults::color_message_edit")]
    pub message_edit: u32,
    #[serde(default = "defaults::color_vc_join")]
    pub vc_join: u32,
    #[serde(default = "defaults::color_vc_leave")]
    pub vc_leave: u32,
    #[serde(default = "defaults::color_vc_move")]
    pub vc_move: u32,
    #[serde(default = "defaults::color_vc_disconnect")]
    pub vc_disconnect: u32,
}

impl Default for EmbedColors {
    fn default() -> Self {
        serde_yaml::from_str("{}").expect("empty mapping always deserializes")
    }
}

impl EmbedColors {
    /// Accent color for a moderation action
    #[must_use]
    pub fn for_action(&self, kind: ActionKind) -> u32 {
        match kind {
            ActionKind::Ban => self.ban,
            ActionKind::Kick => self.kick,
            ActionKind::Warn => self.warn,
            ActionKind::Mute => self.mute,
            ActionKind::TempMute => self.tempmute,
            ActionKind::Unmute | ActionKind::BulkRoleGrant => self.unmute,
        }
    }
}

/// Message templates. Placeholders are `{name}` tokens substituted by the
/// renderer; entries missing from the file fall back to these defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplates {
    #[serde(default = "defaults::msg_ban")]
    pub ban: String,
    #[serde(default = "defaults::msg_kick")]
    pub kick: String,
    #[serde(default = "defaults::msg_warn")]
    pub warn: String,
    #[serde(default = "defaults::msg_mute")]
    pub mute: String,
    #[serde(default = "defaults::msg_tempmute")]
    pub tempmute: String,
    #[serde(default = "defaults::msg_unmute")]
    pub unmute: String,
    #[serde(default = "defaults::msg_dm_ban")]
    pub dm_ban: String,
    #[serde(default = "defaults::msg_dm_kick")]
    pub dm_kick: String,
    #[serde(default = "defaults::msg_dm_warn")]
    pub dm_warn: String,
    #[serde(default = "defaults::msg_dm_mute")]
    pub dm_mute: String,
    #[serde(default = "defaults::msg_dm_tempmute")]
    pub dm_tempmute: String,
    #[serde(default = "defaults::msg_welcome")]
    pub welcome: String,
    #[serde(default = "defaults::msg_greeting")]
    pub greeting: String,
    #[serde(default = "defaults::msg_leave")]
    pub leave: String,
    #[serde(default = "defaults::msg_verify")]
    pub verify: String,
    #[serde(default = "defaults::msg_message_delete")]
    pub message_delete: String,
    #[serde(default = "defaults::msg_message_edit")]
    pub message_edit: String,
    #[serde(default = "defaults::msg_vc_join")]
    pub vc_join: String,
    #[serde(default = "defaults::msg_vc_leave")]
    pub vc_leave: String,
    #[serde(default = "defaults::msg_vc_move")]
    pub vc_move: String,
    #[serde(default = "defaults::msg_vc_disconnect")]
    pub vc_disconnect: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        serde_yaml::from_str("{}").expect("empty mapping always deserializes")
    }
}

mod defaults {
    pub fn prefix() -> String {
        "!".to_string()
    }
    pub fn game_activity() -> String {
        "over this server".to_string()
    }

    pub fn color_welcome() -> u32 {
        0x0057_F287
    }
    pub fn color_verify() -> u32 {
        0x0058_65F2
    }
    pub fn color_ban() -> u32 {
        0x00ED_4245
    }
    pub fn color_kick() -> u32 {
        0x00E6_7E22
    }
    pub fn color_warn() -> u32 {
        0x00FE_E75C
    }
    pub fn color_mute() -> u32 {
        0x0095_A5A6
    }
    pub fn color_tempmute() -> u32 {
        0x0034_98DB
    }
    pub fn color_unmute() -> u32 {
        0x0057_F287
    }
    pub fn color_message_delete() -> u32 {
        0x00ED_4245
    }
    pub fn color_message_edit() -> u32 {
        0x00E6_7E22
    }
    pub fn color_vc_join() -> u32 {
        0x001A_BC9C
    }
    pub fn color_vc_leave() -> u32 {
        0x0099_AAB5
    }
    pub fn color_vc_move() -> u32 {
        0x0034_98DB
    }
    pub fn color_vc_disconnect() -> u32 {
        0x00ED_4245
    }

    pub fn msg_ban() -> String {
        "{user} has been banned. Reason: {reason}".to_string()
    }
    pub fn msg_kick() -> String {
        "{user} has been kicked. Reason: {reason}".to_string()
    }
    pub fn msg_warn() -> String {
        "{user} has been warned. Reason: {reason}".to_string()
    }
    pub fn msg_mute() -> String {
        "{user} has been muted. Reason: {reason}".to_string()
    }
    pub fn msg_tempmute() -> String {
        "{user} has been muted for {duration}. Reason: {reason}".to_string()
    }
    pub fn msg_unmute() -> String {
        "{user} has been unmuted.".to_string()
    }
    pub fn msg_dm_ban() -> String {
        "You have been banned from {server} by {moderator}. Reason: {reason}. Contact: {contact}"
            .to_string()
    }
    pub fn msg_dm_kick() -> String {
        "You have been kicked from {server} by {moderator}. Reason: {reason}. Contact: {contact}"
            .to_string()
    }
    pub fn msg_dm_warn() -> String {
        "You have been warned in {server} by {moderator}. Reason: {reason}. Contact: {contact}"
            .to_string()
    }
    pub fn msg_dm_mute() -> String {
        "You have been muted in {server} by {moderator}. Reason: {reason}. Contact: {contact}"
            .to_string()
    }
    pub fn msg_dm_tempmute() -> String {
        "You have been muted in {server} for {duration} by {moderator}. Reason: {reason}. Contact: {contact}"
            .to_string()
    }
    pub fn msg_welcome() -> String {
        "Welcome {user}! You are member #{member_count}.".to_string()
    }
    pub fn msg_greeting() -> String {
        "Welcome to the {server}, {user}! You are member #{member_count}.".to_string()
    }
    pub fn msg_leave() -> String {
        "Left: {user}".to_string()
    }
    pub fn msg_verify() -> String {
        "{user}, react with ✅ to verify yourself.".to_string()
    }
    pub fn msg_message_delete() -> String {
        "{user}'s message was deleted: {content}".to_string()
    }
    pub fn msg_message_edit() -> String {
        "{user} edited a message. Before: {before} After: {after}".to_string()
    }
    pub fn msg_vc_join() -> String {
        "{user} joined voice channel {channel}".to_string()
    }
    pub fn msg_vc_leave() -> String {
        "{user} left voice channel {channel}".to_string()
    }
    pub fn msg_vc_move() -> String {
        "{user} moved from {old_channel} to {new_channel}".to_string()
    }
    pub fn msg_vc_disconnect() -> String {
        "{user} was disconnected from {channel}".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let yaml = "guild_id: 1\nadmin_role_id: 2\nmute_role_id: 3\n";
        let config: BotConfig = serde_yaml::from_str(yaml).expect("minimal config");
        assert_eq!(config.guild_id, 1);
        assert_eq!(config.prefix, "!");
        assert!(config.messages.ban.contains("{user}"));
        assert!(config.messages.dm_tempmute.contains("{duration}"));
        assert_eq!(config.log_channels.ban, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_identifiers() {
        let config = BotConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingKey("guild_id"))
        ));

        let config = BotConfig {
            guild_id: 1,
            admin_role_id: 2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingKey("mute_role_id"))
        ));
    }

    #[test]
    fn test_verify_channel_requires_verify_role() {
        let config = BotConfig {
            guild_id: 1,
            admin_role_id: 2,
            mute_role_id: 3,
            verify_channel_id: Some(4),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingKey("verify_role_id"))
        ));
    }

    #[test]
    fn test_log_channel_lookup_by_action() {
        let channels = LogChannels {
            ban: Some(10),
            unmute: Some(11),
            ..Default::default()
        };
        assert_eq!(channels.for_action(ActionKind::Ban), Some(10));
        assert_eq!(channels.for_action(ActionKind::Unmute), Some(11));
        assert_eq!(channels.for_action(ActionKind::Kick), None);
        assert_eq!(channels.for_action(ActionKind::BulkRoleGrant), None);
    }

    #[test]
    fn test_config_round_trip() {
        let config = BotConfig {
            guild_id: 42,
            admin_role_id: 1,
            mute_role_id: 2,
            logs_channel_name: Some("logs".to_string()),
            self_assign_role_ids: vec![7, 8],
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).expect("serialize");
        let parsed: BotConfig = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(parsed.guild_id, 42);
        assert_eq!(parsed.logs_channel_name.as_deref(), Some("logs"));
        assert_eq!(parsed.self_assign_role_ids, vec![7, 8]);
    }
}
