//! Moderation action requests.
//!
//! An [`ActionRequest`] is built fresh for every command invocation and is
//! immutable once constructed; the pipeline never caches principals beyond
//! a single run.

use std::collections::HashSet;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The kinds of moderation action the pipeline knows how to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ActionKind {
    Ban,
    Kick,
    Warn,
    Mute,
    TempMute,
    Unmute,
    BulkRoleGrant,
}

impl ActionKind {
    /// Whether the target must resolve to a current guild member before the
    /// pipeline proceeds. Warnings are notification-only and may address a
    /// user who already left.
    #[must_use]
    pub fn requires_member(self) -> bool {
        matches!(
            self,
            Self::Ban | Self::Kick | Self::Mute | Self::TempMute | Self::Unmute
        )
    }
}

/// A named permission bit required for administrative operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Capability {
    #[display("Ban Members")]
    BanMembers,
    #[display("Kick Members")]
    KickMembers,
    #[display("Administrator")]
    Administrator,
}

/// The invoking principal, with the capabilities it held at invocation time
#[derive(Debug, Clone)]
pub struct Requester {
    pub user_id: u64,
    pub tag: String,
    pub capabilities: HashSet<Capability>,
}

impl Requester {
    #[must_use]
    pub fn new(user_id: u64, tag: impl Into<String>) -> Self {
        Self {
            user_id,
            tag: tag.into(),
            capabilities: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_capabilities(
        user_id: u64,
        tag: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            user_id,
            tag: tag.into(),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn holds(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Whom an action applies to
#[derive(Debug, Clone)]
pub enum Target {
    /// A single member, identified at invocation time
    Member { user_id: u64, tag: String },
    /// Every current member of the guild (bulk role grant)
    AllMembers,
}

/// One validated unit of moderator intent
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub guild_id: u64,
    pub requester: Requester,
    pub target: Target,
    pub reason: Option<String>,
    /// Raw duration token as typed by the moderator (TempMute only)
    pub duration: Option<String>,
    /// Role to grant (BulkRoleGrant only)
    pub role_id: Option<u64>,
}

impl ActionRequest {
    fn single(
        kind: ActionKind,
        guild_id: u64,
        requester: Requester,
        user_id: u64,
        tag: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            kind,
            guild_id,
            requester,
            target: Target::Member {
                user_id,
                tag: tag.into(),
            },
            reason,
            duration: None,
            role_id: None,
        }
    }

    #[must_use]
    pub fn ban(
        guild_id: u64,
        requester: Requester,
        user_id: u64,
        tag: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self::single(ActionKind::Ban, guild_id, requester, user_id, tag, reason)
    }

    #[must_use]
    pub fn kick(
        guild_id: u64,
        requester: Requester,
        user_id: u64,
        tag: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self::single(ActionKind::Kick, guild_id, requester, user_id, tag, reason)
    }

    #[must_use]
    pub fn warn(
        guild_id: u64,
        requester: Requester,
        user_id: u64,
        tag: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self::single(ActionKind::Warn, guild_id, requester, user_id, tag, reason)
    }

    #[must_use]
    pub fn mute(
        guild_id: u64,
        requester: Requester,
        user_id: u64,
        tag: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self::single(ActionKind::Mute, guild_id, requester, user_id, tag, reason)
    }

    #[must_use]
    pub fn tempmute(
        guild_id: u64,
        requester: Requester,
        user_id: u64,
        tag: impl Into<String>,
        duration: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        let mut request = Self::single(
            ActionKind::TempMute,
            guild_id,
            requester,
            user_id,
            tag,
            reason,
        );
        request.duration = Some(duration.into());
        request
    }

    #[must_use]
    pub fn unmute(
        guild_id: u64,
        requester: Requester,
        user_id: u64,
        tag: impl Into<String>,
    ) -> Self {
        Self::single(ActionKind::Unmute, guild_id, requester, user_id, tag, None)
    }

    #[must_use]
    pub fn bulk_role_grant(guild_id: u64, requester: Requester, role_id: u64) -> Self {
        Self {
            kind: ActionKind::BulkRoleGrant,
            guild_id,
            requester,
            target: Target::AllMembers,
            reason: None,
            duration: None,
            role_id: Some(role_id),
        }
    }

    /// The single-member target, if this request has one
    #[must_use]
    pub fn target_member(&self) -> Option<(u64, &str)> {
        match &self.target {
            Target::Member { user_id, tag } => Some((*user_id, tag.as_str())),
            Target::AllMembers => None,
        }
    }

    /// Display tag for rendering; bulk requests have no single target
    #[must_use]
    pub fn target_tag(&self) -> &str {
        match &self.target {
            Target::Member { tag, .. } => tag.as_str(),
            Target::AllMembers => "",
        }
    }
}
