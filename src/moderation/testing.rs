//! Shared fixtures for moderation tests: a recording fake gateway and
//! canned config/identity/scheduler builders.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, Receiver};

use crate::config::{BotConfig, LogChannels};
use crate::moderation::render::Identity;
use crate::moderation::scheduler::ReversalCheckRequest;
use crate::moderation::{
    Gateway, GatewayError, MemberProfile, Notification, SanctionScheduler, SanctionStore,
};

/// One observed gateway call, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ResolveMember(u64),
    ListMembers,
    RoleExists(u64),
    AddRole { user_id: u64, role_id: u64 },
    RemoveRole { user_id: u64, role_id: u64 },
    Ban(u64),
    Kick(u64),
    Direct(u64),
    Channel(u64),
}

/// Fake gateway that records every call and serves canned members/roles
#[derive(Default)]
pub struct RecordingGateway {
    pub calls: Mutex<Vec<Call>>,
    /// user_id -> profile served by resolve_member/list_members
    pub members: Mutex<HashMap<u64, MemberProfile>>,
    /// role ids that exist on the guild
    pub guild_roles: Mutex<HashSet<u64>>,
    /// when set, send_direct fails (target has DMs closed)
    pub fail_direct: AtomicBool,
    /// user ids whose add_role/remove_role calls fail
    pub fail_role_changes_for: Mutex<HashSet<u64>>,
}

impl RecordingGateway {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl Gateway for RecordingGateway {
    async fn resolve_member(
        &self,
        _guild_id: u64,
        user_id: u64,
    ) -> Result<Option<MemberProfile>, GatewayError> {
        self.record(Call::ResolveMember(user_id));
        Ok(self.members.lock().unwrap().get(&user_id).cloned())
    }

    async fn list_members(&self, _guild_id: u64) -> Result<Vec<MemberProfile>, GatewayError> {
        self.record(Call::ListMembers);
        let mut members: Vec<MemberProfile> =
            self.members.lock().unwrap().values().cloned().collect();
        members.sort_by_key(|member| member.user_id);
        Ok(members)
    }

    async fn role_exists(&self, _guild_id: u64, role_id: u64) -> Result<bool, GatewayError> {
        self.record(Call::RoleExists(role_id));
        Ok(self.guild_roles.lock().unwrap().contains(&role_id))
    }

    async fn add_role(
        &self,
        _guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError> {
        self.record(Call::AddRole { user_id, role_id });
        if self.fail_role_changes_for.lock().unwrap().contains(&user_id) {
            return Err(GatewayError::new("missing permissions"));
        }
        Ok(())
    }

    async fn remove_role(
        &self,
        _guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError> {
        self.record(Call::RemoveRole { user_id, role_id });
        if self.fail_role_changes_for.lock().unwrap().contains(&user_id) {
            return Err(GatewayError::new("missing permissions"));
        }
        Ok(())
    }

    async fn ban(&self, _guild_id: u64, user_id: u64, _reason: &str) -> Result<(), GatewayError> {
        self.record(Call::Ban(user_id));
        Ok(())
    }

    async fn kick(&self, _guild_id: u64, user_id: u64, _reason: &str) -> Result<(), GatewayError> {
        self.record(Call::Kick(user_id));
        Ok(())
    }

    async fn send_direct(&self, user_id: u64, _note: &Notification) -> Result<(), GatewayError> {
        self.record(Call::Direct(user_id));
        if self.fail_direct.load(Ordering::SeqCst) {
            return Err(GatewayError::new("cannot send messages to this user"));
        }
        Ok(())
    }

    async fn send_to_channel(
        &self,
        channel_id: u64,
        _note: &Notification,
    ) -> Result<(), GatewayError> {
        self.record(Call::Channel(channel_id));
        Ok(())
    }
}

/// Fresh recording gateway with the configured mute role in place
pub fn recording_gateway() -> Arc<RecordingGateway> {
    let gateway = RecordingGateway::default();
    gateway.guild_roles.lock().unwrap().insert(500);
    Arc::new(gateway)
}

/// Canned config: guild 10, mute role 500, one self-service role 700, every
/// moderation log channel wired to a distinct id
pub fn test_config() -> Arc<BotConfig> {
    Arc::new(BotConfig {
        guild_id: 10,
        admin_role_id: 600,
        mute_role_id: 500,
        self_assign_role_ids: vec![700],
        contact: "mods@example.com".to_string(),
        log_channels: LogChannels {
            ban: Some(9001),
            kick: Some(9002),
            warn: Some(9003),
            mute: Some(9004),
            tempmute: Some(9005),
            unmute: Some(9006),
            message_delete: Some(9007),
            message_edit: Some(9008),
            voice: Some(9009),
        },
        ..Default::default()
    })
}

pub fn test_identity() -> Identity {
    Identity {
        bot_name: "warden".to_string(),
        bot_avatar_url: None,
        guild_name: Some("Test Guild".to_string()),
    }
}

/// Scheduler over a uniquely named temp-file store; the receiver is handed
/// back so tests decide whether the task side exists
pub fn test_scheduler(name: &str) -> (SanctionScheduler, Receiver<ReversalCheckRequest>) {
    let path = std::env::temp_dir().join(format!(
        "warden-test-{name}-{}.yaml",
        uuid::Uuid::new_v4()
    ));
    let store = SanctionStore::new(path);
    let (tx, rx) = mpsc::channel(8);
    (SanctionScheduler::new(store, tx), rx)
}
