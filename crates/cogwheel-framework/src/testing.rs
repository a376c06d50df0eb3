//! In-memory [`ChatPlatform`] for tests and offline demos.
//!
//! [`RecordingPlatform`] records every outbound call instead of talking to a
//! real service. Permissions are granted per `(user, permission)` pair.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use cogwheel_core::{ChannelRef, ChatPlatform, Permission, PlatformError, PlatformResult};

/// An outbound action recorded by [`RecordingPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// `send(channel, content)`.
    Sent {
        /// Target channel id.
        channel: String,
        /// Message text.
        content: String,
    },
    /// `kick(guild, user, reason)`.
    Kicked {
        /// Guild id.
        guild: String,
        /// Kicked user id.
        user: String,
        /// Audit-log reason.
        reason: Option<String>,
    },
    /// `ban(guild, user, reason)`.
    Banned {
        /// Guild id.
        guild: String,
        /// Banned user id.
        user: String,
        /// Audit-log reason.
        reason: Option<String>,
    },
}

/// A [`ChatPlatform`] that records instead of sending.
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    self_id: Option<String>,
    fail_sends: bool,
    grants: Mutex<HashSet<(String, Permission)>>,
    log: Mutex<Vec<Recorded>>,
}

impl RecordingPlatform {
    /// Creates a platform whose bot account is `self_id`.
    pub fn new(self_id: impl Into<String>) -> Self {
        Self {
            self_id: Some(self_id.into()),
            ..Default::default()
        }
    }

    /// Makes every `send` fail.
    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Wraps the platform in an `Arc`.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Grants `permission` to `user_id` everywhere.
    pub fn grant(&self, user_id: impl Into<String>, permission: Permission) {
        self.grants.lock().insert((user_id.into(), permission));
    }

    /// Returns every recorded action, oldest first.
    pub fn recorded(&self) -> Vec<Recorded> {
        self.log.lock().clone()
    }

    /// Returns the text of every sent message, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|r| match r {
                Recorded::Sent { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the last sent message text.
    pub fn last_sent(&self) -> Option<String> {
        self.sent().pop()
    }

    /// Clears the record.
    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    async fn send(&self, channel: &ChannelRef, content: &str) -> PlatformResult<()> {
        if self.fail_sends {
            return Err(PlatformError::send_failed(&channel.id, "sends disabled"));
        }
        self.log.lock().push(Recorded::Sent {
            channel: channel.id.clone(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn has_permission(
        &self,
        _channel: &ChannelRef,
        user_id: &str,
        permission: Permission,
    ) -> PlatformResult<bool> {
        let grants = self.grants.lock();
        Ok(grants.contains(&(user_id.to_string(), permission))
            || grants.contains(&(user_id.to_string(), Permission::Administrator)))
    }

    async fn kick(
        &self,
        guild_id: &str,
        user_id: &str,
        reason: Option<&str>,
    ) -> PlatformResult<()> {
        self.log.lock().push(Recorded::Kicked {
            guild: guild_id.to_string(),
            user: user_id.to_string(),
            reason: reason.map(str::to_string),
        });
        Ok(())
    }

    async fn ban(&self, guild_id: &str, user_id: &str, reason: Option<&str>) -> PlatformResult<()> {
        self.log.lock().push(Recorded::Banned {
            guild: guild_id.to_string(),
            user: user_id.to_string(),
            reason: reason.map(str::to_string),
        });
        Ok(())
    }
}
