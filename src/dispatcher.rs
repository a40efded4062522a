use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::directory::{Directory, DirectoryError};
use crate::message::{DeliveryReceipt, MemberRecord, MemberUpsert, SendMessage};
use crate::push::{PushChannel, PushTarget};
use crate::translator::{TranslateError, Translator};

/// Event name carried by every message push.
pub const MESSAGE_EVENT: &str = "newMessage";

const USER_NAME_MIN: usize = 2;
const USER_NAME_MAX: usize = 50;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl From<DirectoryError> for DispatchError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::InvalidArgument(msg) => DispatchError::BadRequest(msg),
            DirectoryError::Conflict => DispatchError::Conflict("member already exists".into()),
            DirectoryError::NotFound => DispatchError::NotFound("member not found".into()),
            DirectoryError::Store(msg) => DispatchError::Internal(msg),
        }
    }
}

impl From<TranslateError> for DispatchError {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::InvalidArgument(msg) => DispatchError::BadRequest(msg),
            TranslateError::Upstream(msg) => DispatchError::Upstream(msg),
        }
    }
}

/// Implements every user-facing operation as a short validation pipeline
/// followed by at most one directory read, at most one directory write and
/// at most one translator call. Capabilities arrive by constructor
/// injection; nothing here reads ambient state.
pub struct Dispatcher {
    directory: Directory,
    translator: Arc<dyn Translator>,
    push: Arc<dyn PushChannel>,
}

fn require(value: &str, what: &str) -> Result<(), DispatchError> {
    if value.trim().is_empty() {
        return Err(DispatchError::BadRequest(format!("{what} is required")));
    }
    Ok(())
}

/// Pull the translated text out of the service's raw response. The proxy
/// hands the payload over verbatim; this is the one place that knows its
/// shape: `[{"translations": [{"text": ..., "to": ...}]}]`.
fn extract_translation(payload: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    value
        .get(0)?
        .get("translations")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

impl Dispatcher {
    pub fn new(
        directory: Directory,
        translator: Arc<dyn Translator>,
        push: Arc<dyn PushChannel>,
    ) -> Self {
        Self {
            directory,
            translator,
            push,
        }
    }

    /// Translate a message for its recipient, push it to the recipient's
    /// live connection and return the synchronous acknowledgment.
    pub async fn send_message(&self, msg: SendMessage) -> Result<DeliveryReceipt, DispatchError> {
        require(&msg.group, "group")?;
        require(&msg.source_user_id, "sourceUserId")?;
        require(&msg.target_user_id, "targetUserId")?;
        require(&msg.text, "text")?;

        let members = self.directory.members_of(&msg.group).await?;
        if members.is_empty() {
            return Err(DispatchError::NotFound(format!(
                "no members in group '{}'",
                msg.group
            )));
        }
        let source = members.get(&msg.source_user_id).ok_or_else(|| {
            DispatchError::NotFound(format!(
                "source user '{}' not in group '{}'",
                msg.source_user_id, msg.group
            ))
        })?;
        let target = members.get(&msg.target_user_id).ok_or_else(|| {
            DispatchError::NotFound(format!(
                "target user '{}' not in group '{}'",
                msg.target_user_id, msg.group
            ))
        })?;

        // same language: keep the exact byte content and skip the remote call
        let translated_text = if source.language == target.language {
            msg.text.clone()
        } else {
            let payload = self
                .translator
                .translate(&msg.text, &source.language, &target.language)
                .await?;
            extract_translation(&payload).ok_or_else(|| {
                DispatchError::Internal("unrecognized translation payload".into())
            })?
        };

        let push_target = if target.connection_id.is_empty() {
            PushTarget::Group(msg.group.clone())
        } else {
            PushTarget::Connection(target.connection_id.clone())
        };
        let receipt = DeliveryReceipt {
            original_text: msg.text,
            translated_text,
            source_language: source.language.clone(),
            target_language: target.language.clone(),
            source_user_id: msg.source_user_id,
            target_user_id: msg.target_user_id,
            group: msg.group,
            timestamp: msg.timestamp,
        };

        let argument = serde_json::to_value(&receipt)
            .map_err(|err| DispatchError::Internal(err.to_string()))?;
        // the ack stands on its own; delivery is the hub's responsibility
        if let Err(err) = self.push.publish(MESSAGE_EVENT, push_target, vec![argument]).await {
            warn!(
                group = %receipt.group,
                target = %receipt.target_user_id,
                "push delivery failed: {err}"
            );
        }
        debug!(
            group = %receipt.group,
            source = %receipt.source_user_id,
            target = %receipt.target_user_id,
            "message dispatched"
        );
        Ok(receipt)
    }

    /// Join a user to a group. The existence pre-check only buys a
    /// friendlier message; the store's duplicate-insert rejection is the
    /// actual guard under concurrent requests.
    pub async fn add_member(&self, member: MemberUpsert) -> Result<(), DispatchError> {
        require(&member.group, "group")?;
        require(&member.user_id, "userId")?;
        require(&member.language, "language")?;

        let duplicate = DispatchError::Conflict(format!(
            "user '{}' already exists in group '{}'",
            member.user_id, member.group
        ));
        let members = self.directory.members_of(&member.group).await?;
        if members.contains_key(&member.user_id) {
            return Err(duplicate);
        }
        self.directory.add(member.into_record()).await.map_err(|err| match err {
            DirectoryError::Conflict => duplicate,
            other => other.into(),
        })
    }

    pub async fn remove_member(&self, group: &str, user: &str) -> Result<(), DispatchError> {
        require(group, "group")?;
        require(user, "userId")?;
        self.directory.remove(group, user).await.map_err(|err| match err {
            DirectoryError::NotFound => DispatchError::NotFound(format!(
                "member '{user}' not found in group '{group}'"
            )),
            other => other.into(),
        })
    }

    /// "Group has no members" and "group unknown" are indistinguishable
    /// here; groups exist only through their members.
    pub async fn list_members(
        &self,
        group: &str,
    ) -> Result<HashMap<String, MemberRecord>, DispatchError> {
        require(group, "group")?;
        let members = self.directory.members_of(group).await?;
        if members.is_empty() {
            return Err(DispatchError::NotFound(format!(
                "no members in group '{group}'"
            )));
        }
        Ok(members)
    }

    pub async fn is_online(&self, user: &str) -> Result<bool, DispatchError> {
        require(user, "userId")?;
        Ok(self.directory.is_online(user).await?)
    }

    /// Remove the user's membership in every group. No-op success when the
    /// user is unknown.
    pub async fn delete_user(&self, user: &str) -> Result<(), DispatchError> {
        require(user, "userId")?;
        Ok(self.directory.delete_all_for_user(user).await?)
    }

    /// A profile is a degenerate one-member group whose name is the user
    /// id itself. Kept for compatibility, behind its own operation.
    pub async fn create_profile(&self, profile: MemberUpsert) -> Result<(), DispatchError> {
        require(&profile.group, "group")?;
        require(&profile.user_id, "userId")?;
        require(&profile.language, "language")?;

        let duplicate = DispatchError::Conflict(format!(
            "profile for user '{}' already exists",
            profile.user_id
        ));
        let existing = self
            .directory
            .get_one(&profile.user_id, &profile.user_id)
            .await?;
        if existing.is_some() {
            return Err(duplicate);
        }
        let record = MemberRecord::new(
            &profile.user_id,
            &profile.user_id,
            &profile.language,
            profile.connection_id.as_deref().unwrap_or(""),
        );
        self.directory.add(record).await.map_err(|err| match err {
            DirectoryError::Conflict => duplicate,
            other => other.into(),
        })
    }

    /// Available iff no membership record in any group carries the name.
    pub async fn username_available(&self, user: &str) -> Result<bool, DispatchError> {
        require(user, "userId")?;
        let length = user.chars().count();
        if !(USER_NAME_MIN..=USER_NAME_MAX).contains(&length) {
            return Err(DispatchError::BadRequest(format!(
                "user name must be between {USER_NAME_MIN} and {USER_NAME_MAX} characters"
            )));
        }
        Ok(!self.directory.is_online(user).await?)
    }

    /// Members with a live connection, one entry per user.
    pub async fn online_users(&self) -> Result<Vec<MemberRecord>, DispatchError> {
        let mut seen = HashSet::new();
        Ok(self
            .directory
            .list_all()
            .await?
            .into_iter()
            .filter(|record| !record.connection_id.is_empty())
            .filter(|record| seen.insert(record.user_id.clone()))
            .collect())
    }

    /// Raw language-catalog payload; interpreting the shape is left to the
    /// caller.
    pub async fn supported_languages(&self) -> Result<String, DispatchError> {
        Ok(self.translator.supported_languages().await?)
    }
}
