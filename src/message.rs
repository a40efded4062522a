use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user's membership in one group.
///
/// `group` is the partition dimension of the composite key, `user_id` the
/// row dimension within it. At most one record exists per pair; the store's
/// insert-if-absent signal enforces that, not this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub group: String,
    pub user_id: String,
    /// Target language tag for translations addressed to this user.
    pub language: String,
    /// Opaque handle to the user's live transport session; empty when the
    /// user has no live connection.
    #[serde(default)]
    pub connection_id: String,
    /// Assigned by the directory on write.
    pub last_modified: DateTime<Utc>,
}

impl MemberRecord {
    pub fn new(group: &str, user_id: &str, language: &str, connection_id: &str) -> Self {
        Self {
            group: group.to_string(),
            user_id: user_id.to_string(),
            language: language.to_string(),
            connection_id: connection_id.to_string(),
            last_modified: Utc::now(),
        }
    }
}

/// Inbound send-message body. Ephemeral, never persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub group: String,
    pub source_user_id: String,
    pub target_user_id: String,
    pub text: String,
    /// Client-supplied send time, echoed back in the receipt.
    pub timestamp: DateTime<Utc>,
}

/// Synchronous acknowledgment returned to the sender; also the single
/// argument of the push notification delivered to the recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub original_text: String,
    pub translated_text: String,
    pub source_user_id: String,
    pub target_user_id: String,
    pub source_language: String,
    pub target_language: String,
    pub group: String,
    pub timestamp: DateTime<Utc>,
}

/// Inbound add-member / create-profile body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpsert {
    pub group: String,
    pub user_id: String,
    pub language: String,
    #[serde(default)]
    pub connection_id: Option<String>,
}

impl MemberUpsert {
    pub fn into_record(self) -> MemberRecord {
        MemberRecord::new(
            &self.group,
            &self.user_id,
            &self.language,
            self.connection_id.as_deref().unwrap_or(""),
        )
    }
}
