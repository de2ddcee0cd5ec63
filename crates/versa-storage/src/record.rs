//! Persistent record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a content item owned by the host CMS.
pub type ContentId = i64;

/// Identifier of a stored version.
pub type VersionId = i64;

/// Identifier of a user (author or actor).
pub type UserId = i64;

/// Metadata of a stored version.
///
/// The snapshot fields never change after insertion. `tags` and
/// `restoration_notes` may be amended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: VersionId,
    pub content_id: ContentId,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
    pub change_summary: String,
    #[serde(default)]
    pub is_major: bool,
    /// Set when the version was produced by a restore.
    #[serde(default)]
    pub restored: bool,
    /// The version whose restore produced this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_from_id: Option<VersionId>,
    /// Size of the stored body in bytes.
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restoration_notes: Option<String>,
}

impl VersionRecord {
    /// Whether this version was created as a pre-restore backup.
    pub fn is_restore_backup(&self) -> bool {
        self.restored && self.restored_from_id.is_some()
    }
}

/// Fields of a version about to be inserted. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVersion {
    pub content_id: ContentId,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
    pub change_summary: String,
    pub is_major: bool,
    pub restored: bool,
    pub restored_from_id: Option<VersionId>,
    pub size_bytes: u64,
    pub tags: Vec<String>,
}

impl NewVersion {
    /// Turn this into a full record with the given id.
    pub fn into_record(self, id: VersionId) -> VersionRecord {
        VersionRecord {
            id,
            content_id: self.content_id,
            author_id: self.author_id,
            created_at: self.created_at,
            change_summary: self.change_summary,
            is_major: self.is_major,
            restored: self.restored,
            restored_from_id: self.restored_from_id,
            size_bytes: self.size_bytes,
            tags: self.tags,
            restoration_notes: None,
        }
    }
}

/// Severity of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    Info,
    Error,
}

/// One entry of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor_id: UserId,
    pub action: String,
    pub message: String,
    pub level: AuditLevel,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor_id: UserId,
        action: impl Into<String>,
        message: impl Into<String>,
        level: AuditLevel,
    ) -> Self {
        Self {
            actor_id,
            action: action.into(),
            message: message.into(),
            level,
            created_at: Utc::now(),
        }
    }
}

/// Sort records into the canonical order: `created_at`, then `id`.
pub fn sort_chronologically(records: &mut [VersionRecord]) {
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: VersionId, secs: i64) -> VersionRecord {
        NewVersion {
            content_id: 1,
            author_id: 7,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            change_summary: format!("v{id}"),
            is_major: false,
            restored: false,
            restored_from_id: None,
            size_bytes: 3,
            tags: Vec::new(),
        }
        .into_record(id)
    }

    #[test]
    fn sort_orders_by_time_then_id() {
        let mut records = vec![record(3, 10), record(1, 20), record(2, 10)];
        sort_chronologically(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn record_json_omits_empty_amendments() {
        let json = serde_json::to_value(record(1, 0)).unwrap();
        assert!(json.get("tags").is_none());
        assert!(json.get("restoration_notes").is_none());
        assert_eq!(json["change_summary"], "v1");
    }

    #[test]
    fn restore_backup_requires_source() {
        let mut r = record(1, 0);
        r.restored = true;
        assert!(!r.is_restore_backup());
        r.restored_from_id = Some(9);
        assert!(r.is_restore_backup());
    }
}
