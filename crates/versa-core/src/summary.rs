//! Listing views of versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use versa_storage::{ContentId, UserId, VersionId, VersionRecord};

/// A version as shown in listings, with the author's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub id: VersionId,
    pub content_id: ContentId,
    pub author_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub change_summary: String,
    pub is_major: bool,
    pub restored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restored_from_id: Option<VersionId>,
    pub size_bytes: u64,
    /// Human readable description, see [`describe`].
    pub description: String,
}

impl VersionSummary {
    pub fn new(record: &VersionRecord, author_name: Option<String>, is_first: bool) -> Self {
        Self {
            id: record.id,
            content_id: record.content_id,
            author_id: record.author_id,
            author_name,
            created_at: record.created_at,
            change_summary: record.change_summary.clone(),
            is_major: record.is_major,
            restored: record.restored,
            restored_from_id: record.restored_from_id,
            size_bytes: record.size_bytes,
            description: describe(record, is_first),
        }
    }
}

/// One-line description of what a version represents.
pub fn describe(record: &VersionRecord, is_first: bool) -> String {
    if let (true, Some(source)) = (record.restored, record.restored_from_id) {
        return format!("Backup taken before restoring version {source}");
    }
    if record.restoration_notes.is_some() {
        return format!("Restored version: {}", record.change_summary);
    }
    if is_first {
        return "Initial version".to_string();
    }
    if record.is_major {
        return format!("Major revision: {}", record.change_summary);
    }
    if record.change_summary.trim().is_empty() {
        "Minor changes".to_string()
    } else {
        record.change_summary.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use versa_storage::NewVersion;

    fn record(summary: &str) -> VersionRecord {
        NewVersion {
            content_id: 1,
            author_id: 2,
            created_at: Utc::now(),
            change_summary: summary.to_string(),
            is_major: false,
            restored: false,
            restored_from_id: None,
            size_bytes: 0,
            tags: Vec::new(),
        }
        .into_record(10)
    }

    #[test]
    fn describes_each_kind() {
        assert_eq!(describe(&record("Fix typo"), true), "Initial version");
        assert_eq!(describe(&record("Fix typo"), false), "Fix typo");
        assert_eq!(describe(&record(" "), false), "Minor changes");

        let mut major = record("Rewrite");
        major.is_major = true;
        assert_eq!(describe(&major, false), "Major revision: Rewrite");

        let mut backup = record("Pre-restore backup");
        backup.restored = true;
        backup.restored_from_id = Some(4);
        assert_eq!(describe(&backup, true), "Backup taken before restoring version 4");
    }

    #[test]
    fn summary_carries_author_name() {
        let summary = VersionSummary::new(&record("x"), Some("Ada".to_string()), false);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["author_name"], "Ada");
        assert!(json.get("restored_from_id").is_none());
    }
}
