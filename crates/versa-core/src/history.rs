//! Read-only queries over version history.

use crate::error::{VersionError, VersionResult};
use crate::store::VersionStore;
use crate::summary::{describe, VersionSummary};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use versa_diff::{ContentFormat, DiffEngine, DiffResult};
use versa_storage::{AuthorDirectory, ContentId, VersionId, VersionRecord};

/// Number of largest versions reported by [`RevisionHistory::storage_usage`].
const LARGEST_VERSIONS: usize = 10;

/// A history listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub version: VersionSummary,
    /// First lines of the body; absent if the body could not be read.
    pub preview: Option<String>,
}

/// Versions created on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineDay {
    pub date: NaiveDate,
    pub count: usize,
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

/// Storage consumed by one content item's versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub content_id: ContentId,
    pub total_versions: usize,
    pub total_bytes: u64,
    /// `(version id, size in bytes)`, largest first.
    pub largest_versions: Vec<(VersionId, u64)>,
}

/// First `lines` lines of `text`.
pub fn preview_text(text: &str, lines: usize) -> String {
    text.lines().take(lines).collect::<Vec<_>>().join("\n")
}

/// Listing, timeline, search and preview queries. Nothing here writes.
pub struct RevisionHistory {
    store: Arc<VersionStore>,
    authors: Arc<dyn AuthorDirectory>,
    engine: Arc<DiffEngine>,
    preview_lines: usize,
}

impl RevisionHistory {
    pub fn new(
        store: Arc<VersionStore>,
        authors: Arc<dyn AuthorDirectory>,
        engine: Arc<DiffEngine>,
        preview_lines: usize,
    ) -> Self {
        Self {
            store,
            authors,
            engine,
            preview_lines,
        }
    }

    async fn author_name(&self, record: &VersionRecord) -> Option<String> {
        self.authors
            .display_name(record.author_id)
            .await
            .unwrap_or_else(|e| {
                warn!(author_id = record.author_id, error = %e, "Author lookup failed");
                None
            })
    }

    /// Newest versions of a content item, with body previews.
    ///
    /// A version whose body disappears between listing and reading (for
    /// example, pruned concurrently) is listed without a preview.
    pub async fn get_history_for_content(
        &self,
        content_id: ContentId,
        limit: usize,
    ) -> VersionResult<Vec<HistoryEntry>> {
        let versions = self.store.list_versions(content_id).await?;
        let first_id = versions.first().map(|v| v.id);

        let mut entries = Vec::new();
        for version in versions.iter().rev().take(limit) {
            let preview = match self.store.get_version_text(version.id).await {
                Ok(text) => Some(preview_text(&text, self.preview_lines)),
                Err(e) if e.is_not_found() => {
                    debug!(version_id = version.id, "Body vanished during history query");
                    None
                }
                Err(e) => return Err(e),
            };
            let author_name = self.author_name(version).await;
            entries.push(HistoryEntry {
                version: VersionSummary::new(version, author_name, Some(version.id) == first_id),
                preview,
            });
        }
        Ok(entries)
    }

    pub async fn get_version_count(&self, content_id: ContentId) -> VersionResult<usize> {
        self.store.count_versions(content_id).await
    }

    /// Versions grouped by UTC calendar day, oldest day first.
    pub async fn get_version_timeline(
        &self,
        content_id: ContentId,
    ) -> VersionResult<Vec<TimelineDay>> {
        let versions = self.store.list_versions(content_id).await?;
        let mut days: BTreeMap<NaiveDate, TimelineDay> = BTreeMap::new();

        for version in &versions {
            let at = version.created_at;
            days.entry(at.date_naive())
                .and_modify(|day| {
                    day.count += 1;
                    day.earliest = day.earliest.min(at);
                    day.latest = day.latest.max(at);
                })
                .or_insert(TimelineDay {
                    date: at.date_naive(),
                    count: 1,
                    earliest: at,
                    latest: at,
                });
        }

        Ok(days.into_values().collect())
    }

    /// Versions whose change summary contains `query`, ignoring case,
    /// newest first. Optionally restricted to one content item.
    pub async fn search_versions(
        &self,
        query: &str,
        content_id: Option<ContentId>,
    ) -> VersionResult<Vec<VersionRecord>> {
        let needle = query.to_lowercase();
        let versions = match content_id {
            Some(id) => self.store.list_versions(id).await?,
            None => self.store.list_all().await?,
        };

        Ok(versions
            .into_iter()
            .rev()
            .filter(|v| v.change_summary.to_lowercase().contains(&needle))
            .collect())
    }

    /// First `lines` lines of a version's body.
    pub async fn preview_version(&self, version_id: VersionId, lines: usize) -> VersionResult<String> {
        let text = self.store.get_version_text(version_id).await?;
        Ok(preview_text(&text, lines))
    }

    /// Diff two versions of the same content item.
    pub async fn compare_versions(
        &self,
        from: VersionId,
        to: VersionId,
        format: ContentFormat,
    ) -> VersionResult<DiffResult> {
        let leases = self.store.leases();
        let _from_lease = leases.lease(from);
        let _to_lease = leases.lease(to);

        let a = self.store.get_version_metadata(from).await?;
        let b = self.store.get_version_metadata(to).await?;
        if a.content_id != b.content_id {
            return Err(VersionError::invalid_argument(format!(
                "versions {from} and {to} belong to different content"
            )));
        }

        let old = self.store.get_version_text(from).await?;
        let new = self.store.get_version_text(to).await?;
        Ok(self.engine.compare(&old, &new, format)?)
    }

    /// Version count and byte totals for a content item.
    pub async fn storage_usage(&self, content_id: ContentId) -> VersionResult<StorageUsage> {
        let versions = self.store.list_versions(content_id).await?;
        let mut largest: Vec<_> = versions.iter().map(|v| (v.id, v.size_bytes)).collect();
        largest.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        largest.truncate(LARGEST_VERSIONS);

        Ok(StorageUsage {
            content_id,
            total_versions: versions.len(),
            total_bytes: versions.iter().map(|v| v.size_bytes).sum(),
            largest_versions: largest,
        })
    }

    /// Human readable one-line description of a version.
    pub async fn summarize(&self, version_id: VersionId) -> VersionResult<String> {
        let record = self.store.get_version_metadata(version_id).await?;
        let is_first = self
            .store
            .list_versions(record.content_id)
            .await?
            .first()
            .is_some_and(|v| v.id == record.id);
        Ok(describe(&record, is_first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::leases::VersionLeases;
    use crate::store::CreateVersion;
    use chrono::{Duration, TimeZone};
    use versa_storage::{BlobStore, MemoryStorage};

    struct Fixture {
        storage: Arc<MemoryStorage>,
        store: Arc<VersionStore>,
        clock: Arc<ManualClock>,
        history: RevisionHistory,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 22, 0, 0).unwrap(),
        ));
        let store = Arc::new(VersionStore::new(
            storage.clone(),
            storage.clone(),
            clock.clone(),
            VersionLeases::new(),
        ));
        let history = RevisionHistory::new(
            store.clone(),
            storage.clone(),
            Arc::new(DiffEngine::default()),
            2,
        );
        Fixture {
            storage,
            store,
            clock,
            history,
        }
    }

    async fn create(f: &Fixture, content_id: ContentId, body: &str, summary: &str) -> VersionId {
        f.store
            .create_version(content_id, body.as_bytes(), CreateVersion::new(1, summary))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn history_is_newest_first_with_previews() {
        let f = fixture();
        let v1 = create(&f, 1, "one\ntwo\nthree", "first").await;
        f.clock.advance(Duration::minutes(1));
        let v2 = create(&f, 1, "alpha\nbeta\ngamma", "second").await;

        let history = f.history.get_history_for_content(1, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version.id, v2);
        assert_eq!(history[0].preview.as_deref(), Some("alpha\nbeta"));
        assert_eq!(history[1].version.id, v1);

        let limited = f.history.get_history_for_content(1, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn vanished_body_has_no_preview() {
        let f = fixture();
        let v1 = create(&f, 1, "body", "first").await;
        BlobStore::delete(f.storage.as_ref(), v1).await.unwrap();

        let history = f.history.get_history_for_content(1, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].preview, None);
    }

    #[tokio::test]
    async fn timeline_groups_by_utc_day() {
        let f = fixture();
        create(&f, 1, "a", "a").await;
        f.clock.advance(Duration::minutes(30));
        create(&f, 1, "b", "b").await;
        f.clock.advance(Duration::hours(2));
        create(&f, 1, "c", "c").await;

        let timeline = f.history.get_version_timeline(1).await.unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(timeline[0].count, 2);
        assert_eq!(
            timeline[0].latest - timeline[0].earliest,
            Duration::minutes(30)
        );
        assert_eq!(timeline[1].count, 1);
        assert_eq!(f.history.get_version_count(1).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_scoped() {
        let f = fixture();
        create(&f, 1, "a", "Fix Typo in intro").await;
        f.clock.advance(Duration::seconds(1));
        let newer = create(&f, 2, "b", "typo in footer").await;
        create(&f, 2, "c", "new section").await;

        let all = f.history.search_versions("TYPO", None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, newer);

        let scoped = f.history.search_versions("typo", Some(1)).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].content_id, 1);
    }

    #[tokio::test]
    async fn compare_requires_same_content() {
        let f = fixture();
        let a = create(&f, 1, "x\ny", "a").await;
        let b = create(&f, 1, "x\nz", "b").await;
        let other = create(&f, 2, "x", "c").await;

        let diff = f
            .history
            .compare_versions(a, b, ContentFormat::Text)
            .await
            .unwrap();
        assert_eq!(diff.ops().len(), 1);
        assert!(!f.store.leases().is_leased(a));

        let err = f
            .history
            .compare_versions(a, other, ContentFormat::Text)
            .await
            .unwrap_err();
        assert!(matches!(err, VersionError::InvalidArgument(_)));

        let err = f
            .history
            .compare_versions(a, 999, ContentFormat::Text)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn usage_and_summary() {
        let f = fixture();
        let small = create(&f, 1, "ab", "small").await;
        let large = create(&f, 1, "abcdef", "large").await;

        let usage = f.history.storage_usage(1).await.unwrap();
        assert_eq!(usage.total_versions, 2);
        assert_eq!(usage.total_bytes, 8);
        assert_eq!(usage.largest_versions, vec![(large, 6), (small, 2)]);

        assert_eq!(f.history.summarize(small).await.unwrap(), "Initial version");
        assert_eq!(f.history.summarize(large).await.unwrap(), "large");
        assert_eq!(
            f.history.preview_version(large, 1).await.unwrap(),
            "abcdef"
        );
    }
}
