//! The comparison entry point.

use crate::cache::{cache_key, DiffCache};
use crate::error::{DiffError, Result};
use crate::merge::{self, LineMerge, LineMergeOptions, Resolution, StructuredMerge};
use crate::op::{ContentFormat, DiffResult};
use crate::structured::MergeConflict;
use crate::{html, structured, text};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use versa_util::TimingGuard;

/// Largest input accepted by default (1 MiB).
pub const DEFAULT_MAX_COMPARISON_SIZE: usize = 1024 * 1024;

/// Default lifetime of cached results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Engine limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffConfig {
    /// Inputs larger than this many bytes are rejected.
    pub max_comparison_size: usize,
    pub cache_ttl: Duration,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_comparison_size: DEFAULT_MAX_COMPARISON_SIZE,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Compares content as text, HTML or structured data.
///
/// The engine is stateless apart from its optional cache and can be shared
/// freely behind an `Arc`.
#[derive(Clone, Default)]
pub struct DiffEngine {
    config: DiffConfig,
    cache: Option<Arc<dyn DiffCache>>,
}

impl std::fmt::Debug for DiffEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffEngine")
            .field("config", &self.config)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl DiffEngine {
    pub fn new(config: DiffConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    /// Attach a result cache.
    pub fn with_cache(mut self, cache: Arc<dyn DiffCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Compare two inputs under the given format.
    ///
    /// Fails with [`DiffError::SizeExceeded`] before doing any work if
    /// either input is over the limit, and with [`DiffError::InvalidFormat`]
    /// if structured input does not parse.
    pub fn compare(&self, old: &str, new: &str, format: ContentFormat) -> Result<DiffResult> {
        self.check_size(old)?;
        self.check_size(new)?;

        let key = self.cache.as_ref().map(|_| cache_key(old, new, format));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                trace!(format = %format, "Diff cache hit");
                return Ok(hit);
            }
        }

        let _timing = TimingGuard::diff(format.as_str());
        let result = match format {
            ContentFormat::Structured => DiffResult::Structured(structured::compare(old, new)?),
            _ if old == new => DiffResult::empty(),
            ContentFormat::Html => DiffResult::Lines(html::compare(old, new)),
            ContentFormat::Text => DiffResult::Lines(text::compare(old, new)),
        };

        debug!(
            format = %format,
            old_len = old.len(),
            new_len = new.len(),
            empty = result.is_empty(),
            "Compared content"
        );

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            cache.set(key, result.clone(), self.config.cache_ttl);
        }
        Ok(result)
    }

    /// Compare using the `is_html` / `is_structured` flag pair.
    pub fn compare_flags(
        &self,
        old: &str,
        new: &str,
        is_html: bool,
        is_structured: bool,
    ) -> Result<DiffResult> {
        self.compare(old, new, ContentFormat::from_flags(is_html, is_structured))
    }

    /// Line-merge `other` into `base`, under the same size cap as
    /// [`compare`](Self::compare).
    pub fn merge_lines(
        &self,
        base: &str,
        other: &str,
        options: LineMergeOptions,
    ) -> Result<LineMerge> {
        self.check_size(base)?;
        self.check_size(other)?;
        let _timing = TimingGuard::diff("merge");
        Ok(merge::merge_lines(base, other, options))
    }

    /// Keys changed differently by both sides since `base`.
    pub fn merge_conflicts(
        &self,
        base: &str,
        current: &str,
        incoming: &str,
    ) -> Result<Vec<MergeConflict>> {
        for input in [base, current, incoming] {
            self.check_size(input)?;
        }
        Ok(structured::merge_conflicts(
            &structured::parse(base)?,
            &structured::parse(current)?,
            &structured::parse(incoming)?,
        ))
    }

    /// Three-way structured merge, under the same size cap as
    /// [`compare`](Self::compare).
    pub fn merge_structured(
        &self,
        base: &str,
        current: &str,
        incoming: &str,
        resolutions: &BTreeMap<String, Resolution>,
    ) -> Result<StructuredMerge> {
        for input in [base, current, incoming] {
            self.check_size(input)?;
        }
        merge::merge_structured(base, current, incoming, resolutions)
    }

    fn check_size(&self, input: &str) -> Result<()> {
        if input.len() > self.config.max_comparison_size {
            return Err(DiffError::SizeExceeded {
                size: input.len(),
                limit: self.config.max_comparison_size,
            });
        }
        Ok(())
    }
}
