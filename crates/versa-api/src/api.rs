//! JSON command/response façade.
//!
//! Requests have the shape `{"action": "...", "params": {...}}`. Every
//! response carries `"status"`: `"success"` with action-specific fields, or
//! `"error"` with a `message` and numeric `code`. This is the only place
//! internal errors are turned into wire errors; storage details are logged,
//! never returned.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use versa_core::{
    AutoVersioningPolicy, CreateVersion, RevisionHistory, RollbackManager, VersionError,
    VersionMerger, VersionStore,
};
use versa_diff::{diff_stats, format_diff, ContentFormat, LineMergeOptions, Resolution};

/// Default number of entries returned by listing actions.
const DEFAULT_LIMIT: usize = 50;

/// Default number of rollback candidates.
const DEFAULT_CANDIDATES: usize = 10;

/// Known request actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateVersion,
    GetVersions,
    GetVersionContent,
    CompareVersions,
    RestoreVersion,
    AutoSave,
    GetTimeline,
    SearchVersions,
    GetRollbackCandidates,
    PreviewRestore,
    MergeVersions,
    GetMergeConflicts,
    MergeStructured,
}

impl Action {
    pub const ALL: [Action; 13] = [
        Action::CreateVersion,
        Action::GetVersions,
        Action::GetVersionContent,
        Action::CompareVersions,
        Action::RestoreVersion,
        Action::AutoSave,
        Action::GetTimeline,
        Action::SearchVersions,
        Action::GetRollbackCandidates,
        Action::PreviewRestore,
        Action::MergeVersions,
        Action::GetMergeConflicts,
        Action::MergeStructured,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateVersion => "create_version",
            Action::GetVersions => "get_versions",
            Action::GetVersionContent => "get_version_content",
            Action::CompareVersions => "compare_versions",
            Action::RestoreVersion => "restore_version",
            Action::AutoSave => "auto_save",
            Action::GetTimeline => "get_timeline",
            Action::SearchVersions => "search_versions",
            Action::GetRollbackCandidates => "get_rollback_candidates",
            Action::PreviewRestore => "preview_restore",
            Action::MergeVersions => "merge_versions",
            Action::GetMergeConflicts => "get_merge_conflicts",
            Action::MergeStructured => "merge_structured",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ApiFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or(ApiFailure::InvalidAction)
    }
}

/// A request that could not be served.
#[derive(Debug, Error)]
pub enum ApiFailure {
    #[error("Invalid action")]
    InvalidAction,

    #[error("Missing required parameter: {0}")]
    MissingParam(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParam(&'static str),

    #[error("Version restore failed")]
    RestoreFailed,

    #[error(transparent)]
    Version(#[from] VersionError),
}

impl ApiFailure {
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidAction | Self::MissingParam(_) | Self::InvalidParam(_) => 400,
            Self::RestoreFailed => 500,
            Self::Version(e) => e.code(),
        }
    }

    /// Message safe to return to callers.
    pub fn public_message(&self) -> String {
        match self {
            Self::Version(e) => match e {
                VersionError::InvalidArgument(msg) => format!("Invalid argument: {msg}"),
                VersionError::NotFound(what) => format!("Not found: {what}"),
                VersionError::SizeExceeded { limit, .. } => {
                    format!("Content exceeds maximum comparison size of {limit} bytes")
                }
                VersionError::InvalidFormat(_) => "Invalid structured content".to_string(),
                VersionError::Storage(_) => "Internal storage error".to_string(),
            },
            other => other.to_string(),
        }
    }

    fn to_response(&self) -> Value {
        json!({
            "status": "error",
            "message": self.public_message(),
            "code": self.code(),
        })
    }
}

/// Typed access to a request's `params` object.
struct Params<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Params<'a> {
    fn new(request: &'a Value) -> Self {
        Self {
            map: request.get("params").and_then(Value::as_object),
        }
    }

    fn raw(&self, name: &str) -> Option<&'a Value> {
        self.map
            .and_then(|m| m.get(name))
            .filter(|v| !v.is_null())
    }

    /// An integer id, given as a JSON number or a numeric string.
    fn opt_id(&self, name: &'static str) -> Result<Option<i64>, ApiFailure> {
        match self.raw(name) {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or(ApiFailure::InvalidParam(name)),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ApiFailure::InvalidParam(name)),
            Some(_) => Err(ApiFailure::InvalidParam(name)),
        }
    }

    fn id(&self, name: &'static str) -> Result<i64, ApiFailure> {
        self.opt_id(name)?.ok_or(ApiFailure::MissingParam(name))
    }

    fn opt_str(&self, name: &'static str) -> Result<Option<&'a str>, ApiFailure> {
        match self.raw(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ApiFailure::InvalidParam(name)),
        }
    }

    fn str(&self, name: &'static str) -> Result<&'a str, ApiFailure> {
        self.opt_str(name)?.ok_or(ApiFailure::MissingParam(name))
    }

    fn opt_bool(&self, name: &'static str) -> Result<Option<bool>, ApiFailure> {
        match self.raw(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(ApiFailure::InvalidParam(name)),
        }
    }

    fn opt_limit(&self, name: &'static str) -> Result<Option<usize>, ApiFailure> {
        match self.opt_id(name)? {
            None => Ok(None),
            Some(n) if n > 0 => Ok(Some(n as usize)),
            Some(_) => Err(ApiFailure::InvalidParam(name)),
        }
    }

    /// Comparison format from `format`, or from the `is_html` /
    /// `is_structured` flags.
    fn format(&self) -> Result<ContentFormat, ApiFailure> {
        if let Some(name) = self.opt_str("format")? {
            return name.parse().map_err(|_| ApiFailure::InvalidParam("format"));
        }
        let is_html = self.opt_bool("is_html")?.unwrap_or(false);
        let is_structured = self.opt_bool("is_structured")?.unwrap_or(false);
        Ok(ContentFormat::from_flags(is_html, is_structured))
    }

    /// `{"path": "current" | "incoming"}`; absent means no resolutions.
    fn resolutions(&self) -> Result<BTreeMap<String, Resolution>, ApiFailure> {
        match self.raw("resolutions") {
            None => Ok(BTreeMap::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|_| ApiFailure::InvalidParam("resolutions")),
        }
    }

    fn merge_options(&self) -> Result<LineMergeOptions, ApiFailure> {
        let defaults = LineMergeOptions::default();
        Ok(LineMergeOptions {
            include_additions: self
                .opt_bool("include_additions")?
                .unwrap_or(defaults.include_additions),
            exclude_deletions: self
                .opt_bool("exclude_deletions")?
                .unwrap_or(defaults.exclude_deletions),
        })
    }
}

fn success(fields: Value) -> Value {
    let mut body = Map::new();
    body.insert("status".to_string(), Value::from("success"));
    if let Value::Object(fields) = fields {
        body.extend(fields);
    }
    Value::Object(body)
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, ApiFailure> {
    serde_json::to_value(value).map_err(|e| {
        error!(error = %e, "Failed to serialize response");
        ApiFailure::Version(VersionError::Storage(e.into()))
    })
}

/// Uniform command interface over the version services.
pub struct VersionControlApi {
    store: Arc<VersionStore>,
    policy: Arc<AutoVersioningPolicy>,
    rollback: Arc<RollbackManager>,
    history: Arc<RevisionHistory>,
    merger: Arc<VersionMerger>,
}

impl VersionControlApi {
    pub fn new(
        store: Arc<VersionStore>,
        policy: Arc<AutoVersioningPolicy>,
        rollback: Arc<RollbackManager>,
        history: Arc<RevisionHistory>,
        merger: Arc<VersionMerger>,
    ) -> Self {
        Self {
            store,
            policy,
            rollback,
            history,
            merger,
        }
    }

    /// Serve one request. Always returns a response object.
    pub async fn handle_request(&self, request: Value) -> Value {
        let action = request
            .get("action")
            .and_then(Value::as_str)
            .ok_or(ApiFailure::InvalidAction)
            .and_then(str::parse::<Action>);

        let action = match action {
            Ok(action) => action,
            Err(failure) => {
                warn!(action = ?request.get("action"), "Rejected request with unknown action");
                return failure.to_response();
            }
        };

        debug!(%action, "Handling request");
        match self.dispatch(action, &Params::new(&request)).await {
            Ok(response) => success(response),
            Err(failure) => {
                match &failure {
                    ApiFailure::Version(VersionError::Storage(e)) => {
                        error!(%action, error = %e, "Storage failure while handling request");
                    }
                    other => warn!(%action, error = %other, "Request failed"),
                }
                failure.to_response()
            }
        }
    }

    async fn dispatch(&self, action: Action, params: &Params<'_>) -> Result<Value, ApiFailure> {
        match action {
            Action::CreateVersion => {
                let content_id = params.id("content_id")?;
                let content = params.str("content")?;
                let user_id = params.id("user_id")?;
                let attrs = CreateVersion {
                    author_id: user_id,
                    change_summary: params.opt_str("change_summary")?.unwrap_or("").to_string(),
                    is_major: params.opt_bool("is_major")?.unwrap_or(false),
                    ..Default::default()
                };

                let version_id = self
                    .store
                    .create_version(content_id, content.as_bytes(), attrs)
                    .await?;
                info!(version_id, content_id, user_id, "Version created via API");
                Ok(json!({ "version_id": version_id }))
            }

            Action::GetVersions => {
                let content_id = params.id("content_id")?;
                let limit = params.opt_limit("limit")?.unwrap_or(DEFAULT_LIMIT);

                let versions = self.history.get_history_for_content(content_id, limit).await?;
                let total = self.history.get_version_count(content_id).await?;
                Ok(json!({ "versions": to_value(&versions)?, "total": total }))
            }

            Action::GetVersionContent => {
                let version_id = params.id("version_id")?;

                let metadata = self.store.get_version_metadata(version_id).await?;
                let content = self.store.get_version_text(version_id).await?;
                Ok(json!({
                    "version_id": version_id,
                    "content": content,
                    "metadata": to_value(&metadata)?,
                }))
            }

            Action::CompareVersions => {
                let from = params.id("version_id_a")?;
                let to = params.id("version_id_b")?;
                let format = params.format()?;

                let diff = self.history.compare_versions(from, to, format).await?;
                Ok(json!({
                    "format": format.as_str(),
                    "diff": to_value(&diff)?,
                    "stats": to_value(&diff_stats(&diff))?,
                    "summary": format_diff(&diff),
                }))
            }

            Action::RestoreVersion => {
                let version_id = params.id("version_id")?;
                let user_id = params.id("user_id")?;

                if !self.rollback.restore_version(version_id, user_id).await {
                    return Err(ApiFailure::RestoreFailed);
                }
                Ok(json!({ "version_id": version_id, "restored": true }))
            }

            Action::AutoSave => {
                let content_id = params.id("content_id")?;
                let content = params.str("content")?;
                let user_id = params.id("user_id")?;

                let created = self
                    .policy
                    .check_and_create_version(content_id, content, user_id)
                    .await?;
                Ok(json!({ "created": created.is_some(), "version_id": created }))
            }

            Action::GetTimeline => {
                let content_id = params.id("content_id")?;

                let timeline = self.history.get_version_timeline(content_id).await?;
                Ok(json!({ "timeline": to_value(&timeline)? }))
            }

            Action::SearchVersions => {
                let query = params.str("query")?;
                let content_id = params.opt_id("content_id")?;

                let versions = self.history.search_versions(query, content_id).await?;
                Ok(json!({ "versions": to_value(&versions)? }))
            }

            Action::GetRollbackCandidates => {
                let content_id = params.id("content_id")?;
                let limit = params.opt_limit("limit")?.unwrap_or(DEFAULT_CANDIDATES);

                let candidates = self
                    .rollback
                    .get_rollback_candidates(content_id, limit)
                    .await?;
                Ok(json!({ "candidates": to_value(&candidates)? }))
            }

            Action::PreviewRestore => {
                let version_id = params.id("version_id")?;
                let format = params.format()?;

                let diff = self.rollback.preview_restore(version_id, format).await?;
                Ok(json!({
                    "version_id": version_id,
                    "format": format.as_str(),
                    "diff": to_value(&diff)?,
                    "stats": to_value(&diff_stats(&diff))?,
                    "summary": format_diff(&diff),
                }))
            }

            Action::MergeVersions => {
                let base_id = params.id("base_version_id")?;
                let other_id = params.id("other_version_id")?;
                let user_id = params.id("user_id")?;
                let options = params.merge_options()?;

                let outcome = self
                    .merger
                    .merge_versions(base_id, other_id, user_id, options)
                    .await?;
                Ok(json!({
                    "version_id": outcome.version_id,
                    "conflicts": outcome.conflicts,
                }))
            }

            Action::GetMergeConflicts => {
                let base_id = params.id("base_version_id")?;
                let current_id = params.id("current_version_id")?;
                let incoming_id = params.id("incoming_version_id")?;

                let conflicts = self
                    .merger
                    .find_conflicts(base_id, current_id, incoming_id)
                    .await?;
                Ok(json!({ "conflicts": to_value(&conflicts)? }))
            }

            Action::MergeStructured => {
                let base_id = params.id("base_version_id")?;
                let current_id = params.id("current_version_id")?;
                let incoming_id = params.id("incoming_version_id")?;
                let user_id = params.id("user_id")?;
                let resolutions = params.resolutions()?;

                let outcome = self
                    .merger
                    .merge_structured(base_id, current_id, incoming_id, &resolutions, user_id)
                    .await?;
                Ok(json!({
                    "version_id": outcome.version_id,
                    "unresolved": outcome.unresolved,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!(matches!(
            "drop_tables".parse::<Action>(),
            Err(ApiFailure::InvalidAction)
        ));
    }

    #[test]
    fn params_name_missing_and_invalid_fields() {
        let request = json!({"params": {"version_id": "12", "user_id": null, "flag": 3}});
        let params = Params::new(&request);

        assert_eq!(params.id("version_id").unwrap(), 12);
        assert!(matches!(
            params.id("user_id"),
            Err(ApiFailure::MissingParam("user_id"))
        ));
        assert!(matches!(
            params.opt_bool("flag"),
            Err(ApiFailure::InvalidParam("flag"))
        ));
    }

    #[test]
    fn format_from_name_or_flags() {
        let request = json!({"params": {"format": "html"}});
        assert_eq!(Params::new(&request).format().unwrap(), ContentFormat::Html);

        let request = json!({"params": {"is_structured": true}});
        assert_eq!(
            Params::new(&request).format().unwrap(),
            ContentFormat::Structured
        );

        let request = json!({"params": {"format": "pdf"}});
        assert!(Params::new(&request).format().is_err());
    }

    #[test]
    fn merge_params_default_and_validate() {
        let request = json!({"params": {"exclude_deletions": true}});
        let options = Params::new(&request).merge_options().unwrap();
        assert!(options.include_additions);
        assert!(options.exclude_deletions);

        let request = json!({"params": {"resolutions": {"title": "incoming"}}});
        let resolutions = Params::new(&request).resolutions().unwrap();
        assert_eq!(resolutions["title"], Resolution::Incoming);

        let request = json!({"params": {"resolutions": {"title": "both"}}});
        assert!(matches!(
            Params::new(&request).resolutions(),
            Err(ApiFailure::InvalidParam("resolutions"))
        ));
    }

    #[test]
    fn storage_errors_are_not_echoed() {
        let failure = ApiFailure::Version(VersionError::Storage(
            versa_storage::StorageError::unavailable("db at 10.0.0.3 refused"),
        ));
        let response = failure.to_response();
        assert_eq!(response["code"], 500);
        assert_eq!(response["message"], "Internal storage error");
    }

    #[test]
    fn missing_param_message() {
        let response = ApiFailure::MissingParam("user_id").to_response();
        assert_eq!(response["status"], "error");
        assert_eq!(response["message"], "Missing required parameter: user_id");
        assert_eq!(response["code"], 400);
    }
}
