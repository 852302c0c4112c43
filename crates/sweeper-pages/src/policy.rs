//! Retention decisions for a single project's deployment history.
//!
//! Everything here is synchronous and free of I/O: the worker hands over the
//! raw deployment listing and gets back the exact, ordered set of deployments
//! to remove.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub const SUCCESS_STATUS: &str = "success";

/// Object fields that may carry the deployment array, checked in order.
const WRAPPED_LIST_FIELDS: [&str; 2] = ["result", "deployments"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Deployment {
    pub id: String,

    #[serde(default)]
    pub short_id: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub latest_stage: Option<DeploymentStage>,

    #[serde(default)]
    pub created_on: Option<String>,

    #[serde(default)]
    pub environment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentStage {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub status: Option<String>,
}

impl Deployment {
    /// Top-level status wins; the latest stage's status is the fallback.
    pub fn resolved_status(&self) -> Option<&str> {
        self.status
            .as_deref()
            .or_else(|| self.latest_stage.as_ref()?.status.as_deref())
    }

    pub fn is_successful(&self) -> bool {
        self.resolved_status() == Some(SUCCESS_STATUS)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_on.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    pub fn display_id(&self) -> &str {
        match self.short_id.as_deref() {
            Some(short) if !short.is_empty() => short,
            _ => self.id.get(..8).unwrap_or(&self.id),
        }
    }
}

/// Non-fatal problems found while reading a deployment listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataShapeWarning {
    /// The listing was neither an array nor an object wrapping one.
    UnrecognizedShape { found: String },
    /// Entries that could not be read as deployments were skipped.
    MalformedEntries { count: usize },
    /// A successful deployment had no usable creation time and was kept.
    UnparseableTimestamp { deployment_id: String },
}

impl std::fmt::Display for DataShapeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataShapeWarning::UnrecognizedShape { found } => {
                write!(f, "unrecognized deployment list shape ({})", found)
            }
            DataShapeWarning::MalformedEntries { count } => {
                write!(f, "skipped {} malformed deployment entries", count)
            }
            DataShapeWarning::UnparseableTimestamp { deployment_id } => {
                write!(
                    f,
                    "deployment {} has no parseable creation time",
                    deployment_id
                )
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub deployments: Vec<Deployment>,
    pub warnings: Vec<DataShapeWarning>,
}

pub fn normalize_deployments(raw: &Value) -> Normalized {
    let entries = match raw {
        Value::Array(items) => items,
        Value::Object(map) => {
            match WRAPPED_LIST_FIELDS
                .iter()
                .find_map(|field| map.get(*field)?.as_array())
            {
                Some(items) => items,
                None => return unrecognized("object without a deployment list"),
            }
        }
        Value::Null => return unrecognized("null"),
        Value::Bool(_) => return unrecognized("boolean"),
        Value::Number(_) => return unrecognized("number"),
        Value::String(_) => return unrecognized("string"),
    };

    let mut normalized = Normalized::default();
    let mut malformed = 0;

    for entry in entries {
        match Deployment::deserialize(entry) {
            Ok(deployment) => normalized.deployments.push(deployment),
            Err(_) => malformed += 1,
        }
    }

    if malformed > 0 {
        normalized
            .warnings
            .push(DataShapeWarning::MalformedEntries { count: malformed });
    }

    normalized
}

fn unrecognized(found: &str) -> Normalized {
    Normalized {
        deployments: Vec::new(),
        warnings: vec![DataShapeWarning::UnrecognizedShape {
            found: found.to_string(),
        }],
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Deployments found in the listing, whatever their status.
    pub considered: usize,
    /// Successful deployments eligible for retention ordering.
    pub candidates: usize,
    /// Newest first; everything after the kept prefix.
    pub to_delete: Vec<Deployment>,
    pub warnings: Vec<DataShapeWarning>,
}

/// Keeps the `keep_count` newest successful deployments and returns the rest,
/// newest first. Deployments sharing a timestamp keep their listing order.
pub fn select_for_deletion(
    deployments: Vec<Deployment>,
    keep_count: usize,
) -> (usize, Vec<Deployment>, Vec<DataShapeWarning>) {
    let mut warnings = Vec::new();

    let mut candidates: Vec<(DateTime<Utc>, Deployment)> = deployments
        .into_iter()
        .filter(Deployment::is_successful)
        .filter_map(|deployment| match deployment.created_at() {
            Some(ts) => Some((ts, deployment)),
            None => {
                warnings.push(DataShapeWarning::UnparseableTimestamp {
                    deployment_id: deployment.id.clone(),
                });
                None
            }
        })
        .collect();

    // sort_by is stable
    candidates.sort_by(|(a, _), (b, _)| b.cmp(a));

    let candidate_count = candidates.len();
    let to_delete = candidates
        .into_iter()
        .skip(keep_count)
        .map(|(_, deployment)| deployment)
        .collect();

    (candidate_count, to_delete, warnings)
}

pub fn compute_delete_set(raw: &Value, keep_count: usize) -> RetentionPlan {
    let Normalized {
        deployments,
        mut warnings,
    } = normalize_deployments(raw);

    let considered = deployments.len();
    let (candidates, to_delete, selection_warnings) = select_for_deletion(deployments, keep_count);
    warnings.extend(selection_warnings);

    RetentionPlan {
        considered,
        candidates,
        to_delete,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment(id: &str, status: &str, created_on: &str) -> Value {
        json!({
            "id": id,
            "short_id": &id[..id.len().min(4)],
            "created_on": created_on,
            "latest_stage": { "name": "deploy", "status": status },
        })
    }

    fn ids(plan: &RetentionPlan) -> Vec<&str> {
        plan.to_delete.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_keeps_latest_and_deletes_older_in_order() {
        let raw = json!([
            deployment("t3", "success", "2024-01-03T00:00:00Z"),
            deployment("t1", "success", "2024-01-05T00:00:00Z"),
            deployment("t4", "success", "2024-01-01T00:00:00Z"),
            deployment("t2", "success", "2024-01-04T00:00:00Z"),
        ]);

        let plan = compute_delete_set(&raw, 2);

        assert_eq!(ids(&plan), vec!["t3", "t4"]);
        assert_eq!(plan.considered, 4);
        assert_eq!(plan.candidates, 4);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_never_deletes_unsuccessful_deployments() {
        let raw = json!([
            deployment("new", "success", "2024-02-01T00:00:00Z"),
            deployment("failed-old", "failure", "2020-01-01T00:00:00Z"),
            deployment("active-old", "active", "2020-01-02T00:00:00Z"),
            deployment("idle-old", "idle", "2020-01-03T00:00:00Z"),
            deployment("old", "success", "2021-01-01T00:00:00Z"),
        ]);

        let plan = compute_delete_set(&raw, 0);

        assert_eq!(ids(&plan), vec!["new", "old"]);
        assert!(plan.to_delete.iter().all(Deployment::is_successful));
        assert_eq!(plan.considered, 5);
        assert_eq!(plan.candidates, 2);
    }

    #[test]
    fn test_delete_set_size_is_successes_minus_keep() {
        let raw = Value::Array(
            (0..7)
                .map(|i| {
                    deployment(
                        &format!("dep{i}"),
                        "success",
                        &format!("2024-03-{:02}T12:00:00Z", i + 1),
                    )
                })
                .collect(),
        );

        for keep in 0..10 {
            let plan = compute_delete_set(&raw, keep);
            assert_eq!(plan.to_delete.len(), 7usize.saturating_sub(keep), "keep={keep}");
        }
    }

    #[test]
    fn test_keep_count_at_or_above_candidates_deletes_nothing() {
        let raw = json!([
            deployment("a", "success", "2024-01-01T00:00:00Z"),
            deployment("b", "success", "2024-01-02T00:00:00Z"),
        ]);

        assert!(compute_delete_set(&raw, 2).to_delete.is_empty());
        assert!(compute_delete_set(&raw, 5).to_delete.is_empty());
    }

    #[test]
    fn test_top_level_status_takes_precedence_over_stage() {
        let raw = json!([
            {
                "id": "top-failed",
                "status": "failure",
                "created_on": "2020-01-01T00:00:00Z",
                "latest_stage": { "status": "success" },
            },
            {
                "id": "top-success",
                "status": "success",
                "created_on": "2020-01-02T00:00:00Z",
                "latest_stage": { "status": "failure" },
            },
        ]);

        let plan = compute_delete_set(&raw, 0);
        assert_eq!(ids(&plan), vec!["top-success"]);
    }

    #[test]
    fn test_missing_status_is_not_a_candidate() {
        let raw = json!([
            { "id": "no-status", "created_on": "2020-01-01T00:00:00Z" },
            { "id": "empty-stage", "created_on": "2020-01-01T00:00:00Z", "latest_stage": {} },
        ]);

        let plan = compute_delete_set(&raw, 0);
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.considered, 2);
        assert_eq!(plan.candidates, 0);
    }

    #[test]
    fn test_equal_timestamps_keep_listing_order() {
        let raw = json!([
            deployment("first", "success", "2024-01-01T00:00:00Z"),
            deployment("second", "success", "2024-01-01T00:00:00Z"),
            deployment("third", "success", "2024-01-01T00:00:00Z"),
            deployment("newest", "success", "2024-01-02T00:00:00Z"),
        ]);

        let plan = compute_delete_set(&raw, 2);
        assert_eq!(ids(&plan), vec!["second", "third"]);
    }

    #[test]
    fn test_mixed_offsets_compare_as_instants() {
        let raw = json!([
            // 2024-01-01T10:00Z
            deployment("east", "success", "2024-01-01T12:00:00+02:00"),
            // 2024-01-01T11:00Z
            deployment("utc", "success", "2024-01-01T11:00:00.500Z"),
        ]);

        let plan = compute_delete_set(&raw, 1);
        assert_eq!(ids(&plan), vec!["east"]);
    }

    #[test]
    fn test_is_deterministic() {
        let raw = json!([
            deployment("a", "success", "2024-01-01T00:00:00Z"),
            deployment("b", "success", "2024-01-01T00:00:00Z"),
            deployment("c", "success", "2023-06-01T00:00:00Z"),
            deployment("d", "failure", "2022-01-01T00:00:00Z"),
        ]);

        assert_eq!(compute_delete_set(&raw, 1), compute_delete_set(&raw, 1));
    }

    #[test]
    fn test_wrapped_result_shape() {
        let raw = json!({
            "success": true,
            "errors": [],
            "result": [
                deployment("a", "success", "2024-01-02T00:00:00Z"),
                deployment("b", "success", "2024-01-01T00:00:00Z"),
            ],
        });

        let plan = compute_delete_set(&raw, 1);
        assert_eq!(ids(&plan), vec!["b"]);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_wrapped_deployments_shape() {
        let raw = json!({
            "deployments": [deployment("a", "success", "2024-01-02T00:00:00Z")],
        });

        let normalized = normalize_deployments(&raw);
        assert_eq!(normalized.deployments.len(), 1);
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn test_unrecognized_shape_warns_and_yields_nothing() {
        for raw in [
            json!({ "result": { "not": "a list" } }),
            json!("deployments"),
            Value::Null,
            json!(42),
        ] {
            let plan = compute_delete_set(&raw, 0);
            assert!(plan.to_delete.is_empty());
            assert_eq!(plan.considered, 0);
            assert!(matches!(
                plan.warnings.as_slice(),
                [DataShapeWarning::UnrecognizedShape { .. }]
            ));
        }
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let raw = json!([
            deployment("good", "success", "2020-01-01T00:00:00Z"),
            { "no_id": true },
            "garbage",
        ]);

        let plan = compute_delete_set(&raw, 0);
        assert_eq!(ids(&plan), vec!["good"]);
        assert_eq!(plan.considered, 1);
        assert_eq!(
            plan.warnings,
            vec![DataShapeWarning::MalformedEntries { count: 2 }]
        );
    }

    #[test]
    fn test_unparseable_timestamp_is_never_deleted() {
        let raw = json!([
            deployment("bad-ts", "success", "yesterday"),
            { "id": "no-ts", "status": "success" },
            deployment("ok", "success", "2020-01-01T00:00:00Z"),
        ]);

        let plan = compute_delete_set(&raw, 0);
        assert_eq!(ids(&plan), vec!["ok"]);
        assert_eq!(plan.candidates, 1);
        assert_eq!(plan.warnings.len(), 2);
    }

    #[test]
    fn test_display_id_falls_back_to_id_prefix() {
        let with_short: Deployment = serde_json::from_value(json!({
            "id": "0123456789abcdef",
            "short_id": "01234567",
        }))
        .unwrap();
        assert_eq!(with_short.display_id(), "01234567");

        let without_short: Deployment =
            serde_json::from_value(json!({ "id": "fedcba9876543210" })).unwrap();
        assert_eq!(without_short.display_id(), "fedcba98");

        let tiny: Deployment = serde_json::from_value(json!({ "id": "abc" })).unwrap();
        assert_eq!(tiny.display_id(), "abc");
    }
}
