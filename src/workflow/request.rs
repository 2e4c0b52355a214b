use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::audit;
use crate::errors::TimeclockError;
use crate::model::adjustment::{Adjustment, AdjustmentReason, FieldChange};
use crate::model::policy::WorkPolicy;
use crate::model::punch::{PunchKind, PunchRecord};

/// A correction proposal as submitted by the requester. Only the two
/// business fields of a punch are correctable; capture context (device,
/// geolocation, badge) is evidence, not history.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AdjustmentDraft {
    #[schema(example = 4021)]
    pub punch_id: u64,
    #[schema(example = "exit", nullable = true)]
    pub proposed_kind: Option<PunchKind>,
    #[schema(example = "2026-01-05T18:02:00Z", format = "date-time", value_type = Option<String>)]
    pub proposed_timestamp: Option<DateTime<Utc>>,
    /// Must be one of the allowed reason categories.
    #[schema(example = "forgot-to-register")]
    pub reason: String,
    #[schema(example = "Forgot to clock the evening exit, left at 18:02 after the stock count.")]
    pub description: String,
    pub evidence_ref: Option<String>,
}

/// Validate a draft against the original record and capture the field-level
/// diff. Reports every violated rule, not just the first. Pure so the rules
/// are testable without storage.
pub fn validate_draft(
    draft: &AdjustmentDraft,
    original: Option<&PunchRecord>,
    policy: &WorkPolicy,
    now: DateTime<Utc>,
) -> Result<Vec<FieldChange>, TimeclockError> {
    if let Some(original) = original {
        if now - original.punched_at > Duration::days(policy.max_adjustment_days) {
            return Err(TimeclockError::AdjustmentWindowExpired {
                max_days: policy.max_adjustment_days,
            });
        }
    }

    let mut violations = Vec::new();

    if original.is_none() {
        violations.push("original punch record not found".to_string());
    }
    if draft.reason.parse::<AdjustmentReason>().is_err() {
        violations.push(format!("reason {:?} is not in the allowed set", draft.reason));
    }
    if (draft.description.trim().chars().count() as u32) < policy.min_description_len {
        violations.push(format!(
            "description must be at least {} characters",
            policy.min_description_len
        ));
    }
    if policy.require_evidence
        && draft.evidence_ref.as_deref().map(str::trim).unwrap_or("").is_empty()
    {
        violations.push("company policy requires an evidence reference".to_string());
    }

    let mut changes = Vec::new();
    if let Some(original) = original {
        if let Some(kind) = draft.proposed_kind {
            if kind.to_string() != original.kind {
                changes.push(FieldChange {
                    field: "kind".into(),
                    old: original.kind.clone(),
                    new: kind.to_string(),
                });
            }
        }
        if let Some(timestamp) = draft.proposed_timestamp {
            if timestamp != original.punched_at {
                changes.push(FieldChange {
                    field: "punched_at".into(),
                    old: original
                        .punched_at
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                    new: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                });
            }
        }
        if changes.is_empty() {
            violations.push("no proposed field differs from the original record".to_string());
        }
    }

    if !violations.is_empty() {
        return Err(TimeclockError::validation(violations));
    }
    Ok(changes)
}

/// Persist a validated correction proposal as PENDING and audit the
/// transition into the workflow.
pub async fn request_adjustment(
    pool: &MySqlPool,
    requested_by: u64,
    draft: &AdjustmentDraft,
    policy: &WorkPolicy,
) -> Result<Adjustment, TimeclockError> {
    let now = Utc::now();
    let original = crate::ledger::store::fetch_punch(pool, draft.punch_id).await?;
    let changes = validate_draft(draft, original.as_ref(), policy, now)?;
    let original = original.expect("validated draft always has an original");

    let diff = serde_json::to_string(&changes).expect("field diff serializes");
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO adjustments
            (punch_id, company_id, employee_id, proposed_kind,
             proposed_timestamp, reason, description, evidence_ref, diff,
             status, requested_by, requested_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(draft.punch_id)
    .bind(original.company_id)
    .bind(original.employee_id)
    .bind(draft.proposed_kind.map(|k| k.to_string()))
    .bind(draft.proposed_timestamp)
    .bind(&draft.reason)
    .bind(&draft.description)
    .bind(&draft.evidence_ref)
    .bind(&diff)
    .bind(requested_by)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    let adjustment_id = inserted.last_insert_id();

    audit::record(
        &mut *tx,
        policy.compliance_mode,
        requested_by,
        "adjustment_requested",
        "pending",
        &format!("adjustment {adjustment_id} requested for punch {}", draft.punch_id),
        serde_json::json!({
            "adjustment_id": adjustment_id,
            "punch_id": draft.punch_id,
            "diff": changes,
        }),
    )
    .await?;

    tx.commit().await?;

    fetch_adjustment(pool, adjustment_id)
        .await?
        .ok_or(TimeclockError::NotFound("adjustment"))
}

pub async fn fetch_adjustment(
    pool: &MySqlPool,
    id: u64,
) -> Result<Option<Adjustment>, TimeclockError> {
    let adjustment = sqlx::query_as::<_, Adjustment>(
        r#"
        SELECT id, punch_id, company_id, employee_id, proposed_kind,
               proposed_timestamp, reason, description, evidence_ref, diff,
               status, requested_by, requested_at, decided_by, decided_at,
               rejection_reason
        FROM adjustments
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(adjustment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn original(punched_at: DateTime<Utc>) -> PunchRecord {
        PunchRecord {
            id: 4021,
            company_id: 1,
            employee_id: 1000,
            kind: "entry".into(),
            punched_at,
            latitude: None,
            longitude: None,
            device_id: None,
            device_info: None,
            photo_ref: None,
            badge_ref: None,
            fingerprint: "aa".repeat(32),
            origin_punch_id: None,
            adjustment_id: None,
            created_at: None,
        }
    }

    fn draft() -> AdjustmentDraft {
        AdjustmentDraft {
            punch_id: 4021,
            proposed_kind: None,
            proposed_timestamp: Some(Utc.with_ymd_and_hms(2026, 1, 5, 8, 30, 0).unwrap()),
            reason: "forgot-to-register".into(),
            description: "Clocked in late because the terminal at gate B was offline.".into(),
            evidence_ref: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 8, 12, 0, 0).unwrap()
    }

    #[test]
    fn valid_draft_yields_the_field_diff() {
        let punched = Utc.with_ymd_and_hms(2026, 1, 5, 8, 2, 0).unwrap();
        let changes =
            validate_draft(&draft(), Some(&original(punched)), &WorkPolicy::default(), now())
                .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "punched_at");
        assert_eq!(changes[0].old, "2026-01-05T08:02:00Z");
        assert_eq!(changes[0].new, "2026-01-05T08:30:00Z");
    }

    #[test]
    fn every_violation_is_reported_at_once() {
        let punched = Utc.with_ymd_and_hms(2026, 1, 5, 8, 2, 0).unwrap();
        let mut policy = WorkPolicy::default();
        policy.require_evidence = true;

        let mut bad = draft();
        bad.reason = "vacation".into();
        bad.description = "too short".into();
        bad.proposed_timestamp = Some(punched); // identical => no change

        let err = validate_draft(&bad, Some(&original(punched)), &policy, now());
        match err {
            Err(TimeclockError::Validation { violations }) => {
                assert_eq!(violations.len(), 4);
                assert!(violations.iter().any(|v| v.contains("allowed set")));
                assert!(violations.iter().any(|v| v.contains("at least")));
                assert!(violations.iter().any(|v| v.contains("evidence")));
                assert!(violations.iter().any(|v| v.contains("no proposed field")));
            }
            other => panic!("expected a validation failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_original_is_a_violation() {
        let err = validate_draft(&draft(), None, &WorkPolicy::default(), now());
        match err {
            Err(TimeclockError::Validation { violations }) => {
                assert!(violations.iter().any(|v| v.contains("not found")));
            }
            other => panic!("expected a validation failure, got {other:?}"),
        }
    }

    #[test]
    fn window_boundary_is_inclusive_at_max_days() {
        let policy = WorkPolicy::default();
        let punched = now() - Duration::days(policy.max_adjustment_days);
        assert!(
            validate_draft(&draft(), Some(&original(punched)), &policy, now()).is_ok()
        );

        let punched = now() - Duration::days(policy.max_adjustment_days + 1);
        assert!(matches!(
            validate_draft(&draft(), Some(&original(punched)), &policy, now()),
            Err(TimeclockError::AdjustmentWindowExpired { max_days: 7 })
        ));
    }

    #[test]
    fn proposing_the_same_kind_is_not_a_change() {
        let punched = Utc.with_ymd_and_hms(2026, 1, 5, 8, 2, 0).unwrap();
        let mut same = draft();
        same.proposed_kind = Some(PunchKind::Entry);
        same.proposed_timestamp = None;
        assert!(matches!(
            validate_draft(&same, Some(&original(punched)), &WorkPolicy::default(), now()),
            Err(TimeclockError::Validation { .. })
        ));
    }
}
