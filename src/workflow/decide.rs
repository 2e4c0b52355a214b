use chrono::Utc;
use sqlx::MySqlPool;

use crate::audit;
use crate::errors::TimeclockError;
use crate::ledger::fingerprint::chained_fingerprint;
use crate::model::adjustment::{Adjustment, AdjustmentStatus, Decision};
use crate::model::policy::WorkPolicy;
use crate::model::punch::PunchRecord;
use crate::notify;
use crate::utils::fingerprint_filter;
use crate::workflow::request::fetch_adjustment;

/// Decide a PENDING adjustment, at most once.
///
/// The in-memory transition check gives early feedback, but the authority
/// is the conditional UPDATE: whichever concurrent decider matches
/// `status = 'pending'` first wins, the loser sees zero affected rows and
/// gets a conflict. Approval materializes the corrected ledger row inside
/// the same transaction; the original punch is never touched.
pub async fn decide_adjustment(
    pool: &MySqlPool,
    approver: u64,
    adjustment_id: u64,
    decision: Decision,
    rejection_reason: Option<String>,
    policy: &WorkPolicy,
) -> Result<Adjustment, TimeclockError> {
    let adjustment = fetch_adjustment(pool, adjustment_id)
        .await?
        .ok_or(TimeclockError::NotFound("adjustment"))?;

    let current: AdjustmentStatus = adjustment
        .status()
        .map_err(|_| TimeclockError::Conflict)?;
    let next = current.decide(decision)?;

    let rejection_reason = match decision {
        Decision::Reject => {
            let reason = rejection_reason.as_deref().map(str::trim).unwrap_or("");
            if reason.is_empty() {
                return Err(TimeclockError::validation(vec![
                    "a rejection reason is required".into(),
                ]));
            }
            Some(reason.to_string())
        }
        Decision::Approve => None,
    };

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE adjustments
        SET status = ?, decided_by = ?, decided_at = ?, rejection_reason = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(next.to_string())
    .bind(approver)
    .bind(now)
    .bind(&rejection_reason)
    .bind(adjustment_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        // Someone else reached the terminal state first.
        return Err(TimeclockError::Conflict);
    }

    let mut materialized_fingerprint = None;
    if next == AdjustmentStatus::Approved {
        materialized_fingerprint =
            Some(materialize(&mut tx, &adjustment, adjustment_id).await?);
    }

    audit::record(
        &mut *tx,
        policy.compliance_mode,
        approver,
        "adjustment_decided",
        &next.to_string(),
        &format!(
            "adjustment {adjustment_id} for punch {} moved pending -> {next}",
            adjustment.punch_id
        ),
        serde_json::json!({
            "adjustment_id": adjustment_id,
            "punch_id": adjustment.punch_id,
            "before": "pending",
            "after": next.to_string(),
            "rejection_reason": rejection_reason,
        }),
    )
    .await?;

    tx.commit().await?;

    if let Some(fingerprint) = materialized_fingerprint {
        fingerprint_filter::insert(&fingerprint);
    }

    notify::send(
        pool,
        adjustment.employee_id,
        "adjustment_decided",
        &format!("your correction request {adjustment_id} was {next}"),
    )
    .await;

    fetch_adjustment(pool, adjustment_id)
        .await?
        .ok_or(TimeclockError::NotFound("adjustment"))
}

/// Insert the corrected ledger row: the original record with the proposed
/// fields overlaid and a fingerprint chained to the original's, so the
/// correction stays cryptographically traceable to its justification.
async fn materialize(
    tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
    adjustment: &Adjustment,
    adjustment_id: u64,
) -> Result<String, TimeclockError> {
    let original = sqlx::query_as::<_, PunchRecord>(
        r#"
        SELECT id, company_id, employee_id, kind, punched_at, latitude,
               longitude, device_id, device_info, photo_ref, badge_ref,
               fingerprint, origin_punch_id, adjustment_id, created_at
        FROM punch_records
        WHERE id = ?
        "#,
    )
    .bind(adjustment.punch_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(TimeclockError::NotFound("punch"))?;

    let already_superseded = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM punch_records WHERE origin_punch_id = ?",
    )
    .bind(original.id)
    .fetch_one(&mut **tx)
    .await?;
    if already_superseded > 0 {
        // A previously approved adjustment already corrected this punch.
        return Err(TimeclockError::Conflict);
    }

    let kind = adjustment
        .proposed_kind
        .clone()
        .unwrap_or_else(|| original.kind.clone());
    let punched_at = adjustment.proposed_timestamp.unwrap_or(original.punched_at);
    let fingerprint = chained_fingerprint(&original.fingerprint, adjustment_id);

    sqlx::query(
        r#"
        INSERT INTO punch_records
            (company_id, employee_id, kind, punched_at, latitude, longitude,
             device_id, device_info, photo_ref, badge_ref, fingerprint,
             origin_punch_id, adjustment_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(original.company_id)
    .bind(original.employee_id)
    .bind(&kind)
    .bind(punched_at)
    .bind(original.latitude)
    .bind(original.longitude)
    .bind(&original.device_id)
    .bind(&original.device_info)
    .bind(&original.photo_ref)
    .bind(&original.badge_ref)
    .bind(&fingerprint)
    .bind(original.id)
    .bind(adjustment_id)
    .execute(&mut **tx)
    .await?;

    Ok(fingerprint)
}
