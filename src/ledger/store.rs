use chrono::{DateTime, Duration, Utc};
use sqlx::MySqlPool;
use tracing::warn;

use crate::errors::TimeclockError;
use crate::ledger::fingerprint::punch_fingerprint;
use crate::model::policy::WorkPolicy;
use crate::model::punch::{PunchContext, PunchKind, PunchRecord};
use crate::utils::{fingerprint_filter, punch_cache};

const PUNCH_COLUMNS: &str = "id, company_id, employee_id, kind, punched_at, latitude, longitude, \
     device_id, device_info, photo_ref, badge_ref, fingerprint, \
     origin_punch_id, adjustment_id, created_at";

/// Tolerated client clock skew ahead of the server.
const MAX_FUTURE_SKEW_MINUTES: i64 = 10;

/// Guarded append to the punch ledger.
///
/// Rejects the submission when an identical fingerprint already exists, or
/// when any punch for the same employee sits inside the cool-down window
/// regardless of fingerprint. The in-process filter and cache only shortcut
/// the happy path; the database stays the decision point, and the UNIQUE
/// fingerprint index resolves same-employee insert races.
pub async fn submit_punch(
    pool: &MySqlPool,
    company_id: u64,
    employee_id: u64,
    kind: PunchKind,
    punched_at: DateTime<Utc>,
    ctx: &PunchContext,
    policy: &WorkPolicy,
) -> Result<PunchRecord, TimeclockError> {
    if punched_at > Utc::now() + Duration::minutes(MAX_FUTURE_SKEW_MINUTES) {
        return Err(TimeclockError::validation(vec![
            "punch timestamp lies in the future".into(),
        ]));
    }

    let kind_text = kind.to_string();
    let fingerprint = punch_fingerprint(company_id, employee_id, &kind_text, &punched_at, ctx);

    // Cool-down fast path from the in-process cache, then the durable check.
    if let Some(last) = punch_cache::last_punch(employee_id).await {
        reject_within_cooldown(last, punched_at, policy.cooldown_minutes)?;
    }
    if let Some(last) =
        latest_punch_within(pool, employee_id, punched_at, policy.cooldown_minutes).await?
    {
        reject_within_cooldown(last, punched_at, policy.cooldown_minutes)?;
    }

    // Filter says "maybe seen" => confirm against the ledger.
    if fingerprint_filter::might_exist(&fingerprint)
        && fingerprint_exists(pool, &fingerprint).await?
    {
        return Err(TimeclockError::DuplicateRecord {
            wait_minutes: policy.cooldown_minutes,
        });
    }

    let result = sqlx::query(
        r#"
        INSERT INTO punch_records
            (company_id, employee_id, kind, punched_at, latitude, longitude,
             device_id, device_info, photo_ref, badge_ref, fingerprint)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(company_id)
    .bind(employee_id)
    .bind(&kind_text)
    .bind(punched_at)
    .bind(ctx.latitude)
    .bind(ctx.longitude)
    .bind(&ctx.device_id)
    .bind(&ctx.device_info)
    .bind(&ctx.photo_ref)
    .bind(&ctx.badge_ref)
    .bind(&fingerprint)
    .execute(pool)
    .await;

    let inserted = match result {
        Ok(r) => r,
        Err(e) => {
            // Duplicate fingerprint lost the insert race.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Err(TimeclockError::DuplicateRecord {
                        wait_minutes: policy.cooldown_minutes,
                    });
                }
            }
            return Err(e.into());
        }
    };

    fingerprint_filter::insert(&fingerprint);
    punch_cache::mark_punch(employee_id, punched_at).await;

    let id = inserted.last_insert_id();
    fetch_punch(pool, id)
        .await?
        .ok_or(TimeclockError::NotFound("punch"))
}

fn reject_within_cooldown(
    last: DateTime<Utc>,
    candidate: DateTime<Utc>,
    cooldown_minutes: i64,
) -> Result<(), TimeclockError> {
    let elapsed = (candidate - last).num_minutes();
    if elapsed.abs() < cooldown_minutes {
        let wait_minutes = (cooldown_minutes - elapsed.abs()).max(1);
        return Err(TimeclockError::DuplicateRecord { wait_minutes });
    }
    Ok(())
}

async fn latest_punch_within(
    pool: &MySqlPool,
    employee_id: u64,
    candidate: DateTime<Utc>,
    cooldown_minutes: i64,
) -> Result<Option<DateTime<Utc>>, TimeclockError> {
    let window_start = candidate - Duration::minutes(cooldown_minutes);
    let window_end = candidate + Duration::minutes(cooldown_minutes);
    let last = sqlx::query_scalar::<_, DateTime<Utc>>(
        r#"
        SELECT punched_at FROM punch_records
        WHERE employee_id = ? AND punched_at BETWEEN ? AND ?
        ORDER BY punched_at DESC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .bind(window_start)
    .bind(window_end)
    .fetch_optional(pool)
    .await?;
    Ok(last)
}

pub async fn fingerprint_exists(
    pool: &MySqlPool,
    fingerprint: &str,
) -> Result<bool, TimeclockError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM punch_records WHERE fingerprint = ?",
    )
    .bind(fingerprint)
    .fetch_one(pool)
    .await?;
    if count > 1 {
        warn!(fingerprint, count, "fingerprint stored more than once");
    }
    Ok(count > 0)
}

pub async fn fetch_punch(
    pool: &MySqlPool,
    id: u64,
) -> Result<Option<PunchRecord>, TimeclockError> {
    let sql = format!("SELECT {PUNCH_COLUMNS} FROM punch_records WHERE id = ?");
    let record = sqlx::query_as::<_, PunchRecord>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(record)
}

/// The ledger view reports and exports are built from: rows materialized by
/// approved adjustments plus every original not superseded by one. Computed
/// at read time so no original row is ever touched.
pub async fn effective_punches(
    pool: &MySqlPool,
    company_id: u64,
    employee_id: Option<u64>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<PunchRecord>, TimeclockError> {
    let mut sql = format!(
        r#"
        SELECT {PUNCH_COLUMNS} FROM punch_records p
        WHERE p.company_id = ?
          AND p.punched_at BETWEEN ? AND ?
          AND NOT EXISTS (
              SELECT 1 FROM punch_records m WHERE m.origin_punch_id = p.id
          )
        "#
    );
    if employee_id.is_some() {
        sql.push_str(" AND p.employee_id = ?");
    }
    sql.push_str(" ORDER BY p.punched_at ASC, p.id ASC");

    let mut query = sqlx::query_as::<_, PunchRecord>(&sql)
        .bind(company_id)
        .bind(from)
        .bind(to);
    if let Some(employee_id) = employee_id {
        query = query.bind(employee_id);
    }

    Ok(query.fetch_all(pool).await?)
}
