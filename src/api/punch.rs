use crate::auth::context::ActorContext;
use crate::errors::TimeclockError;
use crate::ledger::{fingerprint, store};
use crate::model::policy::WorkPolicy;
use crate::model::punch::{PunchContext, PunchKind, PunchRecord};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct SubmitPunch {
    #[schema(example = "entry")]
    pub kind: PunchKind,
    #[schema(example = "2026-01-05T08:02:11Z", format = "date-time", value_type = String)]
    pub punched_at: DateTime<Utc>,
    #[schema(example = -23.5613, nullable = true)]
    pub latitude: Option<f64>,
    #[schema(example = -46.6565, nullable = true)]
    pub longitude: Option<f64>,
    #[schema(example = "TERM-07", nullable = true)]
    pub device_id: Option<String>,
    pub device_info: Option<String>,
    pub photo_ref: Option<String>,
    pub badge_ref: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PunchQuery {
    #[schema(example = 1000)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    /// Range start (inclusive)
    pub from: Option<NaiveDate>,
    #[schema(example = "2026-01-31", format = "date", value_type = Option<String>)]
    /// Range end (inclusive)
    pub to: Option<NaiveDate>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Instant(DateTime<Utc>),
}

#[derive(Serialize, ToSchema)]
pub struct PunchListResponse {
    pub data: Vec<PunchRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Submit punch
========================= */
/// Swagger doc for submit_punch endpoint
#[utoipa::path(
    post,
    path = "/api/v1/punch",
    request_body(
        content = SubmitPunch,
        description = "Clock event payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Punch appended to the ledger", body = PunchRecord),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Duplicate punch", body = Object, example = json!({
            "message": "punch already registered, wait 3 minute(s) before trying again"
        }))
    ),
    tag = "Punch"
)]
pub async fn submit_punch(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SubmitPunch>,
) -> actix_web::Result<impl Responder> {
    let employee_id: u64 = actor
        .employee_id
        .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?;

    let policy = WorkPolicy::load(&pool, actor.company_id).await?;

    let ctx = PunchContext {
        latitude: payload.latitude,
        longitude: payload.longitude,
        device_id: payload.device_id.clone(),
        device_info: payload.device_info.clone(),
        photo_ref: payload.photo_ref.clone(),
        badge_ref: payload.badge_ref.clone(),
    };

    let record = store::submit_punch(
        &pool,
        actor.company_id,
        employee_id,
        payload.kind,
        payload.punched_at,
        &ctx,
        &policy,
    )
    .await?;

    tracing::info!(punch_id = record.id, employee_id, "punch accepted");
    Ok(HttpResponse::Created().json(record))
}

/* =========================
List punches
========================= */
/// Swagger doc for punch_list endpoint
#[utoipa::path(
    get,
    path = "/api/v1/punch",
    params(PunchQuery),
    responses(
        (status = 200, description = "Paginated punch list", body = PunchListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Punch"
)]
pub async fn punch_list(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    query: web::Query<PunchQuery>,
) -> actix_web::Result<impl Responder> {
    // Employees only see their own ledger slice.
    let employee_filter = if actor.is_employee() {
        let own = actor
            .employee_id
            .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?;
        if query.employee_id.is_some_and(|requested| requested != own) {
            return Err(actix_web::error::ErrorForbidden("Employees may only list their own punches"));
        }
        Some(own)
    } else {
        query.employee_id
    };

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE company_id = ?");
    let mut args: Vec<FilterValue> = vec![FilterValue::U64(actor.company_id)];

    if let Some(emp_id) = employee_filter {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(from) = query.from {
        where_sql.push_str(" AND punched_at >= ?");
        args.push(FilterValue::Instant(from.and_time(NaiveTime::MIN).and_utc()));
    }

    if let Some(to) = query.to {
        where_sql.push_str(" AND punched_at <= ?");
        args.push(FilterValue::Instant(
            to.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap())
                .and_utc(),
        ));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM punch_records{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Instant(t) => count_q.bind(*t),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error=%e, "Failed to count punches");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT id, company_id, employee_id, kind, punched_at, latitude,
               longitude, device_id, device_info, photo_ref, badge_ref,
               fingerprint, origin_punch_id, adjustment_id, created_at
        FROM punch_records
        {}
        ORDER BY punched_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, PunchRecord>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Instant(t) => data_q.bind(t),
        };
    }

    let punches = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error=%e, "Failed to fetch punch list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(PunchListResponse {
        data: punches,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/* =========================
Verify punch integrity
========================= */
/// Swagger doc for verify_punch endpoint
#[utoipa::path(
    get,
    path = "/api/v1/punch/{punch_id}/verify",
    params(
        ("punch_id" = u64, Path, description = "ID of the ledger entry to verify")
    ),
    responses(
        (status = 200, description = "Stored fingerprint matches record content", body = Object, example = json!({
            "message": "integrity verified",
            "punch_id": 4021
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Punch not found"),
        (status = 500, description = "Integrity mismatch")
    ),
    tag = "Punch"
)]
pub async fn verify_punch(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    actor.require_manager_or_admin()?;

    let punch_id = path.into_inner();
    let record = store::fetch_punch(&pool, punch_id)
        .await?
        .ok_or(TimeclockError::NotFound("punch"))?;

    // Adjusted rows verify against the fingerprint chain of their origin.
    let origin_fingerprint = match record.origin_punch_id {
        Some(origin_id) => store::fetch_punch(&pool, origin_id)
            .await?
            .map(|origin| origin.fingerprint),
        None => None,
    };

    fingerprint::verify_record(&record, origin_fingerprint.as_deref())?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "integrity verified",
        "punch_id": punch_id
    })))
}
