use crate::auth::context::ActorContext;
use crate::errors::TimeclockError;
use crate::ledger::store;
use crate::model::adjustment::{Adjustment, AdjustmentStatus, Decision};
use crate::model::policy::WorkPolicy;
use crate::workflow::{decide, request};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct RejectBody {
    #[schema(example = "Gate camera shows the badge was used at 17:02, not 18:02.")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AdjustmentFilter {
    #[schema(example = 1000)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by adjustment status
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[derive(Serialize, ToSchema)]
pub struct AdjustmentListResponse {
    pub data: Vec<Adjustment>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Request adjustment
========================= */
/// Swagger doc for create_adjustment endpoint
#[utoipa::path(
    post,
    path = "/api/v1/adjustment",
    request_body(
        content = request::AdjustmentDraft,
        description = "Correction proposal payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Adjustment recorded as pending", body = Adjustment),
        (status = 400, description = "Validation failed or window expired"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Adjustment"
)]
pub async fn create_adjustment(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    payload: web::Json<request::AdjustmentDraft>,
) -> actix_web::Result<impl Responder> {
    // Employees may only correct their own punches; managers file on
    // behalf of anyone in the company.
    if actor.is_employee() {
        let own = actor
            .employee_id
            .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?;
        if let Some(original) = store::fetch_punch(&pool, payload.punch_id).await? {
            if original.employee_id != own {
                return Err(actix_web::error::ErrorForbidden(
                    "Employees may only correct their own punches",
                ));
            }
        }
    }

    let policy = WorkPolicy::load(&pool, actor.company_id).await?;
    let adjustment = request::request_adjustment(&pool, actor.user_id, &payload, &policy).await?;

    tracing::info!(
        adjustment_id = adjustment.id,
        punch_id = adjustment.punch_id,
        "adjustment requested"
    );
    Ok(HttpResponse::Created().json(adjustment))
}

/* =========================
Approve adjustment (Manager/Admin)
========================= */
/// Swagger doc for approve_adjustment endpoint
#[utoipa::path(
    put,
    path = "/api/v1/adjustment/{adjustment_id}/approve",
    params(
        ("adjustment_id" = u64, Path, description = "ID of the adjustment to approve")
    ),
    responses(
        (status = 200, description = "Adjustment approved and correction materialized", body = Adjustment),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Adjustment not found"),
        (status = 409, description = "Already decided", body = Object, example = json!({
            "message": "already decided by someone else, refresh"
        }))
    ),
    tag = "Adjustment"
)]
pub async fn approve_adjustment(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    actor.require_manager_or_admin()?;

    let adjustment_id = path.into_inner();
    let policy = WorkPolicy::load(&pool, actor.company_id).await?;
    let adjustment = decide::decide_adjustment(
        &pool,
        actor.user_id,
        adjustment_id,
        Decision::Approve,
        None,
        &policy,
    )
    .await?;

    Ok(HttpResponse::Ok().json(adjustment))
}

/* =========================
Reject adjustment (Manager/Admin)
========================= */
/// Swagger doc for reject_adjustment endpoint
#[utoipa::path(
    put,
    path = "/api/v1/adjustment/{adjustment_id}/reject",
    params(
        ("adjustment_id" = u64, Path, description = "ID of the adjustment to reject")
    ),
    request_body = RejectBody,
    responses(
        (status = 200, description = "Adjustment rejected", body = Adjustment),
        (status = 400, description = "Missing rejection reason"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Adjustment not found"),
        (status = 409, description = "Already decided")
    ),
    tag = "Adjustment"
)]
pub async fn reject_adjustment(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<RejectBody>,
) -> actix_web::Result<impl Responder> {
    actor.require_manager_or_admin()?;

    let adjustment_id = path.into_inner();
    let policy = WorkPolicy::load(&pool, actor.company_id).await?;
    let adjustment = decide::decide_adjustment(
        &pool,
        actor.user_id,
        adjustment_id,
        Decision::Reject,
        Some(body.reason.clone()),
        &policy,
    )
    .await?;

    Ok(HttpResponse::Ok().json(adjustment))
}

/// for getting an adjustment details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/adjustment/{adjustment_id}",
    params(
        ("adjustment_id" = u64, Path, description = "ID of the adjustment to fetch")
    ),
    responses(
        (status = 200, description = "Adjustment found", body = Adjustment),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Adjustment not found", body = Object, example = json!({
            "message": "adjustment not found"
        }))
    ),
    tag = "Adjustment"
)]
pub async fn get_adjustment(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let adjustment_id = path.into_inner();
    let adjustment = request::fetch_adjustment(&pool, adjustment_id)
        .await?
        .ok_or(TimeclockError::NotFound("adjustment"))?;

    if actor.is_employee() && actor.employee_id != Some(adjustment.employee_id) {
        return Err(actix_web::error::ErrorForbidden(
            "Employees may only view their own adjustments",
        ));
    }

    Ok(HttpResponse::Ok().json(adjustment))
}

/// for getting adjustments endpoint
#[utoipa::path(
    get,
    path = "/api/v1/adjustment",
    params(AdjustmentFilter),
    responses(
        (status = 200, description = "Paginated adjustment list", body = AdjustmentListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Adjustment"
)]
pub async fn adjustment_list(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    query: web::Query<AdjustmentFilter>,
) -> actix_web::Result<impl Responder> {
    actor.require_manager_or_admin()?;

    if let Some(status) = query.status.as_deref() {
        if status.parse::<AdjustmentStatus>().is_err() {
            return Err(TimeclockError::validation(vec![format!(
                "status {status:?} is not one of pending/approved/rejected"
            )])
            .into());
        }
    }

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

    if let Some(emp_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM adjustments{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error=%e, "Failed to count adjustments");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT id, punch_id, company_id, employee_id, proposed_kind,
               proposed_timestamp, reason, description, evidence_ref, diff,
               status, requested_by, requested_at, decided_by, decided_at,
               rejection_reason
        FROM adjustments
        {}
        ORDER BY requested_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, Adjustment>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let adjustments = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error=%e, "Failed to fetch adjustment list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(AdjustmentListResponse {
        data: adjustments,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}
