use crate::auth::context::ActorContext;
use crate::compliance::export;
use crate::notify;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ExportQuery {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from: NaiveDate,
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub to: NaiveDate,
    /// Narrow the file to a single employee
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
}

/* =========================
Compliance export (Manager/Admin)
========================= */
/// Swagger doc for compliance_export endpoint
#[utoipa::path(
    get,
    path = "/api/v1/export/compliance",
    params(ExportQuery),
    responses(
        (status = 200, description = "Fixed-field audit file, CR+LF separated",
         content_type = "text/plain"),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Export failed", body = Object, example = json!({
            "message": "compliance export failed: employee 1000 has no tax identifier on file"
        }))
    ),
    tag = "Export"
)]
pub async fn compliance_export(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    query: web::Query<ExportQuery>,
) -> actix_web::Result<impl Responder> {
    actor.require_manager_or_admin()?;
    if query.from > query.to {
        return Err(actix_web::error::ErrorBadRequest("from cannot be after to"));
    }

    let file = export::export_compliance(
        &pool,
        actor.company_id,
        query.from,
        query.to,
        query.employee_id,
        Utc::now(),
    )
    .await?;

    tracing::info!(
        company_id = actor.company_id,
        record_count = file.record_count,
        checksum = %file.checksum,
        "compliance export generated"
    );
    if let Some(employee_id) = actor.employee_id {
        notify::send(
            &pool,
            employee_id,
            "compliance_export",
            &format!(
                "export for {} to {} completed: {} records, checksum {}",
                query.from, query.to, file.record_count, file.checksum
            ),
        )
        .await;
    }

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header(("X-Record-Count", file.record_count.to_string()))
        .insert_header(("X-Checksum", file.checksum.clone()))
        .body(file.content))
}

/* =========================
Export self-check (Manager/Admin)
========================= */
/// Swagger doc for compliance_export_verify endpoint
#[utoipa::path(
    get,
    path = "/api/v1/export/compliance/verify",
    params(ExportQuery),
    responses(
        (status = 200, description = "Generated file re-parsed, checksum reproduced", body = export::ExportSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Checksum or structural failure")
    ),
    tag = "Export"
)]
pub async fn compliance_export_verify(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    query: web::Query<ExportQuery>,
) -> actix_web::Result<impl Responder> {
    actor.require_manager_or_admin()?;
    if query.from > query.to {
        return Err(actix_web::error::ErrorBadRequest("from cannot be after to"));
    }

    let file = export::export_compliance(
        &pool,
        actor.company_id,
        query.from,
        query.to,
        query.employee_id,
        Utc::now(),
    )
    .await?;
    let summary = export::verify(&file.content)?;

    Ok(HttpResponse::Ok().json(summary))
}
