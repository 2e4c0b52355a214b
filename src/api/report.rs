use crate::auth::context::ActorContext;
use crate::errors::TimeclockError;
use crate::ledger::store;
use crate::model::metrics::{DailyMetrics, HourBankEntry, PeriodMetrics, WeeklyMetrics};
use crate::model::policy::WorkPolicy;
use crate::workhours::{aggregator, hour_bank};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DailyQuery {
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct WeeklyQuery {
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 2)]
    pub week: u32,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PeriodQuery {
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from: NaiveDate,
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub to: NaiveDate,
    /// Hour-bank balance carried into the period, in minutes
    #[schema(example = 120)]
    pub opening_minutes: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct WeeklyReport {
    pub week: WeeklyMetrics,
    pub days: Vec<DailyMetrics>,
}

#[derive(Serialize, ToSchema)]
pub struct PeriodReport {
    pub period: PeriodMetrics,
    pub weeks: Vec<WeeklyMetrics>,
    pub days: Vec<DailyMetrics>,
    pub hour_bank: HourBankEntry,
}

/// Employees report on themselves; managers and admins on anyone.
fn resolve_employee(
    actor: &ActorContext,
    requested: Option<u64>,
) -> actix_web::Result<u64> {
    if actor.is_employee() {
        let own = actor
            .employee_id
            .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?;
        if requested.is_some_and(|r| r != own) {
            return Err(actix_web::error::ErrorForbidden(
                "Employees may only view their own reports",
            ));
        }
        return Ok(own);
    }
    requested
        .or(actor.employee_id)
        .ok_or_else(|| actix_web::error::ErrorBadRequest("employee_id is required"))
}

async fn dailies_for_range(
    pool: &MySqlPool,
    company_id: u64,
    employee_id: u64,
    from: NaiveDate,
    to: NaiveDate,
    policy: &WorkPolicy,
) -> Result<Vec<DailyMetrics>, TimeclockError> {
    let range_start = from.and_time(NaiveTime::MIN).and_utc();
    let range_end = to
        .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap())
        .and_utc();
    let records =
        store::effective_punches(pool, company_id, Some(employee_id), range_start, range_end)
            .await?;
    Ok(aggregator::compute_range(from, to, &records, policy))
}

/* =========================
Daily metrics
========================= */
/// Swagger doc for daily_report endpoint
#[utoipa::path(
    get,
    path = "/api/v1/report/daily",
    params(DailyQuery),
    responses(
        (status = 200, description = "Minute-level metrics for one employee-day", body = DailyMetrics),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Report"
)]
pub async fn daily_report(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    query: web::Query<DailyQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = resolve_employee(&actor, query.employee_id)?;
    let policy = WorkPolicy::load(&pool, actor.company_id).await?;

    let dailies = dailies_for_range(
        &pool,
        actor.company_id,
        employee_id,
        query.date,
        query.date,
        &policy,
    )
    .await?;
    let daily = dailies.into_iter().next().ok_or(TimeclockError::NotFound("day"))?;

    Ok(HttpResponse::Ok().json(daily))
}

/* =========================
Weekly metrics
========================= */
/// Swagger doc for weekly_report endpoint
#[utoipa::path(
    get,
    path = "/api/v1/report/weekly",
    params(WeeklyQuery),
    responses(
        (status = 200, description = "One ISO week rolled up from its dailies", body = WeeklyReport),
        (status = 400, description = "No such ISO week"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Report"
)]
pub async fn weekly_report(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    query: web::Query<WeeklyQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = resolve_employee(&actor, query.employee_id)?;

    let monday = NaiveDate::from_isoywd_opt(query.year, query.week, Weekday::Mon)
        .ok_or_else(|| actix_web::error::ErrorBadRequest("No such ISO week"))?;
    let sunday = monday + Duration::days(6);

    let policy = WorkPolicy::load(&pool, actor.company_id).await?;
    let days =
        dailies_for_range(&pool, actor.company_id, employee_id, monday, sunday, &policy).await?;

    let week = aggregator::rollup_weeks(&days, &policy)
        .into_iter()
        .next()
        .ok_or(TimeclockError::NotFound("week"))?;

    Ok(HttpResponse::Ok().json(WeeklyReport { week, days }))
}

/* =========================
Period metrics + hour bank
========================= */
/// Swagger doc for period_report endpoint
#[utoipa::path(
    get,
    path = "/api/v1/report/period",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Arbitrary range rolled up week-wise, with hour bank", body = PeriodReport),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Report"
)]
pub async fn period_report(
    actor: ActorContext,
    pool: web::Data<MySqlPool>,
    query: web::Query<PeriodQuery>,
) -> actix_web::Result<impl Responder> {
    if query.from > query.to {
        return Err(actix_web::error::ErrorBadRequest("from cannot be after to"));
    }

    let employee_id = resolve_employee(&actor, query.employee_id)?;
    let policy = WorkPolicy::load(&pool, actor.company_id).await?;

    let days = dailies_for_range(
        &pool,
        actor.company_id,
        employee_id,
        query.from,
        query.to,
        &policy,
    )
    .await?;
    let weeks = aggregator::rollup_weeks(&days, &policy);
    let period = aggregator::rollup_period(query.from, query.to, &weeks);
    let bank = hour_bank::hour_bank_entry(query.opening_minutes.unwrap_or(0), &period);

    Ok(HttpResponse::Ok().json(PeriodReport {
        period,
        weeks,
        days,
        hour_bank: bank,
    }))
}
