use crate::api::adjustment::{AdjustmentFilter, AdjustmentListResponse, RejectBody};
use crate::api::export::ExportQuery;
use crate::api::punch::{PunchListResponse, PunchQuery, SubmitPunch};
use crate::api::report::{
    DailyQuery, PeriodQuery, PeriodReport, WeeklyQuery, WeeklyReport,
};
use crate::compliance::export::{ComplianceFile, ExportSummary};
use crate::model::adjustment::{Adjustment, AdjustmentReason, AdjustmentStatus, FieldChange};
use crate::model::metrics::{
    AggregationWarning, DailyMetrics, DayStatus, HourBankEntry, PeriodMetrics, WeeklyMetrics,
};
use crate::model::policy::WorkPolicy;
use crate::model::punch::{PunchContext, PunchKind, PunchRecord};
use crate::workflow::request::AdjustmentDraft;
use utoipa::OpenApi;
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Time Clock API",
        version = "1.0.0",
        description = r#"
## Employee Time Clock

This API powers an employee attendance platform: an append-only punch
ledger with duplicate and tamper detection, an approval workflow for
after-the-fact corrections, minute-level work-hour computation, and the
fixed-format export required for labor-inspection audits.

### 🔹 Key Features
- **Punch Ledger**
  - Submit entry/exit/break events, list the ledger, verify record integrity
- **Adjustments**
  - Request corrections, approve/reject them, inspect the field-level diff
- **Work-Hour Reports**
  - Daily, weekly and period metrics plus the compensatory hour bank
- **Compliance Export**
  - Byte-exact audit file with record count and checksum

### 🔐 Identity
Every request carries a pre-resolved identity context in the
`X-User-Id`, `X-Company-Id`, `X-Role` and optional `X-Employee-Id`
headers. Approvals and exports require **Manager** or **Admin** roles.

### 📦 Response Format
- JSON-based RESTful responses (the export endpoint returns the raw file)
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::punch::submit_punch,
        crate::api::punch::punch_list,
        crate::api::punch::verify_punch,

        crate::api::adjustment::create_adjustment,
        crate::api::adjustment::approve_adjustment,
        crate::api::adjustment::reject_adjustment,
        crate::api::adjustment::get_adjustment,
        crate::api::adjustment::adjustment_list,

        crate::api::report::daily_report,
        crate::api::report::weekly_report,
        crate::api::report::period_report,

        crate::api::export::compliance_export,
        crate::api::export::compliance_export_verify
    ),
    components(
        schemas(
            PunchKind,
            PunchRecord,
            PunchContext,
            SubmitPunch,
            PunchQuery,
            PunchListResponse,
            Adjustment,
            AdjustmentStatus,
            AdjustmentReason,
            AdjustmentDraft,
            AdjustmentFilter,
            AdjustmentListResponse,
            FieldChange,
            RejectBody,
            WorkPolicy,
            DayStatus,
            AggregationWarning,
            DailyMetrics,
            WeeklyMetrics,
            PeriodMetrics,
            HourBankEntry,
            DailyQuery,
            WeeklyQuery,
            PeriodQuery,
            WeeklyReport,
            PeriodReport,
            ExportQuery,
            ComplianceFile,
            ExportSummary
        )
    ),
    tags(
        (name = "Punch", description = "Punch ledger APIs"),
        (name = "Adjustment", description = "Correction workflow APIs"),
        (name = "Report", description = "Work-hour report APIs"),
        (name = "Export", description = "Compliance export APIs"),
    )
)]
pub struct ApiDoc;
