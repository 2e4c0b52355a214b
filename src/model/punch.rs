use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumString;
use strum_macros::Display;
use utoipa::ToSchema;

/// A single clock event kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PunchKind {
    Entry,
    Exit,
    BreakStart,
    BreakEnd,
}

/// Ledger entry. Immutable once written: corrections never touch the row,
/// they materialize a new one carrying `origin_punch_id` + `adjustment_id`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 4021,
        "company_id": 1,
        "employee_id": 1000,
        "kind": "entry",
        "punched_at": "2026-01-05T08:02:11Z",
        "latitude": -23.5613,
        "longitude": -46.6565,
        "device_id": "TERM-07",
        "fingerprint": "9f2c1d…",
        "origin_punch_id": null,
        "adjustment_id": null
    })
)]
pub struct PunchRecord {
    pub id: u64,
    pub company_id: u64,
    pub employee_id: u64,

    /// Stored as text; parse with [`PunchRecord::kind`].
    #[schema(example = "entry")]
    pub kind: String,

    #[schema(example = "2026-01-05T08:02:11Z", format = "date-time", value_type = String)]
    pub punched_at: DateTime<Utc>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    #[schema(example = "TERM-07", nullable = true)]
    pub device_id: Option<String>,
    pub device_info: Option<String>,
    pub photo_ref: Option<String>,
    pub badge_ref: Option<String>,

    /// One-way content fingerprint, also the duplicate key.
    pub fingerprint: String,

    /// Set only on rows materialized from an approved adjustment.
    pub origin_punch_id: Option<u64>,
    pub adjustment_id: Option<u64>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PunchRecord {
    pub fn kind(&self) -> Result<PunchKind, strum::ParseError> {
        self.kind.parse()
    }

    /// True for rows materialized by an approved adjustment.
    pub fn is_adjusted(&self) -> bool {
        self.origin_punch_id.is_some()
    }
}

/// Optional capture context accompanying a punch submission.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct PunchContext {
    #[schema(example = -23.5613, nullable = true)]
    pub latitude: Option<f64>,
    #[schema(example = -46.6565, nullable = true)]
    pub longitude: Option<f64>,
    #[schema(example = "TERM-07", nullable = true)]
    pub device_id: Option<String>,
    #[schema(example = "ESSL X990, fw 2.1", nullable = true)]
    pub device_info: Option<String>,
    #[schema(example = "photos/2026/01/05/4021.jpg", nullable = true)]
    pub photo_ref: Option<String>,
    #[schema(example = "NFC-00A3F2", nullable = true)]
    pub badge_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_text() {
        for kind in [
            PunchKind::Entry,
            PunchKind::Exit,
            PunchKind::BreakStart,
            PunchKind::BreakEnd,
        ] {
            let text = kind.to_string();
            assert_eq!(text.parse::<PunchKind>().unwrap(), kind);
        }
        assert_eq!(PunchKind::BreakStart.to_string(), "break_start");
    }

    #[test]
    fn unknown_kind_text_is_an_error() {
        assert!("lunch".parse::<PunchKind>().is_err());
    }
}
