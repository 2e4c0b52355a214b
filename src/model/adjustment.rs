use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumString;
use strum_macros::Display;
use utoipa::ToSchema;

use crate::errors::TimeclockError;

/// Adjustment lifecycle. PENDING is the only non-terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl AdjustmentStatus {
    /// Total transition function: PENDING × decision → terminal state.
    /// Any transition out of a terminal state is a conflict.
    pub fn decide(self, decision: Decision) -> Result<AdjustmentStatus, TimeclockError> {
        match self {
            AdjustmentStatus::Pending => Ok(match decision {
                Decision::Approve => AdjustmentStatus::Approved,
                Decision::Reject => AdjustmentStatus::Rejected,
            }),
            AdjustmentStatus::Approved | AdjustmentStatus::Rejected => {
                Err(TimeclockError::Conflict)
            }
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, AdjustmentStatus::Pending)
    }
}

/// Allowed correction reason categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AdjustmentReason {
    ForgotToRegister,
    TechnicalFailure,
    HumanError,
    ScheduleChange,
    Other,
}

/// One changed field in the request-time diff snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldChange {
    #[schema(example = "punched_at")]
    pub field: String,
    #[schema(example = "2026-01-05T17:02:00Z")]
    pub old: String,
    #[schema(example = "2026-01-05T18:02:00Z")]
    pub new: String,
}

/// Correction proposal against one ledger entry. The original punch is never
/// edited; an approved adjustment materializes a new chained ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Adjustment {
    pub id: u64,
    pub punch_id: u64,
    pub company_id: u64,
    pub employee_id: u64,

    /// Proposed replacement event kind, if the kind is being corrected.
    #[schema(example = "exit", nullable = true)]
    pub proposed_kind: Option<String>,
    #[schema(example = "2026-01-05T18:02:00Z", format = "date-time", value_type = Option<String>)]
    pub proposed_timestamp: Option<DateTime<Utc>>,

    #[schema(example = "forgot-to-register")]
    pub reason: String,
    pub description: String,
    pub evidence_ref: Option<String>,

    /// Field-level old→new snapshot captured at request time, JSON-encoded.
    pub diff: String,

    #[schema(example = "pending")]
    pub status: String,

    pub requested_by: u64,
    #[schema(format = "date-time", value_type = String)]
    pub requested_at: DateTime<Utc>,

    pub decided_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub decided_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Adjustment {
    pub fn status(&self) -> Result<AdjustmentStatus, strum::ParseError> {
        self.status.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_decides_exactly_once() {
        let approved = AdjustmentStatus::Pending.decide(Decision::Approve).unwrap();
        assert_eq!(approved, AdjustmentStatus::Approved);

        let rejected = AdjustmentStatus::Pending.decide(Decision::Reject).unwrap();
        assert_eq!(rejected, AdjustmentStatus::Rejected);
    }

    #[test]
    fn terminal_states_refuse_any_decision() {
        for terminal in [AdjustmentStatus::Approved, AdjustmentStatus::Rejected] {
            assert!(terminal.is_terminal());
            for decision in [Decision::Approve, Decision::Reject] {
                assert!(matches!(
                    terminal.decide(decision),
                    Err(TimeclockError::Conflict)
                ));
            }
        }
    }

    #[test]
    fn reason_uses_kebab_case_wire_form() {
        assert_eq!(
            "forgot-to-register".parse::<AdjustmentReason>().unwrap(),
            AdjustmentReason::ForgotToRegister
        );
        assert_eq!(AdjustmentReason::TechnicalFailure.to_string(), "technical-failure");
        assert!("vacation".parse::<AdjustmentReason>().is_err());
    }
}
