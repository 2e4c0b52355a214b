use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Typed failures of the time-clock core. Every operation returns one of
/// these; nothing is surfaced as an opaque error and nothing is swallowed.
#[derive(Debug, Error)]
pub enum TimeclockError {
    /// Malformed or insufficient input. Carries every violated rule, not
    /// just the first one found.
    #[error("validation failed: {}", violations.join("; "))]
    Validation { violations: Vec<String> },

    /// Fingerprint collision or a punch inside the cool-down window.
    #[error("punch already registered, wait {wait_minutes} minute(s) before trying again")]
    DuplicateRecord { wait_minutes: i64 },

    /// Stored fingerprint disagrees with the one recomputed from row
    /// content. Fatal: must be surfaced, never silently repaired.
    #[error("integrity mismatch on punch {punch_id}: stored fingerprint does not match record content")]
    IntegrityMismatch { punch_id: u64 },

    /// The original punch is older than the correction window allows.
    #[error("adjustment window expired: corrections are only accepted up to {max_days} day(s) after the punch")]
    AdjustmentWindowExpired { max_days: i64 },

    /// Lost a concurrent race to a terminal state.
    #[error("already decided by someone else, refresh")]
    Conflict,

    /// Structural or checksum failure while producing/verifying the
    /// compliance file.
    #[error("compliance export failed: {0}")]
    ComplianceExport(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl TimeclockError {
    pub fn validation(violations: Vec<String>) -> Self {
        Self::Validation { violations }
    }
}

impl ResponseError for TimeclockError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::AdjustmentWindowExpired { .. } => StatusCode::BAD_REQUEST,
            Self::DuplicateRecord { .. } => StatusCode::CONFLICT,
            Self::Conflict => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::IntegrityMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ComplianceExport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::Validation { violations } => json!({
                "message": "validation failed",
                "violations": violations,
            }),
            Self::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                json!({ "message": "Internal Server Error" })
            }
            other => json!({ "message": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_message_names_the_wait() {
        let err = TimeclockError::DuplicateRecord { wait_minutes: 3 };
        assert_eq!(
            err.to_string(),
            "punch already registered, wait 3 minute(s) before trying again"
        );
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn window_message_names_the_day_limit() {
        let err = TimeclockError::AdjustmentWindowExpired { max_days: 7 };
        assert!(err.to_string().contains("7 day(s)"));
    }

    #[test]
    fn validation_lists_every_violation() {
        let err = TimeclockError::validation(vec![
            "description too short".into(),
            "unknown reason".into(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("description too short"));
        assert!(msg.contains("unknown reason"));
    }
}
