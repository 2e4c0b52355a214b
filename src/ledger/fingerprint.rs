use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::errors::TimeclockError;
use crate::model::punch::{PunchContext, PunchRecord};

/// Deterministic one-way fingerprint over the semantically significant
/// fields of a punch. Reproducible, not reversible: later integrity checks
/// recompute it from row content and compare against the stored value.
pub fn punch_fingerprint(
    company_id: u64,
    employee_id: u64,
    kind: &str,
    punched_at: &DateTime<Utc>,
    ctx: &PunchContext,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_line(company_id, employee_id, kind, punched_at, ctx));
    hex::encode(hasher.finalize())
}

/// Fingerprint of a ledger row materialized from an approved adjustment:
/// derived from the original fingerprint plus the adjustment id, so the
/// correction is cryptographically traceable to its justification.
pub fn chained_fingerprint(original_fingerprint: &str, adjustment_id: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(original_fingerprint.as_bytes());
    hasher.update(b"|adjustment:");
    hasher.update(adjustment_id.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Recompute the fingerprint a stored row should carry and compare it to
/// the stored one. For adjusted rows the expected value is chained from the
/// originating row's fingerprint. A mismatch signals storage-level
/// tampering and is surfaced, never repaired.
pub fn verify_record(
    record: &PunchRecord,
    origin_fingerprint: Option<&str>,
) -> Result<(), TimeclockError> {
    let expected = match (record.origin_punch_id, record.adjustment_id, origin_fingerprint) {
        (Some(_), Some(adjustment_id), Some(origin_fp)) => {
            chained_fingerprint(origin_fp, adjustment_id)
        }
        (None, None, _) => punch_fingerprint(
            record.company_id,
            record.employee_id,
            &record.kind,
            &record.punched_at,
            &context_of(record),
        ),
        // Adjusted row without its origin available, or half-set lineage
        // columns: either way the stored lineage cannot be validated.
        _ => return Err(TimeclockError::IntegrityMismatch { punch_id: record.id }),
    };

    if expected != record.fingerprint {
        return Err(TimeclockError::IntegrityMismatch { punch_id: record.id });
    }
    Ok(())
}

fn context_of(record: &PunchRecord) -> PunchContext {
    PunchContext {
        latitude: record.latitude,
        longitude: record.longitude,
        device_id: record.device_id.clone(),
        device_info: record.device_info.clone(),
        photo_ref: record.photo_ref.clone(),
        badge_ref: record.badge_ref.clone(),
    }
}

fn canonical_line(
    company_id: u64,
    employee_id: u64,
    kind: &str,
    punched_at: &DateTime<Utc>,
    ctx: &PunchContext,
) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}",
        company_id,
        employee_id,
        kind,
        punched_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ctx.device_id.as_deref().unwrap_or(""),
        ctx.latitude.map(|v| format!("{v:.6}")).unwrap_or_default(),
        ctx.longitude.map(|v| format!("{v:.6}")).unwrap_or_default(),
        ctx.badge_ref.as_deref().unwrap_or(""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, h, m, 0).unwrap()
    }

    #[test]
    fn same_inputs_same_fingerprint() {
        let ctx = PunchContext {
            device_id: Some("TERM-07".into()),
            latitude: Some(-23.5613),
            longitude: Some(-46.6565),
            ..Default::default()
        };
        let a = punch_fingerprint(1, 1000, "entry", &ts(8, 2), &ctx);
        let b = punch_fingerprint(1, 1000, "entry", &ts(8, 2), &ctx);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn changing_any_field_changes_the_fingerprint() {
        let ctx = PunchContext::default();
        let base = punch_fingerprint(1, 1000, "entry", &ts(8, 2), &ctx);

        assert_ne!(base, punch_fingerprint(2, 1000, "entry", &ts(8, 2), &ctx));
        assert_ne!(base, punch_fingerprint(1, 1001, "entry", &ts(8, 2), &ctx));
        assert_ne!(base, punch_fingerprint(1, 1000, "exit", &ts(8, 2), &ctx));
        assert_ne!(base, punch_fingerprint(1, 1000, "entry", &ts(8, 3), &ctx));

        let with_device = PunchContext {
            device_id: Some("TERM-01".into()),
            ..Default::default()
        };
        assert_ne!(base, punch_fingerprint(1, 1000, "entry", &ts(8, 2), &with_device));
    }

    #[test]
    fn chained_fingerprint_depends_on_adjustment_id() {
        let origin = punch_fingerprint(1, 1000, "exit", &ts(17, 0), &PunchContext::default());
        assert_ne!(chained_fingerprint(&origin, 1), chained_fingerprint(&origin, 2));
        assert_eq!(chained_fingerprint(&origin, 1), chained_fingerprint(&origin, 1));
    }

    fn record_with(fp: String) -> PunchRecord {
        PunchRecord {
            id: 7,
            company_id: 1,
            employee_id: 1000,
            kind: "entry".into(),
            punched_at: ts(8, 2),
            latitude: None,
            longitude: None,
            device_id: None,
            device_info: None,
            photo_ref: None,
            badge_ref: None,
            fingerprint: fp,
            origin_punch_id: None,
            adjustment_id: None,
            created_at: None,
        }
    }

    #[test]
    fn verify_accepts_untampered_row() {
        let fp = punch_fingerprint(1, 1000, "entry", &ts(8, 2), &PunchContext::default());
        assert!(verify_record(&record_with(fp), None).is_ok());
    }

    #[test]
    fn verify_flags_tampered_timestamp() {
        let fp = punch_fingerprint(1, 1000, "entry", &ts(8, 2), &PunchContext::default());
        let mut record = record_with(fp);
        record.punched_at = ts(9, 2);
        assert!(matches!(
            verify_record(&record, None),
            Err(TimeclockError::IntegrityMismatch { punch_id: 7 })
        ));
    }

    #[test]
    fn verify_checks_adjusted_rows_against_the_chain() {
        let origin_fp = punch_fingerprint(1, 1000, "exit", &ts(17, 0), &PunchContext::default());
        let mut record = record_with(chained_fingerprint(&origin_fp, 42));
        record.kind = "exit".into();
        record.origin_punch_id = Some(3);
        record.adjustment_id = Some(42);

        assert!(verify_record(&record, Some(&origin_fp)).is_ok());
        assert!(verify_record(&record, Some("deadbeef")).is_err());
        // Origin row unavailable: lineage cannot be validated.
        assert!(verify_record(&record, None).is_err());
    }
}
