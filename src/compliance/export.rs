use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::MySqlPool;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::errors::TimeclockError;
use crate::ledger::store;
use crate::model::punch::PunchKind;

/// Fixed layout of the labor-inspection audit file. Field positions, the
/// CR+LF separator and the date/time encodings are contractual: inspection
/// tooling reads this byte-for-byte.
const FORMAT_VERSION: &str = "001";
const COMPANY_TAX_ID_WIDTH: usize = 14;
const EMPLOYEE_TAX_ID_WIDTH: usize = 11;
const COMPANY_NAME_WIDTH: usize = 100;
const SEQUENCE_WIDTH: usize = 18;
const COUNT_WIDTH: usize = 9;
const CHECKSUM_WIDTH: usize = 16;
const HEADER_LEN: usize = 1 + COMPANY_TAX_ID_WIDTH + COMPANY_NAME_WIDTH + 8 + 4 + 3;
const BODY_LEN: usize = 1 + EMPLOYEE_TAX_ID_WIDTH + 8 + 4 + SEQUENCE_WIDTH;
const TRAILER_LEN: usize = 1 + COMPANY_TAX_ID_WIDTH + 8 + 4 + COUNT_WIDTH + CHECKSUM_WIDTH;
const LINE_SEPARATOR: &str = "\r\n";

/// The issuing company as it appears in the header and trailer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyParty {
    pub tax_id: String,
    pub name: String,
}

/// One punch flattened for serialization. `sequence` is the ledger id.
#[derive(Debug, Clone)]
pub struct ExportPunch {
    pub sequence: u64,
    pub kind: PunchKind,
    pub adjusted: bool,
    pub punched_at: DateTime<Utc>,
    pub employee_tax_id: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComplianceFile {
    /// The complete file, CR+LF separated, ready to hand to the inspector.
    pub content: String,
    pub record_count: u64,
    #[schema(example = "9f2c1d8a34b07e61")]
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ExportSummary {
    pub record_count: u64,
    pub checksum: String,
}

/// Record-type codes 2..7: originals map 2..5 by punch kind; corrections of
/// entry/exit carry 6/7 so auditors can spot corrected spans. Corrected
/// break boundaries keep 4/5.
fn record_code(kind: PunchKind, adjusted: bool) -> char {
    match (kind, adjusted) {
        (PunchKind::Entry, false) => '2',
        (PunchKind::Exit, false) => '3',
        (PunchKind::BreakStart, _) => '4',
        (PunchKind::BreakEnd, _) => '5',
        (PunchKind::Entry, true) => '6',
        (PunchKind::Exit, true) => '7',
    }
}

fn numeric_field(raw: &str, width: usize, what: &str) -> Result<String, TimeclockError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || digits.len() > width {
        return Err(TimeclockError::ComplianceExport(format!(
            "{what} {raw:?} does not fit a {width}-digit field"
        )));
    }
    Ok(format!("{digits:0>width$}"))
}

fn padded_name(name: &str) -> String {
    let truncated: String = name.chars().take(COMPANY_NAME_WIDTH).collect();
    format!("{truncated:<width$}", width = COMPANY_NAME_WIDTH)
}

fn checksum_of(sequence_fields: &[String]) -> String {
    let mut hasher = Sha256::new();
    for field in sequence_fields {
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())[..CHECKSUM_WIDTH].to_string()
}

/// Serialize one company/date-range slice of the effective ledger into the
/// fixed-field audit file.
pub fn render(
    company: &CompanyParty,
    generated_at: DateTime<Utc>,
    punches: &[ExportPunch],
) -> Result<ComplianceFile, TimeclockError> {
    let company_tax = numeric_field(&company.tax_id, COMPANY_TAX_ID_WIDTH, "company tax id")?;
    let date = generated_at.format("%d%m%Y").to_string();
    let time = generated_at.format("%H%M").to_string();

    let mut lines: Vec<String> = Vec::with_capacity(punches.len() + 2);
    lines.push(format!(
        "1{company_tax}{}{date}{time}{FORMAT_VERSION}",
        padded_name(&company.name)
    ));

    let mut sequence_fields = Vec::with_capacity(punches.len());
    for punch in punches {
        let employee_tax =
            numeric_field(&punch.employee_tax_id, EMPLOYEE_TAX_ID_WIDTH, "employee tax id")?;
        let sequence = format!("{:0width$}", punch.sequence, width = SEQUENCE_WIDTH);
        lines.push(format!(
            "{}{employee_tax}{}{}{sequence}",
            record_code(punch.kind, punch.adjusted),
            punch.punched_at.format("%d%m%Y"),
            punch.punched_at.format("%H%M"),
        ));
        sequence_fields.push(sequence);
    }

    let checksum = checksum_of(&sequence_fields);
    let record_count = punches.len() as u64;
    lines.push(format!(
        "9{company_tax}{date}{time}{count}{checksum}",
        count = format!("{record_count:0width$}", width = COUNT_WIDTH),
    ));

    let mut content = lines.join(LINE_SEPARATOR);
    content.push_str(LINE_SEPARATOR);

    Ok(ComplianceFile {
        content,
        record_count,
        checksum,
    })
}

/// Re-parse a generated file and recompute the trailer checksum and count
/// from its body lines. Any structural fault or disagreement is fatal; a
/// regulator cannot tolerate silent correction.
pub fn verify(content: &str) -> Result<ExportSummary, TimeclockError> {
    let structural = |detail: String| TimeclockError::ComplianceExport(detail);

    let mut lines: Vec<&str> = content.split(LINE_SEPARATOR).collect();
    match lines.pop() {
        Some("") => {}
        _ => return Err(structural("file does not end with CR+LF".into())),
    }
    if lines.len() < 2 {
        return Err(structural("missing header or trailer line".into()));
    }

    let header = lines[0];
    if header.chars().count() != HEADER_LEN || !header.starts_with('1') {
        return Err(structural(format!("malformed header line: {header:?}")));
    }

    let trailer = lines[lines.len() - 1];
    if !trailer.is_ascii() || trailer.len() != TRAILER_LEN || !trailer.starts_with('9') {
        return Err(structural(format!("malformed trailer line: {trailer:?}")));
    }

    let mut sequence_fields = Vec::new();
    for (idx, line) in lines[1..lines.len() - 1].iter().enumerate() {
        if !line.is_ascii() || line.len() != BODY_LEN {
            return Err(structural(format!("body line {} has wrong length", idx + 2)));
        }
        let code = line.as_bytes()[0] as char;
        if !('2'..='7').contains(&code) {
            return Err(structural(format!(
                "body line {} carries record code {code:?}",
                idx + 2
            )));
        }
        let sequence = &line[BODY_LEN - SEQUENCE_WIDTH..];
        if !sequence.chars().all(|c| c.is_ascii_digit()) {
            return Err(structural(format!(
                "body line {} has a non-numeric sequence field",
                idx + 2
            )));
        }
        sequence_fields.push(sequence.to_string());
    }

    let count_start = 1 + COMPANY_TAX_ID_WIDTH + 8 + 4;
    let declared_count: u64 = trailer[count_start..count_start + COUNT_WIDTH]
        .parse()
        .map_err(|_| structural("trailer count is not numeric".into()))?;
    let declared_checksum = &trailer[count_start + COUNT_WIDTH..];

    if declared_count != sequence_fields.len() as u64 {
        return Err(structural(format!(
            "trailer declares {declared_count} records, file carries {}",
            sequence_fields.len()
        )));
    }

    let recomputed = checksum_of(&sequence_fields);
    if recomputed != declared_checksum {
        return Err(structural(format!(
            "checksum mismatch: trailer {declared_checksum}, recomputed {recomputed}"
        )));
    }

    Ok(ExportSummary {
        record_count: declared_count,
        checksum: recomputed,
    })
}

/// Assemble the export for a company/date range, optionally narrowed to one
/// employee, over the effective ledger.
pub async fn export_compliance(
    pool: &MySqlPool,
    company_id: u64,
    from: NaiveDate,
    to: NaiveDate,
    employee_id: Option<u64>,
    generated_at: DateTime<Utc>,
) -> Result<ComplianceFile, TimeclockError> {
    let company = sqlx::query_as::<_, CompanyParty>(
        "SELECT tax_id, name FROM companies WHERE id = ?",
    )
    .bind(company_id)
    .fetch_optional(pool)
    .await?
    .ok_or(TimeclockError::NotFound("company"))?;

    let tax_ids: HashMap<u64, String> = sqlx::query_as::<_, (u64, String)>(
        "SELECT id, tax_id FROM employees WHERE company_id = ?",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    let range_start = from.and_time(NaiveTime::MIN).and_utc();
    let range_end = to
        .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap())
        .and_utc();
    let records =
        store::effective_punches(pool, company_id, employee_id, range_start, range_end).await?;

    let mut punches = Vec::with_capacity(records.len());
    for record in &records {
        let kind = record.kind().map_err(|_| {
            TimeclockError::ComplianceExport(format!(
                "punch {} carries unknown kind {:?}",
                record.id, record.kind
            ))
        })?;
        let employee_tax_id = tax_ids.get(&record.employee_id).cloned().ok_or_else(|| {
            TimeclockError::ComplianceExport(format!(
                "employee {} has no tax identifier on file",
                record.employee_id
            ))
        })?;
        punches.push(ExportPunch {
            sequence: record.id,
            kind,
            adjusted: record.is_adjusted(),
            punched_at: record.punched_at,
            employee_tax_id,
        });
    }

    render(&company, generated_at, &punches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn company() -> CompanyParty {
        CompanyParty {
            tax_id: "12.345.678/0001-95".into(),
            name: "Acme Logistics Ltda".into(),
        }
    }

    fn punch(sequence: u64, kind: PunchKind, adjusted: bool, h: u32, m: u32) -> ExportPunch {
        ExportPunch {
            sequence,
            kind,
            adjusted,
            punched_at: Utc.with_ymd_and_hms(2026, 1, 5, h, m, 0).unwrap(),
            employee_tax_id: "390.533.447-05".into(),
        }
    }

    fn generated() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 14, 30, 0).unwrap()
    }

    fn sample() -> ComplianceFile {
        let punches = vec![
            punch(101, PunchKind::Entry, false, 8, 2),
            punch(102, PunchKind::BreakStart, false, 12, 0),
            punch(103, PunchKind::BreakEnd, false, 13, 0),
            punch(110, PunchKind::Exit, true, 17, 50),
        ];
        render(&company(), generated(), &punches).unwrap()
    }

    #[test]
    fn layout_is_byte_exact() {
        let file = sample();
        let lines: Vec<&str> = file.content.split("\r\n").collect();
        // header + 4 punches + trailer + empty tail after the final CR+LF
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[6], "");

        let header = lines[0];
        assert_eq!(header.chars().count(), HEADER_LEN);
        assert!(header.starts_with("112345678000195"));
        assert!(header.contains("Acme Logistics Ltda"));
        assert!(header.ends_with("010220261430001"));

        let first = lines[1];
        assert_eq!(first.len(), BODY_LEN);
        assert_eq!(
            first,
            "239053344705050120260802000000000000000101"
        );

        // The adjusted exit carries record code 7.
        assert!(lines[4].starts_with('7'));

        let trailer = lines[5];
        assert_eq!(trailer.len(), TRAILER_LEN);
        assert!(trailer.starts_with("912345678000195"));
        assert!(trailer.contains("000000004"));
        assert!(trailer.ends_with(&file.checksum));
        assert_eq!(file.checksum.len(), CHECKSUM_WIDTH);
        assert_eq!(file.record_count, 4);
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(sample().content, sample().content);
    }

    #[test]
    fn verify_round_trips_the_checksum() {
        let file = sample();
        let summary = verify(&file.content).unwrap();
        assert_eq!(summary.record_count, file.record_count);
        assert_eq!(summary.checksum, file.checksum);
    }

    #[test]
    fn verify_rejects_a_tampered_sequence_number() {
        let file = sample();
        let tampered = file.content.replacen("000000000000000101", "000000000000000999", 1);
        assert_ne!(tampered, file.content);
        assert!(matches!(
            verify(&tampered),
            Err(TimeclockError::ComplianceExport(_))
        ));
    }

    #[test]
    fn verify_rejects_a_dropped_line() {
        let file = sample();
        let mut lines: Vec<&str> = file.content.split("\r\n").collect();
        lines.remove(2);
        let shortened = lines.join("\r\n");
        assert!(verify(&shortened).is_err());
    }

    #[test]
    fn verify_rejects_lf_only_separators() {
        let file = sample();
        let unix = file.content.replace("\r\n", "\n");
        assert!(verify(&unix).is_err());
    }

    #[test]
    fn record_codes_cover_the_contracted_range() {
        assert_eq!(record_code(PunchKind::Entry, false), '2');
        assert_eq!(record_code(PunchKind::Exit, false), '3');
        assert_eq!(record_code(PunchKind::BreakStart, false), '4');
        assert_eq!(record_code(PunchKind::BreakEnd, false), '5');
        assert_eq!(record_code(PunchKind::Entry, true), '6');
        assert_eq!(record_code(PunchKind::Exit, true), '7');
        assert_eq!(record_code(PunchKind::BreakStart, true), '4');
    }

    #[test]
    fn oversized_tax_id_is_a_hard_failure() {
        let mut bad = company();
        bad.tax_id = "123456789012345".into();
        assert!(matches!(
            render(&bad, generated(), &[]),
            Err(TimeclockError::ComplianceExport(_))
        ));
    }

    #[test]
    fn empty_range_still_produces_header_and_trailer() {
        let file = render(&company(), generated(), &[]).unwrap();
        assert_eq!(file.record_count, 0);
        let summary = verify(&file.content).unwrap();
        assert_eq!(summary.record_count, 0);
    }
}
