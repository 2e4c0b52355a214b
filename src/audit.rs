use sqlx::MySqlConnection;
use tracing::warn;
use uuid::Uuid;

use crate::errors::TimeclockError;

/// Append one entry to the audit-log sink. In compliance mode (the default
/// policy) a failed write fails the surrounding transition; otherwise the
/// failure is logged and the operation proceeds.
pub async fn record(
    conn: &mut MySqlConnection,
    compliance_mode: bool,
    actor_id: u64,
    action: &str,
    status: &str,
    details: &str,
    metadata: serde_json::Value,
) -> Result<(), TimeclockError> {
    let result = sqlx::query(
        r#"
        INSERT INTO audit_log (id, actor_id, action, status, details, metadata, created_at)
        VALUES (?, ?, ?, ?, ?, ?, NOW())
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(actor_id)
    .bind(action)
    .bind(status)
    .bind(details)
    .bind(metadata.to_string())
    .execute(conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if compliance_mode => Err(e.into()),
        Err(e) => {
            warn!(error = %e, actor_id, action, "audit write failed, continuing (compliance mode off)");
            Ok(())
        }
    }
}
