use sqlx::MySqlPool;
use tracing::warn;

/// Fire-and-forget write to the notification sink. Delivery is someone
/// else's job; a failure here must never fail the core operation.
pub async fn send(pool: &MySqlPool, employee_id: u64, topic: &str, body: &str) {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (employee_id, topic, body, created_at)
        VALUES (?, ?, ?, NOW())
        "#,
    )
    .bind(employee_id)
    .bind(topic)
    .bind(body)
    .execute(pool)
    .await;

    if let Err(e) = result {
        warn!(error = %e, employee_id, topic, "notification write failed, dropping");
    }
}
