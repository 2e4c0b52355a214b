use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// employee id => unix seconds of their latest known punch. Advisory only:
/// a hit lets the cool-down check reject without a round trip, a miss
/// always falls through to the durable store.
pub static LAST_PUNCH_CACHE: Lazy<Cache<u64, i64>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000) // tune based on memory
        .time_to_live(Duration::from_secs(3600)) // 1h TTL, cool-downs are minutes
        .build()
});

/// Record an accepted punch instant for an employee, keeping the latest
pub async fn mark_punch(employee_id: u64, punched_at: DateTime<Utc>) {
    let seconds = punched_at.timestamp();
    let newest = match LAST_PUNCH_CACHE.get(&employee_id).await {
        Some(known) if known > seconds => known,
        _ => seconds,
    };
    LAST_PUNCH_CACHE.insert(employee_id, newest).await;
}

/// Latest known punch instant for an employee, if cached
pub async fn last_punch(employee_id: u64) -> Option<DateTime<Utc>> {
    let seconds = LAST_PUNCH_CACHE.get(&employee_id).await?;
    Utc.timestamp_opt(seconds, 0).single()
}

/// Load each employee's most recent punch from the last N days into the
/// in-memory cache (batched)
pub async fn warmup_punch_cache(
    pool: &MySqlPool,
    days: u32,
    batch_size: usize,
) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (u64, DateTime<Utc>)>(
        r#"
        SELECT employee_id, MAX(punched_at)
        FROM punch_records
        WHERE punched_at >= NOW() - INTERVAL ? DAY
        GROUP BY employee_id
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (employee_id, punched_at) = row?;
        batch.push((employee_id, punched_at));
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    // Insert any remaining entries
    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    log::info!(
        "Punch cache warmup complete: {} employees (last {} days)",
        total_count,
        days
    );

    Ok(())
}

/// Batch mark latest punches
async fn batch_mark(entries: &[(u64, DateTime<Utc>)]) {
    let futures: Vec<_> = entries
        .iter()
        .map(|(employee_id, punched_at)| {
            LAST_PUNCH_CACHE.insert(*employee_id, punched_at.timestamp())
        })
        .collect();

    // Await all insertions concurrently
    futures::future::join_all(futures).await;
}
