use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real ledger volume.
const FILTER_CAPACITY: usize = 1_000_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static FINGERPRINT_FILTER: Lazy<RwLock<CuckooFilter<String>>> = Lazy::new(|| {
    RwLock::new(CuckooFilter::new(
        FILTER_CAPACITY,
        FALSE_POSITIVE_RATE,
    ))
});

/// Check if a fingerprint might already be in the ledger (false positives
/// possible, so a hit still needs the durable check)
pub fn might_exist(fingerprint: &str) -> bool {
    FINGERPRINT_FILTER
        .read()
        .expect("fingerprint filter poisoned")
        .contains(&fingerprint.to_string())
}

/// Insert a single fingerprint into the filter
pub fn insert(fingerprint: &str) {
    FINGERPRINT_FILTER
        .write()
        .expect("fingerprint filter poisoned")
        .add(&fingerprint.to_string());
}

/// Warm up the fingerprint filter using streaming + batching
pub async fn warmup_fingerprint_filter(
    pool: &MySqlPool,
    batch_size: usize,
) -> Result<()> {
    let mut stream =
        sqlx::query_as::<_, (String,)>("SELECT fingerprint FROM punch_records").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (fingerprint,) =
            row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(fingerprint);
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Fingerprint filter warmup complete: {} punches", total);
    Ok(())
}

/// Insert a batch of fingerprints
fn insert_batch(fingerprints: &[String]) {
    let mut filter = FINGERPRINT_FILTER
        .write()
        .expect("fingerprint filter poisoned");

    for fingerprint in fingerprints {
        filter.add(fingerprint);
    }
}
