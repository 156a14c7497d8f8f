use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real staff counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static ACCOUNT_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
fn normalize(account: &str) -> String {
    account.to_lowercase()
}

/// Check if an account might exist (false positives possible)
pub fn might_exist(account: &str) -> bool {
    let account = normalize(account);
    ACCOUNT_FILTER
        .read()
        .expect("account filter poisoned")
        .contains(&account)
}

/// Insert a single account into the filter
pub fn insert(account: &str) {
    let account = normalize(account);
    ACCOUNT_FILTER
        .write()
        .expect("account filter poisoned")
        .add(&account);
}

/// Remove an account from the filter
pub fn remove(account: &str) {
    let account = normalize(account);
    ACCOUNT_FILTER
        .write()
        .expect("account filter poisoned")
        .remove(&account);
}

/// Warm up the account filter using streaming + batching
pub async fn warmup_account_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT account FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (account,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&account));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Account filter warmup complete: {} users", total);
    Ok(())
}

/// Insert a batch of normalized accounts
fn insert_batch(accounts: &[String]) {
    let mut filter = ACCOUNT_FILTER.write().expect("account filter poisoned");

    for account in accounts {
        filter.add(account);
    }
}
