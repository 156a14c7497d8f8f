use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// true  => account is TAKEN
/// false => account is AVAILABLE (usually we store only taken)
pub static ACCOUNT_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000) // tune based on memory
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Mark a single account as taken
pub async fn mark_taken(account: &str) {
    ACCOUNT_CACHE.insert(account.to_lowercase(), true).await;
}

/// Check if account is taken
pub async fn is_taken(account: &str) -> bool {
    ACCOUNT_CACHE
        .get(&account.to_lowercase())
        .await
        .unwrap_or(false)
}

/// Batch mark accounts as taken
async fn batch_mark(accounts: &[String]) {
    let futures: Vec<_> = accounts
        .iter()
        .map(|a| ACCOUNT_CACHE.insert(a.to_lowercase(), true))
        .collect();

    // Await all insertions concurrently
    futures::future::join_all(futures).await;
}

/// Load only RECENT accounts into in-memory cache (batched)
pub async fn warmup_account_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT account
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (account,) = row?;
        batch.push(account);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    // Insert any remaining accounts
    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    log::info!(
        "Account cache warmup complete: {} recent users (last {} days)",
        total_count,
        days
    );

    Ok(())
}
