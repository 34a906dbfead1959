use sqlx::SqlitePool;
use tracing::info;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS address (
            address TEXT PRIMARY KEY,
            stake_address TEXT NOT NULL,
            payment_credential TEXT NOT NULL,
            stake_credential TEXT NOT NULL,
            slot INTEGER NOT NULL,
            update_datetime INTEGER NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS address_utxo (
            tx_hash TEXT NOT NULL,
            output_index INTEGER NOT NULL,
            slot INTEGER NOT NULL,
            block_number INTEGER NOT NULL,
            block_hash TEXT,
            owner_addr TEXT NOT NULL,
            lovelace_amount INTEGER NOT NULL,
            amounts TEXT NOT NULL,
            script_ref TEXT,
            update_datetime INTEGER NOT NULL,
            PRIMARY KEY (tx_hash, output_index)
        )"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_address_utxo_owner_addr
         ON address_utxo(owner_addr)"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_address_utxo_slot
         ON address_utxo(slot)"
    )
    .execute(pool)
    .await?;

    info!("Database migrations completed successfully");
    Ok(())
}
