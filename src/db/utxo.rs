use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::db::{StoreError, UtxoStore};
use crate::models::{AddressUtxo, Amount};

/// Default unspent-output storage. Writes every record it is given.
#[derive(Clone)]
pub struct SqliteUtxoStore {
    pool: SqlitePool,
}

impl SqliteUtxoStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_owner(&self, owner_addr: &str) -> Result<Vec<AddressUtxo>, StoreError> {
        let rows = sqlx::query(
            "SELECT tx_hash, output_index, slot, block_number, block_hash, owner_addr,
                    lovelace_amount, amounts, script_ref
             FROM address_utxo
             WHERE owner_addr = ?
             ORDER BY slot ASC, tx_hash ASC, output_index ASC"
        )
        .bind(owner_addr)
        .fetch_all(&self.pool)
        .await?;

        let mut utxos = Vec::with_capacity(rows.len());
        for row in &rows {
            let amounts: Vec<Amount> = serde_json::from_str(row.get::<&str, _>("amounts"))?;
            utxos.push(AddressUtxo {
                tx_hash: row.get("tx_hash"),
                output_index: row.get::<i64, _>("output_index") as u32,
                slot: row.get("slot"),
                block_number: row.get("block_number"),
                block_hash: row.get("block_hash"),
                owner_addr: row.get("owner_addr"),
                lovelace_amount: row.get::<i64, _>("lovelace_amount") as u64,
                amounts,
                script_ref: row.get("script_ref"),
            });
        }

        Ok(utxos)
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query("SELECT COUNT(*) FROM address_utxo")
            .fetch_one(&self.pool)
            .await?
            .get::<i64, _>(0);

        Ok(count)
    }
}

#[async_trait]
impl UtxoStore for SqliteUtxoStore {
    async fn save_unspent(&self, utxos: Vec<AddressUtxo>) -> Result<(), StoreError> {
        if utxos.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for utxo in &utxos {
            let amounts = serde_json::to_string(&utxo.amounts)?;
            // SQLite integers are signed
            let lovelace = utxo.lovelace_amount as i64;

            sqlx::query(
                "INSERT INTO address_utxo
                 (tx_hash, output_index, slot, block_number, block_hash, owner_addr,
                  lovelace_amount, amounts, script_ref, update_datetime)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(tx_hash, output_index) DO NOTHING"
            )
            .bind(&utxo.tx_hash)
            .bind(i64::from(utxo.output_index))
            .bind(utxo.slot)
            .bind(utxo.block_number)
            .bind(&utxo.block_hash)
            .bind(&utxo.owner_addr)
            .bind(lovelace)
            .bind(amounts)
            .bind(&utxo.script_ref)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
