use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::db::{AddressStore, StoreError};
use crate::models::Address;

#[derive(Clone)]
pub struct SqliteAddressStore {
    pool: SqlitePool,
}

impl SqliteAddressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressStore for SqliteAddressStore {
    async fn find_all(&self) -> Result<Vec<Address>, StoreError> {
        let rows = sqlx::query(
            "SELECT address, stake_address, payment_credential, stake_credential, slot
             FROM address"
        )
        .fetch_all(&self.pool)
        .await?;

        let addresses = rows.iter().map(|row| {
            Address {
                address: row.get("address"),
                stake_address: row.get("stake_address"),
                payment_credential: row.get("payment_credential"),
                stake_credential: row.get("stake_credential"),
                slot: row.get("slot"),
            }
        }).collect();

        Ok(addresses)
    }

    async fn save(&self, addresses: &[Address]) -> Result<(), StoreError> {
        if addresses.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for address in addresses {
            sqlx::query(
                "INSERT INTO address
                 (address, stake_address, payment_credential, stake_credential, slot, update_datetime)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(address) DO NOTHING"
            )
            .bind(&address.address)
            .bind(&address.stake_address)
            .bind(&address.payment_credential)
            .bind(&address.stake_credential)
            .bind(address.slot)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
