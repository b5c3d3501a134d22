use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::types::Json;
use sqlx::{Row, SqlitePool};

use crate::error::VtuError;
use crate::schema::{ServiceCategory, Topup, Transaction, TxStatus, User, Wallet};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Failed to create SQLite connect options")?
            .create_if_missing(true);
        // SQLite takes one writer at a time; a single pooled connection also
        // keeps every statement on the same database when the URL is :memory:.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("Database migration error")?;
        Ok(Self { pool })
    }

    pub async fn save_user(&self, user: &User) -> Result<i64, VtuError> {
        let result = sqlx::query(
            "INSERT INTO users (email, full_name, password_hash, is_superuser) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.is_superuser)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, VtuError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn get_users(&self) -> Result<Vec<User>, VtuError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    pub async fn fetch_wallet(&self, user_id: i64) -> Result<Option<Wallet>, VtuError> {
        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(wallet)
    }

    pub async fn get_wallets(&self) -> Result<Vec<Wallet>, VtuError> {
        let wallets = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets ORDER BY user_id")
            .fetch_all(&self.pool)
            .await?;

        Ok(wallets)
    }

    /// Adds to a balance, creating the wallet row if it does not exist yet.
    pub async fn upsert_wallet_credit(&self, user_id: i64, amount: i64) -> Result<(), VtuError> {
        sqlx::query(
            "INSERT INTO wallets (user_id, balance) VALUES (?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
             balance = balance + excluded.balance, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Subtracts from a balance only while enough is there. Affects zero
    /// rows when the wallet is missing or short, so the caller can tell
    /// a refused debit from an applied one.
    pub async fn debit_wallet_if_funded(
        &self,
        user_id: i64,
        amount: i64,
    ) -> Result<u64, VtuError> {
        let result = sqlx::query(
            "UPDATE wallets SET balance = balance - ?, updated_at = CURRENT_TIMESTAMP \
             WHERE user_id = ? AND balance >= ?",
        )
        .bind(amount)
        .bind(user_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn insert_transaction(&self, tx: &Transaction) -> Result<(), VtuError> {
        sqlx::query(
            "INSERT INTO transactions \
             (id, user_id, category, service_id, amount, charged_amount, reference, status, meta) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&tx.id)
        .bind(tx.user_id)
        .bind(tx.category.as_str())
        .bind(&tx.service_id)
        .bind(tx.amount)
        .bind(tx.charged_amount)
        .bind(&tx.reference)
        .bind(tx.status.as_str())
        .bind(Json(&tx.meta))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Settles a transaction's status only while it still has the expected
    /// one. The orchestrator and the reconciler both go through this
    /// compare-and-swap, so whichever writes last loses instead of
    /// clobbering an earlier settle.
    pub async fn update_transaction_if_status(
        &self,
        id: &str,
        expected: TxStatus,
        next: TxStatus,
        meta: &serde_json::Value,
    ) -> Result<bool, VtuError> {
        let result = sqlx::query(
            "UPDATE transactions SET status = ?, meta = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ? AND status = ?",
        )
        .bind(next.as_str())
        .bind(Json(meta))
        .bind(id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, VtuError> {
        let row = sqlx::query("SELECT * FROM transactions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(transaction_from_row).transpose()?)
    }

    pub async fn get_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, VtuError> {
        let row = sqlx::query("SELECT * FROM transactions WHERE reference = ?")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(transaction_from_row).transpose()?)
    }

    pub async fn get_transactions_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<Transaction>, VtuError> {
        let rows = sqlx::query(
            "SELECT * FROM transactions WHERE user_id = ? ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        collect_transactions(&rows)
    }

    pub async fn get_transactions_for_user_by_status(
        &self,
        user_id: i64,
        status: TxStatus,
    ) -> Result<Vec<Transaction>, VtuError> {
        let rows = sqlx::query(
            "SELECT * FROM transactions WHERE user_id = ? AND status = ? \
             ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        collect_transactions(&rows)
    }

    pub async fn get_all_transactions(&self) -> Result<Vec<Transaction>, VtuError> {
        let rows = sqlx::query("SELECT * FROM transactions ORDER BY created_at DESC, id")
            .fetch_all(&self.pool)
            .await?;

        collect_transactions(&rows)
    }

    pub async fn insert_topup(&self, topup: &Topup) -> Result<(), VtuError> {
        sqlx::query(
            "INSERT INTO topups (id, user_id, amount, status, meta) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&topup.id)
        .bind(topup.user_id)
        .bind(topup.amount)
        .bind(&topup.status)
        .bind(Json(&topup.meta))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_all_topups(&self) -> Result<Vec<Topup>, VtuError> {
        let rows = sqlx::query("SELECT * FROM topups ORDER BY created_at DESC, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(topup_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(VtuError::from)
    }
}

fn transaction_from_row(row: &SqliteRow) -> Result<Transaction, sqlx::Error> {
    let category: String = row.try_get("category")?;
    let status: String = row.try_get("status")?;
    let meta: Json<serde_json::Value> = row.try_get("meta")?;

    Ok(Transaction {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        category: ServiceCategory::parse(&category).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown service category `{category}`").into())
        })?,
        service_id: row.try_get("service_id")?,
        amount: row.try_get("amount")?,
        charged_amount: row.try_get("charged_amount")?,
        reference: row.try_get("reference")?,
        status: TxStatus::parse(&status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown transaction status `{status}`").into())
        })?,
        meta: meta.0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn collect_transactions(rows: &[SqliteRow]) -> Result<Vec<Transaction>, VtuError> {
    rows.iter()
        .map(transaction_from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(VtuError::from)
}

fn topup_from_row(row: &SqliteRow) -> Result<Topup, sqlx::Error> {
    let meta: Json<serde_json::Value> = row.try_get("meta")?;

    Ok(Topup {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        amount: row.try_get("amount")?,
        status: row.try_get("status")?,
        meta: meta.0,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn saves_and_finds_users_by_email() {
        let db = test_db().await;
        let user = User::new("ada@example.com", "Ada Lovelace", "Sup3rSecret", true).unwrap();
        let id = db.save_user(&user).await.unwrap();
        assert!(id > 0);

        let found = db.get_user_by_email("ada@example.com").await.unwrap();
        let found = found.expect("user should exist");
        assert_eq!(found.id, id);
        assert_eq!(found.full_name, "Ada Lovelace");
        assert!(found.is_superuser);

        assert!(db.get_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wallet_credit_creates_row_and_debit_is_conditional() {
        let db = test_db().await;
        assert!(db.fetch_wallet(1).await.unwrap().is_none());

        db.upsert_wallet_credit(1, 1_000).await.unwrap();
        db.upsert_wallet_credit(1, 500).await.unwrap();
        assert_eq!(db.fetch_wallet(1).await.unwrap().unwrap().balance, 1_500);

        // Short debit affects nothing
        assert_eq!(db.debit_wallet_if_funded(1, 2_000).await.unwrap(), 0);
        assert_eq!(db.fetch_wallet(1).await.unwrap().unwrap().balance, 1_500);

        // Exact debit drains it
        assert_eq!(db.debit_wallet_if_funded(1, 1_500).await.unwrap(), 1);
        assert_eq!(db.fetch_wallet(1).await.unwrap().unwrap().balance, 0);

        // Missing wallet debits nothing
        assert_eq!(db.debit_wallet_if_funded(99, 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn transaction_reference_is_unique() {
        let db = test_db().await;
        let tx = Transaction::new(1, ServiceCategory::Airtime, "mtn", 500, 500, "VTU-1-aaaa");
        db.insert_transaction(&tx).await.unwrap();

        let dup = Transaction::new(2, ServiceCategory::Data, "plan-9", 0, 0, "VTU-1-aaaa");
        assert!(db.insert_transaction(&dup).await.is_err());
    }

    #[tokio::test]
    async fn status_update_is_compare_and_swap() {
        let db = test_db().await;
        let tx = Transaction::new(1, ServiceCategory::Airtime, "mtn", 500, 500, "VTU-2-bbbb");
        db.insert_transaction(&tx).await.unwrap();

        let meta = serde_json::json!({"note": "settled"});
        // Wrong expectation loses
        assert!(
            !db.update_transaction_if_status(&tx.id, TxStatus::Processing, TxStatus::Success, &meta)
                .await
                .unwrap()
        );
        let unchanged = db.get_transaction(&tx.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, TxStatus::Pending);
        assert_eq!(unchanged.meta, serde_json::json!({}));

        // Right expectation wins and writes meta
        assert!(
            db.update_transaction_if_status(&tx.id, TxStatus::Pending, TxStatus::Success, &meta)
                .await
                .unwrap()
        );
        let updated = db.get_transaction(&tx.id).await.unwrap().unwrap();
        assert_eq!(updated.status, TxStatus::Success);
        assert_eq!(updated.meta, meta);
    }

    #[tokio::test]
    async fn finds_transactions_by_reference_and_user() {
        let db = test_db().await;
        let first = Transaction::new(1, ServiceCategory::Airtime, "mtn", 500, 500, "VTU-3-cccc");
        let second = Transaction::new(1, ServiceCategory::Data, "plan-9", 0, 0, "VTU-3-dddd");
        let other = Transaction::new(2, ServiceCategory::Cable, "plan-1", 900, 900, "VTU-3-eeee");
        for tx in [&first, &second, &other] {
            db.insert_transaction(tx).await.unwrap();
        }

        let by_ref = db.get_transaction_by_reference("VTU-3-dddd").await.unwrap();
        assert_eq!(by_ref.unwrap().id, second.id);
        assert!(db.get_transaction_by_reference("VTU-0-none").await.unwrap().is_none());

        assert_eq!(db.get_transactions_for_user(1).await.unwrap().len(), 2);
        assert_eq!(db.get_all_transactions().await.unwrap().len(), 3);

        let pending = db
            .get_transactions_for_user_by_status(1, TxStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
        let successes = db
            .get_transactions_for_user_by_status(1, TxStatus::Success)
            .await
            .unwrap();
        assert!(successes.is_empty());
    }

    #[tokio::test]
    async fn records_topups() {
        let db = test_db().await;
        let topup = Topup::new(5, 10_000, "success", "mock_topup");
        db.insert_topup(&topup).await.unwrap();

        let all = db.get_all_topups().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user_id, 5);
        assert_eq!(all[0].meta, serde_json::json!({"source": "mock_topup"}));
    }
}
