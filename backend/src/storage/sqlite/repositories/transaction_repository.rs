use crate::error::{LedgerError, Result};
use crate::storage::db::DbConnection;
use crate::storage::sqlite::{
    conflict_on_unique, datetime_col, decimal_col, json_col, json_text, opt_datetime_col,
};
use crate::storage::traits::{TransactionFilter, TransactionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{Transaction, TransactionStatus, TransactionType};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};

const TRANSACTION_COLUMNS: &str = "id, user_id, from_account_id, to_account_id, \
     transaction_type, status, amount, currency, fee, description, reference, \
     metadata, created_at, processed_at";

/// When a list query does not specify a cap, at most this many rows come back.
const DEFAULT_LIST_LIMIT: u32 = 50;

/// Repository for ledger transactions.
///
/// Settlement and cancellation run their status transition as a conditional
/// update, so two concurrent calls for the same transaction cannot both
/// succeed, and balance updates ride in the same database transaction as the
/// status flip.
#[derive(Clone)]
pub struct TransactionRepository {
    db: DbConnection,
}

impl TransactionRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Apply a signed balance delta to an account inside an open database
    /// transaction. Balance and available balance move together; holds are
    /// not modeled separately.
    async fn adjust_balance(
        dbtx: &mut sqlx::Transaction<'_, Sqlite>,
        account_id: &str,
        delta: Decimal,
    ) -> Result<()> {
        let row = sqlx::query("SELECT balance, available_balance FROM accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(&mut **dbtx)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))?;

        let balance = decimal_col(&row, "balance")? + delta;
        let available = decimal_col(&row, "available_balance")? + delta;

        sqlx::query("UPDATE accounts SET balance = ?, available_balance = ? WHERE id = ?")
            .bind(balance.to_string())
            .bind(available.to_string())
            .bind(account_id)
            .execute(&mut **dbtx)
            .await?;

        Ok(())
    }
}

pub(crate) fn map_transaction(row: &SqliteRow) -> Result<Transaction> {
    let transaction_type: String = row.get("transaction_type");
    let status: String = row.get("status");
    Ok(Transaction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        from_account_id: row.get("from_account_id"),
        to_account_id: row.get("to_account_id"),
        transaction_type: TransactionType::parse(&transaction_type)
            .ok_or_else(|| LedgerError::Decode(format!("transaction_type: {transaction_type}")))?,
        status: TransactionStatus::parse(&status)
            .ok_or_else(|| LedgerError::Decode(format!("status: {status}")))?,
        amount: decimal_col(row, "amount")?,
        currency: row.get("currency"),
        fee: decimal_col(row, "fee")?,
        description: row.get("description"),
        reference: row.get("reference"),
        metadata: json_col(row, "metadata")?,
        created_at: datetime_col(row, "created_at")?,
        processed_at: opt_datetime_col(row, "processed_at")?,
    })
}

#[async_trait]
impl TransactionStore for TransactionRepository {
    async fn store_transaction(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, user_id, from_account_id, to_account_id, transaction_type,
                 status, amount, currency, fee, description, reference,
                 metadata, created_at, processed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.user_id)
        .bind(&transaction.from_account_id)
        .bind(&transaction.to_account_id)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.amount.to_string())
        .bind(&transaction.currency)
        .bind(transaction.fee.to_string())
        .bind(&transaction.description)
        .bind(&transaction.reference)
        .bind(json_text(&transaction.metadata))
        .bind(transaction.created_at.to_rfc3339())
        .bind(transaction.processed_at.map(|d| d.to_rfc3339()))
        .execute(self.db.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "transaction reference already exists"))?;
        Ok(())
    }

    async fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?"
        ))
        .bind(transaction_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(map_transaction(&r)?)),
            None => Ok(None),
        }
    }

    async fn get_transaction_by_reference(&self, reference: &str) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE reference = ?"
        ))
        .bind(reference)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(map_transaction(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_transactions(
        &self,
        user_id: &str,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let mut sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = ?");
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.transaction_type.is_some() {
            sql.push_str(" AND transaction_type = ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut query = sqlx::query(&sql).bind(user_id);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(transaction_type) = filter.transaction_type {
            query = query.bind(transaction_type.as_str());
        }
        query = query.bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT) as i64);

        let rows = query.fetch_all(self.db.pool()).await?;
        rows.iter().map(map_transaction).collect()
    }

    async fn settle(&self, transaction_id: &str, now: DateTime<Utc>) -> Result<Transaction> {
        let mut dbtx = self.db.pool().begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?"
        ))
        .bind(transaction_id)
        .fetch_optional(&mut *dbtx)
        .await?;

        let mut transaction = match row {
            Some(r) => map_transaction(&r)?,
            None => return Err(LedgerError::not_found("transaction", transaction_id)),
        };

        // The status guard and transition are one conditional update; a
        // second settle or a concurrent cancel sees zero affected rows.
        let updated = sqlx::query(
            "UPDATE transactions SET status = 'COMPLETED', processed_at = ? \
             WHERE id = ? AND status = 'PENDING'",
        )
        .bind(now.to_rfc3339())
        .bind(transaction_id)
        .execute(&mut *dbtx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(LedgerError::InvalidState(format!(
                "transaction {transaction_id} is {} and cannot be processed",
                transaction.status.as_str()
            )));
        }

        // Source pays amount + fee; destination receives the amount only.
        // The fee is retained by the system.
        if let Some(from_account_id) = transaction.from_account_id.clone() {
            let debit = transaction.amount + transaction.fee;
            Self::adjust_balance(&mut dbtx, &from_account_id, -debit).await?;
        }
        if let Some(to_account_id) = transaction.to_account_id.clone() {
            Self::adjust_balance(&mut dbtx, &to_account_id, transaction.amount).await?;
        }

        dbtx.commit().await?;

        transaction.status = TransactionStatus::Completed;
        transaction.processed_at = Some(now);
        Ok(transaction)
    }

    async fn cancel(&self, transaction_id: &str) -> Result<Transaction> {
        let updated = sqlx::query(
            "UPDATE transactions SET status = 'CANCELLED' \
             WHERE id = ? AND status = 'PENDING'",
        )
        .bind(transaction_id)
        .execute(self.db.pool())
        .await?;

        if updated.rows_affected() == 0 {
            return match self.get_transaction(transaction_id).await? {
                None => Err(LedgerError::not_found("transaction", transaction_id)),
                Some(t) => Err(LedgerError::InvalidState(format!(
                    "only pending transactions can be cancelled, transaction {transaction_id} is {}",
                    t.status.as_str()
                ))),
            };
        }

        self.get_transaction(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))
    }
}
