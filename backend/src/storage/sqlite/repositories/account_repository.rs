use crate::error::{LedgerError, Result};
use crate::storage::db::DbConnection;
use crate::storage::sqlite::{conflict_on_unique, datetime_col, decimal_col};
use crate::storage::traits::AccountStore;
use async_trait::async_trait;
use shared::{Account, AccountStatus, AccountType};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const ACCOUNT_COLUMNS: &str = "id, user_id, account_number, account_type, currency, \
     balance, available_balance, is_default, status, created_at";

/// Repository for account operations
#[derive(Clone)]
pub struct AccountRepository {
    db: DbConnection,
}

impl AccountRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

pub(crate) fn map_account(row: &SqliteRow) -> Result<Account> {
    let account_type: String = row.get("account_type");
    let status: String = row.get("status");
    Ok(Account {
        id: row.get("id"),
        user_id: row.get("user_id"),
        account_number: row.get("account_number"),
        account_type: AccountType::parse(&account_type)
            .ok_or_else(|| LedgerError::Decode(format!("account_type: {account_type}")))?,
        currency: row.get("currency"),
        balance: decimal_col(row, "balance")?,
        available_balance: decimal_col(row, "available_balance")?,
        is_default: row.get("is_default"),
        status: AccountStatus::parse(&status)
            .ok_or_else(|| LedgerError::Decode(format!("status: {status}")))?,
        created_at: datetime_col(row, "created_at")?,
    })
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn store_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, user_id, account_number, account_type, currency,
                 balance, available_balance, is_default, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.user_id)
        .bind(&account.account_number)
        .bind(account.account_type.as_str())
        .bind(&account.currency)
        .bind(account.balance.to_string())
        .bind(account.available_balance.to_string())
        .bind(account.is_default)
        .bind(account.status.as_str())
        .bind(account.created_at.to_rfc3339())
        .execute(self.db.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "account number already in use"))?;
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(account_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(map_account(&r)?)),
            None => Ok(None),
        }
    }

    async fn get_account_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = ?"
        ))
        .bind(account_number)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(map_account(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_account).collect()
    }

    async fn count_accounts(&self, user_id: &str) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM accounts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    async fn update_status(&self, account_id: &str, status: AccountStatus) -> Result<Account> {
        let result = sqlx::query("UPDATE accounts SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(account_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::not_found("account", account_id));
        }

        self.get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))
    }

    async fn set_default(&self, account_id: &str, user_id: &str) -> Result<Account> {
        // Clear-then-set inside one database transaction, so no reader ever
        // observes two defaults for the user.
        let mut dbtx = self.db.pool().begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(account_id)
        .fetch_optional(&mut *dbtx)
        .await?;

        let account = match row {
            Some(r) => map_account(&r)?,
            None => return Err(LedgerError::not_found("account", account_id)),
        };

        if account.user_id != user_id {
            return Err(LedgerError::InvalidInput(format!(
                "account {account_id} does not belong to user {user_id}"
            )));
        }

        sqlx::query("UPDATE accounts SET is_default = 0 WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *dbtx)
            .await?;

        sqlx::query("UPDATE accounts SET is_default = 1 WHERE id = ?")
            .bind(account_id)
            .execute(&mut *dbtx)
            .await?;

        dbtx.commit().await?;

        self.get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))
    }
}
