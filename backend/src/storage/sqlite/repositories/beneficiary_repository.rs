use crate::error::{LedgerError, Result};
use crate::storage::db::DbConnection;
use crate::storage::sqlite::datetime_col;
use crate::storage::traits::BeneficiaryStore;
use async_trait::async_trait;
use shared::Beneficiary;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const BENEFICIARY_COLUMNS: &str = "id, user_id, name, account_number, bank_name, \
     bank_code, email, phone_number, is_verified, created_at";

/// Repository for beneficiary operations
#[derive(Clone)]
pub struct BeneficiaryRepository {
    db: DbConnection,
}

impl BeneficiaryRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

fn map_beneficiary(row: &SqliteRow) -> Result<Beneficiary> {
    Ok(Beneficiary {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        account_number: row.get("account_number"),
        bank_name: row.get("bank_name"),
        bank_code: row.get("bank_code"),
        email: row.get("email"),
        phone_number: row.get("phone_number"),
        is_verified: row.get("is_verified"),
        created_at: datetime_col(row, "created_at")?,
    })
}

#[async_trait]
impl BeneficiaryStore for BeneficiaryRepository {
    async fn store_beneficiary(&self, beneficiary: &Beneficiary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO beneficiaries
                (id, user_id, name, account_number, bank_name, bank_code,
                 email, phone_number, is_verified, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&beneficiary.id)
        .bind(&beneficiary.user_id)
        .bind(&beneficiary.name)
        .bind(&beneficiary.account_number)
        .bind(&beneficiary.bank_name)
        .bind(&beneficiary.bank_code)
        .bind(&beneficiary.email)
        .bind(&beneficiary.phone_number)
        .bind(beneficiary.is_verified)
        .bind(beneficiary.created_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn get_beneficiary(&self, beneficiary_id: &str) -> Result<Option<Beneficiary>> {
        let row = sqlx::query(&format!(
            "SELECT {BENEFICIARY_COLUMNS} FROM beneficiaries WHERE id = ?"
        ))
        .bind(beneficiary_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(map_beneficiary(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_beneficiaries(&self, user_id: &str) -> Result<Vec<Beneficiary>> {
        let rows = sqlx::query(&format!(
            "SELECT {BENEFICIARY_COLUMNS} FROM beneficiaries WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_beneficiary).collect()
    }

    async fn set_verified(&self, beneficiary_id: &str) -> Result<Beneficiary> {
        let result = sqlx::query("UPDATE beneficiaries SET is_verified = 1 WHERE id = ?")
            .bind(beneficiary_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::not_found("beneficiary", beneficiary_id));
        }

        self.get_beneficiary(beneficiary_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("beneficiary", beneficiary_id))
    }

    async fn delete_beneficiary(&self, beneficiary_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM beneficiaries WHERE id = ?")
            .bind(beneficiary_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
