use crate::error::{LedgerError, Result};
use crate::storage::db::DbConnection;
use crate::storage::sqlite::{datetime_col, opt_decimal_col};
use crate::storage::traits::CardStore;
use async_trait::async_trait;
use shared::{Card, CardStatus, CardType};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const CARD_COLUMNS: &str = "id, user_id, card_number, card_holder_name, card_type, \
     expiry_month, expiry_year, cvv, is_virtual, credit_limit, available_credit, \
     status, created_at";

/// Repository for card operations
#[derive(Clone)]
pub struct CardRepository {
    db: DbConnection,
}

impl CardRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

fn map_card(row: &SqliteRow) -> Result<Card> {
    let card_type: String = row.get("card_type");
    let status: String = row.get("status");
    let expiry_month: i64 = row.get("expiry_month");
    let expiry_year: i64 = row.get("expiry_year");
    Ok(Card {
        id: row.get("id"),
        user_id: row.get("user_id"),
        card_number: row.get("card_number"),
        card_holder_name: row.get("card_holder_name"),
        card_type: CardType::parse(&card_type)
            .ok_or_else(|| LedgerError::Decode(format!("card_type: {card_type}")))?,
        expiry_month: expiry_month as u8,
        expiry_year: expiry_year as u16,
        cvv: row.get("cvv"),
        is_virtual: row.get("is_virtual"),
        credit_limit: opt_decimal_col(row, "credit_limit")?,
        available_credit: opt_decimal_col(row, "available_credit")?,
        status: CardStatus::parse(&status)
            .ok_or_else(|| LedgerError::Decode(format!("status: {status}")))?,
        created_at: datetime_col(row, "created_at")?,
    })
}

#[async_trait]
impl CardStore for CardRepository {
    async fn store_card(&self, card: &Card) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cards
                (id, user_id, card_number, card_holder_name, card_type,
                 expiry_month, expiry_year, cvv, is_virtual, credit_limit,
                 available_credit, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&card.id)
        .bind(&card.user_id)
        .bind(&card.card_number)
        .bind(&card.card_holder_name)
        .bind(card.card_type.as_str())
        .bind(card.expiry_month as i64)
        .bind(card.expiry_year as i64)
        .bind(&card.cvv)
        .bind(card.is_virtual)
        .bind(card.credit_limit.map(|d| d.to_string()))
        .bind(card.available_credit.map(|d| d.to_string()))
        .bind(card.status.as_str())
        .bind(card.created_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn get_card(&self, card_id: &str) -> Result<Option<Card>> {
        let row = sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?"))
            .bind(card_id)
            .fetch_optional(self.db.pool())
            .await?;

        match row {
            Some(r) => Ok(Some(map_card(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_cards(&self, user_id: &str) -> Result<Vec<Card>> {
        let rows = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_card).collect()
    }

    async fn update_status(&self, card_id: &str, status: CardStatus) -> Result<Card> {
        let result = sqlx::query("UPDATE cards SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(card_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::not_found("card", card_id));
        }

        self.get_card(card_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("card", card_id))
    }
}
