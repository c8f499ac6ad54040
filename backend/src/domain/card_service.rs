use crate::domain::commands::cards::CreateCardCommand;
use crate::domain::generators::{generate_card_number, generate_cvv};
use crate::error::{LedgerError, Result};
use crate::storage::sqlite::{CardRepository, UserRepository};
use crate::storage::traits::{CardStore, UserStore};
use crate::storage::DbConnection;
use chrono::Utc;
use shared::{Card, CardStatus};
use std::sync::Arc;
use tracing::info;

/// Issues and manages cards. Card numbers are stored masked from the start;
/// the full PAN never exists in this system.
#[derive(Clone)]
pub struct CardService {
    card_repository: Arc<dyn CardStore>,
    user_repository: Arc<dyn UserStore>,
}

impl CardService {
    pub fn new(connection: Arc<DbConnection>) -> Self {
        Self {
            card_repository: Arc::new(CardRepository::new((*connection).clone())),
            user_repository: Arc::new(UserRepository::new((*connection).clone())),
        }
    }

    pub async fn create_card(&self, command: CreateCardCommand) -> Result<Card> {
        let user = self
            .user_repository
            .get_user(&command.user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("user", &command.user_id))?;

        if command.card_holder_name.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "card holder name must not be empty".into(),
            ));
        }
        if !(1..=12).contains(&command.expiry_month) {
            return Err(LedgerError::InvalidInput(format!(
                "expiry month out of range: {}",
                command.expiry_month
            )));
        }

        let card = Card {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            card_number: generate_card_number(),
            card_holder_name: command.card_holder_name,
            card_type: command.card_type,
            expiry_month: command.expiry_month,
            expiry_year: command.expiry_year,
            cvv: generate_cvv(),
            is_virtual: command.is_virtual,
            credit_limit: command.credit_limit,
            // A fresh card has its full limit available
            available_credit: command.credit_limit,
            status: CardStatus::Active,
            created_at: Utc::now(),
        };

        self.card_repository.store_card(&card).await?;
        info!(
            "issued {} card {} for user {}",
            card.card_type.as_str(),
            card.card_number,
            user.id
        );
        Ok(card)
    }

    pub async fn block_card(&self, card_id: &str) -> Result<Card> {
        let card = self
            .card_repository
            .update_status(card_id, CardStatus::Blocked)
            .await?;
        info!("blocked card {}", card.id);
        Ok(card)
    }

    pub async fn unblock_card(&self, card_id: &str) -> Result<Card> {
        self.card_repository
            .update_status(card_id, CardStatus::Active)
            .await
    }

    pub async fn list_cards(&self, user_id: &str) -> Result<Vec<Card>> {
        self.card_repository.list_cards(user_id).await
    }

    pub async fn get_card(&self, card_id: &str) -> Result<Card> {
        self.card_repository
            .get_card(card_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("card", card_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commands::users::CreateUserCommand;
    use crate::domain::user_service::UserService;
    use rust_decimal_macros::dec;
    use shared::CardType;

    async fn create_test_services() -> (CardService, String) {
        let connection = Arc::new(DbConnection::init_test().await.unwrap());
        let users = UserService::new(connection.clone());
        let user = users
            .create_user(CreateUserCommand {
                email: "card@example.com".to_string(),
                name: "Card Holder".to_string(),
            })
            .await
            .unwrap();
        (CardService::new(connection), user.id)
    }

    fn debit_command(user_id: &str) -> CreateCardCommand {
        CreateCardCommand {
            user_id: user_id.to_string(),
            card_holder_name: "CARD HOLDER".to_string(),
            card_type: CardType::Debit,
            expiry_month: 12,
            expiry_year: 2030,
            is_virtual: false,
            credit_limit: None,
        }
    }

    #[tokio::test]
    async fn test_issue_debit_card() {
        let (cards, user_id) = create_test_services().await;
        let card = cards.create_card(debit_command(&user_id)).await.unwrap();

        assert_eq!(card.status, CardStatus::Active);
        assert!(card.card_number.starts_with("****-****-****-"));
        assert_eq!(card.cvv.len(), 3);
        assert!(card.credit_limit.is_none());
        assert!(card.available_credit.is_none());
    }

    #[tokio::test]
    async fn test_credit_card_starts_with_full_limit() {
        let (cards, user_id) = create_test_services().await;
        let card = cards
            .create_card(CreateCardCommand {
                card_type: CardType::Credit,
                credit_limit: Some(dec!(5000.00)),
                ..debit_command(&user_id)
            })
            .await
            .unwrap();
        assert_eq!(card.available_credit, Some(dec!(5000.00)));
    }

    #[tokio::test]
    async fn test_invalid_expiry_month() {
        let (cards, user_id) = create_test_services().await;
        let err = cards
            .create_card(CreateCardCommand {
                expiry_month: 13,
                ..debit_command(&user_id)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_card_for_missing_user() {
        let (cards, _user_id) = create_test_services().await;
        let err = cards
            .create_card(debit_command("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_block_and_unblock() {
        let (cards, user_id) = create_test_services().await;
        let card = cards.create_card(debit_command(&user_id)).await.unwrap();

        let blocked = cards.block_card(&card.id).await.unwrap();
        assert_eq!(blocked.status, CardStatus::Blocked);

        let unblocked = cards.unblock_card(&card.id).await.unwrap();
        assert_eq!(unblocked.status, CardStatus::Active);

        let err = cards.block_card("missing").await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}
