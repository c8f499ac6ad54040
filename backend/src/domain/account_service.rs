use crate::domain::commands::accounts::{
    CreateAccountCommand, SetDefaultAccountCommand, UpdateAccountStatusCommand,
};
use crate::domain::generators::generate_account_number;
use crate::error::{LedgerError, Result};
use crate::storage::sqlite::{AccountRepository, UserRepository};
use crate::storage::traits::{AccountStore, UserStore};
use crate::storage::DbConnection;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::{Account, AccountStatus};
use std::sync::Arc;
use tracing::info;

/// How many times account creation retries a fresh number after a
/// uniqueness collision before giving up.
const ACCOUNT_NUMBER_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct AccountService {
    account_repository: Arc<dyn AccountStore>,
    user_repository: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(connection: Arc<DbConnection>) -> Self {
        Self {
            account_repository: Arc::new(AccountRepository::new((*connection).clone())),
            user_repository: Arc::new(UserRepository::new((*connection).clone())),
        }
    }

    /// Open a new account. The user's first account automatically becomes
    /// their default.
    pub async fn create_account(&self, command: CreateAccountCommand) -> Result<Account> {
        let user = self
            .user_repository
            .get_user(&command.user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("user", &command.user_id))?;

        let currency = command.currency.unwrap_or_else(|| "USD".to_string());
        if currency.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "currency must not be empty".into(),
            ));
        }

        let existing = self.account_repository.count_accounts(&user.id).await?;

        let mut last_err = None;
        for _ in 0..ACCOUNT_NUMBER_ATTEMPTS {
            let account = Account {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user.id.clone(),
                account_number: generate_account_number(),
                account_type: command.account_type,
                currency: currency.clone(),
                balance: Decimal::ZERO,
                available_balance: Decimal::ZERO,
                is_default: existing == 0,
                status: AccountStatus::Active,
                created_at: Utc::now(),
            };

            match self.account_repository.store_account(&account).await {
                Ok(()) => {
                    info!(
                        "created {} account {} for user {}",
                        account.account_type.as_str(),
                        account.account_number,
                        user.id
                    );
                    return Ok(account);
                }
                // Random ten-digit numbers can collide; draw again
                Err(e @ LedgerError::Conflict(_)) => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            LedgerError::Conflict("could not allocate an account number".into())
        }))
    }

    pub async fn update_status(&self, command: UpdateAccountStatusCommand) -> Result<Account> {
        self.account_repository
            .update_status(&command.account_id, command.status)
            .await
    }

    /// Make the account the user's single default; every other account of
    /// the user loses the flag in the same store transaction.
    pub async fn set_default_account(&self, command: SetDefaultAccountCommand) -> Result<Account> {
        self.account_repository
            .set_default(&command.account_id, &command.user_id)
            .await
    }

    pub async fn list_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        self.account_repository.list_accounts(user_id).await
    }

    pub async fn get_account(&self, account_id: &str) -> Result<Account> {
        self.account_repository
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))
    }

    pub async fn get_account_by_number(&self, account_number: &str) -> Result<Account> {
        self.account_repository
            .get_account_by_number(account_number)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commands::users::CreateUserCommand;
    use crate::domain::user_service::UserService;
    use shared::AccountType;

    async fn create_test_services() -> (AccountService, UserService) {
        let connection = Arc::new(DbConnection::init_test().await.unwrap());
        (
            AccountService::new(connection.clone()),
            UserService::new(connection),
        )
    }

    async fn create_test_user(users: &UserService, email: &str) -> String {
        users
            .create_user(CreateUserCommand {
                email: email.to_string(),
                name: "Test User".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_first_account_is_default() {
        let (accounts, users) = create_test_services().await;
        let user_id = create_test_user(&users, "a@example.com").await;

        let first = accounts
            .create_account(CreateAccountCommand {
                user_id: user_id.clone(),
                account_type: AccountType::Checking,
                currency: None,
            })
            .await
            .unwrap();
        assert!(first.is_default);
        assert_eq!(first.currency, "USD");
        assert_eq!(first.balance, Decimal::ZERO);

        let second = accounts
            .create_account(CreateAccountCommand {
                user_id: user_id.clone(),
                account_type: AccountType::Savings,
                currency: None,
            })
            .await
            .unwrap();
        assert!(!second.is_default);

        let all = accounts.list_accounts(&user_id).await.unwrap();
        assert_eq!(all.iter().filter(|a| a.is_default).count(), 1);
    }

    #[tokio::test]
    async fn test_create_account_for_missing_user() {
        let (accounts, _users) = create_test_services().await;
        let err = accounts
            .create_account(CreateAccountCommand {
                user_id: "missing".to_string(),
                account_type: AccountType::Checking,
                currency: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_default_switches_exactly_once() {
        let (accounts, users) = create_test_services().await;
        let user_id = create_test_user(&users, "b@example.com").await;

        let first = accounts
            .create_account(CreateAccountCommand {
                user_id: user_id.clone(),
                account_type: AccountType::Checking,
                currency: None,
            })
            .await
            .unwrap();
        let second = accounts
            .create_account(CreateAccountCommand {
                user_id: user_id.clone(),
                account_type: AccountType::Crypto,
                currency: Some("BTC".to_string()),
            })
            .await
            .unwrap();

        accounts
            .set_default_account(SetDefaultAccountCommand {
                account_id: second.id.clone(),
                user_id: user_id.clone(),
            })
            .await
            .unwrap();

        let all = accounts.list_accounts(&user_id).await.unwrap();
        let defaults: Vec<_> = all.iter().filter(|a| a.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, second.id);
        assert!(!all.iter().find(|a| a.id == first.id).unwrap().is_default);
    }

    #[tokio::test]
    async fn test_lookup_by_number() {
        let (accounts, users) = create_test_services().await;
        let user_id = create_test_user(&users, "c@example.com").await;

        let account = accounts
            .create_account(CreateAccountCommand {
                user_id,
                account_type: AccountType::Investment,
                currency: None,
            })
            .await
            .unwrap();

        let found = accounts
            .get_account_by_number(&account.account_number)
            .await
            .unwrap();
        assert_eq!(found.id, account.id);

        let err = accounts
            .get_account_by_number("ACC0000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_status() {
        let (accounts, users) = create_test_services().await;
        let user_id = create_test_user(&users, "d@example.com").await;

        let account = accounts
            .create_account(CreateAccountCommand {
                user_id,
                account_type: AccountType::Checking,
                currency: None,
            })
            .await
            .unwrap();

        let frozen = accounts
            .update_status(UpdateAccountStatusCommand {
                account_id: account.id,
                status: AccountStatus::Frozen,
            })
            .await
            .unwrap();
        assert_eq!(frozen.status, AccountStatus::Frozen);
    }
}
