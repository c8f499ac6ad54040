//! Transaction lifecycle engine: validation, creation, settlement and
//! cancellation of ledger transactions.

use crate::domain::commands::notifications::EmitNotificationCommand;
use crate::domain::commands::transactions::{CreateTransactionCommand, TransactionListQuery};
use crate::domain::generators::generate_reference;
use crate::domain::notification_service::NotificationService;
use crate::error::{LedgerError, Result};
use crate::storage::sqlite::{AccountRepository, TransactionRepository};
use crate::storage::traits::{AccountStore, TransactionFilter, TransactionStore};
use crate::storage::DbConnection;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{NotificationType, Transaction, TransactionStatus, TransactionType};
use std::sync::Arc;
use tracing::{error, info};

/// Flat fee charged to the source account, by transaction type.
fn fee_for(transaction_type: TransactionType) -> Decimal {
    match transaction_type {
        TransactionType::Transfer => dec!(2.50),
        TransactionType::Withdrawal => dec!(5.00),
        TransactionType::Deposit | TransactionType::Payment | TransactionType::Refund => {
            Decimal::ZERO
        }
    }
}

/// Transaction types that spend from the source account and therefore
/// require sufficient available balance at creation time.
fn requires_funds(transaction_type: TransactionType) -> bool {
    matches!(
        transaction_type,
        TransactionType::Transfer | TransactionType::Withdrawal | TransactionType::Payment
    )
}

#[derive(Clone)]
pub struct TransactionService {
    transaction_repository: Arc<dyn TransactionStore>,
    account_repository: Arc<dyn AccountStore>,
    notification_service: NotificationService,
}

impl TransactionService {
    pub fn new(connection: Arc<DbConnection>, notification_service: NotificationService) -> Self {
        Self {
            transaction_repository: Arc::new(TransactionRepository::new((*connection).clone())),
            account_repository: Arc::new(AccountRepository::new((*connection).clone())),
            notification_service,
        }
    }

    /// Create a new transaction in PENDING (or, on explicit caller intent,
    /// COMPLETED) status. Balances are not touched here; debits and credits
    /// happen at settlement.
    ///
    /// The available-balance check is a pre-check against a balance that may
    /// move before settlement; it is not re-validated at settlement time.
    pub async fn create_transaction(&self, command: CreateTransactionCommand) -> Result<Transaction> {
        if command.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidInput("amount must be positive".into()));
        }

        if command.from_account_id.is_none() && command.to_account_id.is_none() {
            return Err(LedgerError::InvalidInput(
                "at least one of source and destination account is required".into(),
            ));
        }

        let status = command.status.unwrap_or(TransactionStatus::Pending);
        if !matches!(
            status,
            TransactionStatus::Pending | TransactionStatus::Completed
        ) {
            return Err(LedgerError::InvalidInput(format!(
                "transactions cannot be created in {} status",
                status.as_str()
            )));
        }

        if let Some(from_account_id) = &command.from_account_id {
            let from_account = self
                .account_repository
                .get_account(from_account_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("account", from_account_id))?;

            if requires_funds(command.transaction_type)
                && from_account.available_balance < command.amount
            {
                return Err(LedgerError::InsufficientFunds {
                    account_id: from_account.id,
                });
            }
        }

        if let Some(to_account_id) = &command.to_account_id {
            self.account_repository
                .get_account(to_account_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("account", to_account_id))?;
        }

        let now = Utc::now();
        let transaction = Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: command.user_id,
            from_account_id: command.from_account_id,
            to_account_id: command.to_account_id,
            transaction_type: command.transaction_type,
            status,
            amount: command.amount,
            currency: command.currency.unwrap_or_else(|| "USD".to_string()),
            fee: fee_for(command.transaction_type),
            description: command.description,
            reference: generate_reference(),
            metadata: command.metadata,
            created_at: now,
            processed_at: (status == TransactionStatus::Completed).then_some(now),
        };

        self.transaction_repository
            .store_transaction(&transaction)
            .await?;

        info!(
            "created {} transaction {} ({})",
            transaction.transaction_type.as_str(),
            transaction.id,
            transaction.reference
        );
        Ok(transaction)
    }

    /// Settle a PENDING transaction: the status flip and both balance
    /// updates commit as one unit in the store. On success one notification
    /// goes to the initiating user; a notification failure is logged and
    /// never rolls back the settlement.
    pub async fn process_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        let transaction = self
            .transaction_repository
            .settle(transaction_id, Utc::now())
            .await?;

        info!(
            "settled transaction {} ({} {} {})",
            transaction.id,
            transaction.transaction_type.as_str(),
            transaction.amount,
            transaction.currency
        );

        let notification = EmitNotificationCommand {
            user_id: transaction.user_id.clone(),
            notification_type: NotificationType::Transaction,
            title: "Transaction Completed".to_string(),
            message: format!(
                "Your {} of {} {} was successful",
                transaction.transaction_type.as_str().to_lowercase(),
                transaction.amount,
                transaction.currency
            ),
            metadata: Some(serde_json::json!({
                "transactionId": transaction.id,
                "amount": transaction.amount.to_string(),
            })),
        };
        if let Err(e) = self.notification_service.emit(notification).await {
            error!(
                "failed to emit settlement notification for {}: {e}",
                transaction.id
            );
        }

        Ok(transaction)
    }

    /// Cancel a PENDING transaction. Balances were never touched for it, so
    /// nothing is reversed.
    pub async fn cancel_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        let transaction = self.transaction_repository.cancel(transaction_id).await?;
        info!("cancelled transaction {}", transaction.id);
        Ok(transaction)
    }

    pub async fn list_transactions(
        &self,
        user_id: &str,
        query: TransactionListQuery,
    ) -> Result<Vec<Transaction>> {
        self.transaction_repository
            .list_transactions(
                user_id,
                TransactionFilter {
                    status: query.status,
                    transaction_type: query.transaction_type,
                    limit: query.limit,
                },
            )
            .await
    }

    pub async fn get_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        self.transaction_repository
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))
    }

    pub async fn get_transaction_by_reference(&self, reference: &str) -> Result<Transaction> {
        self.transaction_repository
            .get_transaction_by_reference(reference)
            .await?
            .ok_or_else(|| LedgerError::not_found("transaction", reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account_service::AccountService;
    use crate::domain::commands::accounts::CreateAccountCommand;
    use crate::domain::commands::users::CreateUserCommand;
    use crate::domain::user_service::UserService;
    use shared::AccountType;

    struct Fixture {
        transactions: TransactionService,
        accounts: AccountService,
        notifications: NotificationService,
        user_id: String,
    }

    async fn create_test_fixture() -> Fixture {
        let connection = Arc::new(DbConnection::init_test().await.unwrap());
        let users = UserService::new(connection.clone());
        let accounts = AccountService::new(connection.clone());
        let notifications = NotificationService::new(connection.clone());
        let transactions = TransactionService::new(connection, notifications.clone());

        let user = users
            .create_user(CreateUserCommand {
                email: "john@example.com".to_string(),
                name: "John Doe".to_string(),
            })
            .await
            .unwrap();

        Fixture {
            transactions,
            accounts,
            notifications,
            user_id: user.id,
        }
    }

    async fn create_funded_account(fixture: &Fixture, balance: Decimal) -> String {
        let account = fixture
            .accounts
            .create_account(CreateAccountCommand {
                user_id: fixture.user_id.clone(),
                account_type: AccountType::Checking,
                currency: None,
            })
            .await
            .unwrap();
        if balance > Decimal::ZERO {
            // Fund through the engine itself: deposit, then settle
            let deposit = fixture
                .transactions
                .create_transaction(CreateTransactionCommand {
                    user_id: fixture.user_id.clone(),
                    from_account_id: None,
                    to_account_id: Some(account.id.clone()),
                    transaction_type: TransactionType::Deposit,
                    amount: balance,
                    currency: None,
                    description: Some("initial funding".to_string()),
                    metadata: None,
                    status: None,
                })
                .await
                .unwrap();
            fixture
                .transactions
                .process_transaction(&deposit.id)
                .await
                .unwrap();
        }
        account.id
    }

    fn transfer_command(fixture: &Fixture, from: &str, to: &str, amount: Decimal) -> CreateTransactionCommand {
        CreateTransactionCommand {
            user_id: fixture.user_id.clone(),
            from_account_id: Some(from.to_string()),
            to_account_id: Some(to.to_string()),
            transaction_type: TransactionType::Transfer,
            amount,
            currency: None,
            description: None,
            metadata: None,
            status: None,
        }
    }

    #[test]
    fn test_fee_schedule() {
        assert_eq!(fee_for(TransactionType::Transfer), dec!(2.50));
        assert_eq!(fee_for(TransactionType::Withdrawal), dec!(5.00));
        assert_eq!(fee_for(TransactionType::Deposit), Decimal::ZERO);
        assert_eq!(fee_for(TransactionType::Payment), Decimal::ZERO);
        assert_eq!(fee_for(TransactionType::Refund), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_transfer_settlement_scenario() {
        let fixture = create_test_fixture().await;
        let from = create_funded_account(&fixture, dec!(1000.00)).await;
        let to = create_funded_account(&fixture, Decimal::ZERO).await;

        let transaction = fixture
            .transactions
            .create_transaction(transfer_command(&fixture, &from, &to, dec!(500.00)))
            .await
            .unwrap();
        assert_eq!(transaction.status, TransactionStatus::Pending);
        assert_eq!(transaction.fee, dec!(2.50));
        assert!(transaction.processed_at.is_none());

        let settled = fixture
            .transactions
            .process_transaction(&transaction.id)
            .await
            .unwrap();
        assert_eq!(settled.status, TransactionStatus::Completed);
        assert!(settled.processed_at.is_some());

        let from_account = fixture.accounts.get_account(&from).await.unwrap();
        assert_eq!(from_account.balance, dec!(497.50));
        assert_eq!(from_account.available_balance, dec!(497.50));

        let to_account = fixture.accounts.get_account(&to).await.unwrap();
        assert_eq!(to_account.balance, dec!(500.00));

        // Total system balance decreased by exactly the fee
        assert_eq!(
            from_account.balance + to_account.balance,
            dec!(1000.00) - dec!(2.50)
        );

        // The available <= balance invariant holds for both accounts
        assert!(from_account.available_balance <= from_account.balance);
        assert!(to_account.available_balance <= to_account.balance);
    }

    #[tokio::test]
    async fn test_settlement_emits_notification() {
        let fixture = create_test_fixture().await;
        let from = create_funded_account(&fixture, dec!(100.00)).await;
        let to = create_funded_account(&fixture, Decimal::ZERO).await;

        let before = fixture
            .notifications
            .unread_count(&fixture.user_id)
            .await
            .unwrap();

        let transaction = fixture
            .transactions
            .create_transaction(transfer_command(&fixture, &from, &to, dec!(10.00)))
            .await
            .unwrap();
        fixture
            .transactions
            .process_transaction(&transaction.id)
            .await
            .unwrap();

        let after = fixture
            .notifications
            .unread_count(&fixture.user_id)
            .await
            .unwrap();
        assert_eq!(after, before + 1);
    }

    #[tokio::test]
    async fn test_insufficient_funds_creates_no_record() {
        let fixture = create_test_fixture().await;
        let from = create_funded_account(&fixture, dec!(100.00)).await;
        let to = create_funded_account(&fixture, Decimal::ZERO).await;

        let before = fixture
            .transactions
            .list_transactions(&fixture.user_id, TransactionListQuery::default())
            .await
            .unwrap()
            .len();

        let err = fixture
            .transactions
            .create_transaction(transfer_command(&fixture, &from, &to, dec!(100.01)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        let after = fixture
            .transactions
            .list_transactions(&fixture.user_id, TransactionListQuery::default())
            .await
            .unwrap()
            .len();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_deposit_needs_no_funds() {
        let fixture = create_test_fixture().await;
        let to = create_funded_account(&fixture, Decimal::ZERO).await;

        let deposit = fixture
            .transactions
            .create_transaction(CreateTransactionCommand {
                user_id: fixture.user_id.clone(),
                from_account_id: None,
                to_account_id: Some(to.clone()),
                transaction_type: TransactionType::Deposit,
                amount: dec!(25.00),
                currency: None,
                description: None,
                metadata: None,
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(deposit.fee, Decimal::ZERO);

        fixture
            .transactions
            .process_transaction(&deposit.id)
            .await
            .unwrap();
        let account = fixture.accounts.get_account(&to).await.unwrap();
        assert_eq!(account.balance, dec!(25.00));
    }

    #[tokio::test]
    async fn test_withdrawal_debits_amount_plus_fee() {
        let fixture = create_test_fixture().await;
        let from = create_funded_account(&fixture, dec!(100.00)).await;

        let withdrawal = fixture
            .transactions
            .create_transaction(CreateTransactionCommand {
                user_id: fixture.user_id.clone(),
                from_account_id: Some(from.clone()),
                to_account_id: None,
                transaction_type: TransactionType::Withdrawal,
                amount: dec!(40.00),
                currency: None,
                description: None,
                metadata: None,
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(withdrawal.fee, dec!(5.00));

        fixture
            .transactions
            .process_transaction(&withdrawal.id)
            .await
            .unwrap();
        let account = fixture.accounts.get_account(&from).await.unwrap();
        assert_eq!(account.balance, dec!(55.00));
    }

    #[tokio::test]
    async fn test_pending_settles_or_cancels_exactly_once() {
        let fixture = create_test_fixture().await;
        let from = create_funded_account(&fixture, dec!(100.00)).await;
        let to = create_funded_account(&fixture, Decimal::ZERO).await;

        let transaction = fixture
            .transactions
            .create_transaction(transfer_command(&fixture, &from, &to, dec!(10.00)))
            .await
            .unwrap();

        fixture
            .transactions
            .process_transaction(&transaction.id)
            .await
            .unwrap();

        let settle_again = fixture
            .transactions
            .process_transaction(&transaction.id)
            .await
            .unwrap_err();
        assert!(matches!(settle_again, LedgerError::InvalidState(_)));

        let cancel_after = fixture
            .transactions
            .cancel_transaction(&transaction.id)
            .await
            .unwrap_err();
        assert!(matches!(cancel_after, LedgerError::InvalidState(_)));

        // Balances reflect exactly one settlement
        let from_account = fixture.accounts.get_account(&from).await.unwrap();
        assert_eq!(from_account.balance, dec!(87.50));
    }

    #[tokio::test]
    async fn test_cancel_leaves_balances_untouched() {
        let fixture = create_test_fixture().await;
        let from = create_funded_account(&fixture, dec!(100.00)).await;
        let to = create_funded_account(&fixture, Decimal::ZERO).await;

        let transaction = fixture
            .transactions
            .create_transaction(transfer_command(&fixture, &from, &to, dec!(10.00)))
            .await
            .unwrap();
        let cancelled = fixture
            .transactions
            .cancel_transaction(&transaction.id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, TransactionStatus::Cancelled);
        assert!(cancelled.processed_at.is_none());

        let from_account = fixture.accounts.get_account(&from).await.unwrap();
        assert_eq!(from_account.balance, dec!(100.00));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let fixture = create_test_fixture().await;
        let to = create_funded_account(&fixture, Decimal::ZERO).await;

        // Non-positive amount
        let err = fixture
            .transactions
            .create_transaction(CreateTransactionCommand {
                user_id: fixture.user_id.clone(),
                from_account_id: None,
                to_account_id: Some(to.clone()),
                transaction_type: TransactionType::Deposit,
                amount: Decimal::ZERO,
                currency: None,
                description: None,
                metadata: None,
                status: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        // No accounts at all
        let err = fixture
            .transactions
            .create_transaction(CreateTransactionCommand {
                user_id: fixture.user_id.clone(),
                from_account_id: None,
                to_account_id: None,
                transaction_type: TransactionType::Payment,
                amount: dec!(10.00),
                currency: None,
                description: None,
                metadata: None,
                status: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        // Unknown source account
        let err = fixture
            .transactions
            .create_transaction(CreateTransactionCommand {
                user_id: fixture.user_id.clone(),
                from_account_id: Some("missing".to_string()),
                to_account_id: Some(to.clone()),
                transaction_type: TransactionType::Transfer,
                amount: dec!(10.00),
                currency: None,
                description: None,
                metadata: None,
                status: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));

        // Creating in a terminal failure status is not a caller's call to make
        let err = fixture
            .transactions
            .create_transaction(CreateTransactionCommand {
                user_id: fixture.user_id.clone(),
                from_account_id: None,
                to_account_id: Some(to),
                transaction_type: TransactionType::Deposit,
                amount: dec!(10.00),
                currency: None,
                description: None,
                metadata: None,
                status: Some(TransactionStatus::Failed),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_completed_records_without_balance_effects() {
        let fixture = create_test_fixture().await;
        let to = create_funded_account(&fixture, Decimal::ZERO).await;

        let recorded = fixture
            .transactions
            .create_transaction(CreateTransactionCommand {
                user_id: fixture.user_id.clone(),
                from_account_id: None,
                to_account_id: Some(to.clone()),
                transaction_type: TransactionType::Refund,
                amount: dec!(15.00),
                currency: None,
                description: Some("imported refund".to_string()),
                metadata: None,
                status: Some(TransactionStatus::Completed),
            })
            .await
            .unwrap();
        assert_eq!(recorded.status, TransactionStatus::Completed);
        assert!(recorded.processed_at.is_some());

        // Recorded, not settled: no balance movement
        let account = fixture.accounts.get_account(&to).await.unwrap();
        assert_eq!(account.balance, Decimal::ZERO);

        // And it can never be settled again
        let err = fixture
            .transactions
            .process_transaction(&recorded.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_lookup_by_reference() {
        let fixture = create_test_fixture().await;
        let to = create_funded_account(&fixture, Decimal::ZERO).await;

        let transaction = fixture
            .transactions
            .create_transaction(CreateTransactionCommand {
                user_id: fixture.user_id.clone(),
                from_account_id: None,
                to_account_id: Some(to),
                transaction_type: TransactionType::Deposit,
                amount: dec!(10.00),
                currency: None,
                description: None,
                metadata: None,
                status: None,
            })
            .await
            .unwrap();

        let found = fixture
            .transactions
            .get_transaction_by_reference(&transaction.reference)
            .await
            .unwrap();
        assert_eq!(found.id, transaction.id);
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let fixture = create_test_fixture().await;
        let to = create_funded_account(&fixture, Decimal::ZERO).await;

        for _ in 0..2 {
            fixture
                .transactions
                .create_transaction(CreateTransactionCommand {
                    user_id: fixture.user_id.clone(),
                    from_account_id: None,
                    to_account_id: Some(to.clone()),
                    transaction_type: TransactionType::Deposit,
                    amount: dec!(5.00),
                    currency: None,
                    description: None,
                    metadata: None,
                    status: None,
                })
                .await
                .unwrap();
        }

        let pending = fixture
            .transactions
            .list_transactions(
                &fixture.user_id,
                TransactionListQuery {
                    status: Some(TransactionStatus::Pending),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);

        let capped = fixture
            .transactions
            .list_transactions(
                &fixture.user_id,
                TransactionListQuery {
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(capped.len(), 1);
    }
}
