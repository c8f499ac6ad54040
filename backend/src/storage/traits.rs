//! # Storage Traits
//!
//! Storage abstraction traits that keep the domain layer independent of the
//! concrete backend. The SQLite repositories implement these; tests and any
//! future backend can provide their own implementations.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    Account, AccountStatus, Beneficiary, Card, CardStatus, Notification, NotificationStatus,
    Transaction, TransactionStatus, TransactionType, User,
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Store a new user; fails with Conflict on a duplicate email
    async fn store_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// List all users ordered by creation time descending
    async fn list_users(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Store a new account; fails with Conflict on a duplicate account number
    async fn store_account(&self, account: &Account) -> Result<()>;

    async fn get_account(&self, account_id: &str) -> Result<Option<Account>>;

    async fn get_account_by_number(&self, account_number: &str) -> Result<Option<Account>>;

    /// List a user's accounts ordered by creation time descending
    async fn list_accounts(&self, user_id: &str) -> Result<Vec<Account>>;

    /// Number of accounts the user currently has
    async fn count_accounts(&self, user_id: &str) -> Result<u64>;

    /// Update an account's status; returns the updated account
    async fn update_status(&self, account_id: &str, status: AccountStatus) -> Result<Account>;

    /// Atomically clear the default flag on all of the user's accounts and
    /// set it on the given one. The account must belong to the user. At no
    /// observable point does the user end up with two defaults.
    async fn set_default(&self, account_id: &str, user_id: &str) -> Result<Account>;
}

/// Filters for listing a user's transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    pub transaction_type: Option<TransactionType>,
    pub limit: Option<u32>,
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Store a new transaction; fails with Conflict on a duplicate reference
    async fn store_transaction(&self, transaction: &Transaction) -> Result<()>;

    async fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>>;

    async fn get_transaction_by_reference(&self, reference: &str) -> Result<Option<Transaction>>;

    /// List a user's transactions newest first, capped by `filter.limit`
    async fn list_transactions(
        &self,
        user_id: &str,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>>;

    /// Settle a PENDING transaction: flip it to COMPLETED, debit the source
    /// account by amount + fee and credit the destination by amount, all
    /// inside a single database transaction. The PENDING check and the
    /// status flip are one conditional update, so concurrent settlement or
    /// cancellation of the same transaction cannot both succeed.
    async fn settle(&self, transaction_id: &str, now: DateTime<Utc>) -> Result<Transaction>;

    /// Cancel a PENDING transaction. No balance changes: balances are only
    /// touched at settlement.
    async fn cancel(&self, transaction_id: &str) -> Result<Transaction>;
}

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn store_card(&self, card: &Card) -> Result<()>;

    async fn get_card(&self, card_id: &str) -> Result<Option<Card>>;

    /// List a user's cards ordered by creation time descending
    async fn list_cards(&self, user_id: &str) -> Result<Vec<Card>>;

    /// Update a card's status; returns the updated card
    async fn update_status(&self, card_id: &str, status: CardStatus) -> Result<Card>;
}

#[async_trait]
pub trait BeneficiaryStore: Send + Sync {
    async fn store_beneficiary(&self, beneficiary: &Beneficiary) -> Result<()>;

    async fn get_beneficiary(&self, beneficiary_id: &str) -> Result<Option<Beneficiary>>;

    /// List a user's beneficiaries ordered by creation time descending
    async fn list_beneficiaries(&self, user_id: &str) -> Result<Vec<Beneficiary>>;

    /// Mark a beneficiary as verified; returns the updated beneficiary
    async fn set_verified(&self, beneficiary_id: &str) -> Result<Beneficiary>;

    /// Delete a beneficiary; returns true if it existed
    async fn delete_beneficiary(&self, beneficiary_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn store_notification(&self, notification: &Notification) -> Result<()>;

    async fn get_notification(&self, notification_id: &str) -> Result<Option<Notification>>;

    /// List a user's notifications newest first, optionally filtered by status
    async fn list_notifications(
        &self,
        user_id: &str,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<Notification>>;

    async fn unread_count(&self, user_id: &str) -> Result<u64>;

    /// Mark one notification as read, recording the read timestamp
    async fn mark_read(&self, notification_id: &str, now: DateTime<Utc>) -> Result<Notification>;

    /// Mark all of a user's unread notifications as read; returns the count
    async fn mark_all_read(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64>;

    /// Delete a notification; returns true if it existed
    async fn delete_notification(&self, notification_id: &str) -> Result<bool>;
}
