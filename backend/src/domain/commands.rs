//! Domain-level command and query types.
//!
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer is responsible for mapping the
//! public DTOs defined in the `shared` crate to these internal types, and for
//! rejecting malformed input before it reaches a service.

pub mod users {
    /// Input for creating a new user.
    #[derive(Debug, Clone)]
    pub struct CreateUserCommand {
        pub email: String,
        pub name: String,
    }
}

pub mod accounts {
    use shared::{AccountStatus, AccountType};

    /// Input for opening a new account.
    #[derive(Debug, Clone)]
    pub struct CreateAccountCommand {
        pub user_id: String,
        pub account_type: AccountType,
        /// Defaults to "USD" when omitted.
        pub currency: Option<String>,
    }

    /// Input for updating an account's status.
    #[derive(Debug, Clone)]
    pub struct UpdateAccountStatusCommand {
        pub account_id: String,
        pub status: AccountStatus,
    }

    /// Input for making an account the user's default.
    #[derive(Debug, Clone)]
    pub struct SetDefaultAccountCommand {
        pub account_id: String,
        pub user_id: String,
    }
}

pub mod transactions {
    use rust_decimal::Decimal;
    use shared::{TransactionStatus, TransactionType};

    /// Input for creating a new ledger transaction.
    #[derive(Debug, Clone)]
    pub struct CreateTransactionCommand {
        pub user_id: String,
        pub from_account_id: Option<String>,
        pub to_account_id: Option<String>,
        pub transaction_type: TransactionType,
        pub amount: Decimal,
        /// Defaults to "USD" when omitted.
        pub currency: Option<String>,
        pub description: Option<String>,
        pub metadata: Option<serde_json::Value>,
        /// PENDING (default) or COMPLETED. COMPLETED records the transaction
        /// without balance effects; balances only move at settlement.
        pub status: Option<TransactionStatus>,
    }

    /// Query parameters for listing a user's transactions.
    #[derive(Debug, Clone, Default)]
    pub struct TransactionListQuery {
        pub status: Option<TransactionStatus>,
        pub transaction_type: Option<TransactionType>,
        pub limit: Option<u32>,
    }
}

pub mod cards {
    use rust_decimal::Decimal;
    use shared::CardType;

    /// Input for issuing a new card.
    #[derive(Debug, Clone)]
    pub struct CreateCardCommand {
        pub user_id: String,
        pub card_holder_name: String,
        pub card_type: CardType,
        pub expiry_month: u8,
        pub expiry_year: u16,
        pub is_virtual: bool,
        pub credit_limit: Option<Decimal>,
    }
}

pub mod beneficiaries {
    /// Input for registering a new beneficiary.
    #[derive(Debug, Clone)]
    pub struct CreateBeneficiaryCommand {
        pub user_id: String,
        pub name: String,
        pub account_number: String,
        pub bank_name: String,
        pub bank_code: Option<String>,
        pub email: Option<String>,
        pub phone_number: Option<String>,
    }
}

pub mod notifications {
    use shared::{NotificationStatus, NotificationType};

    /// Input for emitting a notification to a user.
    #[derive(Debug, Clone)]
    pub struct EmitNotificationCommand {
        pub user_id: String,
        pub notification_type: NotificationType,
        pub title: String,
        pub message: String,
        pub metadata: Option<serde_json::Value>,
    }

    /// Query parameters for listing a user's notifications.
    #[derive(Debug, Clone, Default)]
    pub struct NotificationListQuery {
        pub status: Option<NotificationStatus>,
    }
}
