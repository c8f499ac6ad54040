use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account classification, mirrored in the stored `account_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Checking,
    Savings,
    Crypto,
    Investment,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "CHECKING",
            AccountType::Savings => "SAVINGS",
            AccountType::Crypto => "CRYPTO",
            AccountType::Investment => "INVESTMENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CHECKING" => Some(AccountType::Checking),
            "SAVINGS" => Some(AccountType::Savings),
            "CRYPTO" => Some(AccountType::Crypto),
            "INVESTMENT" => Some(AccountType::Investment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Inactive,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Inactive => "INACTIVE",
            AccountStatus::Frozen => "FROZEN",
            AccountStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(AccountStatus::Active),
            "INACTIVE" => Some(AccountStatus::Inactive),
            "FROZEN" => Some(AccountStatus::Frozen),
            "CLOSED" => Some(AccountStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Refund => "REFUND",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DEPOSIT" => Some(TransactionType::Deposit),
            "WITHDRAWAL" => Some(TransactionType::Withdrawal),
            "TRANSFER" => Some(TransactionType::Transfer),
            "PAYMENT" => Some(TransactionType::Payment),
            "REFUND" => Some(TransactionType::Refund),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(TransactionStatus::Pending),
            "COMPLETED" => Some(TransactionStatus::Completed),
            "FAILED" => Some(TransactionStatus::Failed),
            "CANCELLED" => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal transactions can never change status again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardType {
    Debit,
    Credit,
    Virtual,
    Prepaid,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Debit => "DEBIT",
            CardType::Credit => "CREDIT",
            CardType::Virtual => "VIRTUAL",
            CardType::Prepaid => "PREPAID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DEBIT" => Some(CardType::Debit),
            "CREDIT" => Some(CardType::Credit),
            "VIRTUAL" => Some(CardType::Virtual),
            "PREPAID" => Some(CardType::Prepaid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    Active,
    Blocked,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "ACTIVE",
            CardStatus::Blocked => "BLOCKED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(CardStatus::Active),
            "BLOCKED" => Some(CardStatus::Blocked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Transaction,
    Security,
    Account,
    System,
    Promotional,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Transaction => "TRANSACTION",
            NotificationType::Security => "SECURITY",
            NotificationType::Account => "ACCOUNT",
            NotificationType::System => "SYSTEM",
            NotificationType::Promotional => "PROMOTIONAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TRANSACTION" => Some(NotificationType::Transaction),
            "SECURITY" => Some(NotificationType::Security),
            "ACCOUNT" => Some(NotificationType::Account),
            "SYSTEM" => Some(NotificationType::System),
            "PROMOTIONAL" => Some(NotificationType::Promotional),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Unread,
    Read,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Unread => "UNREAD",
            NotificationStatus::Read => "READ",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNREAD" => Some(NotificationStatus::Unread),
            "READ" => Some(NotificationStatus::Read),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// ID of the user who owns this account
    pub user_id: String,
    /// Externally visible account number (unique, "ACC" + 10 digits)
    pub account_number: String,
    pub account_type: AccountType,
    /// ISO currency code, e.g. "USD"
    pub currency: String,
    /// Total balance including settled funds
    pub balance: Decimal,
    /// Portion of the balance usable for new transactions
    pub available_balance: Decimal,
    /// At most one account per user carries this flag
    pub is_default: bool,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// ID of the user who initiated this transaction
    pub user_id: String,
    /// Source account, absent for deposits
    pub from_account_id: Option<String>,
    /// Destination account, absent for withdrawals/payments
    pub to_account_id: Option<String>,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    /// Always positive; direction is carried by the account references
    pub amount: Decimal,
    pub currency: String,
    /// Flat fee charged to the source account, retained by the system
    pub fee: Decimal,
    pub description: Option<String>,
    /// Unique externally visible reference ("TXN-..."), usable by callers
    /// to detect duplicate submission
    pub reference: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// Set if and only if status is COMPLETED
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub user_id: String,
    /// Masked form only: "****-****-****-dddd"
    pub card_number: String,
    pub card_holder_name: String,
    pub card_type: CardType,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub cvv: String,
    pub is_virtual: bool,
    pub credit_limit: Option<Decimal>,
    pub available_credit: Option<Decimal>,
    pub status: CardStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub account_number: String,
    pub bank_name: String,
    pub bank_code: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Request/response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub user_id: String,
    pub account_type: AccountType,
    /// Defaults to "USD" when omitted
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAccountStatusRequest {
    pub status: AccountStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDefaultAccountRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub user_id: String,
    pub from_account_id: Option<String>,
    pub to_account_id: Option<String>,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    /// PENDING (default) or COMPLETED; COMPLETED records the transaction
    /// without any balance effects
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub user_id: String,
    pub card_holder_name: String,
    pub card_type: CardType,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub is_virtual: Option<bool>,
    pub credit_limit: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBeneficiaryRequest {
    pub user_id: String,
    pub name: String,
    pub account_number: String,
    pub bank_name: String,
    pub bank_code: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkAllNotificationsReadRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// Error body returned by every failed API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable kind: "not_found", "invalid_input", "invalid_state",
    /// "insufficient_funds", "conflict" or "storage"
    pub error: String,
    pub message: String,
}
