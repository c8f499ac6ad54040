//! Domain layer: one service per entity, each owning its repositories.
//!
//! Services validate commands, enforce state-machine rules and delegate
//! persistence to the storage traits. The REST layer only ever talks to
//! these services.

pub mod account_service;
pub mod beneficiary_service;
pub mod card_service;
pub mod commands;
pub mod generators;
pub mod notification_service;
pub mod transaction_service;
pub mod user_service;

pub use account_service::AccountService;
pub use beneficiary_service::BeneficiaryService;
pub use card_service::CardService;
pub use notification_service::NotificationService;
pub use transaction_service::TransactionService;
pub use user_service::UserService;
