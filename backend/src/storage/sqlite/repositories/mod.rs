pub mod account_repository;
pub mod beneficiary_repository;
pub mod card_repository;
pub mod notification_repository;
pub mod transaction_repository;
pub mod user_repository;

pub use account_repository::AccountRepository;
pub use beneficiary_repository::BeneficiaryRepository;
pub use card_repository::CardRepository;
pub use notification_repository::NotificationRepository;
pub use transaction_repository::TransactionRepository;
pub use user_repository::UserRepository;
