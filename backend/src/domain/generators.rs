//! Number and reference generators.
//!
//! Account and card numbers are random digits; collisions are possible and
//! are caught by the store's unique indexes. Transaction references use a
//! full 128-bit random token, so uniqueness holds by construction.

use rand::Rng;

/// Externally visible account number: "ACC" followed by ten digits.
pub fn generate_account_number() -> String {
    let digits: u64 = rand::thread_rng().gen_range(0..10_000_000_000);
    format!("ACC{digits:010}")
}

/// Unique transaction reference: "TXN-" followed by a uuid v4 token.
pub fn generate_reference() -> String {
    format!("TXN-{}", uuid::Uuid::new_v4().simple())
}

/// Masked card number; only the last four digits are real.
pub fn generate_card_number() -> String {
    let last_four: u16 = rand::thread_rng().gen_range(1000..10000);
    format!("****-****-****-{last_four}")
}

/// Three-digit card verification value.
pub fn generate_cvv() -> String {
    let cvv: u16 = rand::thread_rng().gen_range(100..1000);
    format!("{cvv}")
}
