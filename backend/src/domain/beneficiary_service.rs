use crate::domain::commands::beneficiaries::CreateBeneficiaryCommand;
use crate::error::{LedgerError, Result};
use crate::storage::sqlite::{BeneficiaryRepository, UserRepository};
use crate::storage::traits::{BeneficiaryStore, UserStore};
use crate::storage::DbConnection;
use chrono::Utc;
use shared::Beneficiary;
use std::sync::Arc;
use tracing::info;

/// Manages saved external payees. Beneficiaries start unverified; a separate
/// verification step flips the flag.
#[derive(Clone)]
pub struct BeneficiaryService {
    beneficiary_repository: Arc<dyn BeneficiaryStore>,
    user_repository: Arc<dyn UserStore>,
}

impl BeneficiaryService {
    pub fn new(connection: Arc<DbConnection>) -> Self {
        Self {
            beneficiary_repository: Arc::new(BeneficiaryRepository::new((*connection).clone())),
            user_repository: Arc::new(UserRepository::new((*connection).clone())),
        }
    }

    pub async fn add_beneficiary(&self, command: CreateBeneficiaryCommand) -> Result<Beneficiary> {
        let user = self
            .user_repository
            .get_user(&command.user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("user", &command.user_id))?;

        if command.name.trim().is_empty() {
            return Err(LedgerError::InvalidInput("name must not be empty".into()));
        }
        if command.account_number.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "account number must not be empty".into(),
            ));
        }

        let beneficiary = Beneficiary {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            name: command.name,
            account_number: command.account_number,
            bank_name: command.bank_name,
            bank_code: command.bank_code,
            email: command.email,
            phone_number: command.phone_number,
            is_verified: false,
            created_at: Utc::now(),
        };

        self.beneficiary_repository
            .store_beneficiary(&beneficiary)
            .await?;
        info!("added beneficiary {} for user {}", beneficiary.id, user.id);
        Ok(beneficiary)
    }

    pub async fn verify_beneficiary(&self, beneficiary_id: &str) -> Result<Beneficiary> {
        self.beneficiary_repository
            .set_verified(beneficiary_id)
            .await
    }

    pub async fn remove_beneficiary(&self, beneficiary_id: &str) -> Result<bool> {
        self.beneficiary_repository
            .delete_beneficiary(beneficiary_id)
            .await
    }

    pub async fn list_beneficiaries(&self, user_id: &str) -> Result<Vec<Beneficiary>> {
        self.beneficiary_repository.list_beneficiaries(user_id).await
    }

    pub async fn get_beneficiary(&self, beneficiary_id: &str) -> Result<Beneficiary> {
        self.beneficiary_repository
            .get_beneficiary(beneficiary_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("beneficiary", beneficiary_id))
    }
}
