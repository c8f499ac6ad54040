use crate::domain::commands::users::CreateUserCommand;
use crate::error::{LedgerError, Result};
use crate::storage::sqlite::UserRepository;
use crate::storage::traits::UserStore;
use crate::storage::DbConnection;
use chrono::Utc;
use shared::User;
use std::sync::Arc;

/// Minimal user management: enough to own accounts, cards and beneficiaries.
/// Authentication is out of scope.
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(connection: Arc<DbConnection>) -> Self {
        Self {
            user_repository: Arc::new(UserRepository::new((*connection).clone())),
        }
    }

    pub async fn create_user(&self, command: CreateUserCommand) -> Result<User> {
        if command.name.trim().is_empty() {
            return Err(LedgerError::InvalidInput("name must not be empty".into()));
        }
        if !command.email.contains('@') {
            return Err(LedgerError::InvalidInput(format!(
                "not a valid email address: {}",
                command.email
            )));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: command.email,
            name: command.name,
            created_at: Utc::now(),
        };

        self.user_repository.store_user(&user).await?;
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.user_repository
            .get_user(user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("user", user_id))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repository.list_users().await
    }
}
